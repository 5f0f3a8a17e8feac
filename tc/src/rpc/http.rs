//! HTTP tile renderer client
//!
//! Implements the TileRenderer trait against workers that expose
//! `POST /compute` and, optionally, `GET /progress`.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{ProgressReport, RasterTile, RpcError, TileRenderer, TileRequest};
use crate::domain::WorkerSpec;

/// Content type for bodies carrying bare row-major L8 pixels
const RAW_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type for bodies carrying `{"data": [[x, y, value], ...]}`
const JSON_CONTENT_TYPE: &str = "application/json";

/// Progress polls are cheap; never let one hang longer than this
const POLL_TIMEOUT: Duration = Duration::from_secs(2);

/// reqwest-backed worker client
#[derive(Debug, Clone)]
pub struct HttpTileClient {
    http: Client,
    timeout: Duration,
}

impl HttpTileClient {
    /// Create a client whose compute calls give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, RpcError> {
        debug!(?timeout, "HttpTileClient::new: called");
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::WorkerUnavailable(e.to_string()))?;
        Ok(Self { http, timeout })
    }

    fn map_send_error(&self, e: reqwest::Error) -> RpcError {
        if e.is_timeout() {
            RpcError::Timeout(self.timeout)
        } else {
            RpcError::from(e)
        }
    }
}

/// Pixel list answered by workers that reply in JSON
#[derive(Debug, Deserialize)]
struct PixelTriplets {
    data: Vec<(u32, u32, u8)>,
}

/// Place every `(x, y, value)` triplet; each pixel of the tile must be covered
fn decode_triplets(body: &[u8], request: &TileRequest) -> Result<RasterTile, RpcError> {
    let triplets: PixelTriplets = serde_json::from_slice(body).map_err(|e| RpcError::Decode(e.to_string()))?;
    let (width, height) = (request.width, request.height);
    let mut pixels = vec![0u8; request.pixel_count()];
    let mut seen = vec![false; request.pixel_count()];

    for (x, y, value) in triplets.data {
        if x >= width || y >= height {
            return Err(RpcError::Decode(format!("pixel ({}, {}) outside {}x{} tile", x, y, width, height)));
        }
        let i = y as usize * width as usize + x as usize;
        pixels[i] = value;
        seen[i] = true;
    }

    let missing = seen.iter().filter(|s| !**s).count();
    if missing > 0 {
        return Err(RpcError::Decode(format!(
            "{} of {} pixels missing from {}x{} tile",
            missing,
            pixels.len(),
            width,
            height
        )));
    }
    Ok(RasterTile { width, height, pixels })
}

/// Decode a compute response body into a raster of the requested size
pub fn decode_tile(content_type: Option<&str>, body: &[u8], request: &TileRequest) -> Result<RasterTile, RpcError> {
    debug!(?content_type, len = body.len(), "decode_tile: called");
    let media_type = content_type.map(|ct| ct.split(';').next().unwrap_or("").trim());
    let is = |expected: &str| media_type.is_some_and(|mt| mt.eq_ignore_ascii_case(expected));

    let raster = if is(JSON_CONTENT_TYPE) {
        debug!("decode_tile: json pixel triplets");
        decode_triplets(body, request)?
    } else if is(RAW_CONTENT_TYPE) {
        debug!("decode_tile: raw L8 body");
        RasterTile::from_raw(request.width, request.height, body.to_vec()).ok_or_else(|| {
            RpcError::Decode(format!(
                "expected {} raw bytes for {}x{}, got {}",
                request.pixel_count(),
                request.width,
                request.height,
                body.len()
            ))
        })?
    } else {
        debug!("decode_tile: encoded image body");
        let image = image::load_from_memory(body).map_err(|e| RpcError::Decode(e.to_string()))?;
        let luma = image.into_luma8();
        let (width, height) = luma.dimensions();
        RasterTile {
            width,
            height,
            pixels: luma.into_raw(),
        }
    };

    if raster.width != request.width || raster.height != request.height {
        debug!(raster.width, raster.height, "decode_tile: dimension mismatch");
        return Err(RpcError::Decode(format!(
            "expected {}x{} tile, got {}x{}",
            request.width, request.height, raster.width, raster.height
        )));
    }
    Ok(raster)
}

#[async_trait]
impl TileRenderer for HttpTileClient {
    async fn compute_tile(&self, worker: &WorkerSpec, request: &TileRequest) -> Result<RasterTile, RpcError> {
        debug!(worker = %worker.name, height = request.height, "HttpTileClient::compute_tile: called");
        let url = worker.endpoint("compute");

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "HttpTileClient::compute_tile: worker error");
            let message = response.text().await.unwrap_or_default();
            return Err(RpcError::WorkerError {
                status: status.as_u16(),
                message,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|e| self.map_send_error(e))?;

        decode_tile(content_type.as_deref(), &body, request)
    }

    async fn poll_progress(&self, worker: &WorkerSpec) -> Result<ProgressReport, RpcError> {
        debug!(worker = %worker.name, "HttpTileClient::poll_progress: called");
        let response = self
            .http
            .get(worker.endpoint("progress"))
            .timeout(POLL_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::WorkerError {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let report: ProgressReport = response
            .json()
            .await
            .map_err(|e| RpcError::Decode(e.to_string()))?;
        Ok(report.clamped())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat, Luma};
    use serde_json::json;
    use std::io::Cursor;

    fn request(width: u32, height: u32) -> TileRequest {
        TileRequest {
            x_min: -2.0,
            x_max: 1.0,
            y_min: -1.0,
            y_max: 1.0,
            width,
            height,
            max_iter: 100,
        }
    }

    fn png(width: u32, height: u32, value: u8) -> Vec<u8> {
        let image = GrayImage::from_pixel(width, height, Luma([value]));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let body = png(8, 4, 200);
        let raster = decode_tile(Some("image/png"), &body, &request(8, 4)).unwrap();

        assert_eq!(raster.width, 8);
        assert_eq!(raster.height, 4);
        assert!(raster.pixels.iter().all(|p| *p == 200));
    }

    #[test]
    fn test_decode_png_without_content_type() {
        let body = png(3, 3, 7);
        assert!(decode_tile(None, &body, &request(3, 3)).is_ok());
    }

    #[test]
    fn test_decode_png_wrong_size() {
        let body = png(8, 5, 0);
        let err = decode_tile(Some("image/png"), &body, &request(8, 4)).unwrap_err();
        assert!(matches!(err, RpcError::Decode(_)));
    }

    #[test]
    fn test_decode_raw() {
        let body: Vec<u8> = (0..12).collect();
        let raster = decode_tile(Some("application/octet-stream"), &body, &request(4, 3)).unwrap();
        assert_eq!(raster.row(2), &[8, 9, 10, 11]);
    }

    #[test]
    fn test_decode_raw_short_body() {
        let err = decode_tile(Some("application/octet-stream"), &[0; 5], &request(4, 3)).unwrap_err();
        assert!(err.to_string().contains("expected 12 raw bytes"));
    }

    #[test]
    fn test_decode_json_triplets() {
        let data: Vec<_> = (0..3u32)
            .flat_map(|y| (0..4u32).map(move |x| json!([x, y, y * 4 + x])))
            .rev()
            .collect();
        let body = serde_json::to_vec(&json!({ "data": data })).unwrap();

        let raster = decode_tile(Some("application/json; charset=utf-8"), &body, &request(4, 3)).unwrap();
        assert_eq!(raster.row(0), &[0, 1, 2, 3]);
        assert_eq!(raster.row(2), &[8, 9, 10, 11]);
    }

    #[test]
    fn test_decode_json_pixel_out_of_range() {
        let body = serde_json::to_vec(&json!({ "data": [[0, 0, 1], [4, 0, 1]] })).unwrap();
        let err = decode_tile(Some("application/json"), &body, &request(4, 1)).unwrap_err();
        assert!(matches!(err, RpcError::Decode(_)));
        assert!(err.to_string().contains("(4, 0) outside 4x1"));
    }

    #[test]
    fn test_decode_json_missing_pixels() {
        let body = serde_json::to_vec(&json!({ "data": [[0, 0, 1], [1, 0, 1]] })).unwrap();
        let err = decode_tile(Some("application/json"), &body, &request(2, 2)).unwrap_err();
        assert!(err.to_string().contains("2 of 4 pixels missing"));
    }

    #[test]
    fn test_decode_json_wrong_shape() {
        let body = br#"{"pixels": [1, 2, 3]}"#;
        let err = decode_tile(Some("application/json"), body, &request(3, 1)).unwrap_err();
        assert!(matches!(err, RpcError::Decode(_)));
    }

    #[test]
    fn test_decode_garbage() {
        let err = decode_tile(Some("image/png"), b"not an image", &request(4, 3)).unwrap_err();
        assert!(matches!(err, RpcError::Decode(_)));
    }
}
