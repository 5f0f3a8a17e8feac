//! Fake HTTP workers for integration tests

#![allow(dead_code)]

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use image::{GrayImage, ImageFormat};
use serde_json::json;

use tilecast::TileRequest;

/// How a fake worker answers `POST /compute`
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    /// PNG-encoded grayscale tile
    Png,
    /// Raw row-major L8 bytes
    Raw,
    /// `{"data": [[x, y, value], ...]}`, one triplet per pixel
    Json,
    /// Raw bytes, one row short
    Truncated,
    /// HTTP 500
    ServerError,
    /// Never answer within the test
    Hang,
}

struct WorkerState {
    reply: Reply,
    delay: Duration,
    computes: AtomicUsize,
}

/// A running fake worker
pub struct FakeWorker {
    pub addr: SocketAddr,
    state: Arc<WorkerState>,
}

impl FakeWorker {
    pub async fn start(reply: Reply) -> Self {
        Self::start_with_delay(reply, Duration::ZERO).await
    }

    pub async fn start_with_delay(reply: Reply, delay: Duration) -> Self {
        let state = Arc::new(WorkerState {
            reply,
            delay,
            computes: AtomicUsize::new(0),
        });
        let app = Router::new()
            .route("/compute", post(compute))
            .route("/progress", get(progress))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn computes(&self) -> usize {
        self.state.computes.load(Ordering::SeqCst)
    }
}

/// Pixel value a fake worker produces at tile-local `(x, y)`
pub fn pixel(request: &TileRequest, x: u32, y: u32) -> u8 {
    let base = (request.y_min * 1000.0).round() as i64;
    (base + 3 * y as i64 + x as i64).rem_euclid(256) as u8
}

pub fn render(request: &TileRequest) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((request.width * request.height) as usize);
    for y in 0..request.height {
        for x in 0..request.width {
            pixels.push(pixel(request, x, y));
        }
    }
    pixels
}

async fn compute(State(state): State<Arc<WorkerState>>, Json(request): Json<TileRequest>) -> Response {
    state.computes.fetch_add(1, Ordering::SeqCst);
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    match state.reply {
        Reply::Png => {
            let image = GrayImage::from_raw(request.width, request.height, render(&request)).unwrap();
            let mut body = Cursor::new(Vec::new());
            image.write_to(&mut body, ImageFormat::Png).unwrap();
            ([(header::CONTENT_TYPE, "image/png")], body.into_inner()).into_response()
        }
        Reply::Raw => ([(header::CONTENT_TYPE, "application/octet-stream")], render(&request)).into_response(),
        Reply::Json => {
            let data: Vec<_> = (0..request.height)
                .flat_map(|y| (0..request.width).map(move |x| (x, y)))
                .map(|(x, y)| json!([x, y, pixel(&request, x, y)]))
                .collect();
            Json(json!({ "data": data })).into_response()
        }
        Reply::Truncated => {
            let mut pixels = render(&request);
            pixels.truncate(((request.height - 1) * request.width) as usize);
            ([(header::CONTENT_TYPE, "application/octet-stream")], pixels).into_response()
        }
        Reply::ServerError => (StatusCode::INTERNAL_SERVER_ERROR, "kernel crashed").into_response(),
        Reply::Hang => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            StatusCode::OK.into_response()
        }
    }
}

async fn progress(State(state): State<Arc<WorkerState>>) -> Json<serde_json::Value> {
    let status = if state.computes.load(Ordering::SeqCst) > 0 {
        "busy"
    } else {
        "idle"
    };
    Json(json!({ "status": status, "progress": 42.0 }))
}
