//! Wire types for the tile compute and progress endpoints

use serde::{Deserialize, Serialize};

/// Body of `POST /compute`: a coordinate window and its pixel dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileRequest {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub width: u32,
    pub height: u32,
    pub max_iter: u32,
}

impl TileRequest {
    /// Number of bytes a single-channel raster of this request occupies
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Decoded single-channel tile, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterTile {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RasterTile {
    /// Wrap raw L8 pixels, returning `None` if the length does not match
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize).then_some(Self { width, height, pixels })
    }

    /// A tile filled with one value
    #[cfg(test)]
    pub(crate) fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; width as usize * height as usize],
        }
    }

    /// Row `y` of the tile
    pub fn row(&self, y: u32) -> &[u8] {
        let w = self.width as usize;
        let start = y as usize * w;
        &self.pixels[start..start + w]
    }
}

/// Worker activity reported by `GET /progress`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Idle,
    Busy,
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Busy => write!(f, "busy"),
        }
    }
}

/// Body of `GET /progress`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub status: WorkerStatus,

    /// Percent of the current tile done, in `[0, 100]`
    pub progress: f64,
}

impl ProgressReport {
    /// Clamp `progress` into `[0, 100]`; NaN becomes 0
    pub fn clamped(self) -> Self {
        let progress = if self.progress.is_nan() {
            0.0
        } else {
            self.progress.clamp(0.0, 100.0)
        };
        Self { progress, ..self }
    }
}
