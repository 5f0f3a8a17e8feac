//! Row ranges, tiles and canvas geometry

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Bounds;
use crate::rpc::TileRequest;

/// Pixel dimensions of the target canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Square canvas, the shape the CLI renders
    pub fn square(size: u32) -> Self {
        Self::new(size, size)
    }

    /// Total number of pixels
    pub fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl std::fmt::Display for CanvasSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Half-open range of canvas rows `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowRange {
    pub start: u32,
    pub end: u32,
}

impl RowRange {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "RowRange start must not exceed end");
        Self { start, end }
    }

    /// Number of rows covered
    pub fn rows(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if the two ranges share at least one row
    pub fn overlaps(&self, other: &RowRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl std::fmt::Display for RowRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A unit of work: a row range and the request that renders it
///
/// Tiles are immutable once planned. Each carries the full coordinate window
/// so a worker can compute it without any other context.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    /// Position in partition order
    pub index: usize,
    pub rows: RowRange,
    pub request: TileRequest,
}

impl Tile {
    /// Build one tile per row range, mapping each range proportionally onto
    /// the imaginary axis of `bounds`
    pub fn plan(canvas: CanvasSize, bounds: &Bounds, max_iter: u32, ranges: &[RowRange]) -> Vec<Tile> {
        debug!(%canvas, tiles = ranges.len(), "Tile::plan: called");
        let height = canvas.height as f64;
        let span = bounds.y_max - bounds.y_min;

        ranges
            .iter()
            .enumerate()
            .map(|(index, rows)| {
                let y1 = bounds.y_min + (rows.start as f64 / height) * span;
                let y2 = bounds.y_min + (rows.end as f64 / height) * span;
                Tile {
                    index,
                    rows: *rows,
                    request: TileRequest {
                        x_min: bounds.x_min,
                        x_max: bounds.x_max,
                        y_min: y1,
                        y_max: y2,
                        width: canvas.width,
                        height: rows.rows(),
                        max_iter,
                    },
                }
            })
            .collect()
    }
}
