//! Compositor implementation

use thiserror::Error;
use tracing::{debug, warn};

use super::{Canvas, Composition, RunStatus, TileFailure};
use crate::domain::{CanvasSize, RowRange};
use crate::rpc::RasterTile;

/// A tile that cannot be placed on the canvas
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositeError {
    #[error("Tile width {actual} does not match canvas width {expected}")]
    WidthMismatch { expected: u32, actual: u32 },

    #[error("Rows {rows} fall outside a canvas of height {height}")]
    OutOfBounds { rows: RowRange, height: u32 },

    #[error("Rows {rows} overlap already written rows {existing}")]
    Overlap { rows: RowRange, existing: RowRange },
}

/// Writes completed tiles into their row range of the canvas
///
/// Placement depends only on each tile's row offset, so the final canvas is
/// the same whatever order tiles arrive in.
#[derive(Debug, Default)]
pub struct Compositor {
    canvas: Canvas,
    expected: Vec<RowRange>,
    written: Vec<RowRange>,
}

impl Compositor {
    /// Allocate the canvas for a run partitioned into `expected`
    pub fn new(size: CanvasSize, expected: Vec<RowRange>) -> Self {
        debug!(%size, tiles = expected.len(), "Compositor::new: called");
        Self {
            canvas: Canvas::new(size),
            expected,
            written: Vec::new(),
        }
    }

    /// Copy `raster` into the canvas starting at row `y_start`
    pub fn accept(&mut self, y_start: u32, raster: &RasterTile) -> Result<RowRange, CompositeError> {
        debug!(y_start, rows = raster.height, "Compositor::accept: called");
        if raster.width != self.canvas.width() {
            return Err(CompositeError::WidthMismatch {
                expected: self.canvas.width(),
                actual: raster.width,
            });
        }

        let end = y_start.checked_add(raster.height).unwrap_or(u32::MAX);
        let rows = RowRange::new(y_start, end);
        if end > self.canvas.height() {
            return Err(CompositeError::OutOfBounds {
                rows,
                height: self.canvas.height(),
            });
        }
        if let Some(existing) = self.written.iter().find(|w| w.overlaps(&rows)) {
            return Err(CompositeError::Overlap {
                rows,
                existing: *existing,
            });
        }

        self.canvas
            .rows_mut(y_start, raster.height)
            .copy_from_slice(&raster.pixels);
        self.written.push(rows);
        debug!(%rows, written = self.written.len(), "Compositor::accept: placed");
        Ok(rows)
    }

    /// Ranges written so far, in arrival order
    #[cfg(test)]
    pub(crate) fn written(&self) -> &[RowRange] {
        &self.written
    }

    /// Close the run and hand back the canvas
    ///
    /// Any expected range that was neither written nor given up on is
    /// reported as missing; outside of cancellation that means the run is
    /// degraded.
    pub fn finalize(self, failed: Vec<TileFailure>, cancelled: bool) -> Composition {
        debug!(
            written = self.written.len(),
            failed = failed.len(),
            cancelled,
            "Compositor::finalize: called"
        );
        let missing: Vec<RowRange> = self
            .expected
            .iter()
            .filter(|r| !self.written.contains(r) && !failed.iter().any(|f| f.rows == **r))
            .copied()
            .collect();

        let status = if cancelled {
            RunStatus::Cancelled
        } else if !missing.is_empty() {
            warn!(missing = missing.len(), "Compositor::finalize: ranges unaccounted for");
            RunStatus::Degraded
        } else if !failed.is_empty() {
            RunStatus::Degraded
        } else {
            RunStatus::Complete
        };

        Composition {
            status,
            canvas: self.canvas,
            failed,
            missing,
        }
    }
}
