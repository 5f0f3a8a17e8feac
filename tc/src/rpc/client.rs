//! TileRenderer trait definition

use async_trait::async_trait;

use super::{ProgressReport, RasterTile, RpcError, TileRequest};
use crate::domain::WorkerSpec;

/// Stateless access to a worker's tile renderer
///
/// Every call is independent: a tile request carries everything needed to
/// compute it, so any worker can take any tile and a failed tile can be sent
/// again anywhere.
#[async_trait]
pub trait TileRenderer: Send + Sync {
    /// Compute one tile, returning the decoded single-channel raster
    ///
    /// Blocks the calling task until the worker answers, the transport fails
    /// or the deadline passes.
    async fn compute_tile(&self, worker: &WorkerSpec, request: &TileRequest) -> Result<RasterTile, RpcError>;

    /// Ask a worker how far along its current tile is
    async fn poll_progress(&self, worker: &WorkerSpec) -> Result<ProgressReport, RpcError>;
}
