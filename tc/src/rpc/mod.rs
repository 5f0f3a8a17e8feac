//! RPC compute client
//!
//! Sends tile-compute requests to workers and polls their progress. Every
//! failure is surfaced as a typed [`RpcError`]; nothing raises past this
//! boundary.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

pub mod client;
mod error;
mod http;
mod types;

pub use client::TileRenderer;
pub use error::RpcError;
pub use http::{HttpTileClient, decode_tile};
pub use types::{ProgressReport, RasterTile, TileRequest, WorkerStatus};

/// Create the HTTP renderer shared by every slot of a run
pub fn create_renderer(timeout: Duration) -> Result<Arc<dyn TileRenderer>, RpcError> {
    debug!(?timeout, "create_renderer: called");
    Ok(Arc::new(HttpTileClient::new(timeout)?))
}
