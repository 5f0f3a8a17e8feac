//! Tilecast - distributed escape-time raster renderer
//!
//! Tilecast renders a large single-channel raster by cutting it into row
//! bands and handing each band to a fixed set of remote workers over HTTP.
//! Workers pull the next band as soon as they finish one, so faster workers
//! take on more of the canvas.
//!
//! # Core Concepts
//!
//! - **Pull Dispatch**: One slot per worker, refilled on completion
//! - **Bounded Retry**: Failed bands are requeued until their budget is spent
//! - **Position-Exact Compositing**: Arrival order never changes the canvas
//! - **Monotonic Progress**: The reported percentage never goes back
//!
//! # Modules
//!
//! - [`domain`] - Canvas, tiles, viewport and the worker registry
//! - [`rpc`] - Tile renderer trait and its HTTP implementation
//! - [`scheduler`] - Partitioning and pull dispatch
//! - [`progress`] - Progress snapshots, polling and aggregation
//! - [`compositor`] - Canvas assembly and run results
//! - [`dispatch`] - Run handles for front ends
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod compositor;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod progress;
pub mod rpc;
pub mod scheduler;

// Re-export commonly used types
pub use compositor::{Canvas, RunResult, RunStatus, TileFailure};
pub use config::{Config, RenderConfig};
pub use dispatch::{Dispatcher, RunHandle};
pub use domain::{CanvasSize, RowRange, Tile, Viewport, WorkerRegistry, WorkerSpec};
pub use progress::{ProgressAggregator, RunProgress};
pub use rpc::{HttpTileClient, RasterTile, RpcError, TileRenderer, TileRequest, create_renderer};
pub use scheduler::{PartitionError, RunError, Scheduler, SchedulerConfig, partition};
