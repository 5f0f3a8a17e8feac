//! Domain types for tilecast
//!
//! Canvas geometry, the fractal viewport, tiles (row ranges plus the request a
//! worker needs to compute them) and the worker registry.

mod tile;
mod viewport;
mod worker;

pub use tile::{CanvasSize, RowRange, Tile};
pub use viewport::{Bounds, Viewport};
pub use worker::{RegistryError, WorkerRegistry, WorkerSpec};
