//! Result compositor
//!
//! Accumulates completed tiles into a pre-allocated canvas and produces the
//! terminal run result.

mod canvas;
mod core;
mod result;

pub use canvas::Canvas;
pub use core::{CompositeError, Compositor};
pub use result::{Composition, RunResult, RunStatus, TileFailure};
