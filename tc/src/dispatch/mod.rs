//! Presentation adapter
//!
//! Entry point for front ends: start a run, sample its progress, cancel it
//! and collect the composed canvas.

mod dispatcher;
mod handle;

pub use dispatcher::Dispatcher;
pub use handle::RunHandle;
