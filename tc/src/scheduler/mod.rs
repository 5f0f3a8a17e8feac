//! Tile dispatch scheduler
//!
//! Splits the canvas into row bands, keeps one execution slot per worker and
//! pulls the next pending tile into whichever slot frees up first. Failed
//! tiles go to the back of the queue until their retry budget is spent.

mod config;
mod core;
mod error;
mod partition;
mod queue;
mod slot;

pub use config::SchedulerConfig;
pub use core::Scheduler;
pub use error::RunError;
pub use partition::{PartitionError, partition};
pub use queue::{PendingQueue, QueuedTile};
pub use slot::{SlotState, SlotSummary, WorkerSlot};
