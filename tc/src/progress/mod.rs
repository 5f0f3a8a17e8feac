//! Run progress tracking
//!
//! The scheduler publishes [`RunProgress`] snapshots; the aggregator turns
//! them into a single monotonic percentage, optionally refined by in-flight
//! samples the poller collects from workers.

mod aggregator;
mod poller;
mod snapshot;

pub use aggregator::{PRE_COMPLETION_CEILING, PolledSample, ProgressAggregator};
pub use poller::{ProgressPoller, SampleMap};
pub use snapshot::RunProgress;
