//! Progress aggregator
//!
//! Turns a [`RunProgress`] snapshot plus the latest in-flight samples into one
//! percentage for display.

use std::collections::HashMap;

use tracing::debug;

use super::RunProgress;
use crate::domain::RowRange;

/// Highest value reported before the scheduler declares completion
pub const PRE_COMPLETION_CEILING: f64 = 99.9;

/// Last polled in-flight percentage of one slot's current tile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolledSample {
    /// Tile the sample belongs to
    pub rows: RowRange,

    /// Dispatch of the slot the sample was taken during
    pub dispatch: u64,

    pub percent: f64,
}

/// Monotonic progress percentage
///
/// Finished rows count fully; rows in flight count by their worker's last
/// reported percentage. A high-water mark keeps the value from going back
/// when a tile in flight fails and is requeued.
#[derive(Debug, Default)]
pub struct ProgressAggregator {
    high_water: f64,
}

impl ProgressAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in a new snapshot and return the percentage to show
    pub fn observe(&mut self, snapshot: &RunProgress, samples: &HashMap<usize, PolledSample>) -> f64 {
        if snapshot.finished {
            debug!("ProgressAggregator::observe: run finished");
            self.high_water = 100.0;
            return self.high_water;
        }
        if snapshot.rows_total == 0 {
            return self.high_water;
        }

        let mut done = snapshot.rows_accounted() as f64;
        for slot in 0..snapshot.assignments.len() {
            if let Some((rows, dispatch)) = snapshot.attempt(slot)
                && let Some(sample) = samples.get(&slot)
                && sample.rows == rows
                && sample.dispatch == dispatch
            {
                done += rows.rows() as f64 * sample.percent.clamp(0.0, 100.0) / 100.0;
            }
        }

        let raw = 100.0 * done / snapshot.rows_total as f64;
        let value = raw.min(PRE_COMPLETION_CEILING);
        if value > self.high_water {
            self.high_water = value;
        }
        self.high_water
    }

    /// Last value returned by [`observe`](Self::observe)
    pub fn current(&self) -> f64 {
        self.high_water
    }
}
