//! Run progress counters

use serde::{Deserialize, Serialize};

use crate::domain::{RowRange, Tile};

/// Immutable snapshot of a run's counters
///
/// Written only by the scheduler and published after every transition.
/// Counters never decrease within a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunProgress {
    pub tiles_total: usize,
    pub tiles_completed: usize,

    /// Failed attempts, including ones that were retried successfully later
    pub tiles_failed: usize,

    /// Tiles given up on after exhausting their retry budget
    pub tiles_exhausted: usize,

    pub rows_total: u64,
    pub rows_completed: u64,
    pub rows_exhausted: u64,

    /// Current assignment of each slot, by slot index
    pub assignments: Vec<Option<RowRange>>,

    /// Tiles handed to each slot so far, by slot index
    ///
    /// Tells two attempts at the same rows on the same slot apart.
    pub dispatches: Vec<u64>,

    /// Set once the scheduler declares the run complete
    pub finished: bool,
}

impl RunProgress {
    pub fn new(tiles: &[Tile], slots: usize) -> Self {
        Self {
            tiles_total: tiles.len(),
            rows_total: tiles.iter().map(|t| t.rows.rows() as u64).sum(),
            assignments: vec![None; slots],
            dispatches: vec![0; slots],
            ..Default::default()
        }
    }

    /// Rows that will not change any more: composited or given up on
    pub fn rows_accounted(&self) -> u64 {
        self.rows_completed + self.rows_exhausted
    }

    pub fn tiles_accounted(&self) -> usize {
        self.tiles_completed + self.tiles_exhausted
    }

    pub fn in_flight(&self) -> usize {
        self.assignments.iter().filter(|a| a.is_some()).count()
    }

    /// Rows a slot is working on and which of its dispatches that is
    pub fn attempt(&self, slot: usize) -> Option<(RowRange, u64)> {
        let rows = self.assignments.get(slot).copied().flatten()?;
        Some((rows, self.dispatches.get(slot).copied().unwrap_or(0)))
    }
}
