//! Per-worker execution slots

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{RowRange, WorkerSpec};

/// Where a slot is in its assignment cycle
///
/// `Idle → Assigned → (Completed | Failed) → Idle | Drained`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotState {
    Idle,
    Assigned(RowRange),
    Completed,
    Failed,
    Drained,
}

impl std::fmt::Display for SlotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Assigned(rows) => write!(f, "assigned {}", rows),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Drained => write!(f, "drained"),
        }
    }
}

/// One concurrent execution context per registered worker
#[derive(Debug, Clone)]
pub struct WorkerSlot {
    pub index: usize,
    pub worker: WorkerSpec,
    pub state: SlotState,
    pub tiles_completed: u32,
    pub tiles_failed: u32,
}

/// Final per-worker tally reported with the run result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSummary {
    pub name: String,
    pub url: String,
    pub tiles_completed: u32,
    pub tiles_failed: u32,
}

impl WorkerSlot {
    pub fn new(index: usize, worker: WorkerSpec) -> Self {
        Self {
            index,
            worker,
            state: SlotState::Idle,
            tiles_completed: 0,
            tiles_failed: 0,
        }
    }

    /// Current assignment, if any
    pub fn assignment(&self) -> Option<RowRange> {
        match self.state {
            SlotState::Assigned(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn assign(&mut self, rows: RowRange) {
        debug!(slot = self.index, %rows, from = %self.state, "WorkerSlot::assign: called");
        debug_assert!(matches!(self.state, SlotState::Idle), "assign from non-idle slot");
        self.state = SlotState::Assigned(rows);
    }

    pub fn complete(&mut self) {
        debug!(slot = self.index, "WorkerSlot::complete: called");
        self.tiles_completed += 1;
        self.state = SlotState::Completed;
    }

    pub fn fail(&mut self) {
        debug!(slot = self.index, "WorkerSlot::fail: called");
        self.tiles_failed += 1;
        self.state = SlotState::Failed;
    }

    /// Back to idle after a settle, ready for the next pull
    pub fn release(&mut self) {
        self.state = SlotState::Idle;
    }

    pub fn drain(&mut self) {
        debug!(slot = self.index, "WorkerSlot::drain: called");
        self.state = SlotState::Drained;
    }

    pub fn summary(&self) -> SlotSummary {
        SlotSummary {
            name: self.worker.name.clone(),
            url: self.worker.url.clone(),
            tiles_completed: self.tiles_completed,
            tiles_failed: self.tiles_failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_cycle() {
        let mut slot = WorkerSlot::new(0, WorkerSpec::new("w", "http://w"));
        assert_eq!(slot.state, SlotState::Idle);

        slot.assign(RowRange::new(0, 10));
        assert_eq!(slot.assignment(), Some(RowRange::new(0, 10)));

        slot.complete();
        assert_eq!(slot.state, SlotState::Completed);
        assert_eq!(slot.assignment(), None);

        slot.release();
        slot.assign(RowRange::new(10, 20));
        slot.fail();
        slot.release();
        slot.drain();

        let summary = slot.summary();
        assert_eq!(slot.state, SlotState::Drained);
        assert_eq!(summary.tiles_completed, 1);
        assert_eq!(summary.tiles_failed, 1);
        assert_eq!(summary.name, "w");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SlotState::Assigned(RowRange::new(5, 9)).to_string(), "assigned [5, 9)");
        assert_eq!(SlotState::Drained.to_string(), "drained");
    }
}
