//! Run result types

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Canvas;
use crate::domain::RowRange;
use crate::scheduler::SlotSummary;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every tile composited
    Complete,
    /// Finished, but some row ranges were given up on
    Degraded,
    /// Stopped from outside; the canvas holds whatever arrived before
    Cancelled,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Degraded => write!(f, "degraded"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A tile that exhausted its retry budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileFailure {
    pub rows: RowRange,
    pub attempts: u32,
    pub last_error: String,
}

/// What the compositor hands back once the scheduler is done
#[derive(Debug, Clone)]
pub struct Composition {
    pub status: RunStatus,
    pub canvas: Canvas,
    pub failed: Vec<TileFailure>,
    pub missing: Vec<RowRange>,
}

/// Terminal artifact of a run
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub canvas: Canvas,

    /// Permanently failed tiles; their rows are left zero
    pub failed: Vec<TileFailure>,

    /// Ranges neither composited nor given up on (cancelled runs only)
    pub missing: Vec<RowRange>,

    pub slots: Vec<SlotSummary>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl RunResult {
    /// Row ranges of the permanently failed tiles, in canvas order
    pub fn failed_ranges(&self) -> Vec<RowRange> {
        let mut ranges: Vec<_> = self.failed.iter().map(|f| f.rows).collect();
        ranges.sort();
        ranges
    }

    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Complete
    }
}
