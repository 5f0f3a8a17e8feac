//! Scheduler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Times a failed tile is sent out again before it is given up on
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Deadline for a single compute call
    #[serde(rename = "rpc-timeout-ms")]
    pub rpc_timeout_ms: u64,

    /// Interval between progress polls of busy workers (0 disables polling)
    #[serde(rename = "progress-poll-ms")]
    pub progress_poll_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            rpc_timeout_ms: 120_000,
            progress_poll_ms: 500,
        }
    }
}

impl SchedulerConfig {
    /// Get the compute deadline as a Duration
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    /// Get the poll interval, or `None` when polling is disabled
    pub fn poll_interval(&self) -> Option<Duration> {
        (self.progress_poll_ms > 0).then(|| Duration::from_millis(self.progress_poll_ms))
    }
}
