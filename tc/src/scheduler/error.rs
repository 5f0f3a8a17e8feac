//! Run-level errors

use thiserror::Error;

use super::PartitionError;

/// Errors that stop a run as a whole
///
/// Per-tile failures never show up here; they are retried and, if they
/// persist, reported on the run result.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Cannot partition run: {0}")]
    Partition(#[from] PartitionError),

    #[error("Run task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl RunError {
    /// True if the run never got as far as dispatching a tile
    pub fn is_fatal_input(&self) -> bool {
        matches!(self, RunError::Partition(_))
    }
}
