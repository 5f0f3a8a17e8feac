//! RPC error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to a worker
///
/// None of these abort a run; the scheduler decides whether the tile is
/// retried or given up on.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Worker unavailable: {0}")]
    WorkerUnavailable(String),

    #[error("Worker error {status}: {message}")]
    WorkerError { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

impl RpcError {
    /// True for failures below HTTP: refused connections, resets, timeouts
    pub fn is_transport(&self) -> bool {
        matches!(self, RpcError::WorkerUnavailable(_) | RpcError::Timeout(_))
    }

    /// HTTP status reported by the worker, if it answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            RpcError::WorkerError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            // reqwest does not report the configured deadline
            RpcError::Timeout(Duration::ZERO)
        } else if e.is_decode() {
            RpcError::Decode(e.to_string())
        } else {
            RpcError::WorkerUnavailable(e.to_string())
        }
    }
}
