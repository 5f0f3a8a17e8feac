//! Worker identities and the fixed registry the scheduler runs against

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// A remote worker that exposes the tile renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSpec {
    /// Human-readable name used in logs and summaries
    pub name: String,

    /// Base URL, e.g. `http://127.0.0.1:8000`
    pub url: String,
}

impl WorkerSpec {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Join an endpoint path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

impl std::fmt::Display for WorkerSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}

/// Errors building a registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid URL for worker '{name}': {url}")]
    InvalidUrl { name: String, url: String },
}

/// Ordered, read-only list of workers
///
/// Slot `i` of a run always talks to worker `i` of the registry.
#[derive(Debug, Clone, Default)]
pub struct WorkerRegistry {
    workers: Vec<WorkerSpec>,
}

impl WorkerRegistry {
    /// Build a registry, rejecting URLs that are not absolute http(s) URLs
    pub fn new(workers: Vec<WorkerSpec>) -> Result<Self, RegistryError> {
        debug!(count = workers.len(), "WorkerRegistry::new: called");
        for worker in &workers {
            let valid = Url::parse(&worker.url)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid {
                debug!(%worker, "WorkerRegistry::new: rejecting worker");
                return Err(RegistryError::InvalidUrl {
                    name: worker.name.clone(),
                    url: worker.url.clone(),
                });
            }
        }
        Ok(Self { workers })
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkerSpec> {
        self.workers.iter()
    }

    pub fn get(&self, index: usize) -> Option<&WorkerSpec> {
        self.workers.get(index)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}
