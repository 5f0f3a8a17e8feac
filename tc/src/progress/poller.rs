//! Background progress sampling
//!
//! Polls the progress endpoint of every busy worker on a timer. Runs beside
//! the scheduler and only ever reads published snapshots, so a slow or broken
//! progress endpoint can never hold up dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{RwLock, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{PolledSample, RunProgress};
use crate::domain::WorkerSpec;
use crate::rpc::{TileRenderer, WorkerStatus};

/// Latest sample per slot index
pub type SampleMap = Arc<RwLock<HashMap<usize, PolledSample>>>;

/// Samples in-flight progress from workers
pub struct ProgressPoller {
    renderer: Arc<dyn TileRenderer>,
    workers: Vec<WorkerSpec>,
    progress_rx: watch::Receiver<RunProgress>,
    samples: SampleMap,
    interval: Duration,
    cancel: CancellationToken,
}

impl ProgressPoller {
    pub fn new(
        renderer: Arc<dyn TileRenderer>,
        workers: Vec<WorkerSpec>,
        progress_rx: watch::Receiver<RunProgress>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        debug!(workers = workers.len(), ?interval, "ProgressPoller::new: called");
        Self {
            renderer,
            workers,
            progress_rx,
            samples: SampleMap::default(),
            interval,
            cancel,
        }
    }

    /// Shared view of the samples, for the aggregator
    pub fn samples(&self) -> SampleMap {
        self.samples.clone()
    }

    /// Poll until the run finishes or the token is cancelled
    pub async fn run(self) {
        debug!("ProgressPoller::run: called");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("ProgressPoller::run: cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    if !self.poll_once().await {
                        debug!("ProgressPoller::run: run finished");
                        break;
                    }
                }
            }
        }
    }

    /// One sampling round; returns false once the run has finished
    pub async fn poll_once(&self) -> bool {
        let snapshot = self.progress_rx.borrow().clone();
        if snapshot.finished {
            return false;
        }

        let busy: Vec<_> = (0..snapshot.assignments.len())
            .filter_map(|slot| snapshot.attempt(slot).map(|attempt| (slot, attempt)))
            .filter_map(|(slot, attempt)| self.workers.get(slot).map(|w| (slot, attempt, w)))
            .collect();
        debug!(busy = busy.len(), "ProgressPoller::poll_once: polling");

        let results = join_all(busy.into_iter().map(|(slot, attempt, worker)| async move {
            (slot, attempt, self.renderer.poll_progress(worker).await)
        }))
        .await;

        let mut samples = self.samples.write().await;
        // samples from a slot's previous dispatch no longer apply, even for the same rows
        samples.retain(|slot, sample| snapshot.attempt(*slot) == Some((sample.rows, sample.dispatch)));

        for (slot, (rows, dispatch), result) in results {
            match result {
                Ok(report) if report.status == WorkerStatus::Busy => {
                    samples.insert(
                        slot,
                        PolledSample {
                            rows,
                            dispatch,
                            percent: report.progress,
                        },
                    );
                }
                Ok(_) => {
                    debug!(slot, "ProgressPoller::poll_once: worker idle, no sample");
                }
                Err(e) => {
                    // no new information; keep the last sample
                    debug!(slot, error = %e, "ProgressPoller::poll_once: poll failed");
                }
            }
        }
        true
    }
}
