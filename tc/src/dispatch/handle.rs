//! RunHandle - caller's view of one run

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::compositor::RunResult;
use crate::progress::{ProgressAggregator, RunProgress, SampleMap};
use crate::scheduler::RunError;

/// Handle to a run started by [`Dispatcher::start_run`](super::Dispatcher::start_run)
///
/// Progress can be sampled at any time; [`result`](Self::result) consumes the
/// handle and waits for the composed canvas.
#[derive(Debug)]
pub struct RunHandle {
    run_id: Uuid,
    cancel: CancellationToken,
    progress_rx: watch::Receiver<RunProgress>,
    samples: SampleMap,
    aggregator: Mutex<ProgressAggregator>,
    task: JoinHandle<RunResult>,
}

impl RunHandle {
    pub(crate) fn new(
        run_id: Uuid,
        cancel: CancellationToken,
        progress_rx: watch::Receiver<RunProgress>,
        samples: SampleMap,
        task: JoinHandle<RunResult>,
    ) -> Self {
        debug!(%run_id, "RunHandle::new: called");
        Self {
            run_id,
            cancel,
            progress_rx,
            samples,
            aggregator: Mutex::new(ProgressAggregator::new()),
            task,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Overall completion in percent; never decreases, 100 only once finished
    pub async fn current_progress(&self) -> f64 {
        let snapshot = self.progress_rx.borrow().clone();
        let samples = self.samples.read().await;
        self.aggregator.lock().await.observe(&snapshot, &samples)
    }

    /// Latest raw counters published by the scheduler
    pub fn progress_snapshot(&self) -> RunProgress {
        self.progress_rx.borrow().clone()
    }

    /// False while the run is still dispatching
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop dispatching; in-flight responses are discarded
    pub fn cancel(&self) {
        info!(run_id = %self.run_id, "Run cancel requested");
        self.cancel.cancel();
    }

    /// Wait for the run to end and take its result
    pub async fn result(self) -> Result<RunResult, RunError> {
        debug!(run_id = %self.run_id, "RunHandle::result: called");
        Ok(self.task.await?)
    }
}
