//! Dispatcher - starts runs against a fixed worker registry

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::RunHandle;
use crate::domain::{CanvasSize, Tile, Viewport, WorkerRegistry};
use crate::progress::{ProgressPoller, SampleMap};
use crate::rpc::TileRenderer;
use crate::scheduler::{PartitionError, RunError, Scheduler, SchedulerConfig, partition};

/// Starts render runs
///
/// Holds everything that stays the same between runs: the registry, the
/// renderer and the scheduling knobs.
pub struct Dispatcher {
    config: SchedulerConfig,
    block_size: u32,
    registry: WorkerRegistry,
    renderer: Arc<dyn TileRenderer>,
}

impl Dispatcher {
    pub fn new(
        config: SchedulerConfig,
        block_size: u32,
        registry: WorkerRegistry,
        renderer: Arc<dyn TileRenderer>,
    ) -> Self {
        debug!(?config, block_size, workers = registry.len(), "Dispatcher::new: called");
        Self {
            config,
            block_size,
            registry,
            renderer,
        }
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    /// Partition the canvas and start dispatching in the background
    ///
    /// Partition errors come back before any request goes out. Must be called
    /// from within a tokio runtime.
    pub fn start_run(&self, canvas: CanvasSize, viewport: Viewport) -> Result<RunHandle, RunError> {
        debug!(%canvas, ?viewport, "Dispatcher::start_run: called");
        if canvas.width == 0 {
            return Err(PartitionError::EmptyCanvas.into());
        }
        let ranges = partition(canvas.height, self.block_size, self.registry.len())?;
        let tiles = Tile::plan(canvas, &viewport.bounds(), viewport.max_iter, &ranges);

        let cancel = CancellationToken::new();
        let scheduler = Arc::new(Scheduler::new(
            self.config.clone(),
            self.renderer.clone(),
            &self.registry,
            canvas,
            tiles,
            cancel.clone(),
        )?);
        let run_id = scheduler.run_id();
        let progress_rx = scheduler.progress();
        info!(%run_id, %canvas, tiles = ranges.len(), workers = self.registry.len(), "Run started");

        // poller stops with the run, or earlier on cancel
        let poll_stop = cancel.child_token();
        let samples = match self.config.poll_interval() {
            Some(interval) => {
                let poller = ProgressPoller::new(
                    self.renderer.clone(),
                    self.registry.iter().cloned().collect(),
                    progress_rx.clone(),
                    interval,
                    poll_stop.clone(),
                );
                let samples = poller.samples();
                tokio::spawn(poller.run());
                samples
            }
            None => {
                debug!("Dispatcher::start_run: progress polling disabled");
                SampleMap::default()
            }
        };

        let task = tokio::spawn(async move {
            let result = scheduler.run().await;
            poll_stop.cancel();
            result
        });

        Ok(RunHandle::new(run_id, cancel, progress_rx, samples, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::compositor::RunStatus;
    use crate::domain::WorkerSpec;
    use crate::rpc::client::mock::{FailMode, MockTileRenderer};
    use crate::rpc::{ProgressReport, WorkerStatus};

    fn registry(names: &[&str]) -> WorkerRegistry {
        WorkerRegistry::new(
            names
                .iter()
                .map(|n| WorkerSpec::new(*n, format!("http://{}:8000", n)))
                .collect(),
        )
        .unwrap()
    }

    fn viewport() -> Viewport {
        Viewport::new(-0.5, 0.0, 1.0, 50)
    }

    #[tokio::test]
    async fn test_zero_workers_fails_before_any_rpc() {
        let mock = Arc::new(MockTileRenderer::new());
        let dispatcher = Dispatcher::new(SchedulerConfig::default(), 500, WorkerRegistry::default(), mock.clone());

        let err = dispatcher.start_run(CanvasSize::square(1000), viewport()).unwrap_err();

        assert!(matches!(err, RunError::Partition(PartitionError::NoWorkers)));
        assert!(err.is_fatal_input());
        assert_eq!(mock.call_count(), 0);
        assert_eq!(mock.poll_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_debug_names_run() {
        let mock = Arc::new(MockTileRenderer::new().worker("a", Duration::from_millis(10), FailMode::Never));
        let dispatcher = Dispatcher::new(SchedulerConfig::default(), 100, registry(&["a"]), mock);

        let handle = dispatcher.start_run(CanvasSize::new(10, 100), viewport()).unwrap();
        let debug = format!("{:?}", handle);

        assert!(debug.starts_with("RunHandle"));
        assert!(debug.contains(&handle.run_id().to_string()));
        handle.cancel();
        assert!(handle.result().await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_canvas_rejected() {
        let dispatcher = Dispatcher::new(
            SchedulerConfig::default(),
            500,
            registry(&["a"]),
            Arc::new(MockTileRenderer::new()),
        );
        assert!(matches!(
            dispatcher.start_run(CanvasSize::new(0, 100), viewport()),
            Err(RunError::Partition(PartitionError::EmptyCanvas))
        ));
        assert!(matches!(
            dispatcher.start_run(CanvasSize::new(100, 0), viewport()),
            Err(RunError::Partition(PartitionError::EmptyCanvas))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_to_completion() {
        let mock = Arc::new(
            MockTileRenderer::new()
                .worker("a", Duration::from_millis(30), FailMode::Never)
                .worker("b", Duration::from_millis(50), FailMode::Never),
        );
        let config = SchedulerConfig {
            progress_poll_ms: 10,
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(config, 100, registry(&["a", "b"]), mock.clone());

        let handle = dispatcher.start_run(CanvasSize::new(20, 400), viewport()).unwrap();
        assert!(handle.current_progress().await < 100.0);

        let run_id = handle.run_id();
        let result = handle.result().await.unwrap();

        assert_eq!(result.run_id, run_id);
        assert_eq!(result.status, RunStatus::Complete);
        assert_eq!(result.canvas.height(), 400);
        assert_eq!(mock.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_reaches_100_only_when_finished() {
        let mock = Arc::new(
            MockTileRenderer::new()
                .worker("a", Duration::from_millis(40), FailMode::FirstN(1))
                .with_progress(
                    "a",
                    ProgressReport {
                        status: WorkerStatus::Busy,
                        progress: 50.0,
                    },
                ),
        );
        let config = SchedulerConfig {
            progress_poll_ms: 5,
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(config, 100, registry(&["a"]), mock);
        let handle = dispatcher.start_run(CanvasSize::new(10, 300), viewport()).unwrap();

        let mut last = 0.0;
        while !handle.is_finished() {
            let percent = handle.current_progress().await;
            assert!(percent >= last, "progress went back from {} to {}", last, percent);
            assert!(percent < 100.0 || handle.progress_snapshot().finished);
            last = percent;
            tokio::time::sleep(Duration::from_millis(3)).await;
        }

        assert_eq!(handle.current_progress().await, 100.0);
        let result = handle.result().await.unwrap();
        assert_eq!(result.status, RunStatus::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_returns_partial_canvas() {
        let mock = Arc::new(
            MockTileRenderer::new()
                .worker("a", Duration::from_millis(10), FailMode::Never)
                .worker("b", Duration::from_secs(600), FailMode::Never),
        );
        let dispatcher = Dispatcher::new(SchedulerConfig::default(), 100, registry(&["a", "b"]), mock);
        let handle = dispatcher.start_run(CanvasSize::new(10, 1000), viewport()).unwrap();

        tokio::time::sleep(Duration::from_millis(35)).await;
        handle.cancel();
        let percent = handle.current_progress().await;
        let result = handle.result().await.unwrap();

        assert_eq!(result.status, RunStatus::Cancelled);
        assert!(!result.missing.is_empty());
        assert!(percent < 100.0);
        assert!(result.slots[0].tiles_completed >= 3);
        assert_eq!(result.slots[1].tiles_completed, 0);
    }
}
