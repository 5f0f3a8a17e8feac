//! Scheduler implementation

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::{Mutex, Notify, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::SchedulerConfig;
use super::queue::{PendingQueue, QueuedTile};
use super::slot::{SlotState, WorkerSlot};
use super::{PartitionError, RunError};
use crate::compositor::{Compositor, RunResult, TileFailure};
use crate::domain::{CanvasSize, Tile, WorkerRegistry, WorkerSpec};
use crate::progress::RunProgress;
use crate::rpc::{RasterTile, RpcError, TileRenderer};

/// A tile handed to a slot, with the worker it goes to
type Assignment = (WorkerSpec, QueuedTile);

/// Shared mutable state, one critical section per transition
struct DispatchState {
    /// Tiles waiting for a slot
    queue: PendingQueue,

    /// One slot per registered worker
    slots: Vec<WorkerSlot>,

    /// Counters published to observers
    progress: RunProgress,

    compositor: Compositor,

    /// Tiles that exhausted their retry budget
    failed: Vec<TileFailure>,

    /// Tiles currently out at a worker
    in_flight: usize,
}

/// The Scheduler pulls tiles from the pending queue into one execution slot
/// per worker, reassigning each slot as soon as its previous tile settles.
///
/// Faster workers come back sooner and therefore take more tiles; the run
/// ends when the queue is empty and every slot has drained, not after a fixed
/// number of tiles per worker.
pub struct Scheduler {
    run_id: Uuid,
    config: SchedulerConfig,
    renderer: Arc<dyn TileRenderer>,
    state: Mutex<DispatchState>,
    notify: Notify,
    progress_tx: watch::Sender<RunProgress>,
    cancel: CancellationToken,
}

impl Scheduler {
    /// Create a scheduler for a planned run
    pub fn new(
        config: SchedulerConfig,
        renderer: Arc<dyn TileRenderer>,
        registry: &WorkerRegistry,
        canvas: CanvasSize,
        tiles: Vec<Tile>,
        cancel: CancellationToken,
    ) -> Result<Self, RunError> {
        debug!(?config, workers = registry.len(), tiles = tiles.len(), "Scheduler::new: called");
        if registry.is_empty() {
            return Err(PartitionError::NoWorkers.into());
        }
        if tiles.is_empty() {
            return Err(PartitionError::EmptyCanvas.into());
        }

        let slots: Vec<_> = registry
            .iter()
            .enumerate()
            .map(|(i, w)| WorkerSlot::new(i, w.clone()))
            .collect();
        let progress = RunProgress::new(&tiles, slots.len());
        let compositor = Compositor::new(canvas, tiles.iter().map(|t| t.rows).collect());
        let (progress_tx, _) = watch::channel(progress.clone());

        Ok(Self {
            run_id: Uuid::now_v7(),
            config,
            renderer,
            state: Mutex::new(DispatchState {
                queue: PendingQueue::new(tiles),
                slots,
                progress,
                compositor,
                failed: Vec::new(),
                in_flight: 0,
            }),
            notify: Notify::new(),
            progress_tx,
            cancel,
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Subscribe to progress snapshots
    pub fn progress(&self) -> watch::Receiver<RunProgress> {
        self.progress_tx.subscribe()
    }

    /// Dispatch every tile and return once all slots have drained
    pub async fn run(self: Arc<Self>) -> RunResult {
        let started_at = Utc::now();
        let start = Instant::now();

        // every slot gets its first tile in registry order before any task runs
        let seeds: Vec<Option<Assignment>> = {
            let mut state = self.state.lock().await;
            info!(
                run_id = %self.run_id,
                tiles = state.progress.tiles_total,
                workers = state.slots.len(),
                "Scheduler::run: starting"
            );
            let seeds = (0..state.slots.len())
                .map(|i| self.try_assign(&mut state, i))
                .collect();
            self.publish(&state);
            seeds
        };

        let tasks: Vec<_> = seeds
            .into_iter()
            .enumerate()
            .map(|(i, seed)| tokio::spawn(self.clone().drive_slot(i, seed)))
            .collect();

        for result in join_all(tasks).await {
            if let Err(e) = result {
                warn!(error = %e, "Scheduler::run: slot task failed");
            }
        }

        self.finish(started_at, start.elapsed()).await
    }

    /// Loop of one slot: settle the current tile, pull the next, until drained
    async fn drive_slot(self: Arc<Self>, index: usize, seed: Option<Assignment>) {
        debug!(slot = index, "Scheduler::drive_slot: called");
        let mut next = seed;

        loop {
            let (worker, entry) = match next.take() {
                Some(assignment) => assignment,
                None => match self.next_assignment(index).await {
                    Some(assignment) => assignment,
                    None => break,
                },
            };

            let timeout = self.config.rpc_timeout();
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(slot = index, rows = %entry.tile.rows, "Scheduler::drive_slot: cancelled, abandoning tile");
                    self.abandon(index).await;
                    break;
                }
                result = tokio::time::timeout(timeout, self.renderer.compute_tile(&worker, &entry.tile.request)) => {
                    result.unwrap_or(Err(RpcError::Timeout(timeout)))
                }
            };

            self.settle(index, entry, outcome).await;
        }

        debug!(slot = index, "Scheduler::drive_slot: done");
    }

    /// Wait for a tile this slot may take, or return `None` once the run has
    /// nothing left for it
    async fn next_assignment(&self, index: usize) -> Option<Assignment> {
        loop {
            // register before checking state so a settle in between is not missed
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if self.cancel.is_cancelled() {
                    state.slots[index].drain();
                    self.publish(&state);
                    return None;
                }
                if let Some(assignment) = self.try_assign(&mut state, index) {
                    self.publish(&state);
                    return Some(assignment);
                }
                if state.queue.is_empty() && state.in_flight == 0 {
                    debug!(slot = index, "Scheduler::next_assignment: queue empty, draining");
                    state.slots[index].drain();
                    self.publish(&state);
                    return None;
                }
                debug!(
                    slot = index,
                    queued = state.queue.len(),
                    in_flight = state.in_flight,
                    "Scheduler::next_assignment: waiting"
                );
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = self.cancel.cancelled() => {}
            }
        }
    }

    /// Pop the next tile for a slot, if one is eligible
    ///
    /// A slot passes over a tile it already failed while another live slot
    /// has not tried it, even a busy one. It waits for that slot instead.
    fn try_assign(&self, state: &mut DispatchState, index: usize) -> Option<Assignment> {
        let live: Vec<usize> = state
            .slots
            .iter()
            .filter(|s| s.state != SlotState::Drained)
            .map(|s| s.index)
            .collect();

        let entry = state.queue.pop_first(|e| e.eligible_for(index, &live))?;

        let rows = entry.tile.rows;
        let slot = &mut state.slots[index];
        slot.assign(rows);
        state.progress.assignments[index] = Some(rows);
        state.progress.dispatches[index] += 1;
        state.in_flight += 1;
        debug!(slot = index, worker = %slot.worker.name, %rows, "Scheduler::try_assign: assigned");
        Some((slot.worker.clone(), entry))
    }

    /// Apply the outcome of one compute call
    async fn settle(&self, index: usize, mut entry: QueuedTile, outcome: Result<RasterTile, RpcError>) {
        let rows = entry.tile.rows;
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.in_flight -= 1;
        state.progress.assignments[index] = None;

        if self.cancel.is_cancelled() {
            debug!(slot = index, %rows, "Scheduler::settle: run cancelled, discarding late response");
            state.slots[index].drain();
            self.publish(state);
            drop(guard);
            self.notify.notify_waiters();
            return;
        }

        let placed = match outcome {
            Ok(raster) if raster.height != rows.rows() => Err(format!(
                "Decode error: expected {} rows, got {}",
                rows.rows(),
                raster.height
            )),
            Ok(raster) => state
                .compositor
                .accept(rows.start, &raster)
                .map(|_| ())
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        let worker = state.slots[index].worker.name.clone();
        match placed {
            Ok(()) => {
                state.slots[index].complete();
                state.progress.tiles_completed += 1;
                state.progress.rows_completed += rows.rows() as u64;
                debug!(
                    slot = index,
                    %worker,
                    %rows,
                    completed = state.progress.tiles_completed,
                    "Scheduler::settle: tile composited"
                );
            }
            Err(error) => {
                state.slots[index].fail();
                state.progress.tiles_failed += 1;
                warn!(%worker, %rows, attempt = entry.failures + 1, %error, "Tile failed");

                if entry.record_failure(index, error.clone(), self.config.max_retries) {
                    warn!(%rows, attempts = entry.failures, "Tile exhausted its retry budget");
                    state.progress.tiles_exhausted += 1;
                    state.progress.rows_exhausted += rows.rows() as u64;
                    state.failed.push(TileFailure {
                        rows,
                        attempts: entry.failures,
                        last_error: error,
                    });
                } else {
                    debug!(%rows, failures = entry.failures, "Scheduler::settle: requeueing tile");
                    state.queue.push_back(entry);
                }
            }
        }

        state.slots[index].release();
        self.publish(state);
        drop(guard);
        self.notify.notify_waiters();
    }

    /// Drop a slot's in-flight tile on cancellation
    async fn abandon(&self, index: usize) {
        let mut state = self.state.lock().await;
        state.in_flight -= 1;
        state.progress.assignments[index] = None;
        state.slots[index].drain();
        self.publish(&state);
    }

    fn publish(&self, state: &DispatchState) {
        self.progress_tx.send_replace(state.progress.clone());
    }

    /// Declare completion and assemble the result
    async fn finish(&self, started_at: DateTime<Utc>, elapsed: Duration) -> RunResult {
        let mut state = self.state.lock().await;
        let cancelled = self.cancel.is_cancelled();
        if !cancelled {
            state.progress.finished = true;
        }
        self.publish(&state);

        let failed = std::mem::take(&mut state.failed);
        let composition = std::mem::take(&mut state.compositor).finalize(failed, cancelled);
        let slots: Vec<_> = state.slots.iter().map(WorkerSlot::summary).collect();

        info!(
            run_id = %self.run_id,
            status = %composition.status,
            completed = state.progress.tiles_completed,
            exhausted = state.progress.tiles_exhausted,
            failed_attempts = state.progress.tiles_failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "Scheduler::finish: run ended"
        );

        RunResult {
            run_id: self.run_id,
            status: composition.status,
            canvas: composition.canvas,
            failed: composition.failed,
            missing: composition.missing,
            slots,
            started_at,
            elapsed,
        }
    }
}
