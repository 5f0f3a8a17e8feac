//! Pending tile queue

use std::collections::{BTreeSet, VecDeque};

use crate::domain::Tile;

/// A tile waiting for a slot, with its failure history
#[derive(Debug, Clone)]
pub struct QueuedTile {
    pub tile: Tile,

    /// Failed attempts so far
    pub failures: u32,

    /// Message of the most recent failure
    pub last_error: Option<String>,

    /// Slots that have failed this tile at least once
    pub failed_on: BTreeSet<usize>,
}

impl QueuedTile {
    pub fn new(tile: Tile) -> Self {
        Self {
            tile,
            failures: 0,
            last_error: None,
            failed_on: BTreeSet::new(),
        }
    }

    /// Record a failed attempt; returns true if the retry budget is spent
    pub fn record_failure(&mut self, slot: usize, error: impl Into<String>, max_retries: u32) -> bool {
        self.failures += 1;
        self.last_error = Some(error.into());
        self.failed_on.insert(slot);
        self.failures > max_retries
    }

    /// Whether `slot` may take this tile, given the slots still running
    ///
    /// A slot that already failed the tile has to leave it to any live slot
    /// that has not tried it yet, busy or not. Once every live slot has
    /// failed it, anyone may retry.
    pub fn eligible_for(&self, slot: usize, live: &[usize]) -> bool {
        !self.failed_on.contains(&slot) || live.iter().all(|s| *s == slot || self.failed_on.contains(s))
    }
}

/// FIFO of tiles not yet successfully completed
///
/// Only ever touched under the scheduler lock, so it needs no locking of its
/// own.
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: VecDeque<QueuedTile>,
}

impl PendingQueue {
    pub fn new(tiles: impl IntoIterator<Item = Tile>) -> Self {
        Self {
            entries: tiles.into_iter().map(QueuedTile::new).collect(),
        }
    }

    #[cfg(test)]
    pub(crate) fn pop_front(&mut self) -> Option<QueuedTile> {
        self.entries.pop_front()
    }

    /// Remove the first entry, in FIFO order, that `eligible` accepts
    pub fn pop_first(&mut self, eligible: impl Fn(&QueuedTile) -> bool) -> Option<QueuedTile> {
        let pos = self.entries.iter().position(eligible)?;
        self.entries.remove(pos)
    }

    /// Re-enqueue a failed tile behind everything already waiting
    pub fn push_back(&mut self, entry: QueuedTile) {
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
