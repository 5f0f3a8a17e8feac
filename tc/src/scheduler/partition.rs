//! Tile partitioner
//!
//! Splits the canvas height into contiguous row ranges. Large canvases are
//! cut into fixed-size blocks to cap the payload of a single RPC; canvases
//! that would yield no more blocks than there are workers are split evenly
//! into one band per worker instead.

use thiserror::Error;
use tracing::debug;

use crate::domain::RowRange;

/// Malformed partition input; fatal before any dispatch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartitionError {
    #[error("No workers registered")]
    NoWorkers,

    #[error("Canvas height is zero")]
    EmptyCanvas,

    #[error("Block size is zero")]
    ZeroBlockSize,
}

/// Partition `[0, height)` into ordered, non-overlapping row ranges
pub fn partition(height: u32, block_size: u32, worker_count: usize) -> Result<Vec<RowRange>, PartitionError> {
    debug!(height, block_size, worker_count, "partition: called");
    if worker_count == 0 {
        return Err(PartitionError::NoWorkers);
    }
    if height == 0 {
        return Err(PartitionError::EmptyCanvas);
    }
    if block_size == 0 {
        return Err(PartitionError::ZeroBlockSize);
    }

    let block_path = (height as u64) > (block_size as u64) * (worker_count as u64);
    let ranges = if block_path {
        debug!("partition: fixed-size blocks");
        let mut ranges = Vec::with_capacity(height.div_ceil(block_size) as usize);
        let mut start = 0;
        while start < height {
            let end = start.saturating_add(block_size).min(height);
            ranges.push(RowRange::new(start, end));
            start = end;
        }
        ranges
    } else {
        debug!("partition: even split per worker");
        // never more bands than rows, so no band is empty
        let bands = (worker_count as u64).min(height as u64) as u32;
        let band = height / bands;
        (0..bands)
            .map(|i| {
                let start = i * band;
                // remainder rows go to the last band
                let end = if i + 1 == bands { height } else { start + band };
                RowRange::new(start, end)
            })
            .collect()
    };

    debug!(tiles = ranges.len(), "partition: done");
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ranges(pairs: &[(u32, u32)]) -> Vec<RowRange> {
        pairs.iter().map(|(s, e)| RowRange::new(*s, *e)).collect()
    }

    #[test]
    fn test_block_path_clamps_last_block() {
        let tiles = partition(1600, 500, 2).unwrap();
        assert_eq!(tiles, ranges(&[(0, 500), (500, 1000), (1000, 1500), (1500, 1600)]));
    }

    #[test]
    fn test_block_path_exact_multiple() {
        let tiles = partition(3000, 500, 2).unwrap();
        assert_eq!(tiles.len(), 6);
        assert_eq!(tiles.last().unwrap(), &RowRange::new(2500, 3000));
    }

    #[test]
    fn test_even_split_fallback() {
        let tiles = partition(1000, 500, 2).unwrap();
        assert_eq!(tiles, ranges(&[(0, 500), (500, 1000)]));
    }

    #[test]
    fn test_even_split_keeps_remainder() {
        let tiles = partition(1000, 500, 3).unwrap();
        assert_eq!(tiles, ranges(&[(0, 333), (333, 666), (666, 1000)]));
    }

    #[test]
    fn test_fewer_rows_than_workers() {
        let tiles = partition(2, 500, 4).unwrap();
        assert_eq!(tiles, ranges(&[(0, 1), (1, 2)]));
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(partition(100, 10, 0), Err(PartitionError::NoWorkers));
        assert_eq!(partition(0, 10, 2), Err(PartitionError::EmptyCanvas));
        assert_eq!(partition(100, 0, 2), Err(PartitionError::ZeroBlockSize));
    }

    proptest! {
        #[test]
        fn prop_partition_covers_height_exactly(
            height in 1u32..20_000,
            block_size in 1u32..2_000,
            workers in 1usize..16,
        ) {
            let tiles = partition(height, block_size, workers).unwrap();

            prop_assert!(!tiles.is_empty());
            prop_assert_eq!(tiles[0].start, 0);
            prop_assert_eq!(tiles.last().unwrap().end, height);
            for pair in tiles.windows(2) {
                prop_assert_eq!(pair[0].end, pair[1].start);
            }
            for tile in &tiles {
                prop_assert!(!tile.is_empty());
            }
            let total: u64 = tiles.iter().map(|t| t.rows() as u64).sum();
            prop_assert_eq!(total, height as u64);
        }

        #[test]
        fn prop_block_path_caps_tile_height(
            height in 1u32..20_000,
            block_size in 1u32..2_000,
            workers in 1usize..16,
        ) {
            prop_assume!(height as u64 > block_size as u64 * workers as u64);
            let tiles = partition(height, block_size, workers).unwrap();
            for tile in &tiles {
                prop_assert!(tile.rows() <= block_size);
            }
        }
    }
}
