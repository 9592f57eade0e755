//! Exactly-once bookkeeping: coarse dedup cells and inspected chunks.
//!
//! Both tables accept concurrent insertion (`DashSet`), so notification
//! callbacks may touch them from any thread.

use dashmap::DashSet;
use serde::{Deserialize, Serialize};

use crate::world::position::{BlockPos, ChunkPos};

/// A coarse horizontal cell: a structure center floor-divided by the cell
/// size. Vertical position never matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DedupKey {
    pub x: i64,
    pub z: i64,
}

impl DedupKey {
    pub fn of(center: BlockPos, cell_size: i64) -> Self {
        Self {
            x: center.x.div_euclid(cell_size),
            z: center.z.div_euclid(cell_size),
        }
    }
}

/// Per-world record of which cells have a job, and which are finished.
///
/// A key is *claimed* when a job is queued for it and *done* once that job
/// completes. Both are permanent for the life of the cache: a claimed key
/// never yields a second job, done or not.
pub struct DedupCache {
    cell_size: i64,
    claimed: DashSet<DedupKey>,
    done: DashSet<DedupKey>,
}

impl DedupCache {
    pub fn new(cell_size: i64) -> Self {
        Self {
            cell_size,
            claimed: DashSet::new(),
            done: DashSet::new(),
        }
    }

    pub fn cell_size(&self) -> i64 {
        self.cell_size
    }

    pub fn key_for(&self, center: BlockPos) -> DedupKey {
        DedupKey::of(center, self.cell_size)
    }

    /// Claim `key` for a new job. Returns `false` if any job has ever been
    /// queued for it.
    pub fn try_claim(&self, key: DedupKey) -> bool {
        self.claimed.insert(key)
    }

    /// Mark `key` done. Returns `true` only the first time.
    pub fn mark_done(&self, key: DedupKey) -> bool {
        self.claimed.insert(key);
        self.done.insert(key)
    }

    pub fn is_claimed(&self, key: DedupKey) -> bool {
        self.claimed.contains(&key)
    }

    pub fn is_done(&self, key: DedupKey) -> bool {
        self.done.contains(&key)
    }

    /// Restore previously completed cells (e.g. from a saved ledger).
    pub fn seed(&self, keys: impl IntoIterator<Item = DedupKey>) {
        for key in keys {
            self.mark_done(key);
        }
    }

    /// All completed cells, sorted.
    pub fn done_keys(&self) -> Vec<DedupKey> {
        let mut keys: Vec<DedupKey> = self.done.iter().map(|k| *k).collect();
        keys.sort();
        keys
    }

    pub fn done_count(&self) -> usize {
        self.done.len()
    }
}

/// Chunks that have already had their structure records inspected.
#[derive(Default)]
pub struct ChunkRecord {
    inspected: DashSet<ChunkPos>,
}

impl ChunkRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `chunk` inspected. Returns `false` if it already was.
    pub fn mark_inspected(&self, chunk: ChunkPos) -> bool {
        self.inspected.insert(chunk)
    }

    pub fn is_inspected(&self, chunk: ChunkPos) -> bool {
        self.inspected.contains(&chunk)
    }

    pub fn len(&self) -> usize {
        self.inspected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inspected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_floor_negative_coordinates() {
        assert_eq!(DedupKey::of(BlockPos::new(-1, 70, 7), 8), DedupKey { x: -1, z: 0 });
        assert_eq!(DedupKey::of(BlockPos::new(-8, 0, -9), 8), DedupKey { x: -1, z: -2 });
        // Nearby centers share a cell regardless of height.
        assert_eq!(
            DedupKey::of(BlockPos::new(17, 64, 17), 8),
            DedupKey::of(BlockPos::new(23, 90, 16), 8)
        );
    }

    #[test]
    fn claims_are_permanent() {
        let cache = DedupCache::new(8);
        let key = cache.key_for(BlockPos::new(100, 64, 100));
        assert!(cache.try_claim(key));
        assert!(!cache.try_claim(key));
        assert!(!cache.is_done(key));
        assert!(cache.mark_done(key));
        assert!(!cache.mark_done(key));
        assert!(!cache.try_claim(key));
        assert_eq!(cache.done_keys(), vec![key]);
    }

    #[test]
    fn seeded_keys_block_claims() {
        let cache = DedupCache::new(8);
        cache.seed([DedupKey { x: 3, z: -4 }]);
        assert!(!cache.try_claim(DedupKey { x: 3, z: -4 }));
        assert_eq!(cache.done_count(), 1);
    }

    #[test]
    fn chunk_inspected_once() {
        let record = ChunkRecord::new();
        assert!(record.mark_inspected(ChunkPos::new(0, 0)));
        assert!(!record.mark_inspected(ChunkPos::new(0, 0)));
        assert!(record.is_inspected(ChunkPos::new(0, 0)));
        assert_eq!(record.len(), 1);
    }
}
