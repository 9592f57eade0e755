pub mod block;
pub mod chunk;
pub mod entity;
pub mod position;
pub mod structure;

use std::sync::Arc;

use block::BlockId;
use chunk::Chunk;
use dashmap::{DashMap, DashSet};
use entity::EntityRegistry;
use position::{BlockBox, BlockPos, ChunkPos};
use structure::StructureStart;

/// Lowest buildable y of a default world.
pub const DEFAULT_MIN_Y: i64 = -64;
/// One past the highest buildable y of a default world.
pub const DEFAULT_MAX_Y: i64 = 320;

/// Failure of a block read or write primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("chunk {0:?} is not loaded")]
    ChunkNotLoaded(ChunkPos),
    #[error("y={y} is outside the world height [{min}, {max})")]
    OutOfBounds { y: i64, min: i64, max: i64 },
}

/// One loaded world. Thread-safe, lock-sharded by chunk.
///
/// Besides blocks it carries the other host surfaces the replacement
/// pipeline consumes: the per-chunk structure registry and the entity
/// registry. Reads may come from background threads; writes only happen on
/// the tick thread.
pub struct World {
    chunks: DashMap<ChunkPos, Chunk>,
    /// Chunks that have been modified since the last save.
    dirty: DashSet<ChunkPos>,
    structures: DashMap<ChunkPos, Vec<StructureStart>>,
    entities: EntityRegistry,
    min_y: i64,
    max_y: i64,
}

impl World {
    pub fn new() -> Self {
        Self::with_height(DEFAULT_MIN_Y, DEFAULT_MAX_Y)
    }

    /// A world whose buildable height is `[min_y, max_y)`.
    pub fn with_height(min_y: i64, max_y: i64) -> Self {
        Self {
            chunks: DashMap::new(),
            dirty: DashSet::new(),
            structures: DashMap::new(),
            entities: EntityRegistry::new(),
            min_y,
            max_y,
        }
    }

    pub fn min_y(&self) -> i64 {
        self.min_y
    }

    pub fn max_y(&self) -> i64 {
        self.max_y
    }

    fn check_height(&self, y: i64) -> Result<(), WorldError> {
        if y < self.min_y || y >= self.max_y {
            return Err(WorldError::OutOfBounds {
                y,
                min: self.min_y,
                max: self.max_y,
            });
        }
        Ok(())
    }

    /// Read a block at an absolute position. Returns AIR for unloaded chunks.
    pub fn get_block(&self, pos: BlockPos) -> BlockId {
        self.block(pos).unwrap_or(BlockId::AIR)
    }

    /// Read a block, reporting unloaded chunks and out-of-range heights.
    pub fn block(&self, pos: BlockPos) -> Result<BlockId, WorldError> {
        self.check_height(pos.y)?;
        match self.chunks.get(&pos.chunk()) {
            Some(chunk) => Ok(chunk.get_block(pos.local())),
            None => Err(WorldError::ChunkNotLoaded(pos.chunk())),
        }
    }

    /// Write a block at an absolute position. Creates the chunk if needed.
    /// Marks the containing chunk as dirty for persistence.
    ///
    /// Takes `&self` (not `&mut self`) because `DashMap` provides interior
    /// mutability via per-shard locking.
    pub fn set_block(&self, pos: BlockPos, block: BlockId) -> Result<(), WorldError> {
        self.check_height(pos.y)?;
        let chunk_pos = pos.chunk();
        self.chunks
            .entry(chunk_pos)
            .or_default()
            .set_block(pos.local(), block);
        self.dirty.insert(chunk_pos);
        Ok(())
    }

    /// Replace a block with air. Unlike `set_block` this never materialises
    /// a chunk: removing from an unloaded chunk is an error.
    pub fn remove_block(&self, pos: BlockPos) -> Result<(), WorldError> {
        self.check_height(pos.y)?;
        let chunk_pos = pos.chunk();
        let Some(mut chunk) = self.chunks.get_mut(&chunk_pos) else {
            return Err(WorldError::ChunkNotLoaded(chunk_pos));
        };
        chunk.set_block(pos.local(), BlockId::AIR);
        drop(chunk);
        self.dirty.insert(chunk_pos);
        Ok(())
    }

    pub fn has_chunk(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    /// Insert a chunk without marking it dirty (used for generation/loading).
    pub fn insert_chunk(&self, pos: ChunkPos, chunk: Chunk) {
        self.chunks.insert(pos, chunk);
    }

    /// Drop a chunk from memory. Pending modifications are discarded.
    pub fn unload_chunk(&self, pos: ChunkPos) -> Option<Chunk> {
        self.dirty.remove(&pos);
        self.chunks.remove(&pos).map(|(_, chunk)| chunk)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Positions of every loaded chunk, in no particular order.
    pub fn chunk_positions(&self) -> Vec<ChunkPos> {
        self.chunks.iter().map(|entry| *entry.key()).collect()
    }

    /// Drain and return all chunk positions that have been modified since the
    /// last call. After this returns, the dirty set is empty.
    pub fn take_dirty_chunks(&self) -> Vec<ChunkPos> {
        let mut dirty = Vec::new();
        // Collect then remove; a tiny race (chunk dirtied between collect and
        // remove) just means it'll be re-saved next time -- always safe.
        for entry in self.dirty.iter() {
            dirty.push(*entry);
        }
        for pos in &dirty {
            self.dirty.remove(pos);
        }
        dirty
    }

    /// Number of chunks currently marked dirty.
    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Get a reference to a single chunk by position, if present.
    pub fn get_chunk(&self, pos: &ChunkPos) -> Option<dashmap::mapref::one::Ref<'_, ChunkPos, Chunk>> {
        self.chunks.get(pos)
    }

    // ── Structure registry ──────────────────────────────────────────────

    /// Record a structure start in the chunk that owns it.
    pub fn add_structure_start(&self, chunk: ChunkPos, start: StructureStart) {
        self.structures.entry(chunk).or_default().push(start);
    }

    /// The structure starts recorded for `chunk` (empty if none).
    pub fn structure_starts(&self, chunk: ChunkPos) -> Vec<StructureStart> {
        self.structures
            .get(&chunk)
            .map(|starts| starts.clone())
            .unwrap_or_default()
    }

    // ── Entities ────────────────────────────────────────────────────────

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    /// Remove non-player living occupants inside `region`; returns how many.
    pub fn purge_living(&self, region: &BlockBox) -> usize {
        self.entities.purge_living(region).len()
    }

    /// Positions of connected players in this world.
    pub fn observers(&self) -> Vec<(f64, f64, f64)> {
        self.entities.observers()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only handle on a shared world.
///
/// Background scans receive this instead of `Arc<World>` so they have no
/// way to issue a write.
#[derive(Clone)]
pub struct ReadView {
    world: Arc<World>,
}

impl ReadView {
    pub fn new(world: Arc<World>) -> Self {
        Self { world }
    }

    pub fn block(&self, pos: BlockPos) -> Result<BlockId, WorldError> {
        self.world.block(pos)
    }

    pub fn min_y(&self) -> i64 {
        self.world.min_y()
    }

    pub fn max_y(&self) -> i64 {
        self.world.max_y()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_report_unloaded_and_out_of_range() {
        let world = World::with_height(0, 256);
        let pos = BlockPos::new(5, 10, 5);
        assert_eq!(world.block(pos), Err(WorldError::ChunkNotLoaded(ChunkPos::new(0, 0))));
        assert_eq!(world.get_block(pos), BlockId::AIR);

        world.set_block(pos, BlockId(3)).unwrap();
        assert_eq!(world.block(pos), Ok(BlockId(3)));
        assert!(matches!(
            world.block(BlockPos::new(5, 256, 5)),
            Err(WorldError::OutOfBounds { .. })
        ));
        assert!(world.set_block(BlockPos::new(0, -1, 0), BlockId(1)).is_err());
    }

    #[test]
    fn remove_requires_loaded_chunk() {
        let world = World::new();
        let pos = BlockPos::new(40, 64, 40);
        assert!(world.remove_block(pos).is_err());
        world.insert_chunk(pos.chunk(), Chunk::new());
        world.remove_block(pos).unwrap();
        assert_eq!(world.dirty_count(), 1);
    }

    #[test]
    fn structure_registry_is_per_chunk() {
        let world = World::new();
        let bb = BlockBox::from_corners(BlockPos::new(0, 60, 0), BlockPos::new(40, 80, 40));
        world.add_structure_start(ChunkPos::new(1, 1), StructureStart::new("minecraft:village_plains", "minecraft:jigsaw", bb));
        assert_eq!(world.structure_starts(ChunkPos::new(1, 1)).len(), 1);
        assert!(world.structure_starts(ChunkPos::new(0, 0)).is_empty());
    }
}
