use super::block::BlockId;
use super::position::LocalBlockPos;
use std::collections::HashMap;

/// Number of blocks along each axis of a chunk section.
pub const SECTION_SIZE: usize = 16;
/// Total block count in one section.
pub const SECTION_VOLUME: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;

/// A 16x16x16 cube of blocks.
///
/// Stored as a flat array in YZX order (x fastest), the same order Anvil
/// uses for `block_states`, so persistence can copy indices straight across.
/// A section that is entirely air is never allocated (see `Chunk`).
#[derive(Clone)]
pub struct ChunkSection {
    blocks: Box<[BlockId; SECTION_VOLUME]>,
}

impl ChunkSection {
    pub fn new_filled(block: BlockId) -> Self {
        Self {
            blocks: Box::new([block; SECTION_VOLUME]),
        }
    }

    pub fn new_empty() -> Self {
        Self::new_filled(BlockId::AIR)
    }

    /// Build a section from a full block array (already in YZX order).
    pub fn from_blocks(blocks: [BlockId; SECTION_VOLUME]) -> Self {
        Self {
            blocks: Box::new(blocks),
        }
    }

    #[inline]
    const fn index(x: u8, y: u8, z: u8) -> usize {
        (y as usize) * SECTION_SIZE * SECTION_SIZE + (z as usize) * SECTION_SIZE + (x as usize)
    }

    #[inline]
    pub fn get(&self, x: u8, y: u8, z: u8) -> BlockId {
        self.blocks[Self::index(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: u8, y: u8, z: u8, block: BlockId) {
        self.blocks[Self::index(x, y, z)] = block;
    }

    pub fn blocks(&self) -> &[BlockId; SECTION_VOLUME] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| *b == BlockId::AIR)
    }
}

/// A column of chunk sections, keyed by section index (y >> 4).
///
/// Only non-empty sections are stored (sparse).
#[derive(Clone)]
pub struct Chunk {
    sections: HashMap<i32, ChunkSection>,
}

impl Chunk {
    pub fn new() -> Self {
        Self {
            sections: HashMap::new(),
        }
    }

    pub fn get_block(&self, pos: LocalBlockPos) -> BlockId {
        let section_idx = pos.section_index();
        match self.sections.get(&section_idx) {
            Some(section) => section.get(pos.x, pos.section_local_y(), pos.z),
            None => BlockId::AIR,
        }
    }

    pub fn set_block(&mut self, pos: LocalBlockPos, block: BlockId) {
        let section_idx = pos.section_index();

        if block == BlockId::AIR {
            if let Some(section) = self.sections.get_mut(&section_idx) {
                section.set(pos.x, pos.section_local_y(), pos.z, block);
                if section.is_empty() {
                    self.sections.remove(&section_idx);
                }
            }
        } else {
            let section = self
                .sections
                .entry(section_idx)
                .or_insert_with(ChunkSection::new_empty);
            section.set(pos.x, pos.section_local_y(), pos.z, block);
        }
    }

    /// Install a whole section, dropping it if it is all air.
    pub fn insert_section(&mut self, section_idx: i32, section: ChunkSection) {
        if section.is_empty() {
            self.sections.remove(&section_idx);
        } else {
            self.sections.insert(section_idx, section);
        }
    }

    pub fn sections(&self) -> impl Iterator<Item = (&i32, &ChunkSection)> {
        self.sections.iter()
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }
}

impl Default for Chunk {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clearing_last_block_frees_section() {
        let mut chunk = Chunk::new();
        let pos = LocalBlockPos { x: 3, y: -20, z: 9 };
        chunk.set_block(pos, BlockId(5));
        assert_eq!(chunk.section_count(), 1);
        assert_eq!(chunk.get_block(pos), BlockId(5));

        chunk.set_block(pos, BlockId::AIR);
        assert_eq!(chunk.section_count(), 0);
        assert_eq!(chunk.get_block(pos), BlockId::AIR);
    }

    #[test]
    fn empty_sections_are_not_inserted() {
        let mut chunk = Chunk::new();
        chunk.insert_section(4, ChunkSection::new_empty());
        assert_eq!(chunk.section_count(), 0);
        chunk.insert_section(4, ChunkSection::new_filled(BlockId(1)));
        assert_eq!(chunk.get_block(LocalBlockPos { x: 0, y: 64, z: 0 }), BlockId(1));
    }
}
