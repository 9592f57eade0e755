use serde::{Deserialize, Serialize};

/// Absolute block position in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl BlockPos {
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// The chunk this block belongs to.
    pub const fn chunk(&self) -> ChunkPos {
        ChunkPos {
            x: (self.x >> 4) as i32,
            z: (self.z >> 4) as i32,
        }
    }

    /// Position within the chunk (0..16 each axis, 0..max_y for y).
    pub const fn local(&self) -> LocalBlockPos {
        LocalBlockPos {
            x: (self.x & 0xF) as u8,
            y: self.y,
            z: (self.z & 0xF) as u8,
        }
    }

    pub const fn offset(&self, dx: i64, dy: i64, dz: i64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// The eight horizontal neighbors (the 3x3 ring around this block at the
    /// same height, excluding the block itself).
    pub const fn horizontal_ring(&self) -> [BlockPos; 8] {
        [
            self.offset(-1, 0, -1),
            self.offset(0, 0, -1),
            self.offset(1, 0, -1),
            self.offset(-1, 0, 0),
            self.offset(1, 0, 0),
            self.offset(-1, 0, 1),
            self.offset(0, 0, 1),
            self.offset(1, 0, 1),
        ]
    }

    /// Squared euclidean distance to a floating point location.
    pub fn distance_sq_to(&self, x: f64, y: f64, z: f64) -> f64 {
        let dx = self.x as f64 - x;
        let dy = self.y as f64 - y;
        let dz = self.z as f64 - z;
        dx * dx + dy * dy + dz * dz
    }
}

/// Chunk column position (each chunk is 16x16 blocks horizontally).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub const fn block_origin(&self, y: i64) -> BlockPos {
        BlockPos::new((self.x as i64) << 4, y, (self.z as i64) << 4)
    }
}

/// Block position local to a chunk (x, z in 0..16).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalBlockPos {
    pub x: u8,
    pub y: i64,
    pub z: u8,
}

impl LocalBlockPos {
    pub const fn section_index(&self) -> i32 {
        (self.y >> 4) as i32
    }

    pub const fn section_local_y(&self) -> u8 {
        (self.y.rem_euclid(16)) as u8
    }
}

/// Inclusive axis-aligned box of blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockBox {
    pub min: BlockPos,
    pub max: BlockPos,
}

impl BlockBox {
    /// Box spanning two arbitrary corners.
    pub fn from_corners(a: BlockPos, b: BlockPos) -> Self {
        Self {
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Cube of half-extent `radius` around `center`.
    pub fn around(center: BlockPos, radius: i64) -> Self {
        Self {
            min: center.offset(-radius, -radius, -radius),
            max: center.offset(radius, radius, radius),
        }
    }

    /// Integer center, rounding toward negative infinity like the host does.
    pub fn center(&self) -> BlockPos {
        BlockPos::new(
            (self.min.x + self.max.x).div_euclid(2),
            (self.min.y + self.max.y).div_euclid(2),
            (self.min.z + self.max.z).div_euclid(2),
        )
    }

    pub fn contains(&self, x: f64, y: f64, z: f64) -> bool {
        x >= self.min.x as f64
            && x < (self.max.x + 1) as f64
            && y >= self.min.y as f64
            && y < (self.max.y + 1) as f64
            && z >= self.min.z as f64
            && z < (self.max.z + 1) as f64
    }

    pub fn union(&self, other: &BlockBox) -> BlockBox {
        BlockBox {
            min: BlockPos::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: BlockPos::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    pub fn size(&self) -> (i64, i64, i64) {
        (
            self.max.x - self.min.x + 1,
            self.max.y - self.min.y + 1,
            self.max.z - self.min.z + 1,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_coordinates_map_to_negative_chunks() {
        let pos = BlockPos::new(-1, 70, -17);
        assert_eq!(pos.chunk(), ChunkPos::new(-1, -2));
        assert_eq!(pos.local().x, 15);
        assert_eq!(pos.local().z, 15);
    }

    #[test]
    fn box_center_and_contains() {
        let bb = BlockBox::from_corners(BlockPos::new(10, 60, -4), BlockPos::new(0, 70, 4));
        assert_eq!(bb.center(), BlockPos::new(5, 65, 0));
        assert!(bb.contains(10.9, 70.5, 4.2));
        assert!(!bb.contains(11.0, 65.0, 0.0));
        assert_eq!(bb.size(), (11, 11, 9));
    }

    #[test]
    fn ring_excludes_self() {
        let p = BlockPos::new(0, 0, 0);
        let ring = p.horizontal_ring();
        assert!(!ring.contains(&p));
        assert!(ring.iter().all(|n| n.y == 0));
    }
}
