//! Ground-level estimation for blueprint placement.
//!
//! Samples a grid across the footprint, walking each sample column down from
//! a fixed elevation to the first open-above-solid transition. Topsoil
//! samples win outright; otherwise the plain mean is used, nudged upward on
//! rough terrain so the blueprint does not end up buried on one side.

use crate::world::ReadView;
use crate::world::position::BlockPos;

use super::blueprint::Blueprint;
use super::config::ReplaceConfig;
use super::tables::BlockTables;

/// Where the ground reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundSource {
    /// Mean of the samples resting on topsoil.
    Topsoil { samples: usize },
    /// Mean of every resolved sample, plus an upward bias on uneven ground.
    Average { samples: usize, bias: i64 },
    /// Nothing resolved; the configured fallback elevation.
    Fallback,
}

/// Where a blueprint will be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementPlan {
    /// Footprint center at ground level.
    pub ground: BlockPos,
    /// World position of the blueprint's (0, 0, 0) cell.
    pub origin: BlockPos,
    pub source: GroundSource,
}

impl PlacementPlan {
    pub fn ground_level(&self) -> i64 {
        self.ground.y
    }
}

#[derive(Debug, Clone, Copy)]
struct GroundSample {
    y: i64,
    topsoil: bool,
}

/// Compute the placement plan for `blueprint` centered on `center`.
pub fn plan(
    view: &ReadView,
    tables: &BlockTables,
    config: &ReplaceConfig,
    center: BlockPos,
    blueprint: &Blueprint,
) -> PlacementPlan {
    let width = i64::from(blueprint.width());
    let length = i64::from(blueprint.length());
    let radius = width.max(length) / 2;
    let stride = config.ground_sample_stride.max(1);

    let mut samples = Vec::new();
    let mut dz = -radius;
    while dz <= radius {
        let mut dx = -radius;
        while dx <= radius {
            if let Some(sample) = sample_column(view, tables, config, center.x + dx, center.z + dz) {
                samples.push(sample);
            }
            dx += stride;
        }
        dz += stride;
    }

    let (ground_y, source) = reference_elevation(&samples, config);
    let ground = BlockPos::new(center.x, ground_y, center.z);
    PlacementPlan {
        ground,
        origin: BlockPos::new(center.x - width / 2, ground_y, center.z - length / 2),
        source,
    }
}

/// Walk one column downward. The returned y is the first open block above
/// solid ground, i.e. where a placed block would stand.
fn sample_column(
    view: &ReadView,
    tables: &BlockTables,
    config: &ReplaceConfig,
    x: i64,
    z: i64,
) -> Option<GroundSample> {
    let top = config.ground_scan_top.min(view.max_y() - 1);
    let floor = config.ground_scan_floor.max(view.min_y() + 1);

    let mut y = top;
    while y >= floor {
        let above = view.block(BlockPos::new(x, y, z));
        let below = view.block(BlockPos::new(x, y - 1, z));
        if let (Ok(above), Ok(below)) = (above, below) {
            if tables.is_open(above) && tables.is_solid(below) {
                return Some(GroundSample {
                    y,
                    topsoil: tables.is_topsoil(below),
                });
            }
        }
        y -= 1;
    }
    None
}

fn reference_elevation(samples: &[GroundSample], config: &ReplaceConfig) -> (i64, GroundSource) {
    let topsoil: Vec<i64> = samples.iter().filter(|s| s.topsoil).map(|s| s.y).collect();
    if !topsoil.is_empty() {
        return (
            mean(&topsoil),
            GroundSource::Topsoil {
                samples: topsoil.len(),
            },
        );
    }

    let all: Vec<i64> = samples.iter().map(|s| s.y).collect();
    if all.is_empty() {
        return (config.fallback_elevation, GroundSource::Fallback);
    }

    let avg = mean(&all);
    let min = all.iter().copied().min().unwrap_or(avg);
    let max = all.iter().copied().max().unwrap_or(avg);
    let bias = if max - min > config.uneven_spread_threshold {
        ((max - avg) / 2).clamp(0, config.uneven_max_bias)
    } else {
        0
    };
    (
        avg + bias,
        GroundSource::Average {
            samples: all.len(),
            bias,
        },
    )
}

fn mean(values: &[i64]) -> i64 {
    let sum: i64 = values.iter().sum();
    sum.div_euclid(values.len() as i64)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::replace::blueprint::BlueprintCell;
    use crate::world::World;
    use crate::world::block::BlockId;
    use crate::world::chunk::Chunk;
    use crate::world::position::ChunkPos;

    const STONE: BlockId = BlockId(1);
    const GRASS: BlockId = BlockId(2);
    const FLOWER: BlockId = BlockId(3);

    fn tables() -> BlockTables {
        let mut t = BlockTables::default();
        t.natural.extend([STONE, GRASS]);
        t.topsoil.insert(GRASS);
        t.passable.insert(FLOWER);
        t
    }

    fn blueprint() -> Blueprint {
        Blueprint::new("hut", 8, 4, 8, vec![BlueprintCell { x: 0, y: 0, z: 0, block: STONE }]).unwrap()
    }

    fn loaded_world() -> World {
        let world = World::new();
        for cx in -2..2 {
            for cz in -2..2 {
                world.insert_chunk(ChunkPos::new(cx, cz), Chunk::new());
            }
        }
        world
    }

    fn fill_column(world: &World, x: i64, z: i64, top: i64, surface: BlockId) {
        for y in 50..top {
            world.set_block(BlockPos::new(x, y, z), STONE).unwrap();
        }
        world.set_block(BlockPos::new(x, top, z), surface).unwrap();
    }

    #[test]
    fn topsoil_samples_take_precedence() {
        let world = loaded_world();
        for x in -8..8 {
            for z in -8..8 {
                // Grass at 70 on one half, bare stone at 80 on the other.
                if x < 0 {
                    fill_column(&world, x, z, 70, GRASS);
                } else {
                    fill_column(&world, x, z, 80, STONE);
                }
            }
        }
        world.set_block(BlockPos::new(-1, 71, -1), FLOWER).unwrap();

        let view = ReadView::new(Arc::new(world));
        let plan = plan(&view, &tables(), &ReplaceConfig::default(), BlockPos::new(0, 64, 0), &blueprint());
        assert_eq!(plan.ground_level(), 71);
        assert!(matches!(plan.source, GroundSource::Topsoil { .. }));
        assert_eq!(plan.origin, BlockPos::new(-4, 71, -4));
    }

    #[test]
    fn uneven_ground_is_biased_upward() {
        let world = loaded_world();
        for x in -8..8 {
            for z in -8..8 {
                let top = if x < 0 { 60 } else { 80 };
                fill_column(&world, x, z, top, STONE);
            }
        }
        let view = ReadView::new(Arc::new(world));
        let plan = plan(&view, &tables(), &ReplaceConfig::default(), BlockPos::new(0, 64, 0), &blueprint());
        let GroundSource::Average { bias, .. } = plan.source else {
            panic!("expected an averaged reference, got {:?}", plan.source);
        };
        assert_eq!(bias, ReplaceConfig::default().uneven_max_bias);
        assert!(plan.ground_level() > 61 && plan.ground_level() < 81);
    }

    #[test]
    fn unresolved_samples_fall_back() {
        let view = ReadView::new(Arc::new(World::new()));
        let config = ReplaceConfig::default();
        let plan = plan(&view, &tables(), &config, BlockPos::new(500, 64, 500), &blueprint());
        assert_eq!(plan.source, GroundSource::Fallback);
        assert_eq!(plan.ground_level(), config.fallback_elevation);
    }
}
