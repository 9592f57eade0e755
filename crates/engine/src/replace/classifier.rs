//! Background, read-only classification of a settlement region.
//!
//! A scan runs on a dedicated rayon pool and produces the ordered list of
//! positions to remove. It plans the ground level first (both passes are
//! anchored to it), then runs:
//!
//! 1. a wide pass over a fixed radius that only looks for structure-specific
//!    blocks, catching remnants outside the blueprint footprint;
//! 2. a tight pass over the padded footprint that removes anything that is
//!    neither air nor natural, plus water that looks artificial.
//!
//! Results travel back over a one-shot channel. The scheduler polls the
//! handle once per tick; workers never touch job state.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crossbeam_channel::{Receiver, TryRecvError};
use rayon::prelude::*;

use crate::world::{ReadView, WorldError};
use crate::world::position::BlockPos;

use super::blueprint::Blueprint;
use super::config::ReplaceConfig;
use super::error::ReplaceError;
use super::planner::{self, PlacementPlan};
use super::tables::BlockTables;

/// Positions flagged for removal, in removal order, without duplicates.
/// Never modified after the scan that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    positions: Box<[BlockPos]>,
}

impl ClassificationResult {
    pub fn new(positions: Vec<BlockPos>) -> Self {
        Self {
            positions: positions.into_boxed_slice(),
        }
    }

    pub fn positions(&self) -> &[BlockPos] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Hits from the wide pass.
    pub wide: usize,
    /// Hits from the tight pass not already found by the wide pass.
    pub tight: usize,
    /// Of the tight hits, water judged artificial.
    pub artificial_water: usize,
    /// Positions skipped because the read failed.
    pub read_errors: usize,
}

/// Everything a finished scan hands back to the tick thread.
#[derive(Debug)]
pub struct ScanOutcome {
    pub plan: PlacementPlan,
    pub result: ClassificationResult,
    pub stats: ScanStats,
}

pub enum ScanPoll {
    Pending,
    Ready(ScanOutcome),
    /// The scan panicked; its worker caught the panic and sent nothing.
    Lost,
}

/// Completion handle for one dispatched scan.
pub struct ScanHandle {
    rx: Receiver<ScanOutcome>,
}

impl ScanHandle {
    /// Non-blocking check for the scan's result.
    pub fn poll(&self) -> ScanPoll {
        match self.rx.try_recv() {
            Ok(outcome) => ScanPoll::Ready(outcome),
            Err(TryRecvError::Empty) => ScanPoll::Pending,
            Err(TryRecvError::Disconnected) => ScanPoll::Lost,
        }
    }
}

/// The classification worker pool plus the tables it classifies with.
pub struct RegionClassifier {
    pool: rayon::ThreadPool,
    tables: Arc<BlockTables>,
    config: Arc<ReplaceConfig>,
}

impl RegionClassifier {
    pub fn new(tables: Arc<BlockTables>, config: Arc<ReplaceConfig>) -> Result<Self, ReplaceError> {
        let threads = config.worker_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("settlement-scan-{i}"))
            .build()?;
        tracing::debug!(threads, "classification pool started");
        Ok(Self {
            pool,
            tables,
            config,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue a scan and return immediately.
    pub fn dispatch(&self, view: ReadView, center: BlockPos, blueprint: Arc<Blueprint>) -> ScanHandle {
        let tables = Arc::clone(&self.tables);
        let config = Arc::clone(&self.config);
        self.spawn_scan(move || scan(&view, &tables, &config, center, &blueprint))
    }

    /// Run `work` on the pool. A panic is caught on the worker; the sender is
    /// dropped unsent and the handle reports `Lost`.
    pub(crate) fn spawn_scan<F>(&self, work: F) -> ScanHandle
    where
        F: FnOnce() -> ScanOutcome + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.pool.spawn(move || match panic::catch_unwind(AssertUnwindSafe(work)) {
            // The receiver is gone if the world was unloaded meanwhile.
            Ok(outcome) => {
                let _ = tx.send(outcome);
            }
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(%reason, "classification worker panicked");
            }
        });
        ScanHandle { rx }
    }
}

/// Plan and classify synchronously on the calling thread's rayon context.
pub fn scan(
    view: &ReadView,
    tables: &BlockTables,
    config: &ReplaceConfig,
    center: BlockPos,
    blueprint: &Blueprint,
) -> ScanOutcome {
    let plan = planner::plan(view, tables, config, center, blueprint);
    let ground = plan.ground_level();
    let min_y = view.min_y();
    let max_y = view.max_y();

    let mut stats = ScanStats::default();
    let mut seen = HashSet::new();
    let mut positions = Vec::new();

    let wide = Region {
        x: (center.x - config.wide_scan_radius, center.x + config.wide_scan_radius),
        y: (
            (ground - config.wide_scan_below).max(min_y),
            (ground + config.wide_scan_above).min(max_y),
        ),
        z: (center.z - config.wide_scan_radius, center.z + config.wide_scan_radius),
    };
    let wide_hits = sweep(&wide, |pos| {
        let block = view.block(pos)?;
        Ok(tables.is_structure_specific(block).then_some(Hit::Block))
    });
    stats.read_errors += wide_hits.read_errors;
    for (pos, _) in wide_hits.hits {
        if seen.insert(pos) {
            positions.push(pos);
            stats.wide += 1;
        }
    }

    // The padded footprint, anchored where the blueprint will be placed.
    let pad = config.footprint_padding;
    let origin = plan.origin;
    let height = config.clear_height.max(i64::from(blueprint.height()));
    let tight = Region {
        x: (origin.x - pad, origin.x + i64::from(blueprint.width()) + pad),
        y: ((ground - config.clear_below).max(min_y), (ground + height).min(max_y)),
        z: (origin.z - pad, origin.z + i64::from(blueprint.length()) + pad),
    };
    let tight_hits = sweep(&tight, |pos| {
        let block = view.block(pos)?;
        if block.is_air() || tables.is_protected(block) {
            return Ok(None);
        }
        if tables.is_water(block) {
            return Ok(is_artificial_water(view, tables, pos).then_some(Hit::Water));
        }
        Ok((!tables.is_natural(block)).then_some(Hit::Block))
    });
    stats.read_errors += tight_hits.read_errors;
    for (pos, hit) in tight_hits.hits {
        if seen.insert(pos) {
            positions.push(pos);
            stats.tight += 1;
            if hit == Hit::Water {
                stats.artificial_water += 1;
            }
        }
    }

    tracing::debug!(
        x = center.x,
        z = center.z,
        ground,
        wide = stats.wide,
        tight = stats.tight,
        skipped = stats.read_errors,
        "classification finished"
    );

    ScanOutcome {
        plan,
        result: ClassificationResult::new(positions),
        stats,
    }
}

/// Water is artificial when structure-specific blocks outnumber natural
/// ones among its eight horizontal neighbors. Unreadable neighbors count
/// for neither side.
fn is_artificial_water(view: &ReadView, tables: &BlockTables, pos: BlockPos) -> bool {
    let mut structure = 0;
    let mut natural = 0;
    for neighbor in pos.horizontal_ring() {
        match view.block(neighbor) {
            Ok(id) if tables.is_structure_specific(id) => structure += 1,
            Ok(id) if tables.is_natural(id) => natural += 1,
            _ => {}
        }
    }
    structure > natural
}

/// Half-open box `[lo, hi)` on each axis.
struct Region {
    x: (i64, i64),
    y: (i64, i64),
    z: (i64, i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hit {
    Block,
    Water,
}

struct Sweep {
    hits: Vec<(BlockPos, Hit)>,
    read_errors: usize,
}

/// Visit every position in `region`, one x column per rayon task, and
/// gather hits in deterministic x, z, y order.
fn sweep<F>(region: &Region, test: F) -> Sweep
where
    F: Fn(BlockPos) -> Result<Option<Hit>, WorldError> + Sync,
{
    let columns: Vec<Sweep> = (region.x.0..region.x.1)
        .into_par_iter()
        .map(|x| {
            let mut column = Sweep {
                hits: Vec::new(),
                read_errors: 0,
            };
            for z in region.z.0..region.z.1 {
                for y in region.y.0..region.y.1 {
                    let pos = BlockPos::new(x, y, z);
                    match test(pos) {
                        Ok(Some(hit)) => column.hits.push((pos, hit)),
                        Ok(None) => {}
                        Err(_) => column.read_errors += 1,
                    }
                }
            }
            column
        })
        .collect();

    let mut out = Sweep {
        hits: Vec::new(),
        read_errors: 0,
    };
    for column in columns {
        out.hits.extend(column.hits);
        out.read_errors += column.read_errors;
    }
    out
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::replace::blueprint::BlueprintCell;
    use crate::world::World;
    use crate::world::block::BlockId;
    use crate::world::chunk::Chunk;
    use crate::world::position::ChunkPos;

    const STONE: BlockId = BlockId(1);
    const BELL: BlockId = BlockId(10);
    const PLANKS: BlockId = BlockId(11);
    const WATER: BlockId = BlockId(20);
    const BEDROCK: BlockId = BlockId(30);

    fn tables() -> BlockTables {
        let mut t = BlockTables::default();
        t.structure_specific.insert(BELL);
        t.natural.extend([STONE, WATER]);
        t.water.insert(WATER);
        t.protected.insert(BEDROCK);
        t
    }

    fn small_config() -> ReplaceConfig {
        ReplaceConfig {
            wide_scan_radius: 12,
            footprint_padding: 2,
            clear_height: 6,
            worker_threads: 2,
            ..ReplaceConfig::default()
        }
    }

    fn flat_world() -> World {
        let world = World::new();
        for cx in -2..2 {
            for cz in -2..2 {
                world.insert_chunk(ChunkPos::new(cx, cz), Chunk::new());
            }
        }
        for x in -20..20 {
            for z in -20..20 {
                world.set_block(BlockPos::new(x, 63, z), STONE).unwrap();
            }
        }
        world
    }

    fn blueprint() -> Blueprint {
        Blueprint::new("hut", 4, 4, 4, vec![BlueprintCell { x: 0, y: 0, z: 0, block: PLANKS }]).unwrap()
    }

    #[test]
    fn tight_pass_keeps_natural_and_protected() {
        let world = flat_world();
        world.set_block(BlockPos::new(1, 64, 1), PLANKS).unwrap();
        world.set_block(BlockPos::new(2, 64, 1), BEDROCK).unwrap();
        world.set_block(BlockPos::new(-1, 64, 0), STONE).unwrap();
        // Far outside the footprint: only the wide pass can see it.
        world.set_block(BlockPos::new(10, 66, -10), BELL).unwrap();
        world.set_block(BlockPos::new(10, 66, 10), PLANKS).unwrap();

        let view = ReadView::new(Arc::new(world));
        let out = scan(&view, &tables(), &small_config(), BlockPos::new(0, 64, 0), &blueprint());

        let positions = out.result.positions();
        assert!(positions.contains(&BlockPos::new(1, 64, 1)));
        assert!(positions.contains(&BlockPos::new(10, 66, -10)));
        assert!(!positions.contains(&BlockPos::new(2, 64, 1)));
        assert!(!positions.contains(&BlockPos::new(-1, 64, 0)));
        assert!(!positions.contains(&BlockPos::new(10, 66, 10)));
        assert_eq!(out.stats.wide, 1);
    }

    #[test]
    fn water_enclosed_by_structure_blocks_is_artificial() {
        let world = flat_world();
        let pool = BlockPos::new(0, 64, 0);
        world.set_block(pool, WATER).unwrap();
        for n in pool.horizontal_ring() {
            world.set_block(n, BELL).unwrap();
        }
        let lake = BlockPos::new(3, 64, 3);
        world.set_block(lake, WATER).unwrap();
        for n in lake.horizontal_ring() {
            world.set_block(n, STONE).unwrap();
        }

        let view = ReadView::new(Arc::new(world));
        let out = scan(&view, &tables(), &small_config(), BlockPos::new(0, 64, 0), &blueprint());
        assert!(out.result.positions().contains(&pool));
        assert!(!out.result.positions().contains(&lake));
        assert_eq!(out.stats.artificial_water, 1);
    }

    #[test]
    fn unloaded_columns_are_skipped_not_fatal() {
        let world = flat_world();
        world.unload_chunk(ChunkPos::new(0, 0));
        world.set_block(BlockPos::new(-5, 64, -5), BELL).unwrap();

        let view = ReadView::new(Arc::new(world));
        let out = scan(&view, &tables(), &small_config(), BlockPos::new(0, 64, 0), &blueprint());
        assert!(out.stats.read_errors > 0);
        assert!(out.result.positions().contains(&BlockPos::new(-5, 64, -5)));
    }

    #[test]
    fn tight_pass_covers_odd_footprint_without_padding() {
        let world = flat_world();
        // A 3-wide footprint centred on x=0 is placed over x in -1..=1.
        world.set_block(BlockPos::new(1, 64, 1), PLANKS).unwrap();
        world.set_block(BlockPos::new(-1, 64, 0), PLANKS).unwrap();
        world.set_block(BlockPos::new(2, 64, 0), PLANKS).unwrap();
        world.set_block(BlockPos::new(0, 64, -2), PLANKS).unwrap();
        let config = ReplaceConfig {
            footprint_padding: 0,
            ..small_config()
        };
        let hut = Blueprint::new("odd", 3, 2, 3, vec![BlueprintCell { x: 0, y: 0, z: 0, block: PLANKS }]).unwrap();

        let view = ReadView::new(Arc::new(world));
        let out = scan(&view, &tables(), &config, BlockPos::new(0, 64, 0), &hut);
        assert_eq!(out.plan.origin.x, -1);
        let positions = out.result.positions();
        assert!(positions.contains(&BlockPos::new(1, 64, 1)));
        assert!(positions.contains(&BlockPos::new(-1, 64, 0)));
        assert!(!positions.contains(&BlockPos::new(2, 64, 0)));
        assert!(!positions.contains(&BlockPos::new(0, 64, -2)));
    }

    fn poll_until_settled(handle: &ScanHandle) -> ScanPoll {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            match handle.poll() {
                ScanPoll::Pending if Instant::now() < deadline => std::thread::sleep(Duration::from_millis(5)),
                ScanPoll::Pending => panic!("scan did not finish"),
                settled => return settled,
            }
        }
    }

    #[test]
    fn panicking_scan_is_lost_and_pool_survives() {
        let classifier = RegionClassifier::new(Arc::new(tables()), Arc::new(small_config())).unwrap();
        let handle = classifier.spawn_scan(|| panic!("corrupt section"));
        assert!(matches!(poll_until_settled(&handle), ScanPoll::Lost));

        // The same workers still serve the next scan.
        let world = flat_world();
        world.set_block(BlockPos::new(0, 64, 0), BELL).unwrap();
        let handle = classifier.dispatch(
            ReadView::new(Arc::new(world)),
            BlockPos::new(0, 64, 0),
            Arc::new(blueprint()),
        );
        assert!(matches!(poll_until_settled(&handle), ScanPoll::Ready(_)));
    }

    #[test]
    fn dispatched_scan_is_polled_to_completion() {
        let world = flat_world();
        world.set_block(BlockPos::new(0, 64, 0), BELL).unwrap();
        let config = Arc::new(small_config());
        let classifier = RegionClassifier::new(Arc::new(tables()), config).unwrap();
        assert_eq!(classifier.worker_count(), 2);

        let handle = classifier.dispatch(
            ReadView::new(Arc::new(world)),
            BlockPos::new(0, 64, 0),
            Arc::new(blueprint()),
        );
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            match handle.poll() {
                ScanPoll::Ready(out) => {
                    assert_eq!(out.result.len(), 1);
                    break;
                }
                ScanPoll::Pending if Instant::now() < deadline => std::thread::sleep(Duration::from_millis(5)),
                ScanPoll::Pending => panic!("scan did not finish"),
                ScanPoll::Lost => panic!("worker dropped the result"),
            }
        }
    }
}
