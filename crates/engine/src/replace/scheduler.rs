//! Tick-driven orchestration of replacement jobs.
//!
//! Everything here runs on the host's tick thread. Per tick the scheduler
//! inspects at most `chunks_per_tick` notified chunks, reorders the pending
//! queue by observer proximity, admits jobs up to `max_active_jobs`, and
//! advances each active job by one bounded step.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use slotmap::SlotMap;

use crate::world::position::{BlockBox, BlockPos, ChunkPos};
use crate::world::{ReadView, World};

use super::WorldId;
use super::applier::{MutationApplier, place_blueprint};
use super::blueprint::BlueprintSet;
use super::classifier::{RegionClassifier, ScanPoll};
use super::config::ReplaceConfig;
use super::dedup::{ChunkRecord, DedupCache, DedupKey};
use super::error::ReplaceError;
use super::job::{Job, JobId, JobState, Stage};
use super::scanner::inspect_chunk;
use super::tables::BlockTables;

/// A chunk has finished loading and may be inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkAvailable {
    pub world: WorldId,
    pub chunk: ChunkPos,
}

/// Cloneable sender for chunk-availability notifications. Safe to use from
/// any thread; the scheduler drains it on the next tick.
#[derive(Clone)]
pub struct ChunkNotifier {
    tx: Sender<ChunkAvailable>,
}

impl ChunkNotifier {
    pub fn notify(&self, world: WorldId, chunk: ChunkPos) {
        // Receiver lives as long as the scheduler; a send after shutdown is moot.
        let _ = self.tx.send(ChunkAvailable { world, chunk });
    }
}

/// State scoped to one loaded world. Dropped with the world.
struct WorldContext {
    world: Arc<World>,
    dedup: DedupCache,
    inspected: ChunkRecord,
}

/// A job that reached a terminal state this tick.
#[derive(Debug, Clone)]
pub struct RetiredJob {
    pub id: JobId,
    pub world: WorldId,
    pub center: BlockPos,
    pub key: DedupKey,
    pub blueprint: String,
    pub history: Vec<JobState>,
    /// Set when the job failed.
    pub error: Option<String>,
}

impl RetiredJob {
    pub fn state(&self) -> JobState {
        self.history.last().copied().unwrap_or(JobState::Detected)
    }
}

/// What one tick did.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: u64,
    pub chunks_inspected: usize,
    pub jobs_detected: usize,
    pub jobs_admitted: usize,
    pub entities_purged: usize,
    pub blocks_removed: usize,
    pub blocks_placed: usize,
    pub retired: Vec<RetiredJob>,
}

impl TickReport {
    pub fn completed(&self) -> usize {
        self.retired
            .iter()
            .filter(|r| r.state() == JobState::Complete)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.retired
            .iter()
            .filter(|r| r.state() == JobState::Failed)
            .count()
    }
}

enum Progress {
    Working,
    Finished,
}

pub struct ReplacementScheduler {
    config: Arc<ReplaceConfig>,
    blueprints: BlueprintSet,
    classifier: RegionClassifier,
    worlds: HashMap<WorldId, WorldContext>,
    jobs: SlotMap<JobId, Job>,
    /// `Detected` jobs awaiting a slot, in admission order.
    pending: Vec<JobId>,
    /// Jobs holding a slot.
    active: Vec<JobId>,
    notify_tx: Sender<ChunkAvailable>,
    notify_rx: Receiver<ChunkAvailable>,
    next_seq: u64,
    tick: u64,
}

impl ReplacementScheduler {
    pub fn new(
        config: ReplaceConfig,
        tables: BlockTables,
        blueprints: BlueprintSet,
    ) -> Result<Self, ReplaceError> {
        config.validate()?;
        let config = Arc::new(config);
        let classifier = RegionClassifier::new(Arc::new(tables), Arc::clone(&config))?;
        let (notify_tx, notify_rx) = crossbeam_channel::unbounded();
        Ok(Self {
            config,
            blueprints,
            classifier,
            worlds: HashMap::new(),
            jobs: SlotMap::with_key(),
            pending: Vec::new(),
            active: Vec::new(),
            notify_tx,
            notify_rx,
            next_seq: 0,
            tick: 0,
        })
    }

    pub fn config(&self) -> &ReplaceConfig {
        &self.config
    }

    pub fn blueprints(&self) -> &BlueprintSet {
        &self.blueprints
    }

    // ── Worlds ──────────────────────────────────────────────────────────

    /// Start tracking a world. Replaces any previous context under `id`.
    pub fn add_world(&mut self, id: WorldId, world: Arc<World>) {
        let context = WorldContext {
            world,
            dedup: DedupCache::new(self.config.dedup_cell_size),
            inspected: ChunkRecord::new(),
        };
        if self.worlds.insert(id, context).is_some() {
            self.drop_jobs_for(id);
        }
    }

    /// Forget a world: its jobs, queue entries and caches are discarded.
    /// In-flight scans finish on their own and their results are dropped.
    pub fn unload_world(&mut self, id: WorldId) -> Result<usize, ReplaceError> {
        if self.worlds.remove(&id).is_none() {
            return Err(ReplaceError::UnknownWorld(id));
        }
        let dropped = self.drop_jobs_for(id);
        tracing::info!(world = id.0, dropped, "world unloaded; replacement state discarded");
        Ok(dropped)
    }

    fn drop_jobs_for(&mut self, id: WorldId) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, job| job.world != id);
        let jobs = &self.jobs;
        self.pending.retain(|jid| jobs.contains_key(*jid));
        self.active.retain(|jid| jobs.contains_key(*jid));
        before - self.jobs.len()
    }

    pub fn world(&self, id: WorldId) -> Option<&Arc<World>> {
        self.worlds.get(&id).map(|ctx| &ctx.world)
    }

    pub fn dedup(&self, id: WorldId) -> Option<&DedupCache> {
        self.worlds.get(&id).map(|ctx| &ctx.dedup)
    }

    // ── Notifications ───────────────────────────────────────────────────

    pub fn notifier(&self) -> ChunkNotifier {
        ChunkNotifier {
            tx: self.notify_tx.clone(),
        }
    }

    pub fn notify_chunk(&self, world: WorldId, chunk: ChunkPos) {
        let _ = self.notify_tx.send(ChunkAvailable { world, chunk });
    }

    pub fn queued_notifications(&self) -> usize {
        self.notify_rx.len()
    }

    // ── Tick ────────────────────────────────────────────────────────────

    pub fn tick(&mut self) -> TickReport {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };

        self.inspect_notified(&mut report);
        self.admit(&mut report);
        self.advance_active(&mut report);

        if report.jobs_detected > 0 || !report.retired.is_empty() {
            tracing::debug!(
                tick = self.tick,
                detected = report.jobs_detected,
                admitted = report.jobs_admitted,
                removed = report.blocks_removed,
                retired = report.retired.len(),
                pending = self.pending.len(),
                active = self.active.len(),
                "replacement tick"
            );
        }
        report
    }

    fn inspect_notified(&mut self, report: &mut TickReport) {
        for _ in 0..self.config.chunks_per_tick {
            let Ok(ChunkAvailable { world: world_id, chunk }) = self.notify_rx.try_recv() else {
                break;
            };
            // Notifications for worlds that have since unloaded are stale.
            let Some(ctx) = self.worlds.get(&world_id) else {
                continue;
            };
            report.chunks_inspected += 1;
            let detections = inspect_chunk(
                &ctx.world,
                &ctx.inspected,
                &ctx.dedup,
                &self.blueprints,
                &self.config,
                chunk,
            );
            for d in detections {
                let seq = self.next_seq;
                self.next_seq += 1;
                let id = self.jobs.insert(Job::new(
                    world_id,
                    d.center,
                    d.blueprint,
                    d.key,
                    d.matched,
                    d.structure_id,
                    seq,
                ));
                self.pending.push(id);
                report.jobs_detected += 1;
            }
        }
    }

    /// Stable-sort pending jobs by squared distance to the nearest observer
    /// in the same world, ties by detection order. Jobs in worlds without
    /// observers sort last.
    pub fn prioritize(&mut self) {
        let mut observers: HashMap<WorldId, Vec<(f64, f64, f64)>> = HashMap::new();
        let mut keyed: Vec<(f64, u64, JobId)> = Vec::with_capacity(self.pending.len());
        for &id in &self.pending {
            let Some(job) = self.jobs.get(id) else { continue };
            let points = observers.entry(job.world).or_insert_with(|| {
                self.worlds
                    .get(&job.world)
                    .map(|ctx| ctx.world.observers())
                    .unwrap_or_default()
            });
            let nearest = points
                .iter()
                .map(|&(x, y, z)| job.center.distance_sq_to(x, y, z))
                .fold(f64::INFINITY, f64::min);
            keyed.push((nearest, job.seq, id));
        }
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        self.pending = keyed.into_iter().map(|(_, _, id)| id).collect();
    }

    fn admit(&mut self, report: &mut TickReport) {
        if self.pending.is_empty() || self.active.len() >= self.config.max_active_jobs {
            return;
        }
        self.prioritize();

        while self.active.len() < self.config.max_active_jobs && !self.pending.is_empty() {
            let id = self.pending.remove(0);
            let Some(job) = self.jobs.get_mut(id) else { continue };
            let Some(ctx) = self.worlds.get(&job.world) else { continue };

            match start_job(job, ctx, &self.classifier, &self.config) {
                Ok(purged) => {
                    report.jobs_admitted += 1;
                    report.entities_purged += purged;
                    self.active.push(id);
                }
                Err(err) => {
                    fail_job(job, &err);
                    report.retired.extend(self.retire(id, Some(err.to_string())));
                }
            }
        }
    }

    fn advance_active(&mut self, report: &mut TickReport) {
        let active = std::mem::take(&mut self.active);
        for id in active {
            let Some(job) = self.jobs.get_mut(id) else { continue };
            let Some(ctx) = self.worlds.get(&job.world) else { continue };

            match step_job(job, ctx, &self.config, report) {
                Ok(Progress::Working) => self.active.push(id),
                Ok(Progress::Finished) => report.retired.extend(self.retire(id, None)),
                Err(err) => {
                    fail_job(job, &err);
                    report.retired.extend(self.retire(id, Some(err.to_string())));
                }
            }
        }
    }

    fn retire(&mut self, id: JobId, error: Option<String>) -> Option<RetiredJob> {
        let job = self.jobs.remove(id)?;
        Some(RetiredJob {
            id,
            world: job.world,
            center: job.center,
            key: job.key,
            blueprint: job.blueprint.name().to_owned(),
            history: job.history().to_vec(),
            error,
        })
    }

    // ── Introspection ───────────────────────────────────────────────────

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn pending_jobs(&self) -> &[JobId] {
        &self.pending
    }

    pub fn active_jobs(&self) -> &[JobId] {
        &self.active
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Nothing queued, nothing running, no notifications waiting.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.active.is_empty() && self.notify_rx.is_empty()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }
}

/// Purge the surroundings and dispatch the scan. Returns entities purged.
fn start_job(
    job: &mut Job,
    ctx: &WorldContext,
    classifier: &RegionClassifier,
    config: &ReplaceConfig,
) -> Result<usize, ReplaceError> {
    job.advance(JobState::Purging)?;
    let purged = ctx
        .world
        .purge_living(&BlockBox::around(job.center, config.purge_radius));
    if purged > 0 {
        tracing::info!(x = job.center.x, z = job.center.z, purged, "purged settlement occupants");
    }

    job.advance(JobState::Scanning)?;
    let handle = classifier.dispatch(
        ReadView::new(Arc::clone(&ctx.world)),
        job.center,
        Arc::clone(&job.blueprint),
    );
    job.stage = Stage::Scanning(handle);
    Ok(purged)
}

/// Advance one active job by at most one bounded step.
fn step_job(
    job: &mut Job,
    ctx: &WorldContext,
    config: &ReplaceConfig,
    report: &mut TickReport,
) -> Result<Progress, ReplaceError> {
    match std::mem::replace(&mut job.stage, Stage::Idle) {
        Stage::Scanning(handle) => match handle.poll() {
            ScanPoll::Pending => {
                job.stage = Stage::Scanning(handle);
                Ok(Progress::Working)
            }
            ScanPoll::Ready(outcome) => {
                job.advance(JobState::Clearing)?;
                tracing::debug!(
                    x = job.center.x,
                    z = job.center.z,
                    ground = outcome.plan.ground_level(),
                    removals = outcome.result.len(),
                    "scan complete"
                );
                job.stage = Stage::Clearing {
                    applier: MutationApplier::new(outcome.result),
                    plan: outcome.plan,
                };
                Ok(Progress::Working)
            }
            ScanPoll::Lost => Err(ReplaceError::ScanLost),
        },
        Stage::Clearing { mut applier, plan } => {
            report.blocks_removed += applier
                .drain_batch(&ctx.world, config.removal_batch_size)?
                .len();
            if !applier.is_exhausted() {
                job.stage = Stage::Clearing { applier, plan };
                return Ok(Progress::Working);
            }

            job.advance(JobState::Placing)?;
            let placed = place_blueprint(&ctx.world, &job.blueprint, &plan)?;
            report.blocks_placed += placed.written;
            job.advance(JobState::Complete)?;
            ctx.dedup.mark_done(job.key);
            tracing::info!(
                x = job.center.x,
                y = plan.ground_level(),
                z = job.center.z,
                blueprint = job.blueprint.name(),
                removed = applier.removed(),
                placed = placed.written,
                "settlement replaced"
            );
            Ok(Progress::Finished)
        }
        Stage::Idle => Err(ReplaceError::Stalled(job.state())),
    }
}

fn fail_job(job: &mut Job, err: &ReplaceError) {
    tracing::error!(
        x = job.center.x,
        y = job.center.y,
        z = job.center.z,
        stage = ?job.state(),
        error = %err,
        "replacement job failed"
    );
    job.fail();
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::replace::blueprint::{Blueprint, BlueprintCell};
    use crate::replace::detect::{SettlementMatch, SettlementVariant};
    use crate::world::block::BlockId;
    use crate::world::chunk::Chunk;
    use crate::world::structure::StructureStart;

    const OVERWORLD: WorldId = WorldId(0);

    fn hut() -> Blueprint {
        Blueprint::new("hut", 1, 1, 1, vec![BlueprintCell { x: 0, y: 0, z: 0, block: BlockId(11) }]).unwrap()
    }

    #[test]
    fn panicking_scan_fails_only_its_own_job() {
        let world = Arc::new(World::new());
        for cx in -2..2 {
            for cz in -2..2 {
                world.insert_chunk(ChunkPos::new(cx, cz), Chunk::new());
            }
        }
        let bounds = BlockBox::from_corners(BlockPos::new(0, 60, 0), BlockPos::new(16, 68, 16));
        world.add_structure_start(
            ChunkPos::new(0, 0),
            StructureStart::new("minecraft:village_plains", "minecraft:jigsaw", bounds),
        );

        let mut blueprints = BlueprintSet::new();
        let blueprint = blueprints.register(hut());
        let config = ReplaceConfig {
            wide_scan_radius: 8,
            footprint_padding: 1,
            clear_height: 4,
            worker_threads: 2,
            ..ReplaceConfig::default()
        };
        let mut scheduler = ReplacementScheduler::new(config, BlockTables::default(), blueprints).unwrap();
        scheduler.add_world(OVERWORLD, Arc::clone(&world));

        // A job whose classification blows up on the worker.
        let center = BlockPos::new(-20, 64, -20);
        let mut doomed = Job::new(
            OVERWORLD,
            center,
            blueprint,
            DedupKey::of(center, 8),
            SettlementMatch::Known(SettlementVariant::Plains),
            "minecraft:village_plains".to_string(),
            0,
        );
        doomed.advance(JobState::Purging).unwrap();
        doomed.advance(JobState::Scanning).unwrap();
        doomed.stage = Stage::Scanning(scheduler.classifier.spawn_scan(|| panic!("section decode failed")));
        let doomed = scheduler.jobs.insert(doomed);
        scheduler.active.push(doomed);

        // And a healthy one running alongside it.
        scheduler.notify_chunk(OVERWORLD, ChunkPos::new(0, 0));

        let deadline = Instant::now() + Duration::from_secs(30);
        let mut retired = Vec::new();
        while !scheduler.is_idle() {
            assert!(Instant::now() < deadline, "scheduler did not go idle");
            retired.extend(scheduler.tick().retired);
            std::thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(retired.len(), 2);
        let failed = retired.iter().find(|r| r.id == doomed).unwrap();
        assert_eq!(failed.state(), JobState::Failed);
        assert_eq!(failed.error.as_deref(), Some(ReplaceError::ScanLost.to_string().as_str()));
        assert_eq!(
            failed.history,
            [JobState::Detected, JobState::Purging, JobState::Scanning, JobState::Failed]
        );
        let healthy = retired.iter().find(|r| r.id != doomed).unwrap();
        assert_eq!(healthy.state(), JobState::Complete);
        assert!(scheduler.active_jobs().is_empty());
    }
}
