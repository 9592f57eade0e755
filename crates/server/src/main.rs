use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::time::MissedTickBehavior;

use settlement_engine::replace::{ReplacementScheduler, WorldId};
use settlement_engine::world::World;
use settlement_engine::world::entity::EntityKind;
use settlement_engine::world::position::BlockPos;
use settlement_server::metrics::Metrics;
use settlement_server::{block, blueprint_file, config, persistence};

/// Default autosave interval (5 minutes).
const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(300);
/// How often pipeline counters are logged while running.
const METRICS_INTERVAL: Duration = Duration::from_secs(30);

const OVERWORLD: WorldId = WorldId(0);

#[derive(Parser, Debug)]
#[command(name = "settlement-server")]
#[command(about = "Replace generated villages in an Anvil world with blueprints")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a world and replace every settlement found, then save it
    Run {
        /// World directory (containing region/)
        #[arg(long)]
        world: PathBuf,

        /// JSON file overriding pipeline settings
        #[arg(long)]
        config: Option<PathBuf>,

        /// Blueprint directory (default: <world>/blueprints)
        #[arg(long)]
        blueprints: Option<PathBuf>,

        /// Player position X,Y,Z; nearer settlements are replaced first
        #[arg(long = "observer", value_parser = config::parse_point)]
        observers: Vec<(f64, f64, f64)>,

        /// Scheduler ticks per second
        #[arg(long, default_value = "20")]
        tps: u32,

        /// Stop after this many ticks even if work remains
        #[arg(long)]
        max_ticks: Option<u64>,
    },
    /// Capture the box between two corners as a blueprint file
    SaveBlueprint {
        /// World directory (containing region/)
        #[arg(long)]
        world: PathBuf,

        /// First corner X,Y,Z
        #[arg(long, value_parser = config::parse_block_pos)]
        from: BlockPos,

        /// Opposite corner X,Y,Z
        #[arg(long, value_parser = config::parse_block_pos)]
        to: BlockPos,

        /// Blueprint name
        #[arg(long)]
        name: String,

        /// Output file
        #[arg(long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run {
            world,
            config,
            blueprints,
            observers,
            tps,
            max_ticks,
        } => {
            let blueprints = blueprints.unwrap_or_else(|| world.join("blueprints"));
            run(&world, config.as_deref(), &blueprints, &observers, tps, max_ticks).await
        }
        Command::SaveBlueprint {
            world,
            from,
            to,
            name,
            out,
        } => save_blueprint(&world, from, to, &name, &out),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_world(dir: &Path) -> Result<World> {
    match persistence::load_world(dir)? {
        Some(world) => Ok(world),
        None => bail!("no Anvil region data under {}", dir.display()),
    }
}

async fn run(
    world_dir: &Path,
    config_path: Option<&Path>,
    blueprint_dir: &Path,
    observers: &[(f64, f64, f64)],
    tps: u32,
    max_ticks: Option<u64>,
) -> Result<()> {
    tracing::info!("Settlement replacement -- {}", world_dir.display());

    let config = config::load_replace_config(config_path)?;
    let world = Arc::new(load_world(world_dir)?);
    let blueprints = blueprint_file::load_dir(blueprint_dir)?;
    if blueprints.is_empty() {
        tracing::warn!(
            "No blueprints in {}; settlements will be left alone",
            blueprint_dir.display()
        );
    }

    let mut scheduler = ReplacementScheduler::new(config, block::minecraft_tables(), blueprints)
        .context("starting replacement scheduler")?;
    scheduler.add_world(OVERWORLD, Arc::clone(&world));
    if let Some(dedup) = scheduler.dedup(OVERWORLD) {
        persistence::load_ledger(world_dir, dedup)?;
    }

    for &(x, y, z) in observers {
        world
            .entities()
            .spawn(EntityKind::Player, "minecraft:player", x, y, z);
    }

    // Every loaded chunk becomes available once, in a stable order.
    let mut chunks = world.chunk_positions();
    chunks.sort();
    let notifier = scheduler.notifier();
    for chunk in &chunks {
        notifier.notify(OVERWORLD, *chunk);
    }
    tracing::info!("Queued {} chunks for inspection", chunks.len());

    let metrics = Metrics::new();
    let period = Duration::from_secs_f64(1.0 / f64::from(tps.max(1)));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut autosave = tokio::time::interval(AUTOSAVE_INTERVAL);
    autosave.tick().await; // first tick is immediate, skip it
    let mut metrics_log = tokio::time::interval(METRICS_INTERVAL);
    metrics_log.tick().await;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let started = Instant::now();
                let report = scheduler.tick();
                metrics.record_tick(&report, started.elapsed());
                if scheduler.is_idle() {
                    tracing::info!("All settlements processed after {} ticks", scheduler.tick_count());
                    break;
                }
                if max_ticks.is_some_and(|max| scheduler.tick_count() >= max) {
                    tracing::warn!(
                        pending = scheduler.pending_count(),
                        active = scheduler.active_count(),
                        "Tick limit reached with work remaining"
                    );
                    break;
                }
            }
            _ = autosave.tick() => {
                tracing::info!("Autosaving...");
                match save_all(&world, &scheduler, world_dir) {
                    Ok(n) => tracing::info!("Autosave complete: {} chunks", n),
                    Err(e) => tracing::error!("Autosave failed: {:#}", e),
                }
            }
            _ = metrics_log.tick() => {
                let snap = metrics.snapshot(scheduler.pending_count(), scheduler.active_count());
                tracing::info!(
                    ticks = snap.ticks,
                    completed = snap.jobs_completed,
                    failed = snap.jobs_failed,
                    removed = snap.blocks_removed,
                    mean_tick = ?snap.mean_tick(),
                    "Pipeline progress"
                );
            }
            _ = &mut shutdown => {
                tracing::info!("Ctrl+C received, shutting down...");
                break;
            }
        }
    }

    // ── Save on shutdown ─────────────────────────────────────────────────
    tracing::info!("Saving world before exit...");
    let written = save_all(&world, &scheduler, world_dir)?;
    tracing::info!("Shutdown save complete: {} chunks written", written);

    let snap = metrics.snapshot(scheduler.pending_count(), scheduler.active_count());
    tracing::info!("Final metrics: {}", serde_json::to_string(&snap)?);
    Ok(())
}

/// Dirty chunks plus the replaced-cell ledger.
fn save_all(world: &World, scheduler: &ReplacementScheduler, dir: &Path) -> Result<usize> {
    let written = persistence::save_world(world, dir)?;
    if let Some(dedup) = scheduler.dedup(OVERWORLD) {
        let cells = persistence::save_ledger(dir, dedup)?;
        tracing::debug!(cells, "Ledger written");
    }
    Ok(written)
}

fn save_blueprint(world_dir: &Path, from: BlockPos, to: BlockPos, name: &str, out: &Path) -> Result<()> {
    let world = load_world(world_dir)?;
    let blueprint = blueprint_file::capture(&world, from, to, name)?;
    blueprint_file::save(&blueprint, out)?;
    tracing::info!(
        name,
        width = blueprint.width(),
        height = blueprint.height(),
        length = blueprint.length(),
        blocks = blueprint.non_air_count(),
        "Blueprint saved to {}",
        out.display()
    );
    Ok(())
}
