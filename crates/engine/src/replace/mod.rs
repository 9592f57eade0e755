//! The settlement replacement pipeline.
//!
//! Leaf-first: `dedup` and `blueprint` hold no dependencies; `planner` and
//! `classifier` read the world; `applier` writes it; `scanner` turns chunk
//! notifications into detections; `scheduler` ties them together under a
//! per-tick budget.

pub mod applier;
pub mod blueprint;
pub mod classifier;
pub mod config;
pub mod dedup;
pub mod detect;
pub mod error;
pub mod job;
pub mod planner;
pub mod scanner;
pub mod scheduler;
pub mod tables;

use serde::{Deserialize, Serialize};

pub use blueprint::{Blueprint, BlueprintCell, BlueprintSet};
pub use config::ReplaceConfig;
pub use dedup::DedupKey;
pub use error::ReplaceError;
pub use job::{JobId, JobState};
pub use scheduler::{ChunkNotifier, ReplacementScheduler, RetiredJob, TickReport};
pub use tables::BlockTables;

/// Host-assigned identifier of a loaded world (dimension).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldId(pub u32);
