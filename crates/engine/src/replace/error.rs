use crate::world::WorldError;

use super::WorldId;
use super::job::JobState;

/// Why a replacement job (or the pipeline itself) could not proceed.
#[derive(Debug, thiserror::Error)]
pub enum ReplaceError {
    #[error(transparent)]
    World(#[from] WorldError),

    #[error("illegal job transition {from:?} -> {to:?}")]
    InvalidTransition { from: JobState, to: JobState },

    #[error("classification worker exited without a result")]
    ScanLost,

    #[error("job in {0:?} has no work attached")]
    Stalled(JobState),

    #[error("world {0:?} is not registered")]
    UnknownWorld(WorldId),

    #[error("invalid blueprint: {0}")]
    InvalidBlueprint(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to start classification workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
