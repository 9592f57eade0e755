//! Replacement jobs and their lifecycle.

use std::sync::Arc;

use slotmap::new_key_type;

use crate::world::position::BlockPos;

use super::WorldId;
use super::applier::MutationApplier;
use super::blueprint::Blueprint;
use super::classifier::ScanHandle;
use super::dedup::DedupKey;
use super::detect::SettlementMatch;
use super::error::ReplaceError;
use super::planner::PlacementPlan;

new_key_type! {
    /// Handle for a job owned by the scheduler.
    pub struct JobId;
}

/// Lifecycle of a job. Transitions only move forward one step at a time;
/// `Failed` is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Detected,
    Purging,
    Scanning,
    Clearing,
    Placing,
    Complete,
    Failed,
}

impl JobState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, JobState::Complete | JobState::Failed)
    }

    /// Holding one of the concurrency slots.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            JobState::Purging | JobState::Scanning | JobState::Clearing | JobState::Placing
        )
    }

    const fn successor(self) -> Option<JobState> {
        match self {
            JobState::Detected => Some(JobState::Purging),
            JobState::Purging => Some(JobState::Scanning),
            JobState::Scanning => Some(JobState::Clearing),
            JobState::Clearing => Some(JobState::Placing),
            JobState::Placing => Some(JobState::Complete),
            JobState::Complete | JobState::Failed => None,
        }
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == JobState::Failed || self.successor() == Some(next)
    }
}

/// Work attached to the current state.
pub(crate) enum Stage {
    Idle,
    Scanning(ScanHandle),
    Clearing {
        applier: MutationApplier,
        plan: PlacementPlan,
    },
}

/// One detected settlement on its way to being replaced.
pub struct Job {
    pub world: WorldId,
    /// Bounding-box center of the detected structure.
    pub center: BlockPos,
    pub blueprint: Arc<Blueprint>,
    pub key: DedupKey,
    pub matched: SettlementMatch,
    pub structure_id: String,
    /// Detection order, used to break proximity ties.
    pub seq: u64,
    state: JobState,
    history: Vec<JobState>,
    pub(crate) stage: Stage,
}

impl Job {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        world: WorldId,
        center: BlockPos,
        blueprint: Arc<Blueprint>,
        key: DedupKey,
        matched: SettlementMatch,
        structure_id: String,
        seq: u64,
    ) -> Self {
        Self {
            world,
            center,
            blueprint,
            key,
            matched,
            structure_id,
            seq,
            state: JobState::Detected,
            history: vec![JobState::Detected],
            stage: Stage::Idle,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Every state this job has been in, oldest first.
    pub fn history(&self) -> &[JobState] {
        &self.history
    }

    pub fn advance(&mut self, next: JobState) -> Result<(), ReplaceError> {
        if !self.state.can_transition_to(next) {
            return Err(ReplaceError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Move to `Failed` and drop any in-flight work. No-op once terminal.
    pub fn fail(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.state = JobState::Failed;
        self.history.push(JobState::Failed);
        self.stage = Stage::Idle;
    }

    /// Remaining positions to remove, while clearing.
    pub fn removals_remaining(&self) -> Option<usize> {
        match &self.stage {
            Stage::Clearing { applier, .. } => Some(applier.remaining()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replace::blueprint::{Blueprint, BlueprintCell};
    use crate::world::block::BlockId;

    fn job() -> Job {
        let bp = Blueprint::new(
            "hut",
            1,
            1,
            1,
            vec![BlueprintCell { x: 0, y: 0, z: 0, block: BlockId(1) }],
        )
        .unwrap();
        Job::new(
            WorldId(0),
            BlockPos::new(0, 64, 0),
            Arc::new(bp),
            DedupKey { x: 0, z: 0 },
            SettlementMatch::Heuristic,
            "test:village".into(),
            0,
        )
    }

    #[test]
    fn forward_path_reaches_complete() {
        let mut j = job();
        for next in [
            JobState::Purging,
            JobState::Scanning,
            JobState::Clearing,
            JobState::Placing,
            JobState::Complete,
        ] {
            j.advance(next).unwrap();
        }
        assert_eq!(j.history().len(), 6);
        assert!(j.advance(JobState::Failed).is_err());
    }

    #[test]
    fn skipping_or_going_back_is_rejected() {
        let mut j = job();
        assert!(j.advance(JobState::Scanning).is_err());
        j.advance(JobState::Purging).unwrap();
        assert!(j.advance(JobState::Detected).is_err());
        assert_eq!(j.state(), JobState::Purging);
    }

    #[test]
    fn fail_is_terminal() {
        let mut j = job();
        j.advance(JobState::Purging).unwrap();
        j.fail();
        j.fail();
        assert_eq!(j.history(), &[JobState::Detected, JobState::Purging, JobState::Failed]);
        assert!(j.advance(JobState::Scanning).is_err());
    }
}
