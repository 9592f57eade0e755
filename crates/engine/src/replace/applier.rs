//! World mutation: batched removal, then blueprint placement.
//!
//! Only ever called from the tick thread.

use crate::world::World;
use crate::world::position::BlockPos;

use super::blueprint::Blueprint;
use super::classifier::ClassificationResult;
use super::error::ReplaceError;
use super::planner::PlacementPlan;

/// Drains one `ClassificationResult` across as many ticks as it takes.
///
/// The cursor only moves past a position once its removal succeeded, so
/// every position is issued exactly once unless a removal fails, which
/// fails the whole job.
#[derive(Debug)]
pub struct MutationApplier {
    result: ClassificationResult,
    cursor: usize,
}

impl MutationApplier {
    pub fn new(result: ClassificationResult) -> Self {
        Self { result, cursor: 0 }
    }

    /// Remove up to `batch` more positions. Returns the ones removed.
    pub fn drain_batch(&mut self, world: &World, batch: usize) -> Result<&[BlockPos], ReplaceError> {
        let start = self.cursor;
        let end = (start + batch).min(self.result.len());
        for &pos in &self.result.positions()[start..end] {
            world.remove_block(pos)?;
            self.cursor += 1;
        }
        Ok(&self.result.positions()[start..end])
    }

    pub fn removed(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.result.len() - self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.result.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlacementReport {
    pub written: usize,
    /// Air cells skipped because the destination was already air.
    pub skipped_air: usize,
}

/// Write `blueprint` at `plan.origin` in one pass.
///
/// Not resumable: an error leaves whatever was already written in place.
pub fn place_blueprint(
    world: &World,
    blueprint: &Blueprint,
    plan: &PlacementPlan,
) -> Result<PlacementReport, ReplaceError> {
    let mut report = PlacementReport::default();
    for cell in blueprint.cells() {
        let pos = plan
            .origin
            .offset(i64::from(cell.x), i64::from(cell.y), i64::from(cell.z));
        if cell.block.is_air() && world.block(pos)?.is_air() {
            report.skipped_air += 1;
            continue;
        }
        world.set_block(pos, cell.block)?;
        report.written += 1;
    }
    Ok(report)
}
