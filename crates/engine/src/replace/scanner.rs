//! Turning chunk-availability notifications into settlement detections.

use std::sync::Arc;

use crate::world::World;
use crate::world::position::{BlockPos, ChunkPos};

use super::blueprint::{Blueprint, BlueprintSet};
use super::config::ReplaceConfig;
use super::dedup::{ChunkRecord, DedupCache, DedupKey};
use super::detect::{self, SettlementMatch};

/// A newly claimed settlement, ready to become a job.
#[derive(Debug, Clone)]
pub struct Detection {
    pub center: BlockPos,
    pub key: DedupKey,
    pub blueprint: Arc<Blueprint>,
    pub matched: SettlementMatch,
    pub structure_id: String,
}

/// Inspect one chunk's structure records.
///
/// A chunk is inspected at most once per world lifetime. Every detection
/// returned has already claimed its dedup cell, so the same settlement seen
/// from a neighbouring chunk is dropped here.
pub fn inspect_chunk(
    world: &World,
    inspected: &ChunkRecord,
    dedup: &DedupCache,
    blueprints: &BlueprintSet,
    config: &ReplaceConfig,
    chunk: ChunkPos,
) -> Vec<Detection> {
    if inspected.is_inspected(chunk) || !world.has_chunk(chunk) {
        return Vec::new();
    }
    inspected.mark_inspected(chunk);

    let mut detections = Vec::new();
    for start in world.structure_starts(chunk) {
        if !start.valid {
            continue;
        }
        let Some(matched) = detect::identify(&start) else {
            continue;
        };
        if matched == SettlementMatch::Heuristic {
            if !config.accept_heuristic_matches {
                tracing::debug!(id = %start.id, "ignoring heuristic settlement match");
                continue;
            }
            tracing::warn!(
                id = %start.id,
                generator = %start.generator,
                "structure matched only by naming heuristic"
            );
        }

        let center = start.bounds.center();
        let key = dedup.key_for(center);
        let Some(blueprint) = blueprints.first() else {
            tracing::warn!(id = %start.id, "settlement detected but no blueprint is loaded");
            continue;
        };
        if !dedup.try_claim(key) {
            tracing::trace!(?key, "settlement already handled");
            continue;
        }

        tracing::info!(
            id = %start.id,
            x = center.x,
            y = center.y,
            z = center.z,
            "settlement detected"
        );
        detections.push(Detection {
            center,
            key,
            blueprint,
            matched,
            structure_id: start.id,
        });
    }
    detections
}
