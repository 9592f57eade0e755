//! Tunables for the replacement pipeline.
//!
//! Every budget and radius lives here with its default; a host config file
//! can override any subset (`#[serde(default)]`).

use serde::{Deserialize, Serialize};

use super::error::ReplaceError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaceConfig {
    /// Edge length (blocks) of the coarse dedup cell.
    pub dedup_cell_size: i64,
    /// Chunk-availability notifications inspected per tick (K).
    pub chunks_per_tick: usize,
    /// Jobs allowed between `Purging` and `Placing` at once (M).
    pub max_active_jobs: usize,
    /// Positions removed per active job per tick.
    pub removal_batch_size: usize,
    /// Half-extent of the box purged of living occupants.
    pub purge_radius: i64,
    /// Horizontal half-extent of the wide (structure-specific only) pass.
    pub wide_scan_radius: i64,
    /// Wide pass depth below the planned ground level.
    pub wide_scan_below: i64,
    /// Wide pass height above the planned ground level.
    pub wide_scan_above: i64,
    /// Extra blocks around the blueprint footprint cleared by the tight pass.
    pub footprint_padding: i64,
    /// Tight pass depth below the planned ground level.
    pub clear_below: i64,
    /// Tight pass height above the planned ground level (at least the
    /// blueprint height is always cleared).
    pub clear_height: i64,
    /// Distance between ground samples across the footprint.
    pub ground_sample_stride: i64,
    /// Elevation each ground sample starts scanning down from.
    pub ground_scan_top: i64,
    /// Lowest elevation a ground sample may resolve to.
    pub ground_scan_floor: i64,
    /// Sample spread (max - min) above which the reference is biased upward.
    pub uneven_spread_threshold: i64,
    /// Largest upward bias applied on uneven terrain.
    pub uneven_max_bias: i64,
    /// Ground level used when no sample resolves.
    pub fallback_elevation: i64,
    /// Classification worker threads; 0 means half the available
    /// parallelism (at least one).
    pub worker_threads: usize,
    /// Accept structures matched only by the naming heuristic.
    pub accept_heuristic_matches: bool,
}

impl Default for ReplaceConfig {
    fn default() -> Self {
        Self {
            dedup_cell_size: 8,
            chunks_per_tick: 5,
            max_active_jobs: 2,
            removal_batch_size: 500,
            purge_radius: 64,
            wide_scan_radius: 64,
            wide_scan_below: 5,
            wide_scan_above: 15,
            footprint_padding: 25,
            clear_below: 2,
            clear_height: 50,
            ground_sample_stride: 3,
            ground_scan_top: 160,
            ground_scan_floor: 40,
            uneven_spread_threshold: 6,
            uneven_max_bias: 3,
            fallback_elevation: 64,
            worker_threads: 0,
            accept_heuristic_matches: true,
        }
    }
}

impl ReplaceConfig {
    /// Reject settings that would stall the pipeline or divide by zero.
    pub fn validate(&self) -> Result<(), ReplaceError> {
        let positive = [
            ("dedup_cell_size", self.dedup_cell_size),
            ("ground_sample_stride", self.ground_sample_stride),
            ("chunks_per_tick", self.chunks_per_tick as i64),
            ("max_active_jobs", self.max_active_jobs as i64),
            ("removal_batch_size", self.removal_batch_size as i64),
        ];
        for (name, value) in positive {
            if value <= 0 {
                return Err(ReplaceError::Config(format!("{name} must be positive, got {value}")));
            }
        }
        if self.ground_scan_floor >= self.ground_scan_top {
            return Err(ReplaceError::Config(format!(
                "ground_scan_floor ({}) must be below ground_scan_top ({})",
                self.ground_scan_floor, self.ground_scan_top
            )));
        }
        Ok(())
    }

    /// Resolved size of the classification worker pool.
    pub fn worker_threads(&self) -> usize {
        if self.worker_threads > 0 {
            return self.worker_threads;
        }
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        (available / 2).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        ReplaceConfig::default().validate().unwrap();
        assert!(ReplaceConfig::default().worker_threads() >= 1);
    }

    #[test]
    fn zero_budget_is_rejected() {
        let config = ReplaceConfig {
            max_active_jobs: 0,
            ..ReplaceConfig::default()
        };
        assert!(matches!(config.validate(), Err(ReplaceError::Config(_))));
    }

    #[test]
    fn explicit_worker_count_wins() {
        let config = ReplaceConfig {
            worker_threads: 3,
            ..ReplaceConfig::default()
        };
        assert_eq!(config.worker_threads(), 3);
    }
}
