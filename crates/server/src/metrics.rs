//! Lock-free pipeline counters.
//!
//! The tick loop feeds each `TickReport` in with a handful of `fetch_add`s;
//! snapshots are taken at the logger's own pace and never block a tick.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::time::{Duration, Instant};

use settlement_engine::replace::TickReport;

pub struct Metrics {
    // Monotonic counters
    ticks: AtomicU64,
    chunks_inspected: AtomicU64,
    jobs_detected: AtomicU64,
    jobs_admitted: AtomicU64,
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
    entities_purged: AtomicU64,
    blocks_removed: AtomicU64,
    blocks_placed: AtomicU64,
    tick_ns_sum: AtomicU64,

    // Tick duration histogram buckets
    hist_under_1ms: AtomicU64,
    hist_1_5ms: AtomicU64,
    hist_5_20ms: AtomicU64,
    hist_20_50ms: AtomicU64,
    hist_over_50ms: AtomicU64,

    started_at: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            chunks_inspected: AtomicU64::new(0),
            jobs_detected: AtomicU64::new(0),
            jobs_admitted: AtomicU64::new(0),
            jobs_completed: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
            entities_purged: AtomicU64::new(0),
            blocks_removed: AtomicU64::new(0),
            blocks_placed: AtomicU64::new(0),
            tick_ns_sum: AtomicU64::new(0),
            hist_under_1ms: AtomicU64::new(0),
            hist_1_5ms: AtomicU64::new(0),
            hist_5_20ms: AtomicU64::new(0),
            hist_20_50ms: AtomicU64::new(0),
            hist_over_50ms: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Called after every scheduler tick.
    pub fn record_tick(&self, report: &TickReport, duration: Duration) {
        self.ticks.fetch_add(1, Relaxed);
        self.chunks_inspected
            .fetch_add(report.chunks_inspected as u64, Relaxed);
        self.jobs_detected.fetch_add(report.jobs_detected as u64, Relaxed);
        self.jobs_admitted.fetch_add(report.jobs_admitted as u64, Relaxed);
        self.jobs_completed.fetch_add(report.completed() as u64, Relaxed);
        self.jobs_failed.fetch_add(report.failed() as u64, Relaxed);
        self.entities_purged
            .fetch_add(report.entities_purged as u64, Relaxed);
        self.blocks_removed.fetch_add(report.blocks_removed as u64, Relaxed);
        self.blocks_placed.fetch_add(report.blocks_placed as u64, Relaxed);
        self.tick_ns_sum
            .fetch_add(duration.as_nanos() as u64, Relaxed);

        let bucket = match duration.as_millis() {
            0 => &self.hist_under_1ms,
            1..=4 => &self.hist_1_5ms,
            5..=19 => &self.hist_5_20ms,
            20..=49 => &self.hist_20_50ms,
            _ => &self.hist_over_50ms,
        };
        bucket.fetch_add(1, Relaxed);
    }

    /// Read all counters into a serializable snapshot. Queue lengths are
    /// gauges owned by the scheduler, so the caller passes them in.
    pub fn snapshot(&self, pending_jobs: usize, active_jobs: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.started_at.elapsed().as_secs_f64(),
            ticks: self.ticks.load(Relaxed),
            chunks_inspected: self.chunks_inspected.load(Relaxed),
            jobs_detected: self.jobs_detected.load(Relaxed),
            jobs_admitted: self.jobs_admitted.load(Relaxed),
            jobs_completed: self.jobs_completed.load(Relaxed),
            jobs_failed: self.jobs_failed.load(Relaxed),
            entities_purged: self.entities_purged.load(Relaxed),
            blocks_removed: self.blocks_removed.load(Relaxed),
            blocks_placed: self.blocks_placed.load(Relaxed),
            tick_ns_sum: self.tick_ns_sum.load(Relaxed),
            pending_jobs,
            active_jobs,
            hist: [
                self.hist_under_1ms.load(Relaxed),
                self.hist_1_5ms.load(Relaxed),
                self.hist_5_20ms.load(Relaxed),
                self.hist_20_50ms.load(Relaxed),
                self.hist_over_50ms.load(Relaxed),
            ],
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable snapshot of all metrics at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: f64,
    pub ticks: u64,
    pub chunks_inspected: u64,
    pub jobs_detected: u64,
    pub jobs_admitted: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub entities_purged: u64,
    pub blocks_removed: u64,
    pub blocks_placed: u64,
    pub tick_ns_sum: u64,
    pub pending_jobs: usize,
    pub active_jobs: usize,
    /// Tick durations: [<1ms, 1-5ms, 5-20ms, 20-50ms, >50ms].
    pub hist: [u64; 5],
}

impl MetricsSnapshot {
    pub fn mean_tick(&self) -> Duration {
        if self.ticks == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.tick_ns_sum / self.ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_accumulate_and_bucket() {
        let metrics = Metrics::new();
        let report = TickReport {
            tick: 1,
            chunks_inspected: 5,
            jobs_detected: 1,
            blocks_removed: 500,
            ..TickReport::default()
        };
        metrics.record_tick(&report, Duration::from_micros(300));
        metrics.record_tick(&TickReport::default(), Duration::from_millis(7));
        metrics.record_tick(&TickReport::default(), Duration::from_millis(120));

        let snap = metrics.snapshot(3, 2);
        assert_eq!(snap.ticks, 3);
        assert_eq!(snap.chunks_inspected, 5);
        assert_eq!(snap.jobs_detected, 1);
        assert_eq!(snap.blocks_removed, 500);
        assert_eq!(snap.hist, [1, 0, 1, 0, 1]);
        assert_eq!((snap.pending_jobs, snap.active_jobs), (3, 2));
        assert!(snap.mean_tick() > Duration::from_millis(40));

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["blocks_removed"], 500);
    }
}
