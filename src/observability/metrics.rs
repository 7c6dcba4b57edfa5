//! Metrics registry
//!
//! - Counters only
//! - Monotonic increase
//! - Thread-safe but lock-minimal

use std::sync::atomic::{AtomicU64, Ordering};

/// Query pipeline counters
///
/// All counters use Relaxed atomics; a snapshot is not a consistent cut.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    queries_planned: AtomicU64,
    queries_rejected: AtomicU64,
    queries_executed: AtomicU64,
    queries_failed: AtomicU64,
    /// Native queries opened, one per branch
    branches_executed: AtomicU64,
    batch_gets: AtomicU64,
    records_merged: AtomicU64,
    duplicates_dropped: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_queries_planned(&self) {
        self.queries_planned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_rejected(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_failed(&self) {
        self.queries_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_branches_executed(&self, count: u64) {
        self.branches_executed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_batch_gets(&self) {
        self.batch_gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_records_merged(&self, count: u64) {
        self.records_merged.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_duplicates_dropped(&self, count: u64) {
        self.duplicates_dropped.fetch_add(count, Ordering::Relaxed);
    }

    /// Current values as a JSON object
    pub fn to_json(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"{{"queries_planned":{},"queries_rejected":{},"queries_executed":{},"queries_failed":{},"branches_executed":{},"batch_gets":{},"records_merged":{},"duplicates_dropped":{}}}"#,
            s.queries_planned,
            s.queries_rejected,
            s.queries_executed,
            s.queries_failed,
            s.branches_executed,
            s.batch_gets,
            s.records_merged,
            s.duplicates_dropped,
        )
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_planned: self.queries_planned.load(Ordering::Relaxed),
            queries_rejected: self.queries_rejected.load(Ordering::Relaxed),
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            queries_failed: self.queries_failed.load(Ordering::Relaxed),
            branches_executed: self.branches_executed.load(Ordering::Relaxed),
            batch_gets: self.batch_gets.load(Ordering::Relaxed),
            records_merged: self.records_merged.load(Ordering::Relaxed),
            duplicates_dropped: self.duplicates_dropped.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queries_planned: u64,
    pub queries_rejected: u64,
    pub queries_executed: u64,
    pub queries_failed: u64,
    pub branches_executed: u64,
    pub batch_gets: u64,
    pub records_merged: u64,
    pub duplicates_dropped: u64,
}
