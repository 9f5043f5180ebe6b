//! Metrics for the deduplication cache
//!
//! Thread-safe counters in the style used across the workspace: plain
//! atomics with a point-in-time snapshot, so a cache can be observed without
//! locking it.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::ConcentratorDeduplicationResult;

/// Metrics collector for one cache instance.
#[derive(Default)]
pub struct Metrics {
    /// Total classification calls (data + join).
    pub checks: AtomicU64,
    /// Observations that created a fresh entry.
    pub first_seen: AtomicU64,
    /// Same-station re-observations of data frames.
    pub resubmissions: AtomicU64,
    /// Cross-station duplicates dropped (`Drop` mode) and duplicate joins.
    pub duplicates: AtomicU64,
    /// Cross-station duplicates allowed through (`Mark`/`None` modes).
    pub soft_duplicates: AtomicU64,
    /// Entries removed by TTL eviction.
    pub evictions: AtomicU64,
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one classification outcome.
    pub fn record_check(&self, result: ConcentratorDeduplicationResult) {
        self.checks.fetch_add(1, Ordering::Relaxed);
        let counter = match result {
            ConcentratorDeduplicationResult::NotDuplicate => &self.first_seen,
            ConcentratorDeduplicationResult::DuplicateDueToResubmission => &self.resubmissions,
            ConcentratorDeduplicationResult::Duplicate => &self.duplicates,
            ConcentratorDeduplicationResult::SoftDuplicateDueToDeduplicationStrategy => {
                &self.soft_duplicates
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record entries removed by an eviction pass.
    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    /// Get a point-in-time snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            checks: self.checks.load(Ordering::Relaxed),
            first_seen: self.first_seen.load(Ordering::Relaxed),
            resubmissions: self.resubmissions.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            soft_duplicates: self.soft_duplicates.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time metrics snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub checks: u64,
    pub first_seen: u64,
    pub resubmissions: u64,
    pub duplicates: u64,
    pub soft_duplicates: u64,
    pub evictions: u64,
}
