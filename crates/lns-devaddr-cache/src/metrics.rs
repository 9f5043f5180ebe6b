//! Metrics for the DevAddr cache subsystem
//!
//! Atomic counters shared by the store, synchroniser and device getter.
//! The stale-bucket counter exists because full reloads deliberately leave
//! stale buckets to expire instead of deleting them; the counter makes that
//! policy observable.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for one cache instance.
#[derive(Default)]
pub struct Metrics {
    /// Bucket reads that found at least one live entry.
    pub bucket_hits: AtomicU64,
    /// Bucket reads that found nothing.
    pub bucket_misses: AtomicU64,
    /// Lookups answered by a negative entry.
    pub negative_hits: AtomicU64,
    /// Negative entries written after an empty registry answer.
    pub negative_entries_written: AtomicU64,
    /// Cached hash fields skipped because their JSON failed to parse.
    pub malformed_entries_skipped: AtomicU64,
    /// Completed full reloads.
    pub full_reloads: AtomicU64,
    /// Completed delta reloads.
    pub delta_reloads: AtomicU64,
    /// Sync attempts skipped because another node held the leases.
    pub syncs_skipped: AtomicU64,
    /// Buckets replaced by sync passes.
    pub buckets_replaced: AtomicU64,
    /// Stale buckets detected (and left to expire) during full reloads.
    pub stale_buckets_detected: AtomicU64,
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a point-in-time snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bucket_hits: self.bucket_hits.load(Ordering::Relaxed),
            bucket_misses: self.bucket_misses.load(Ordering::Relaxed),
            negative_hits: self.negative_hits.load(Ordering::Relaxed),
            negative_entries_written: self.negative_entries_written.load(Ordering::Relaxed),
            malformed_entries_skipped: self.malformed_entries_skipped.load(Ordering::Relaxed),
            full_reloads: self.full_reloads.load(Ordering::Relaxed),
            delta_reloads: self.delta_reloads.load(Ordering::Relaxed),
            syncs_skipped: self.syncs_skipped.load(Ordering::Relaxed),
            buckets_replaced: self.buckets_replaced.load(Ordering::Relaxed),
            stale_buckets_detected: self.stale_buckets_detected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time metrics snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub bucket_hits: u64,
    pub bucket_misses: u64,
    pub negative_hits: u64,
    pub negative_entries_written: u64,
    pub malformed_entries_skipped: u64,
    pub full_reloads: u64,
    pub delta_reloads: u64,
    pub syncs_skipped: u64,
    pub buckets_replaced: u64,
    pub stale_buckets_detected: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = Metrics::new();
        metrics.bucket_hits.fetch_add(2, Ordering::Relaxed);
        metrics.stale_buckets_detected.fetch_add(1, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.bucket_hits, 2);
        assert_eq!(snapshot.stale_buckets_detected, 1);
        assert_eq!(snapshot.full_reloads, 0);
    }
}
