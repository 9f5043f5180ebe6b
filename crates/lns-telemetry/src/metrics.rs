//! Prometheus metrics for LNS services.
//!
//! All metrics follow the naming convention: `lns_<subsystem>_<metric>_<unit>`.
//!
//! The counters mirror the per-instance atomic metrics the subsystem crates
//! keep; services bump both when they export to Prometheus. The stale-bucket
//! counter in particular exists because full reloads leave stale DevAddr
//! buckets to expire rather than deleting them, and that policy needs to be
//! visible on a dashboard.

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, Gauge, IntCounter, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Deduplication outcomes by result label
    pub static ref DEDUP_RESULTS: CounterVec = CounterVec::new(
        Opts::new(
            "lns_dedup_results_total",
            "Concentrator deduplication outcomes"
        ),
        &["result"] // not_duplicate, resubmission, duplicate, soft_duplicate
    )
    .expect("metric creation failed");

    /// Completed full reloads of the DevAddr cache
    pub static ref DEVADDR_FULL_RELOADS: IntCounter = IntCounter::new(
        "lns_devaddr_full_reloads_total",
        "Completed full reloads of the DevAddr cache"
    )
    .expect("metric creation failed");

    /// Completed delta reloads of the DevAddr cache
    pub static ref DEVADDR_DELTA_RELOADS: IntCounter = IntCounter::new(
        "lns_devaddr_delta_reloads_total",
        "Completed delta reloads of the DevAddr cache"
    )
    .expect("metric creation failed");

    /// Stale buckets detected during full reloads and left to expire
    pub static ref DEVADDR_STALE_BUCKETS: IntCounter = IntCounter::new(
        "lns_devaddr_stale_buckets_total",
        "Stale DevAddr buckets detected during full reloads (left to TTL)"
    )
    .expect("metric creation failed");

    /// Registry calls by method
    pub static ref REGISTRY_CALLS: CounterVec = CounterVec::new(
        Opts::new("lns_registry_calls_total", "Device registry calls"),
        &["method"] // get_device, find_by_addr, find_configured, find_by_last_update
    )
    .expect("metric creation failed");

    /// Entries currently cached across DevAddr buckets
    pub static ref DEVADDR_BUCKET_ENTRIES: Gauge = Gauge::new(
        "lns_devaddr_bucket_entries",
        "Entries currently cached across DevAddr buckets"
    )
    .expect("metric creation failed");
}

/// Register every metric family with the global registry.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(DEDUP_RESULTS.clone()),
        Box::new(DEVADDR_FULL_RELOADS.clone()),
        Box::new(DEVADDR_DELTA_RELOADS.clone()),
        Box::new(DEVADDR_STALE_BUCKETS.clone()),
        Box::new(REGISTRY_CALLS.clone()),
        Box::new(DEVADDR_BUCKET_ENTRIES.clone()),
    ];

    for collector in collectors {
        REGISTRY
            .register(collector)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }
    Ok(())
}

/// Encode the current metric values in the Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
