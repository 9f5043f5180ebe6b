//! # LNS Telemetry
//!
//! Observability for LNS services: structured logging via `tracing` and a
//! Prometheus registry with the service-level counters operators watch.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lns_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     init_telemetry(&config).expect("telemetry init");
//!
//!     // tracing events now flow to stdout (pretty or JSON),
//!     // metrics are scraped from /metrics via gather_metrics()
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LNS_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `LNS_JSON_LOGS` | auto | JSON logs (on in containers) |
//! | `LNS_CONSOLE_OUTPUT` | `true` | Console output toggle |
//! | `LNS_METRICS_PORT` | `9100` | Prometheus scrape port |
//! | `LNS_NETWORK` | `production` | Deployment environment tag |

mod config;
mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    gather_metrics, register_metrics, DEDUP_RESULTS, DEVADDR_BUCKET_ENTRIES, DEVADDR_DELTA_RELOADS,
    DEVADDR_FULL_RELOADS, DEVADDR_STALE_BUCKETS, REGISTRY_CALLS,
};
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Telemetry initialisation errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Failed to register Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialise logging and register the metric families.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    init_tracing(config)?;
    register_metrics()?;
    Ok(())
}
