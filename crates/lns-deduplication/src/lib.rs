//! # LNS Concentrator Deduplication
//!
//! Suppresses duplicate uplinks and join requests relayed by multiple
//! concentrators ("stations") that share coverage of a device.
//!
//! ## Architecture
//!
//! This crate follows the workspace's hexagonal layout:
//!
//! - **Domain Layer** (`domain/`): pure logic, no I/O
//!   - `DataMessageKey` / `JoinMessageKey`: canonical deduplication keys
//!   - `ConcentratorDeduplicationResult`: classification of an observation
//!   - `DataUplinkRequest` / `JoinUplinkRequest`: frame + receiving station
//! - **Ports Layer** (`ports/`): trait definitions
//!   - `DuplicateDetection`: driving port (inbound API)
//! - **Service Layer** (`service/`): orchestration
//!   - `ConcentratorDeduplication`: thread-safe in-process cache
//!
//! ## Invariants
//!
//! - Key equality depends only on (DevEui, Mic, FCnt) for data frames and
//!   (JoinEui, DevEui, DevNonce) for join requests; no other frame field
//!   participates.
//! - The first successful insertion for a key establishes the authoritative
//!   `StationEui` for the TTL window; duplicate observations never overwrite
//!   it.
//! - Joins never classify as `DuplicateDueToResubmission`; a resubmitting
//!   station gets a plain `Duplicate` back.

pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

pub use config::DeduplicationConfig;
pub use domain::{
    ConcentratorDeduplicationResult, DataMessageKey, DataUplinkRequest, JoinMessageKey,
    JoinUplinkRequest, MessageKey,
};
pub use error::DeduplicationError;
pub use metrics::{Metrics, MetricsSnapshot};
pub use ports::DuplicateDetection;
pub use service::ConcentratorDeduplication;
