//! # LNS DevAddr Cache
//!
//! Cluster-shared cache mapping LoRaWAN device addresses to the set of
//! devices that may own them, kept consistent with the authoritative device
//! registry through lock-guarded full and delta synchronisations.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): cache records and the bucket merge rules
//! - **Ports Layer** (`ports/`):
//!   - `KeyValueStore`: driven port for the distributed KV store
//!   - `DeviceRegistry`: driven port for the device registry
//!   - `DeviceResolver` / `CacheSynchronisation`: driving ports
//! - **Service Layer** (`service/`):
//!   - `DevAddrCacheStore`: typed wrapper over the KV store
//!   - `RegistrySynchroniser`: lease-guarded full/delta reloads
//!   - `DeviceGetter`: request-time resolver with single-flight cache-miss
//!     coalescing
//! - **Adapters Layer** (`adapters/`): in-memory reference implementations
//!   of both driven ports, used by single-process deployments and tests
//!
//! ## Coordination
//!
//! The KV store is the only cluster-shared state. Three leases coordinate
//! the nodes: `fullUpdateKey` (long; one full reload per cool-down),
//! `globalUpdateKey` (short; one delta or full pass at a time) and a
//! per-DevAddr lease that collapses concurrent cache misses into a single
//! registry query.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryDeviceRegistry, InMemoryKeyValueStore, RegistryCallCounts};
pub use config::DevAddrCacheConfig;
pub use domain::{merge_bucket, Bucket, DevAddrCacheInfo, IoTHubDeviceInfo, RetainPolicy};
pub use error::CacheError;
pub use metrics::{Metrics, MetricsSnapshot};
pub use ports::{
    CacheSynchronisation, DeviceKey, DeviceRegistry, DeviceResolver, DeviceTwin, KeyValueStore,
    KvError, RegistryError, TwinPage,
};
pub use service::{
    DevAddrCacheStore, DeviceGetter, RegistrySynchroniser, SyncOutcome, FULL_UPDATE_LEASE,
    GLOBAL_UPDATE_LEASE,
};
