//! # Integration Tests Crate
//!
//! Cross-subsystem tests exercising the deduplication cache and the DevAddr
//! cache together with their in-memory adapters, the way a running network
//! server wires them.
//!
//! ## Structure
//!
//! ```text
//! integration-tests/
//! └── src/
//!     ├── lib.rs              # This file + shared fixtures
//!     ├── uplink_flows.rs     # Frame → dedup classification flows
//!     ├── resolution_flows.rs # DevAddr resolution, coalescing, negatives
//!     └── sync_flows.rs       # Lease-guarded full/delta reconciliation
//! ```
//!
//! ## What "integration" means here
//!
//! - Multiple service instances share one in-memory KV store, simulating
//!   several network-server processes behind the same Redis.
//! - The fake registry counts every call, so the stampede-protection
//!   assertions ("exactly one `find_by_addr` for N concurrent misses") are
//!   exact, not probabilistic.

pub mod resolution_flows;
pub mod sync_flows;
pub mod uplink_flows;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use lns_devaddr_cache::{
    DevAddrCacheConfig, DevAddrCacheStore, DeviceGetter, DeviceTwin, InMemoryDeviceRegistry,
    InMemoryKeyValueStore, RegistrySynchroniser,
};
use shared_lorawan::{DevAddr, DevEui};

/// One simulated network-server process: its own store wrapper, getter and
/// synchroniser, over a (possibly shared) KV store and registry.
pub struct ServerNode {
    pub store: Arc<DevAddrCacheStore<InMemoryKeyValueStore>>,
    pub getter: Arc<DeviceGetter<InMemoryKeyValueStore, InMemoryDeviceRegistry>>,
    pub sync: Arc<RegistrySynchroniser<InMemoryKeyValueStore, InMemoryDeviceRegistry>>,
}

impl ServerNode {
    /// Spin up a node against shared infrastructure.
    pub fn new(kv: Arc<InMemoryKeyValueStore>, registry: Arc<InMemoryDeviceRegistry>) -> Self {
        let store = Arc::new(DevAddrCacheStore::new(kv, DevAddrCacheConfig::for_testing()));
        let getter = Arc::new(DeviceGetter::new(Arc::clone(&store), Arc::clone(&registry)));
        let sync = Arc::new(RegistrySynchroniser::new(
            Arc::clone(&store),
            Arc::clone(&registry),
        ));
        Self {
            store,
            getter,
            sync,
        }
    }
}

/// A registry twin with the fields the flows care about.
pub fn twin(eui: u64, dev_addr: DevAddr, gateway: &str) -> DeviceTwin {
    DeviceTwin {
        dev_eui: DevEui(eui),
        dev_addr: Some(dev_addr),
        gateway_id: gateway.to_string(),
        nwk_s_key: String::new(),
        last_updated: Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap(),
    }
}
