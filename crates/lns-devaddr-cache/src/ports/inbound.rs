//! Inbound Ports (Driving Ports)

use async_trait::async_trait;
use shared_lorawan::{DevAddr, DevNonce, StationEui};

use crate::domain::IoTHubDeviceInfo;
use crate::error::CacheError;
use crate::service::SyncOutcome;

/// Request-time resolution of a DevAddr to the devices that may own it,
/// with credentials. Called on join and on the first data frame seen for a
/// DevAddr.
#[async_trait]
pub trait DeviceResolver: Send + Sync {
    /// Resolve the candidate device list for one uplink.
    ///
    /// An empty list means "not our device" (negative-cache hit);
    /// operational failures come back as errors instead.
    async fn get_device_list(
        &self,
        station: Option<StationEui>,
        gateway_id: &str,
        dev_nonce: DevNonce,
        dev_addr: DevAddr,
    ) -> Result<Vec<IoTHubDeviceInfo>, CacheError>;
}

/// Cluster-coordinated reconciliation of the cache with the registry.
#[async_trait]
pub trait CacheSynchronisation: Send + Sync {
    /// Run whichever reload this node is entitled to, if any. Losing every
    /// lease race is a normal outcome, not an error.
    async fn perform_needed_syncs(&self) -> Result<SyncOutcome, CacheError>;
}
