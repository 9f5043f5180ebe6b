//! # Device Getter
//!
//! Request-time resolver: given a DevAddr (plus the gateway the uplink came
//! through), return the candidate devices with their credentials, touching
//! the registry as little as possible.
//!
//! Empty-bucket misses are single-flight at two levels: a per-process
//! DashMap of async mutexes collapses concurrent tasks, and the per-DevAddr
//! KV lease collapses concurrent processes. Within one coalescing window a
//! miss costs the registry at most one `find_by_addr` per DevAddr and at
//! most one `get_device` per DevEui. Bucket hits skip the gate; concurrent
//! hits on an entry still missing its credential may each re-fetch it, and
//! the last write wins (the fetches are idempotent, so this only costs a
//! spare registry round).

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use shared_lorawan::{DevAddr, DevNonce, StationEui};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::{Bucket, DevAddrCacheInfo, IoTHubDeviceInfo};
use crate::error::CacheError;
use crate::metrics::Metrics;
use crate::ports::{DeviceRegistry, DeviceResolver, KeyValueStore};
use crate::service::cache_store::DevAddrCacheStore;

/// Resolves DevAddrs to device lists, mediating cache and registry.
pub struct DeviceGetter<K: KeyValueStore, R: DeviceRegistry> {
    store: Arc<DevAddrCacheStore<K>>,
    registry: Arc<R>,
    metrics: Arc<Metrics>,
    /// Per-DevAddr gates collapsing concurrent misses inside this process.
    in_flight: DashMap<DevAddr, Arc<Mutex<()>>>,
}

impl<K: KeyValueStore, R: DeviceRegistry> DeviceGetter<K, R> {
    /// Create a getter over the shared store and registry.
    pub fn new(store: Arc<DevAddrCacheStore<K>>, registry: Arc<R>) -> Self {
        let metrics = store.metrics();
        Self {
            store,
            registry,
            metrics,
            in_flight: DashMap::new(),
        }
    }

    /// Resolve a non-empty bucket: filter by gateway, lazily fetch any
    /// missing credentials (one `get_device` per DevEui, nothing else).
    async fn resolve_from_bucket(
        &self,
        bucket: Bucket,
        gateway_id: &str,
        dev_addr: DevAddr,
    ) -> Result<Vec<IoTHubDeviceInfo>, CacheError> {
        if bucket.values().all(DevAddrCacheInfo::is_negative) {
            self.metrics.negative_hits.fetch_add(1, Ordering::Relaxed);
            debug!(%dev_addr, "Negative cache hit");
            return Ok(Vec::new());
        }
        self.metrics.bucket_hits.fetch_add(1, Ordering::Relaxed);

        let mut candidates: Vec<DevAddrCacheInfo> = bucket
            .into_values()
            .filter(|info| !info.is_negative() && info.matches_gateway(gateway_id))
            .collect();

        for info in &mut candidates {
            if info.primary_key.is_some() {
                continue;
            }
            let Some(dev_eui) = info.dev_eui else {
                continue;
            };
            let device_key = self.registry.get_device(dev_eui).await?;
            info.primary_key = Some(device_key.primary_key);
            self.store.put_entry(info).await?;
            debug!(%dev_addr, %dev_eui, "Fetched missing credential into cache");
        }

        Ok(candidates
            .iter()
            .filter_map(DevAddrCacheInfo::to_device_info)
            .collect())
    }

    /// Miss path: coalesce with everyone else resolving the same DevAddr,
    /// then either run the registry query or pick up the winner's result.
    async fn resolve_via_registry(
        &self,
        gateway_id: &str,
        dev_addr: DevAddr,
    ) -> Result<Vec<IoTHubDeviceInfo>, CacheError> {
        let gate = self
            .in_flight
            .entry(dev_addr)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = gate.lock().await;

        // A sibling task may have populated the bucket while we queued.
        let bucket = self.store.get_bucket(dev_addr).await?;
        if !bucket.is_empty() {
            return self.resolve_from_bucket(bucket, gateway_id, dev_addr).await;
        }

        let config = self.store.config();
        let lease_name = DevAddrCacheStore::<K>::devaddr_lease_name(dev_addr);
        let deadline = Instant::now() + config.lock_wait_timeout;

        loop {
            if self
                .store
                .take_lease(&lease_name, config.devaddr_lease_ttl)
                .await?
            {
                // A previous holder may have finished between our bucket
                // read and this acquisition.
                let bucket = self.store.get_bucket(dev_addr).await?;
                let result = if bucket.is_empty() {
                    self.query_and_populate(gateway_id, dev_addr).await
                } else {
                    self.resolve_from_bucket(bucket, gateway_id, dev_addr).await
                };
                if let Err(release_error) = self.store.release_lease(&lease_name).await {
                    debug!(%dev_addr, %release_error, "Per-DevAddr lease release failed");
                }
                self.in_flight.remove(&dev_addr);
                return result;
            }

            // Another process owns the query; wait for its bucket.
            if Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(config.lock_poll_interval).await;

            let bucket = self.store.get_bucket(dev_addr).await?;
            if !bucket.is_empty() {
                return self.resolve_from_bucket(bucket, gateway_id, dev_addr).await;
            }
        }

        // The lease holder never delivered within the window. Query
        // directly rather than failing the uplink.
        debug!(%dev_addr, "Gave up waiting on per-DevAddr lease; querying registry");
        self.query_and_populate(gateway_id, dev_addr).await
    }

    /// The single registry round for a DevAddr: one `find_by_addr`, one
    /// entry written per twin, credentials fetched only for candidates that
    /// need them, a negative entry when the registry knows nothing.
    async fn query_and_populate(
        &self,
        gateway_id: &str,
        dev_addr: DevAddr,
    ) -> Result<Vec<IoTHubDeviceInfo>, CacheError> {
        let mut twins = Vec::new();
        let mut continuation = None;
        loop {
            let page = self.registry.find_by_addr(dev_addr, continuation).await?;
            twins.extend(page.twins);
            continuation = page.continuation;
            if continuation.is_none() {
                break;
            }
        }

        if twins.is_empty() {
            self.store.put_negative_entry(dev_addr).await?;
            info!(%dev_addr, "DevAddr unknown to registry; negative entry written");
            return Ok(Vec::new());
        }

        let mut result = Vec::new();
        for twin in &twins {
            let mut info = DevAddrCacheInfo::from_twin(twin, dev_addr);
            if info.matches_gateway(gateway_id) {
                let device_key = self.registry.get_device(twin.dev_eui).await?;
                info.primary_key = Some(device_key.primary_key);
            }
            self.store.put_entry(&info).await?;
            if info.matches_gateway(gateway_id) {
                result.extend(info.to_device_info());
            }
        }
        debug!(%dev_addr, devices = twins.len(), candidates = result.len(), "Bucket populated from registry");
        Ok(result)
    }
}

#[async_trait]
impl<K: KeyValueStore, R: DeviceRegistry> DeviceResolver for DeviceGetter<K, R> {
    async fn get_device_list(
        &self,
        station: Option<StationEui>,
        gateway_id: &str,
        dev_nonce: DevNonce,
        dev_addr: DevAddr,
    ) -> Result<Vec<IoTHubDeviceInfo>, CacheError> {
        debug!(?station, gateway_id, %dev_nonce, %dev_addr, "Resolving device list");

        let bucket = self.store.get_bucket(dev_addr).await?;
        if !bucket.is_empty() {
            return self.resolve_from_bucket(bucket, gateway_id, dev_addr).await;
        }

        self.metrics.bucket_misses.fetch_add(1, Ordering::Relaxed);
        self.resolve_via_registry(gateway_id, dev_addr).await
    }
}
