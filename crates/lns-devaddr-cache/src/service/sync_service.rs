//! # Registry Synchroniser
//!
//! Reconciles the DevAddr cache with the authoritative registry. Two named
//! leases coordinate the cluster:
//!
//! - `fullUpdateKey`, long-lived: whichever node grabs it runs the full
//!   reload, then the lease's remaining TTL is the cool-down before anyone
//!   runs another one;
//! - `globalUpdateKey`, short-lived: serialises delta passes and is also
//!   held (forced) for the duration of a full reload so deltas cannot
//!   interleave with it.
//!
//! Every exit path funnels through one cleanup step: the global lease is
//! released, and a failed or cancelled full reload shortens `fullUpdateKey`
//! so the retry happens within a minute instead of a day.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use shared_lorawan::DevAddr;
use tracing::{debug, info, warn};

use crate::domain::{merge_bucket, Bucket, DevAddrCacheInfo, RetainPolicy};
use crate::error::CacheError;
use crate::metrics::Metrics;
use crate::ports::{CacheSynchronisation, DeviceRegistry, DeviceTwin, KeyValueStore};
use crate::service::cache_store::{DevAddrCacheStore, FULL_UPDATE_LEASE, GLOBAL_UPDATE_LEASE};

/// Which reload a `perform_needed_syncs` call ended up running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    FullReload,
    DeltaReload,
    /// Another node holds the leases; nothing to do here.
    Skipped,
}

/// Lease-guarded full/delta reconciliation of the cache.
pub struct RegistrySynchroniser<K: KeyValueStore, R: DeviceRegistry> {
    store: Arc<DevAddrCacheStore<K>>,
    registry: Arc<R>,
    metrics: Arc<Metrics>,
    /// Start instant of the last reload that completed on this node.
    /// Deltas query the registry for changes since this point.
    last_sync: RwLock<DateTime<Utc>>,
}

impl<K: KeyValueStore, R: DeviceRegistry> RegistrySynchroniser<K, R> {
    /// Create a synchroniser. Call [`Self::warm_up`] once before serving
    /// traffic; until then the delta watermark sits at the epoch and the
    /// first delta enumerates every twin ever updated.
    pub fn new(store: Arc<DevAddrCacheStore<K>>, registry: Arc<R>) -> Self {
        let metrics = store.metrics();
        Self {
            store,
            registry,
            metrics,
            last_sync: RwLock::new(DateTime::<Utc>::MIN_UTC),
        }
    }

    /// Initial cache population for this process: one ungated delta pass.
    ///
    /// This is a separate, explicit step (rather than hidden inside the
    /// constructor) so deployments control when the registry gets hit and
    /// observers can count it.
    pub async fn warm_up(&self) -> Result<(), CacheError> {
        let started = Utc::now();
        self.delta_reload().await?;
        *self.last_sync.write() = started;
        info!("DevAddr cache warm-up complete");
        Ok(())
    }

    /// The current delta watermark.
    pub fn last_sync(&self) -> DateTime<Utc> {
        *self.last_sync.read()
    }

    async fn run_full_reload(&self) -> Result<(), CacheError> {
        let started = Utc::now();
        let config = self.store.config();

        // Hold the global lease for the whole pass so no delta interleaves
        // with the bucket swaps.
        let body = async {
            self.store
                .force_lease(GLOBAL_UPDATE_LEASE, config.global_lease_ttl)
                .await?;
            self.full_reload().await
        };
        let result = body.await;

        let released = self.store.release_lease(GLOBAL_UPDATE_LEASE).await;
        match result {
            Ok(()) => {
                *self.last_sync.write() = started;
                self.metrics.full_reloads.fetch_add(1, Ordering::Relaxed);
                // A clean reload leaves fullUpdateKey at its long TTL.
                released?;
                Ok(())
            }
            Err(error) => {
                if let Err(release_error) = released {
                    warn!(%release_error, "Failed to release global update lease");
                }
                // Make the retry fast: cap the full-reload cool-down.
                if let Err(shorten_error) = self
                    .store
                    .shorten_lease(FULL_UPDATE_LEASE, config.full_reload_retry_ttl)
                    .await
                {
                    warn!(%shorten_error, "Failed to shorten full update lease");
                }
                Err(error)
            }
        }
    }

    async fn run_delta_reload(&self) -> Result<(), CacheError> {
        let started = Utc::now();
        let result = self.delta_reload().await;

        let released = self.store.release_lease(GLOBAL_UPDATE_LEASE).await;
        match result {
            Ok(()) => {
                *self.last_sync.write() = started;
                self.metrics.delta_reloads.fetch_add(1, Ordering::Relaxed);
                released?;
                Ok(())
            }
            Err(error) => {
                if let Err(release_error) = released {
                    warn!(%release_error, "Failed to release global update lease");
                }
                Err(error)
            }
        }
    }

    /// Enumerate every configured device and rebuild each mentioned bucket.
    async fn full_reload(&self) -> Result<(), CacheError> {
        let mut twins = Vec::new();
        let mut continuation = None;
        loop {
            let page = self.registry.find_configured_devices(continuation).await?;
            twins.extend(page.twins);
            continuation = page.continuation;
            if continuation.is_none() {
                break;
            }
        }

        let incoming = group_by_dev_addr(twins);
        info!(buckets = incoming.len(), "Full reload: registry enumerated");

        // Buckets the registry no longer mentions are left to expire via
        // their TTL; we only count them so the policy stays observable.
        for addr in self.store.bucket_addresses().await? {
            if !incoming.contains_key(&addr) {
                self.metrics
                    .stale_buckets_detected
                    .fetch_add(1, Ordering::Relaxed);
                debug!(dev_addr = %addr, "Stale DevAddr bucket left to expire");
            }
        }

        for (dev_addr, bucket) in incoming {
            let existing = self.store.get_bucket(dev_addr).await?;
            let merged = merge_bucket(&existing, bucket, RetainPolicy::DiscardUnseen);
            self.store.replace_bucket(dev_addr, merged).await?;
        }
        Ok(())
    }

    /// Apply registry changes since the delta watermark, bucket by bucket.
    async fn delta_reload(&self) -> Result<(), CacheError> {
        let since = *self.last_sync.read();

        let mut twins = Vec::new();
        let mut continuation = None;
        loop {
            let page = self.registry.find_by_last_update(since, continuation).await?;
            twins.extend(page.twins);
            continuation = page.continuation;
            if continuation.is_none() {
                break;
            }
        }

        let incoming = group_by_dev_addr(twins);
        debug!(%since, buckets = incoming.len(), "Delta reload: changed twins grouped");

        for (dev_addr, bucket) in incoming {
            let existing = self.store.get_bucket(dev_addr).await?;
            let merged = merge_bucket(&existing, bucket, RetainPolicy::RetainUnseen);
            self.store.replace_bucket(dev_addr, merged).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<K: KeyValueStore, R: DeviceRegistry> CacheSynchronisation for RegistrySynchroniser<K, R> {
    async fn perform_needed_syncs(&self) -> Result<SyncOutcome, CacheError> {
        let config = self.store.config();

        if self
            .store
            .take_lease(FULL_UPDATE_LEASE, config.full_reload_lease_ttl)
            .await?
        {
            info!("Acquired full update lease; running full reload");
            self.run_full_reload().await?;
            return Ok(SyncOutcome::FullReload);
        }

        if self
            .store
            .take_lease(GLOBAL_UPDATE_LEASE, config.global_lease_ttl)
            .await?
        {
            debug!("Acquired global update lease; running delta reload");
            self.run_delta_reload().await?;
            return Ok(SyncOutcome::DeltaReload);
        }

        self.metrics.syncs_skipped.fetch_add(1, Ordering::Relaxed);
        debug!("Sync leases held elsewhere; skipping");
        Ok(SyncOutcome::Skipped)
    }
}

/// Group twins into per-DevAddr buckets. Twins that have no DevAddr yet
/// (OTAA devices that never joined) do not belong in the cache.
fn group_by_dev_addr(twins: Vec<DeviceTwin>) -> HashMap<DevAddr, Bucket> {
    let mut grouped: HashMap<DevAddr, Bucket> = HashMap::new();
    for twin in twins {
        let Some(dev_addr) = twin.dev_addr else {
            continue;
        };
        let info = DevAddrCacheInfo::from_twin(&twin, dev_addr);
        grouped.entry(dev_addr).or_default().insert(info.hash_field(), info);
    }
    grouped
}
