//! # DevAddr Cache Store
//!
//! Typed wrapper over the distributed KV store. Owns the key layout:
//!
//! - `devAddrTable:<DevAddr>` — hash of `DevEui → DevAddrCacheInfo` (JSON);
//!   a single empty-field entry is the negative marker
//! - `fullUpdateKey` — long lease; a full reload ran recently or is running
//! - `globalUpdateKey` — short lease; a sync pass is running somewhere
//! - `<DevAddr>` — short per-address lease for cache-miss coalescing
//!
//! The store does no retrying and no interpretation beyond (de)serialising
//! records; coherence policy lives in the synchroniser and device getter.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use shared_lorawan::DevAddr;
use tracing::warn;

use crate::config::DevAddrCacheConfig;
use crate::domain::{Bucket, DevAddrCacheInfo};
use crate::error::CacheError;
use crate::metrics::Metrics;
use crate::ports::KeyValueStore;

/// Lease guarding full reloads; lives for the cool-down after a success.
pub const FULL_UPDATE_LEASE: &str = "fullUpdateKey";

/// Lease guarding any sync pass (delta or full).
pub const GLOBAL_UPDATE_LEASE: &str = "globalUpdateKey";

const DEVADDR_TABLE_PREFIX: &str = "devAddrTable:";

/// Typed cache store shared by the synchroniser and device getter.
pub struct DevAddrCacheStore<K: KeyValueStore> {
    kv: Arc<K>,
    config: DevAddrCacheConfig,
    metrics: Arc<Metrics>,
}

impl<K: KeyValueStore> DevAddrCacheStore<K> {
    /// Create a store over the given KV client.
    pub fn new(kv: Arc<K>, config: DevAddrCacheConfig) -> Self {
        Self {
            kv,
            config,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Metrics handle shared with the synchroniser and getter.
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// The configuration this store (and its consumers) run with.
    pub fn config(&self) -> &DevAddrCacheConfig {
        &self.config
    }

    /// KV key of the bucket for a DevAddr.
    pub fn bucket_key(dev_addr: DevAddr) -> String {
        format!("{DEVADDR_TABLE_PREFIX}{dev_addr}")
    }

    /// Inverse of [`Self::bucket_key`]; `None` for foreign keys.
    pub fn dev_addr_of_bucket_key(key: &str) -> Option<DevAddr> {
        key.strip_prefix(DEVADDR_TABLE_PREFIX)
            .and_then(|text| text.parse().ok())
    }

    /// Read a whole bucket. Fields whose JSON does not parse are skipped
    /// and counted; the next sync pass rewrites them.
    pub async fn get_bucket(&self, dev_addr: DevAddr) -> Result<Bucket, CacheError> {
        let raw = self.kv.hash_get_all(&Self::bucket_key(dev_addr)).await?;

        let mut bucket = Bucket::with_capacity(raw.len());
        for (field, value) in raw {
            match serde_json::from_str::<DevAddrCacheInfo>(&value) {
                Ok(info) => {
                    bucket.insert(field, info);
                }
                Err(error) => {
                    self.metrics
                        .malformed_entries_skipped
                        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    warn!(%dev_addr, field, %error, "Skipping malformed cache entry");
                }
            }
        }
        Ok(bucket)
    }

    /// Upsert one entry into its bucket and refresh the bucket TTL.
    pub async fn put_entry(&self, info: &DevAddrCacheInfo) -> Result<(), CacheError> {
        let key = Self::bucket_key(info.dev_addr);
        let value = serde_json::to_string(info)
            .expect("cache record serialises to JSON");
        self.kv.hash_set(&key, &info.hash_field(), &value).await?;
        self.kv.expire(&key, self.config.bucket_ttl).await?;
        Ok(())
    }

    /// Record "not our device" for a DevAddr.
    pub async fn put_negative_entry(&self, dev_addr: DevAddr) -> Result<(), CacheError> {
        self.put_entry(&DevAddrCacheInfo::negative(dev_addr)).await?;
        self.metrics
            .negative_entries_written
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(())
    }

    /// Atomically swap the entire contents of a bucket.
    pub async fn replace_bucket(&self, dev_addr: DevAddr, bucket: Bucket) -> Result<(), CacheError> {
        let entries = bucket
            .iter()
            .map(|(field, info)| {
                let value = serde_json::to_string(info)
                    .expect("cache record serialises to JSON");
                (field.clone(), value)
            })
            .collect();

        self.kv
            .hash_replace(
                &Self::bucket_key(dev_addr),
                entries,
                Some(self.config.bucket_ttl),
            )
            .await?;
        self.metrics
            .buckets_replaced
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(())
    }

    /// DevAddrs that currently have a bucket in the store.
    pub async fn bucket_addresses(&self) -> Result<Vec<DevAddr>, CacheError> {
        let keys = self.kv.scan_keys(DEVADDR_TABLE_PREFIX).await?;
        Ok(keys
            .iter()
            .filter_map(|key| Self::dev_addr_of_bucket_key(key))
            .collect())
    }

    /// Atomically acquire a named lease. Returns whether this caller owns
    /// it now.
    pub async fn take_lease(&self, name: &str, ttl: Duration) -> Result<bool, CacheError> {
        let acquired = self
            .kv
            .set_if_not_exists(name, &Utc::now().to_rfc3339(), ttl)
            .await?;
        Ok(acquired)
    }

    /// Take or refresh a lease unconditionally (used by the full reload to
    /// block delta passes while it runs).
    pub async fn force_lease(&self, name: &str, ttl: Duration) -> Result<(), CacheError> {
        self.kv
            .set(name, &Utc::now().to_rfc3339(), Some(ttl))
            .await?;
        Ok(())
    }

    /// Release a named lease.
    pub async fn release_lease(&self, name: &str) -> Result<(), CacheError> {
        self.kv.delete(name).await?;
        Ok(())
    }

    /// Remaining lifetime of a lease.
    pub async fn lease_time_to_live(&self, name: &str) -> Result<Option<Duration>, CacheError> {
        Ok(self.kv.time_to_live(name).await?)
    }

    /// Cap a lease's remaining lifetime at `max_ttl`. A lease that already
    /// expires sooner is left alone; a missing lease is a no-op.
    pub async fn shorten_lease(&self, name: &str, max_ttl: Duration) -> Result<(), CacheError> {
        match self.kv.time_to_live(name).await? {
            Some(current) if current <= max_ttl => Ok(()),
            _ => {
                self.kv.expire(name, max_ttl).await?;
                Ok(())
            }
        }
    }

    /// The per-DevAddr coalescing lease name.
    pub fn devaddr_lease_name(dev_addr: DevAddr) -> String {
        dev_addr.to_string()
    }
}
