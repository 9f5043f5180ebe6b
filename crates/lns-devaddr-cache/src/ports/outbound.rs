//! Outbound Ports (Driven Ports)
//!
//! Capability interfaces for the two external collaborators of this
//! subsystem: the distributed key-value store and the device registry.
//! Both are consumed as traits so tests run against in-memory fakes and
//! deployments plug in the real clients.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_lorawan::{DevAddr, DevEui};
use thiserror::Error;

/// Errors from the key-value store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KvError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Distributed key-value store capability (string and hash primitives with
/// TTL, plus the atomic set-if-absent the leases are built on).
///
/// Implementations do not retry; every error surfaces to the caller.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a string key.
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Write a string key, with an optional expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), KvError>;

    /// Atomic "set if absent with expiry". Returns whether the key was set.
    async fn set_if_not_exists(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, KvError>;

    /// Delete a key. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, KvError>;

    /// Overwrite the expiry of an existing key. Returns false if the key
    /// does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, KvError>;

    /// Remaining lifetime of a key; `None` for missing keys and keys
    /// without an expiry.
    async fn time_to_live(&self, key: &str) -> Result<Option<Duration>, KvError>;

    /// Read all fields of a hash. Missing hashes read as empty.
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, KvError>;

    /// Upsert one field of a hash.
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), KvError>;

    /// Atomically replace the entire contents of a hash.
    async fn hash_replace(
        &self,
        key: &str,
        entries: HashMap<String, String>,
        ttl: Option<Duration>,
    ) -> Result<(), KvError>;

    /// List keys with the given prefix.
    async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>, KvError>;
}

/// Errors from the device registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Registry unavailable: {0}")]
    Unavailable(String),

    #[error("Device {dev_eui} not found")]
    DeviceNotFound { dev_eui: DevEui },
}

/// Registry-side representation of a device ("twin").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTwin {
    pub dev_eui: DevEui,
    /// Absent for devices that have not joined yet.
    pub dev_addr: Option<DevAddr>,
    /// Empty when the device is not pinned to a gateway.
    pub gateway_id: String,
    /// Empty for OTAA devices that have not joined.
    pub nwk_s_key: String,
    /// Registry-side last-modification timestamp.
    pub last_updated: DateTime<Utc>,
}

/// Credential material for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceKey {
    pub primary_key: String,
    pub assigned_iot_hub: String,
}

/// One page of a twin query. `continuation` is `None` on the last page.
#[derive(Debug, Clone, Default)]
pub struct TwinPage {
    pub twins: Vec<DeviceTwin>,
    pub continuation: Option<String>,
}

/// Device registry capability ("IoT hub registry manager").
///
/// All enumeration calls are paginated through opaque continuation tokens;
/// callers loop until `continuation` comes back `None`.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Fetch credential material for one device.
    async fn get_device(&self, dev_eui: DevEui) -> Result<DeviceKey, RegistryError>;

    /// Fetch the twin of one device.
    async fn get_twin(&self, dev_eui: DevEui) -> Result<DeviceTwin, RegistryError>;

    /// Enumerate twins currently holding the given DevAddr.
    async fn find_by_addr(
        &self,
        dev_addr: DevAddr,
        continuation: Option<String>,
    ) -> Result<TwinPage, RegistryError>;

    /// Enumerate every configured LoRa device (full reload).
    async fn find_configured_devices(
        &self,
        continuation: Option<String>,
    ) -> Result<TwinPage, RegistryError>;

    /// Enumerate twins modified since the given instant (delta reload).
    async fn find_by_last_update(
        &self,
        since: DateTime<Utc>,
        continuation: Option<String>,
    ) -> Result<TwinPage, RegistryError>;
}
