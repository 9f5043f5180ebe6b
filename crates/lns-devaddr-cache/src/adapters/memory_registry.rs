//! In-memory device registry
//!
//! Fake implementation of the `DeviceRegistry` port with per-method call
//! counters, twin seeding, pagination and one-shot failure injection. This
//! is the strict-counting collaborator the coalescing and sync tests are
//! written against.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use shared_lorawan::{DevAddr, DevEui};

use crate::ports::{DeviceKey, DeviceRegistry, DeviceTwin, RegistryError, TwinPage};

/// Point-in-time view of how often each registry operation ran. Paginated
/// enumerations count once per query chain, not once per page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryCallCounts {
    pub get_device: u64,
    pub get_twin: u64,
    pub find_by_addr: u64,
    pub find_configured_devices: u64,
    pub find_by_last_update: u64,
}

/// Seedable fake registry.
#[derive(Default)]
pub struct InMemoryDeviceRegistry {
    twins: RwLock<HashMap<DevEui, DeviceTwin>>,
    primary_keys: RwLock<HashMap<DevEui, String>>,
    page_size: AtomicUsize,
    fail_next: AtomicBool,

    get_device_calls: AtomicU64,
    get_twin_calls: AtomicU64,
    find_by_addr_calls: AtomicU64,
    find_configured_calls: AtomicU64,
    find_by_last_update_calls: AtomicU64,
}

impl InMemoryDeviceRegistry {
    /// Create an empty registry with a page size large enough that most
    /// tests see a single page.
    pub fn new() -> Self {
        let registry = Self::default();
        registry.page_size.store(50, Ordering::SeqCst);
        registry
    }

    /// Seed or overwrite a twin.
    pub fn add_twin(&self, twin: DeviceTwin) {
        self.twins.write().insert(twin.dev_eui, twin);
    }

    /// Remove a twin.
    pub fn remove_twin(&self, dev_eui: DevEui) {
        self.twins.write().remove(&dev_eui);
    }

    /// Set the credential `get_device` hands out for a device.
    pub fn set_primary_key(&self, dev_eui: DevEui, primary_key: &str) {
        self.primary_keys
            .write()
            .insert(dev_eui, primary_key.to_string());
    }

    /// Shrink the page size to force pagination.
    pub fn set_page_size(&self, page_size: usize) {
        self.page_size.store(page_size.max(1), Ordering::SeqCst);
    }

    /// Make the next registry call fail with `RegistryError::Unavailable`.
    pub fn fail_next_queries(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Snapshot of the per-method call counters.
    pub fn calls(&self) -> RegistryCallCounts {
        RegistryCallCounts {
            get_device: self.get_device_calls.load(Ordering::SeqCst),
            get_twin: self.get_twin_calls.load(Ordering::SeqCst),
            find_by_addr: self.find_by_addr_calls.load(Ordering::SeqCst),
            find_configured_devices: self.find_configured_calls.load(Ordering::SeqCst),
            find_by_last_update: self.find_by_last_update_calls.load(Ordering::SeqCst),
        }
    }

    fn check_injected_failure(&self) -> Result<(), RegistryError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }

    /// Page through a deterministically ordered twin selection.
    fn page(&self, mut selected: Vec<DeviceTwin>, continuation: Option<String>) -> TwinPage {
        selected.sort_by_key(|twin| twin.dev_eui);

        let offset = continuation
            .and_then(|token| token.parse::<usize>().ok())
            .unwrap_or(0);
        let page_size = self.page_size.load(Ordering::SeqCst);
        let end = (offset + page_size).min(selected.len());

        let twins = selected[offset.min(end)..end].to_vec();
        let continuation = (end < selected.len()).then(|| end.to_string());
        TwinPage {
            twins,
            continuation,
        }
    }
}

#[async_trait]
impl DeviceRegistry for InMemoryDeviceRegistry {
    async fn get_device(&self, dev_eui: DevEui) -> Result<DeviceKey, RegistryError> {
        self.get_device_calls.fetch_add(1, Ordering::SeqCst);
        self.check_injected_failure()?;

        if !self.twins.read().contains_key(&dev_eui) {
            return Err(RegistryError::DeviceNotFound { dev_eui });
        }
        Ok(DeviceKey {
            primary_key: self
                .primary_keys
                .read()
                .get(&dev_eui)
                .cloned()
                .unwrap_or_default(),
            assigned_iot_hub: "hub-0".to_string(),
        })
    }

    async fn get_twin(&self, dev_eui: DevEui) -> Result<DeviceTwin, RegistryError> {
        self.get_twin_calls.fetch_add(1, Ordering::SeqCst);
        self.check_injected_failure()?;

        self.twins
            .read()
            .get(&dev_eui)
            .cloned()
            .ok_or(RegistryError::DeviceNotFound { dev_eui })
    }

    async fn find_by_addr(
        &self,
        dev_addr: DevAddr,
        continuation: Option<String>,
    ) -> Result<TwinPage, RegistryError> {
        if continuation.is_none() {
            self.find_by_addr_calls.fetch_add(1, Ordering::SeqCst);
        }
        self.check_injected_failure()?;

        let selected = self
            .twins
            .read()
            .values()
            .filter(|twin| twin.dev_addr == Some(dev_addr))
            .cloned()
            .collect();
        Ok(self.page(selected, continuation))
    }

    async fn find_configured_devices(
        &self,
        continuation: Option<String>,
    ) -> Result<TwinPage, RegistryError> {
        if continuation.is_none() {
            self.find_configured_calls.fetch_add(1, Ordering::SeqCst);
        }
        self.check_injected_failure()?;

        let selected = self.twins.read().values().cloned().collect();
        Ok(self.page(selected, continuation))
    }

    async fn find_by_last_update(
        &self,
        since: DateTime<Utc>,
        continuation: Option<String>,
    ) -> Result<TwinPage, RegistryError> {
        if continuation.is_none() {
            self.find_by_last_update_calls.fetch_add(1, Ordering::SeqCst);
        }
        self.check_injected_failure()?;

        let selected = self
            .twins
            .read()
            .values()
            .filter(|twin| twin.last_updated >= since)
            .cloned()
            .collect();
        Ok(self.page(selected, continuation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn twin(eui: u64, addr: u32) -> DeviceTwin {
        DeviceTwin {
            dev_eui: DevEui(eui),
            dev_addr: Some(DevAddr(addr)),
            gateway_id: String::new(),
            nwk_s_key: String::new(),
            last_updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_find_by_addr_filters_and_counts_once() {
        let registry = InMemoryDeviceRegistry::new();
        registry.add_twin(twin(1, 0xAA));
        registry.add_twin(twin(2, 0xAA));
        registry.add_twin(twin(3, 0xBB));

        let page = registry.find_by_addr(DevAddr(0xAA), None).await.unwrap();
        assert_eq!(page.twins.len(), 2);
        assert!(page.continuation.is_none());
        assert_eq!(registry.calls().find_by_addr, 1);
    }

    #[tokio::test]
    async fn test_pagination_counts_a_query_chain_once() {
        let registry = InMemoryDeviceRegistry::new();
        registry.set_page_size(2);
        for eui in 0..5 {
            registry.add_twin(twin(eui, 0xAA));
        }

        let mut seen = 0;
        let mut continuation = None;
        loop {
            let page = registry
                .find_configured_devices(continuation)
                .await
                .unwrap();
            seen += page.twins.len();
            continuation = page.continuation;
            if continuation.is_none() {
                break;
            }
        }

        assert_eq!(seen, 5);
        assert_eq!(registry.calls().find_configured_devices, 1);
    }

    #[tokio::test]
    async fn test_failure_injection_is_one_shot() {
        let registry = InMemoryDeviceRegistry::new();
        registry.add_twin(twin(1, 0xAA));
        registry.fail_next_queries();

        assert!(registry.find_by_addr(DevAddr(0xAA), None).await.is_err());
        assert!(registry.find_by_addr(DevAddr(0xAA), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_device_requires_known_twin() {
        let registry = InMemoryDeviceRegistry::new();
        assert!(matches!(
            registry.get_device(DevEui(9)).await,
            Err(RegistryError::DeviceNotFound { .. })
        ));

        registry.add_twin(twin(9, 0xAA));
        registry.set_primary_key(DevEui(9), "pk");
        let key = registry.get_device(DevEui(9)).await.unwrap();
        assert_eq!(key.primary_key, "pk");
    }
}
