//! Service layer: cache store, registry synchroniser and device getter.

mod cache_store;
mod device_getter;
mod sync_service;

pub use cache_store::{DevAddrCacheStore, FULL_UPDATE_LEASE, GLOBAL_UPDATE_LEASE};
pub use device_getter::DeviceGetter;
pub use sync_service::{RegistrySynchroniser, SyncOutcome};
