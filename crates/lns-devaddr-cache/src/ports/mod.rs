//! Port definitions for the DevAddr cache subsystem.

mod inbound;
mod outbound;

pub use inbound::{CacheSynchronisation, DeviceResolver};
pub use outbound::{
    DeviceKey, DeviceRegistry, DeviceTwin, KeyValueStore, KvError, RegistryError, TwinPage,
};
