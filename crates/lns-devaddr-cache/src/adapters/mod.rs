//! Adapters implementing the driven ports.
//!
//! Both adapters here are in-memory: enough for single-process deployments
//! and for every test in the workspace. Distributed deployments substitute
//! a real Redis client for `InMemoryKeyValueStore` and the IoT-hub registry
//! client for `InMemoryDeviceRegistry`; the ports are the contract.

mod memory_kv;
mod memory_registry;

pub use memory_kv::InMemoryKeyValueStore;
pub use memory_registry::{InMemoryDeviceRegistry, RegistryCallCounts};
