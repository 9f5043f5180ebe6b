//! Error types for the DevAddr cache subsystem

use thiserror::Error;

use crate::ports::{KvError, RegistryError};

/// Errors surfaced by the cache store, synchroniser and device getter.
///
/// Lease contention is not represented here: a node that loses the race
/// simply skips its turn and the synchroniser reports that as a normal
/// outcome.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The distributed KV store raised. Never retried at this layer.
    #[error("Key-value store error: {0}")]
    Kv(#[from] KvError),

    /// The device registry raised. The caller decides whether to retry;
    /// no negative cache entry is written on this path.
    #[error("Device registry error: {0}")]
    Registry(#[from] RegistryError),
}
