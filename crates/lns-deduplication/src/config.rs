//! # Deduplication Configuration

use std::time::Duration;

/// Configuration for the concentrator deduplication cache.
#[derive(Clone, Debug)]
pub struct DeduplicationConfig {
    /// Sliding lifetime of a cache entry. Sized to the maximum expected
    /// inter-station propagation delay with generous headroom.
    pub cache_entry_ttl: Duration,

    /// How often the background eviction pass runs.
    pub cleanup_interval: Duration,
}

impl Default for DeduplicationConfig {
    fn default() -> Self {
        Self {
            cache_entry_ttl: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(30),
        }
    }
}

impl DeduplicationConfig {
    /// Create a config for testing (smaller values).
    pub fn for_testing() -> Self {
        Self {
            cache_entry_ttl: Duration::from_millis(200),
            cleanup_interval: Duration::from_millis(50),
        }
    }
}
