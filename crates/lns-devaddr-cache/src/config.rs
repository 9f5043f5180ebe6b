//! # DevAddr Cache Configuration

use std::time::Duration;

/// Configuration for the cache store, synchroniser and device getter.
#[derive(Clone, Debug)]
pub struct DevAddrCacheConfig {
    /// TTL of `fullUpdateKey` after a successful full reload. While it
    /// lives, no node starts another full reload.
    pub full_reload_lease_ttl: Duration,

    /// `fullUpdateKey` is shortened to at most this after a failed or
    /// cancelled full reload, so the retry happens quickly.
    pub full_reload_retry_ttl: Duration,

    /// TTL of `globalUpdateKey`, which serialises delta reloads and shields
    /// the registry from stampedes.
    pub global_lease_ttl: Duration,

    /// TTL of the per-DevAddr lease used to coalesce cache misses.
    pub devaddr_lease_ttl: Duration,

    /// How long a cache-miss loser waits for the winner to populate the
    /// bucket before falling back to its own registry query.
    pub lock_wait_timeout: Duration,

    /// Poll interval while waiting on a per-DevAddr lease.
    pub lock_poll_interval: Duration,

    /// TTL applied to every `devAddrTable:` bucket on write. Buckets are
    /// never deleted individually; this is how stale ones age out.
    pub bucket_ttl: Duration,
}

impl Default for DevAddrCacheConfig {
    fn default() -> Self {
        Self {
            full_reload_lease_ttl: Duration::from_secs(24 * 60 * 60),
            full_reload_retry_ttl: Duration::from_secs(60),
            global_lease_ttl: Duration::from_secs(5 * 60),
            devaddr_lease_ttl: Duration::from_secs(10),
            lock_wait_timeout: Duration::from_secs(10),
            lock_poll_interval: Duration::from_millis(100),
            bucket_ttl: Duration::from_secs(48 * 60 * 60),
        }
    }
}

impl DevAddrCacheConfig {
    /// Create a config for testing (smaller values).
    pub fn for_testing() -> Self {
        Self {
            full_reload_lease_ttl: Duration::from_secs(60),
            full_reload_retry_ttl: Duration::from_secs(1),
            global_lease_ttl: Duration::from_secs(5),
            devaddr_lease_ttl: Duration::from_secs(2),
            lock_wait_timeout: Duration::from_millis(500),
            lock_poll_interval: Duration::from_millis(10),
            bucket_ttl: Duration::from_secs(120),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DevAddrCacheConfig::default();
        assert_eq!(config.full_reload_lease_ttl, Duration::from_secs(86_400));
        assert_eq!(config.full_reload_retry_ttl, Duration::from_secs(60));
        assert!(config.global_lease_ttl < config.full_reload_lease_ttl);
        assert!(config.lock_poll_interval < config.lock_wait_timeout);
    }
}
