//! # Concentrator Deduplication Cache
//!
//! Single-process, thread-safe cache of "first-seen station per message
//! key". Multiple stations with overlapping coverage relay the same frame
//! within a propagation window; the first relay wins and later relays are
//! classified against it.
//!
//! The per-key read-or-insert is linearisable: it goes through the DashMap
//! entry API, which holds the shard lock for the whole decision. Checks for
//! different keys proceed in parallel.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shared_lorawan::{DeduplicationMode, DeviceProfile, StationEui};
use tracing::{debug, trace};

use crate::config::DeduplicationConfig;
use crate::domain::{
    ConcentratorDeduplicationResult, DataMessageKey, DataUplinkRequest, JoinMessageKey,
    JoinUplinkRequest, MessageKey,
};
use crate::metrics::Metrics;
use crate::ports::DuplicateDetection;

/// Value stored per message key: who relayed it first and when it was last
/// observed (the TTL slides on every observation).
#[derive(Debug, Clone, Copy)]
struct SeenEntry {
    station_eui: StationEui,
    last_seen: Instant,
}

/// How one observation relates to the cache state.
enum Observation {
    First,
    SameStation,
    OtherStation,
}

/// Thread-safe in-process deduplication cache.
pub struct ConcentratorDeduplication {
    entries: DashMap<MessageKey, SeenEntry>,
    ttl: Duration,
    metrics: Arc<Metrics>,
}

impl ConcentratorDeduplication {
    /// Create a cache with the given configuration.
    pub fn new(config: DeduplicationConfig) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: config.cache_entry_ttl,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Metrics handle for this cache instance.
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Number of live (non-expired) keys.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.last_seen.elapsed() < self.ttl)
            .count()
    }

    /// Whether the cache holds no live keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The station recorded as first relay for a key, if the entry is live.
    pub fn first_seen_station(&self, key: &MessageKey) -> Option<StationEui> {
        self.entries
            .get(key)
            .filter(|entry| entry.last_seen.elapsed() < self.ttl)
            .map(|entry| entry.station_eui)
    }

    /// Drop entries whose sliding TTL elapsed.
    pub fn evict_expired(&self) {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.last_seen.elapsed() < ttl);
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            self.metrics.record_evictions(evicted as u64);
            trace!(evicted, remaining = self.entries.len(), "Evicted expired dedup entries");
        }
    }

    /// Linearisable read-or-insert for one key.
    ///
    /// An expired entry counts as absent: the current observation becomes
    /// the new first sighting and the previous station loses authority.
    fn observe(&self, key: MessageKey, station_eui: StationEui) -> Observation {
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.last_seen.elapsed() >= self.ttl {
                    *entry = SeenEntry {
                        station_eui,
                        last_seen: Instant::now(),
                    };
                    return Observation::First;
                }

                entry.last_seen = Instant::now();
                if entry.station_eui == station_eui {
                    Observation::SameStation
                } else {
                    Observation::OtherStation
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(SeenEntry {
                    station_eui,
                    last_seen: Instant::now(),
                });
                Observation::First
            }
        }
    }
}

impl DuplicateDetection for ConcentratorDeduplication {
    fn check_duplicate_data(
        &self,
        request: &DataUplinkRequest,
        device: &DeviceProfile,
    ) -> ConcentratorDeduplicationResult {
        let key = MessageKey::Data(DataMessageKey::for_payload(&request.payload));

        let result = match self.observe(key, request.station_eui) {
            Observation::First => ConcentratorDeduplicationResult::NotDuplicate,
            Observation::SameStation => {
                ConcentratorDeduplicationResult::DuplicateDueToResubmission
            }
            Observation::OtherStation => match device.deduplication {
                DeduplicationMode::Drop => ConcentratorDeduplicationResult::Duplicate,
                DeduplicationMode::Mark | DeduplicationMode::None => {
                    ConcentratorDeduplicationResult::SoftDuplicateDueToDeduplicationStrategy
                }
            },
        };

        self.metrics.record_check(result);
        debug!(
            dev_eui = %request.payload.dev_eui,
            fcnt = %request.payload.fcnt,
            station = %request.station_eui,
            result = %result,
            "Data uplink classified"
        );
        result
    }

    fn check_duplicate_join(
        &self,
        request: &JoinUplinkRequest,
    ) -> ConcentratorDeduplicationResult {
        let key = MessageKey::Join(JoinMessageKey::for_payload(&request.payload));

        // Joins are binary: any repeated observation of the same key is a
        // duplicate join attempt, resubmitted or not.
        let result = match self.observe(key, request.station_eui) {
            Observation::First => ConcentratorDeduplicationResult::NotDuplicate,
            Observation::SameStation | Observation::OtherStation => {
                ConcentratorDeduplicationResult::Duplicate
            }
        };

        self.metrics.record_check(result);
        debug!(
            dev_eui = %request.payload.dev_eui,
            dev_nonce = %request.payload.dev_nonce,
            station = %request.station_eui,
            result = %result,
            "Join request classified"
        );
        result
    }
}

/// Background task that periodically evicts expired entries.
pub async fn cleanup_task(cache: Arc<ConcentratorDeduplication>, interval: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        cache.evict_expired();
    }
}
