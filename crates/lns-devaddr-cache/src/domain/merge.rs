//! # Bucket Merge Rules
//!
//! Pure reconciliation of one cached bucket against the set of entries a
//! sync pass derived from the registry. The rules protect lazily-fetched
//! credentials: a `PrimaryKey` survives only while the registry timestamp
//! proves the twin has not moved underneath it.

use crate::domain::entities::Bucket;

/// What to do with cached entries the incoming set does not mention.
///
/// A full reload saw the whole registry, so an unmentioned entry is gone
/// for real. A delta only saw recent changes and must not destroy what it
/// did not observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetainPolicy {
    /// Full reload: unmentioned entries are discarded.
    DiscardUnseen,
    /// Delta reload: unmentioned entries are retained.
    RetainUnseen,
}

/// Merge `incoming` entries into a copy of `existing`, field by field.
///
/// Per entry (keyed by DevEui):
/// - timestamps equal → the cached `PrimaryKey` is carried over; every
///   other field comes from the incoming record;
/// - timestamps differ → the incoming record wins and the `PrimaryKey` is
///   cleared, to be re-fetched lazily;
/// - entry is new → inserted as given, without a `PrimaryKey`.
///
/// A cached negative entry is dropped as soon as the incoming set names any
/// real device for the bucket, whatever the retain policy: the registry
/// answer it memoised is no longer true.
pub fn merge_bucket(existing: &Bucket, incoming: Bucket, policy: RetainPolicy) -> Bucket {
    let has_incoming_devices = incoming.values().any(|info| !info.is_negative());

    let mut merged = Bucket::with_capacity(incoming.len());
    for (field, mut info) in incoming {
        info.primary_key = match existing.get(&field) {
            Some(cached) if cached.last_updated == info.last_updated => {
                cached.primary_key.clone()
            }
            _ => None,
        };
        merged.insert(field, info);
    }

    if policy == RetainPolicy::RetainUnseen {
        for (field, cached) in existing {
            if merged.contains_key(field) {
                continue;
            }
            if cached.is_negative() && has_incoming_devices {
                continue;
            }
            merged.insert(field.clone(), cached.clone());
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::DevAddrCacheInfo;
    use chrono::{Duration, TimeZone, Utc};
    use shared_lorawan::{DevAddr, DevEui};

    const ADDR: DevAddr = DevAddr(0x0123_ABCD);

    fn cached(eui: u64, key: Option<&str>) -> DevAddrCacheInfo {
        DevAddrCacheInfo {
            dev_eui: Some(DevEui(eui)),
            dev_addr: ADDR,
            gateway_id: "old-gw".to_string(),
            nwk_s_key: "old-key".to_string(),
            primary_key: key.map(str::to_string),
            last_updated: Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap(),
        }
    }

    fn incoming(eui: u64) -> DevAddrCacheInfo {
        DevAddrCacheInfo {
            dev_eui: Some(DevEui(eui)),
            dev_addr: ADDR,
            gateway_id: "new-gw".to_string(),
            nwk_s_key: "new-key".to_string(),
            primary_key: None,
            last_updated: Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap(),
        }
    }

    fn bucket(entries: Vec<DevAddrCacheInfo>) -> Bucket {
        entries
            .into_iter()
            .map(|info| (info.hash_field(), info))
            .collect()
    }

    #[test]
    fn test_equal_timestamp_preserves_primary_key() {
        let existing = bucket(vec![cached(1, Some("secret"))]);
        let merged = merge_bucket(&existing, bucket(vec![incoming(1)]), RetainPolicy::DiscardUnseen);

        let entry = &merged[&DevEui(1).to_string()];
        assert_eq!(entry.primary_key.as_deref(), Some("secret"));
        // Everything else comes from the registry.
        assert_eq!(entry.gateway_id, "new-gw");
        assert_eq!(entry.nwk_s_key, "new-key");
    }

    #[test]
    fn test_newer_timestamp_clears_primary_key() {
        let existing = bucket(vec![cached(1, Some("secret"))]);
        let mut newer = incoming(1);
        newer.last_updated += Duration::minutes(3);

        let merged = merge_bucket(&existing, bucket(vec![newer]), RetainPolicy::DiscardUnseen);

        let entry = &merged[&DevEui(1).to_string()];
        assert_eq!(entry.primary_key, None);
        assert_eq!(entry.gateway_id, "new-gw");
    }

    #[test]
    fn test_new_entry_inserted_without_key() {
        let merged = merge_bucket(&Bucket::new(), bucket(vec![incoming(9)]), RetainPolicy::RetainUnseen);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[&DevEui(9).to_string()].primary_key, None);
    }

    #[test]
    fn test_full_reload_discards_unseen_entries() {
        let existing = bucket(vec![cached(1, Some("secret")), cached(2, None)]);
        let merged = merge_bucket(&existing, bucket(vec![incoming(1)]), RetainPolicy::DiscardUnseen);

        assert_eq!(merged.len(), 1);
        assert!(merged.contains_key(&DevEui(1).to_string()));
    }

    #[test]
    fn test_delta_reload_retains_unseen_entries() {
        let existing = bucket(vec![cached(1, Some("secret")), cached(2, Some("other"))]);
        let merged = merge_bucket(&existing, bucket(vec![incoming(1)]), RetainPolicy::RetainUnseen);

        assert_eq!(merged.len(), 2);
        let untouched = &merged[&DevEui(2).to_string()];
        assert_eq!(untouched.primary_key.as_deref(), Some("other"));
        assert_eq!(untouched.gateway_id, "old-gw");
    }

    #[test]
    fn test_incoming_device_evicts_negative_entry() {
        let existing = bucket(vec![DevAddrCacheInfo::negative(ADDR)]);
        let merged = merge_bucket(&existing, bucket(vec![incoming(1)]), RetainPolicy::RetainUnseen);

        assert_eq!(merged.len(), 1);
        assert!(!merged.values().any(|info| info.is_negative()));
    }

    #[test]
    fn test_empty_delta_keeps_negative_entry() {
        let existing = bucket(vec![DevAddrCacheInfo::negative(ADDR)]);
        let merged = merge_bucket(&existing, Bucket::new(), RetainPolicy::RetainUnseen);
        assert_eq!(merged.len(), 1);
        assert!(merged.values().all(|info| info.is_negative()));
    }
}
