//! # Uplink Flows
//!
//! Frame-level flows through the deduplication cache: a parsed frame comes
//! in from some station, gets a message key, and the dispatcher acts on the
//! classification. These tests drive the public surface exactly as the
//! dispatcher would, including the key-derivation step.

use shared_lorawan::{
    DataPayload, DevAddr, DevEui, DevNonce, FrameCounter, JoinEui, JoinRequestPayload, Mic,
};

/// The literal station EUIs the scenario suite uses.
pub const FIRST_STATION: &str = "11:11:11:11:11:11:11:11";
pub const SECOND_STATION: &str = "22:22:22:22:22:22:22:22";

/// A minimal data uplink: every key field zero, as in the scenario suite.
pub fn zero_data_payload() -> DataPayload {
    DataPayload {
        dev_eui: DevEui(0),
        dev_addr: DevAddr(0),
        fctrl: 0,
        fcnt: FrameCounter(0),
        fopts: Vec::new(),
        fport: None,
        frm_payload: Vec::new(),
        mic: Mic(0),
    }
}

/// A minimal join request: every key field zero.
pub fn zero_join_payload() -> JoinRequestPayload {
    JoinRequestPayload {
        join_eui: JoinEui(0),
        dev_eui: DevEui(0),
        dev_nonce: DevNonce(0),
        mic: Mic(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lns_deduplication::{
        ConcentratorDeduplication, ConcentratorDeduplicationResult, DataUplinkRequest,
        DeduplicationConfig, DuplicateDetection, JoinUplinkRequest, MessageKey,
    };
    use shared_lorawan::{DeduplicationMode, DeviceProfile, ParsedFrame, StationEui};

    fn station(text: &str) -> StationEui {
        text.parse().unwrap()
    }

    fn cache() -> ConcentratorDeduplication {
        ConcentratorDeduplication::new(DeduplicationConfig::default())
    }

    #[test]
    fn test_data_uplink_resubmitted_by_same_station() {
        let cache = cache();
        let device = DeviceProfile::new(DevEui(0), DeduplicationMode::Drop);
        let request = DataUplinkRequest::new(station(FIRST_STATION), zero_data_payload());

        assert_eq!(
            cache.check_duplicate_data(&request, &device),
            ConcentratorDeduplicationResult::NotDuplicate
        );
        assert_eq!(
            cache.check_duplicate_data(&request, &device),
            ConcentratorDeduplicationResult::DuplicateDueToResubmission
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_data_uplink_from_second_station_follows_device_mode() {
        for (mode, expected) in [
            (
                DeduplicationMode::Drop,
                ConcentratorDeduplicationResult::Duplicate,
            ),
            (
                DeduplicationMode::Mark,
                ConcentratorDeduplicationResult::SoftDuplicateDueToDeduplicationStrategy,
            ),
            (
                DeduplicationMode::None,
                ConcentratorDeduplicationResult::SoftDuplicateDueToDeduplicationStrategy,
            ),
        ] {
            let cache = cache();
            let device = DeviceProfile::new(DevEui(0), mode);

            let first = DataUplinkRequest::new(station(FIRST_STATION), zero_data_payload());
            let second = DataUplinkRequest::new(station(SECOND_STATION), zero_data_payload());

            cache.check_duplicate_data(&first, &device);
            assert_eq!(cache.check_duplicate_data(&second, &device), expected);

            // Whatever the mode, the first relay stays authoritative.
            let key = MessageKey::try_for_frame(&ParsedFrame::Data(zero_data_payload())).unwrap();
            assert_eq!(cache.first_seen_station(&key), Some(station(FIRST_STATION)));
        }
    }

    #[test]
    fn test_join_reobservations_always_duplicate() {
        let cache = cache();
        let first = JoinUplinkRequest::new(station(FIRST_STATION), zero_join_payload());
        let second = JoinUplinkRequest::new(station(SECOND_STATION), zero_join_payload());

        assert_eq!(
            cache.check_duplicate_join(&first),
            ConcentratorDeduplicationResult::NotDuplicate
        );
        assert_eq!(
            cache.check_duplicate_join(&first),
            ConcentratorDeduplicationResult::Duplicate
        );
        assert_eq!(
            cache.check_duplicate_join(&second),
            ConcentratorDeduplicationResult::Duplicate
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_payload_variations_share_one_key() {
        // Same key fields, different radio payloads: one cache entry.
        let cache = cache();
        let device = DeviceProfile::new(DevEui(0), DeduplicationMode::Drop);

        let mut variant = zero_data_payload();
        variant.fopts = vec![0x02, 0x30];
        variant.fport = Some(10);
        variant.frm_payload = vec![1, 2, 3];

        let first = DataUplinkRequest::new(station(FIRST_STATION), zero_data_payload());
        let second = DataUplinkRequest::new(station(FIRST_STATION), variant);

        cache.check_duplicate_data(&first, &device);
        assert_eq!(
            cache.check_duplicate_data(&second, &device),
            ConcentratorDeduplicationResult::DuplicateDueToResubmission
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_join_mic_variation_shares_one_key() {
        let cache = cache();

        let mut variant = zero_join_payload();
        variant.mic = Mic(0xFFFF_FFFF);

        cache.check_duplicate_join(&JoinUplinkRequest::new(
            station(FIRST_STATION),
            zero_join_payload(),
        ));
        let result = cache.check_duplicate_join(&JoinUplinkRequest::new(
            station(SECOND_STATION),
            variant,
        ));

        assert_eq!(result, ConcentratorDeduplicationResult::Duplicate);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_dispatcher_can_branch_on_classification() {
        // The upstream dispatcher forwards anything can_process() allows.
        let cache = cache();
        let device = DeviceProfile::new(DevEui(0), DeduplicationMode::Mark);

        let first = DataUplinkRequest::new(station(FIRST_STATION), zero_data_payload());
        let second = DataUplinkRequest::new(station(SECOND_STATION), zero_data_payload());

        let results = [
            cache.check_duplicate_data(&first, &device),
            cache.check_duplicate_data(&second, &device),
            cache.check_duplicate_data(&first, &device),
        ];

        let forwarded: Vec<bool> = results.iter().map(|r| r.can_process()).collect();
        assert_eq!(forwarded, [true, true, false]);
    }

    #[test]
    fn test_metrics_follow_the_flow() {
        let cache = cache();
        let device = DeviceProfile::new(DevEui(0), DeduplicationMode::Drop);
        let first = DataUplinkRequest::new(station(FIRST_STATION), zero_data_payload());
        let second = DataUplinkRequest::new(station(SECOND_STATION), zero_data_payload());

        cache.check_duplicate_data(&first, &device);
        cache.check_duplicate_data(&second, &device);
        cache.check_duplicate_data(&first, &device);

        let snapshot = cache.metrics().snapshot();
        assert_eq!(snapshot.checks, 3);
        assert_eq!(snapshot.first_seen, 1);
        assert_eq!(snapshot.duplicates, 1);
        assert_eq!(snapshot.resubmissions, 1);
    }
}
