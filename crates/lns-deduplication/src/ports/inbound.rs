//! Inbound Port (Driving Port)
//!
//! The API the uplink dispatcher calls for every data frame and join
//! request before anything is forwarded upstream.

use shared_lorawan::DeviceProfile;

use crate::domain::{ConcentratorDeduplicationResult, DataUplinkRequest, JoinUplinkRequest};

/// Duplicate classification of uplink observations.
///
/// Both calls complete synchronously; the cache is process-local and never
/// touches the network.
pub trait DuplicateDetection: Send + Sync {
    /// Classify a data uplink. The device profile supplies the per-device
    /// deduplication strategy used for cross-station duplicates.
    fn check_duplicate_data(
        &self,
        request: &DataUplinkRequest,
        device: &DeviceProfile,
    ) -> ConcentratorDeduplicationResult;

    /// Classify a join request. Joins have no per-device strategy: any
    /// repeated observation of the same key is a `Duplicate`.
    fn check_duplicate_join(&self, request: &JoinUplinkRequest)
        -> ConcentratorDeduplicationResult;
}
