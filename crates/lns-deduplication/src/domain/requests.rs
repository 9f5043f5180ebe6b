//! Uplink requests: a parsed frame plus the station that relayed it.

use shared_lorawan::{DataPayload, JoinRequestPayload, StationEui};

/// A data uplink as relayed by one concentrator.
#[derive(Debug, Clone)]
pub struct DataUplinkRequest {
    pub station_eui: StationEui,
    pub payload: DataPayload,
}

impl DataUplinkRequest {
    pub fn new(station_eui: StationEui, payload: DataPayload) -> Self {
        Self {
            station_eui,
            payload,
        }
    }
}

/// A join request as relayed by one concentrator.
#[derive(Debug, Clone)]
pub struct JoinUplinkRequest {
    pub station_eui: StationEui,
    pub payload: JoinRequestPayload,
}

impl JoinUplinkRequest {
    pub fn new(station_eui: StationEui, payload: JoinRequestPayload) -> Self {
        Self {
            station_eui,
            payload,
        }
    }
}
