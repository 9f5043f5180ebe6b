//! # Parsed Frame Views
//!
//! Typed views of LoRaWAN uplink frames as handed over by the packet parser.
//! Parsing, MIC verification and payload decryption all happen upstream;
//! these structs only carry the fields downstream subsystems read.

use serde::{Deserialize, Serialize};

use crate::identifiers::{DevAddr, DevEui, DevNonce, FrameCounter, JoinEui, Mic};

/// A parsed confirmed/unconfirmed data uplink.
///
/// `dev_eui` is not a wire field of a data frame; it is resolved by device
/// matching before the frame reaches any subsystem in this workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPayload {
    pub dev_eui: DevEui,
    pub dev_addr: DevAddr,
    /// Raw FCtrl octet (ADR, ACK, FPending bits and FOpts length).
    pub fctrl: u8,
    pub fcnt: FrameCounter,
    /// MAC commands piggybacked in the frame header, at most 15 bytes.
    pub fopts: Vec<u8>,
    pub fport: Option<u8>,
    /// Encrypted application payload; opaque at this layer.
    pub frm_payload: Vec<u8>,
    pub mic: Mic,
}

/// A parsed OTAA join request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequestPayload {
    pub join_eui: JoinEui,
    pub dev_eui: DevEui,
    pub dev_nonce: DevNonce,
    pub mic: Mic,
}

/// A parsed join accept, as seen on the downlink path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinAcceptPayload {
    pub dev_addr: DevAddr,
    pub mic: Mic,
}

/// Any parsed frame the network server routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParsedFrame {
    Data(DataPayload),
    JoinRequest(JoinRequestPayload),
    JoinAccept(JoinAcceptPayload),
}

impl ParsedFrame {
    /// Human-readable frame type tag, used in logs and errors.
    pub fn frame_type(&self) -> &'static str {
        match self {
            ParsedFrame::Data(_) => "data",
            ParsedFrame::JoinRequest(_) => "join-request",
            ParsedFrame::JoinAccept(_) => "join-accept",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_type_tags() {
        let join = ParsedFrame::JoinRequest(JoinRequestPayload {
            join_eui: JoinEui(1),
            dev_eui: DevEui(2),
            dev_nonce: DevNonce(3),
            mic: Mic(4),
        });
        assert_eq!(join.frame_type(), "join-request");

        let accept = ParsedFrame::JoinAccept(JoinAcceptPayload {
            dev_addr: DevAddr(5),
            mic: Mic(6),
        });
        assert_eq!(accept.frame_type(), "join-accept");
    }
}
