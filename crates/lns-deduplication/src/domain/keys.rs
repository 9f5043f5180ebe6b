//! # Message Key Derivation
//!
//! Canonical deduplication keys over parsed frames. Two frames are "the same
//! logical uplink" exactly when their key fields match byte-wise; everything
//! else in the frame (FOpts, FPort, payload, MIC for joins) is irrelevant.

use shared_lorawan::{DataPayload, DevEui, DevNonce, FrameCounter, JoinEui, JoinRequestPayload, Mic, ParsedFrame};

use crate::error::DeduplicationError;

/// Deduplication key of a data uplink: (DevEui, Mic, FCnt).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataMessageKey {
    pub dev_eui: DevEui,
    pub mic: Mic,
    pub fcnt: FrameCounter,
}

impl DataMessageKey {
    /// Derive the key from a parsed data uplink.
    pub fn for_payload(payload: &DataPayload) -> Self {
        Self {
            dev_eui: payload.dev_eui,
            mic: payload.mic,
            fcnt: payload.fcnt,
        }
    }
}

/// Deduplication key of a join request: (JoinEui, DevEui, DevNonce).
///
/// The MIC is deliberately not part of the key: a device retrying a join
/// with the same DevNonce is the same join attempt even if radio conditions
/// changed the captured MIC bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JoinMessageKey {
    pub join_eui: JoinEui,
    pub dev_eui: DevEui,
    pub dev_nonce: DevNonce,
}

impl JoinMessageKey {
    /// Derive the key from a parsed join request.
    pub fn for_payload(payload: &JoinRequestPayload) -> Self {
        Self {
            join_eui: payload.join_eui,
            dev_eui: payload.dev_eui,
            dev_nonce: payload.dev_nonce,
        }
    }
}

/// Either kind of message key. Data and join keys never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    Data(DataMessageKey),
    Join(JoinMessageKey),
}

impl MessageKey {
    /// Derive a key from any parsed frame.
    ///
    /// # Errors
    ///
    /// `DeduplicationError::UnsupportedFrameType` if the frame type carries
    /// no key fields (join accept).
    pub fn try_for_frame(frame: &ParsedFrame) -> Result<Self, DeduplicationError> {
        match frame {
            ParsedFrame::Data(payload) => Ok(MessageKey::Data(DataMessageKey::for_payload(payload))),
            ParsedFrame::JoinRequest(payload) => {
                Ok(MessageKey::Join(JoinMessageKey::for_payload(payload)))
            }
            ParsedFrame::JoinAccept(_) => Err(DeduplicationError::UnsupportedFrameType {
                frame_type: frame.frame_type(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_lorawan::{DevAddr, JoinAcceptPayload};

    fn data_payload() -> DataPayload {
        DataPayload {
            dev_eui: DevEui(0x0011_2233_4455_6677),
            dev_addr: DevAddr(0x2601_0000),
            fctrl: 0x80,
            fcnt: FrameCounter(42),
            fopts: vec![0x02],
            fport: Some(8),
            frm_payload: vec![0xDE, 0xAD],
            mic: Mic(0xCAFE_F00D),
        }
    }

    #[test]
    fn test_data_key_ignores_non_key_fields() {
        let base = data_payload();
        let key = DataMessageKey::for_payload(&base);

        let mut other = data_payload();
        other.dev_addr = DevAddr(0x2601_FFFF);
        other.fctrl = 0x00;
        other.fopts = vec![];
        other.fport = None;
        other.frm_payload = vec![1, 2, 3, 4, 5];
        assert_eq!(key, DataMessageKey::for_payload(&other));
    }

    #[test]
    fn test_data_key_depends_on_each_key_field() {
        let base = data_payload();
        let key = DataMessageKey::for_payload(&base);

        let mut changed = data_payload();
        changed.dev_eui = DevEui(1);
        assert_ne!(key, DataMessageKey::for_payload(&changed));

        let mut changed = data_payload();
        changed.mic = Mic(0);
        assert_ne!(key, DataMessageKey::for_payload(&changed));

        let mut changed = data_payload();
        changed.fcnt = FrameCounter(43);
        assert_ne!(key, DataMessageKey::for_payload(&changed));
    }

    #[test]
    fn test_join_key_ignores_mic() {
        let base = JoinRequestPayload {
            join_eui: JoinEui(10),
            dev_eui: DevEui(20),
            dev_nonce: DevNonce(30),
            mic: Mic(0x1111_1111),
        };
        let mut other = base.clone();
        other.mic = Mic(0x2222_2222);

        assert_eq!(
            JoinMessageKey::for_payload(&base),
            JoinMessageKey::for_payload(&other)
        );
    }

    #[test]
    fn test_join_key_depends_on_each_key_field() {
        let base = JoinRequestPayload {
            join_eui: JoinEui(10),
            dev_eui: DevEui(20),
            dev_nonce: DevNonce(30),
            mic: Mic(0),
        };
        let key = JoinMessageKey::for_payload(&base);

        let mut changed = base.clone();
        changed.join_eui = JoinEui(11);
        assert_ne!(key, JoinMessageKey::for_payload(&changed));

        let mut changed = base.clone();
        changed.dev_eui = DevEui(21);
        assert_ne!(key, JoinMessageKey::for_payload(&changed));

        let mut changed = base;
        changed.dev_nonce = DevNonce(31);
        assert_ne!(key, JoinMessageKey::for_payload(&changed));
    }

    #[test]
    fn test_join_accept_has_no_key() {
        let frame = ParsedFrame::JoinAccept(JoinAcceptPayload {
            dev_addr: DevAddr(1),
            mic: Mic(2),
        });
        assert_eq!(
            MessageKey::try_for_frame(&frame),
            Err(DeduplicationError::UnsupportedFrameType {
                frame_type: "join-accept"
            })
        );
    }

    #[test]
    fn test_data_and_join_keys_never_collide() {
        let data = MessageKey::try_for_frame(&ParsedFrame::Data(data_payload())).unwrap();
        let join = MessageKey::try_for_frame(&ParsedFrame::JoinRequest(JoinRequestPayload {
            join_eui: JoinEui(0),
            dev_eui: DevEui(0),
            dev_nonce: DevNonce(0),
            mic: Mic(0),
        }))
        .unwrap();
        assert_ne!(data, join);
    }
}
