//! # LoRaWAN Identifiers
//!
//! Fixed-width identifier newtypes. All of them are little-endian on the
//! wire; the text form is the human convention (most significant byte
//! first), which is also what serde produces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing the text form of an identifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierParseError {
    #[error("Invalid EUI '{input}': expected 8 colon-separated hex octets")]
    InvalidEui { input: String },

    #[error("Invalid DevAddr '{input}': expected 8 hex digits")]
    InvalidDevAddr { input: String },
}

fn parse_eui(input: &str) -> Result<u64, IdentifierParseError> {
    let err = || IdentifierParseError::InvalidEui {
        input: input.to_string(),
    };

    let mut bytes = [0u8; 8];
    let mut count = 0;
    for part in input.split(':') {
        if count == 8 || part.len() != 2 {
            return Err(err());
        }
        bytes[count] = u8::from_str_radix(part, 16).map_err(|_| err())?;
        count += 1;
    }
    if count != 8 {
        return Err(err());
    }
    Ok(u64::from_be_bytes(bytes))
}

fn format_eui(value: u64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let bytes = value.to_be_bytes();
    write!(
        f,
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7]
    )
}

macro_rules! eui_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
            Serialize, Deserialize,
        )]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(pub u64);

        impl $name {
            /// Reconstruct from the wire (little-endian) byte order.
            pub fn from_le_bytes(bytes: [u8; 8]) -> Self {
                Self(u64::from_le_bytes(bytes))
            }

            /// Wire (little-endian) byte order.
            pub fn to_le_bytes(self) -> [u8; 8] {
                self.0.to_le_bytes()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                format_eui(self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = IdentifierParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_eui(s).map(Self)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdentifierParseError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.to_string()
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

eui_type! {
    /// 64-bit permanent device identity.
    DevEui
}

eui_type! {
    /// 64-bit join-server identity (AppEUI in older LoRaWAN revisions).
    JoinEui
}

eui_type! {
    /// 64-bit identity of a concentrator ("station") radio unit.
    StationEui
}

/// 32-bit dynamic device address. Not unique across devices or time;
/// multiple devices may hold the same DevAddr concurrently.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct DevAddr(pub u32);

impl DevAddr {
    /// Reconstruct from the wire (little-endian) byte order.
    pub fn from_le_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }

    /// Wire (little-endian) byte order.
    pub fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for DevAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

impl FromStr for DevAddr {
    type Err = IdentifierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 8 {
            return Err(IdentifierParseError::InvalidDevAddr {
                input: s.to_string(),
            });
        }
        u32::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| IdentifierParseError::InvalidDevAddr {
                input: s.to_string(),
            })
    }
}

impl TryFrom<String> for DevAddr {
    type Error = IdentifierParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DevAddr> for String {
    fn from(value: DevAddr) -> Self {
        value.to_string()
    }
}

impl From<u32> for DevAddr {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// 16-bit per-join nonce.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct DevNonce(pub u16);

impl From<u16> for DevNonce {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for DevNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

/// 32-bit message integrity code. Carried as an opaque key field here;
/// verification happens in the crypto layer, not in this workspace.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Mic(pub u32);

impl From<u32> for Mic {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Mic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

/// 16-bit uplink frame counter. The network-side counter is 32-bit; frames
/// carry the low 16 bits, which is also what message keys use.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct FrameCounter(pub u16);

impl From<u16> for FrameCounter {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for FrameCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
