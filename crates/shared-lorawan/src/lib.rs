//! # Shared LoRaWAN Types
//!
//! Cross-subsystem LoRaWAN domain types for the LNS workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every identifier that crosses a subsystem
//!   boundary (deduplication, DevAddr cache, registry sync) is defined here.
//! - **Typed views, not parsing**: frame parsing happens upstream; this crate
//!   only defines the typed views of frames the subsystems consume.
//! - **Canonical text forms**: EUIs render colon-separated
//!   (`11:22:33:44:55:66:77:88`), DevAddrs as eight hex digits. The same
//!   forms are used for serde, logging and registry twin tags.

pub mod deduplication;
pub mod frames;
pub mod identifiers;

pub use deduplication::{DeduplicationMode, DeviceProfile};
pub use frames::{DataPayload, JoinAcceptPayload, JoinRequestPayload, ParsedFrame};
pub use identifiers::{
    DevAddr, DevEui, DevNonce, FrameCounter, IdentifierParseError, JoinEui, Mic, StationEui,
};
