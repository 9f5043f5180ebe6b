//! # Resolution Flows
//!
//! Device-list resolution against a shared store: cache misses that hit the
//! registry exactly once, negative caching for foreign DevAddrs, lazy
//! credential fetches, and the single-flight guarantee across tasks and
//! across simulated server processes.

use shared_lorawan::{DevAddr, DevNonce};

/// The DevAddr and DevNonce the scenario suite resolves.
pub const ADDR: DevAddr = DevAddr(0x2601_00AB);
pub const NONCE: DevNonce = DevNonce(0xABCD);
