//! # Sync Flows
//!
//! Lease-guarded reconciliation across simulated server processes: who gets
//! to run the full reload, how deltas degrade when the full lease is held,
//! and how the merge rules treat credentials the device getter fetched
//! lazily in between.

use shared_lorawan::{DevAddr, DevNonce};

/// The DevAddr the sync scenarios revolve around.
pub const ADDR: DevAddr = DevAddr(0x2601_0077);
pub const NONCE: DevNonce = DevNonce(0x0042);
