//! Error types for the deduplication subsystem

use thiserror::Error;

/// Errors that can occur while deriving a message key.
///
/// Deduplication itself is infallible once a frame is parsed; the only
/// failure mode is being handed a frame type that cannot carry a key, which
/// is a programming error in the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeduplicationError {
    #[error("Frame type '{frame_type}' carries no message key fields")]
    UnsupportedFrameType { frame_type: &'static str },
}
