//! # Deduplication Mode
//!
//! Per-device policy for cross-concentrator duplicates. The registry stores
//! the mode as a free-text twin tag, so parsing is case-insensitive.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::identifiers::DevEui;

/// What to do with an uplink that a different concentrator already relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeduplicationMode {
    /// Drop the duplicate entirely.
    #[default]
    Drop,
    /// Forward the duplicate upstream, marked as a duplicate.
    Mark,
    /// No strategy configured; duplicates are forwarded unmarked.
    None,
}

impl fmt::Display for DeduplicationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            DeduplicationMode::Drop => "Drop",
            DeduplicationMode::Mark => "Mark",
            DeduplicationMode::None => "None",
        };
        f.write_str(tag)
    }
}

impl FromStr for DeduplicationMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drop" => Ok(DeduplicationMode::Drop),
            "mark" => Ok(DeduplicationMode::Mark),
            "none" => Ok(DeduplicationMode::None),
            _ => Err(()),
        }
    }
}

/// The per-device view the deduplication subsystem needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub dev_eui: DevEui,
    pub deduplication: DeduplicationMode,
}

impl DeviceProfile {
    pub fn new(dev_eui: DevEui, deduplication: DeduplicationMode) -> Self {
        Self {
            dev_eui,
            deduplication,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing_is_case_insensitive() {
        assert_eq!("drop".parse(), Ok(DeduplicationMode::Drop));
        assert_eq!("MARK".parse(), Ok(DeduplicationMode::Mark));
        assert_eq!("None".parse(), Ok(DeduplicationMode::None));
        assert!("discard".parse::<DeduplicationMode>().is_err());
    }

    #[test]
    fn test_default_mode_is_drop() {
        assert_eq!(DeduplicationMode::default(), DeduplicationMode::Drop);
    }
}
