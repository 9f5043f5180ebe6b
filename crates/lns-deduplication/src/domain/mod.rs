//! Domain layer: message keys, uplink requests and observation results.

mod keys;
mod requests;
mod result;

pub use keys::{DataMessageKey, JoinMessageKey, MessageKey};
pub use requests::{DataUplinkRequest, JoinUplinkRequest};
pub use result::ConcentratorDeduplicationResult;
