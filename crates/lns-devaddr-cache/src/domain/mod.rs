//! Domain layer: cache records and bucket merge rules.

mod entities;
mod merge;

pub use entities::{Bucket, DevAddrCacheInfo, IoTHubDeviceInfo};
pub use merge::{merge_bucket, RetainPolicy};
