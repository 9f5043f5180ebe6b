//! Service layer: the concentrator deduplication cache.

mod concentrator_dedup;

pub use concentrator_dedup::{cleanup_task, ConcentratorDeduplication};
