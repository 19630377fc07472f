//! Cache Module
//!
//! Policy and behavior layered on the store: record TTLs and expiry, the
//! LRU image cache, the pending-action outbox, and the [`OfflineCache`]
//! facade that ties them together.

pub mod lifecycle;
mod lru;
mod offline;
mod outbox;
mod stats;


// Re-export public types
pub use lru::{eviction_target, plan_eviction, ImageCache, EVICTION_TARGET_PERCENT};
pub use offline::{CacheSettings, ImageSource, OfflineCache};
pub use outbox::Outbox;
pub use stats::CacheStats;
pub use crate::store::images::ImageMeta;
