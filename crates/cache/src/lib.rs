//! Concurrent in-memory cache of order aggregates.
//!
//! - [`OrderCache`]: reader/writer-locked map from order id to order
//! - [`CacheMetrics`]: hit/miss counters snapshot

pub mod order_cache;
pub mod stats;

pub use order_cache::OrderCache;
pub use stats::CacheMetrics;
