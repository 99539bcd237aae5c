//! Cache Module
//!
//! Provides size-weighted in-memory caching with LRU eviction, idle-age
//! expiry, and frequency-based eviction for memory pressure.

mod entry;
mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use lru::RecencyList;
pub use stats::{CacheStats, CacheStatsSnapshot};
pub use store::{EvictionReport, EvictionStore};
