//! Audio Cache - A capacity-bounded cache for decoded audio segments
//!
//! Provides size-aware LRU eviction, deduplicated lazy loading with chunked
//! assembly, and timer-driven memory pressure cleanup.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod models;
pub mod tasks;

pub use config::Config;
pub use engine::AudioCache;
pub use error::{CacheError, Result};
pub use loader::{LoadOptions, SegmentSource};
pub use models::SampleBuffer;
