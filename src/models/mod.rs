//! Data models for the audio cache
//!
//! This module defines the payload type held by the cache and the
//! serializable report types handed to external statistics consumers.

pub mod buffer;
pub mod memory;

// Re-export commonly used types
pub use buffer::{SampleBuffer, SegmentMetadata};
pub use memory::{
    MemoryAlert, MemoryTrend, MemoryUsageSnapshot, TrendDirection, TriggeredAction,
};
