//! Error types for the audio cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the audio cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The external fetch callback for a segment failed.
    ///
    /// The cause is opaque to the cache; callers supplied it through
    /// [`SegmentSource`](crate::loader::SegmentSource).
    #[error("fetch failed for '{key}': {cause}")]
    FetchFailed {
        key: String,
        cause: anyhow::Error,
    },

    /// A load did not settle within the configured timeout.
    #[error("load timed out for '{key}' after {timeout_ms}ms")]
    LoadTimeout { key: String, timeout_ms: u64 },

    /// A fetch returned sample data inconsistent with its metadata
    /// (wrong channel count, short range, mismatched sample rate).
    #[error("malformed payload for '{key}': {reason}")]
    MalformedPayload { key: String, reason: String },

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the audio cache.
pub type Result<T> = std::result::Result<T, CacheError>;
