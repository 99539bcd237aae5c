//! Segment Source Module
//!
//! Callback bundle describing how the host environment fetches one segment.
//! The cache never decodes audio itself; it drives these callbacks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::models::{SampleBuffer, SegmentMetadata};

/// Boxed future returned by payload fetch callbacks.
pub type FetchFuture =
    Pin<Box<dyn Future<Output = anyhow::Result<Option<SampleBuffer>>> + Send>>;

/// Boxed future returned by metadata fetch callbacks.
pub type MetadataFuture =
    Pin<Box<dyn Future<Output = anyhow::Result<Option<SegmentMetadata>>> + Send>>;

type FetchFn = Arc<dyn Fn() -> FetchFuture + Send + Sync>;
type RangeFetchFn = Arc<dyn Fn(SampleRange) -> FetchFuture + Send + Sync>;
type MetadataFetchFn = Arc<dyn Fn() -> MetadataFuture + Send + Sync>;

// == Sample Range ==
/// Half-open sample range `[start, start + len)` within a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRange {
    pub start: u64,
    pub len: u64,
}

// == Segment Source ==
/// How to fetch one segment from the host environment.
///
/// A whole-payload fetch is required. Range and metadata fetches are
/// optional capabilities: when the source supports them, chunked loading
/// fetches only what it needs; when it does not, the coordinator falls back
/// to fetching the whole payload once and slicing it.
#[derive(Clone)]
pub struct SegmentSource {
    fetch_fn: FetchFn,
    range_fn: Option<RangeFetchFn>,
    metadata_fn: Option<MetadataFetchFn>,
}

impl SegmentSource {
    // == Constructor ==
    /// Creates a source from a whole-payload fetch callback.
    ///
    /// Returning `Ok(None)` means the segment does not exist; errors mean
    /// the fetch itself failed.
    pub fn new<F, Fut>(fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<SampleBuffer>>> + Send + 'static,
    {
        Self {
            fetch_fn: Arc::new(move || Box::pin(fetch())),
            range_fn: None,
            metadata_fn: None,
        }
    }

    /// Adds a sub-range fetch capability.
    pub fn with_range_fetch<F, Fut>(mut self, fetch_range: F) -> Self
    where
        F: Fn(SampleRange) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<SampleBuffer>>> + Send + 'static,
    {
        self.range_fn = Some(Arc::new(move |range| Box::pin(fetch_range(range))));
        self
    }

    /// Adds a metadata fetch capability.
    pub fn with_metadata_fetch<F, Fut>(mut self, fetch_metadata: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<SegmentMetadata>>> + Send + 'static,
    {
        self.metadata_fn = Some(Arc::new(move || Box::pin(fetch_metadata())));
        self
    }

    // == Invocation ==
    /// Starts a whole-payload fetch.
    pub fn fetch(&self) -> FetchFuture {
        (self.fetch_fn)()
    }

    /// Starts a range fetch, when the source supports one.
    pub fn fetch_range(&self, range: SampleRange) -> Option<FetchFuture> {
        self.range_fn.as_ref().map(|f| f(range))
    }

    /// Starts a metadata fetch, when the source supports one.
    pub fn fetch_metadata(&self) -> Option<MetadataFuture> {
        self.metadata_fn.as_ref().map(|f| f())
    }

    /// True when the source can fetch sub-ranges directly.
    pub fn supports_range_fetch(&self) -> bool {
        self.range_fn.is_some()
    }
}

impl std::fmt::Debug for SegmentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentSource")
            .field("range_fetch", &self.range_fn.is_some())
            .field("metadata_fetch", &self.metadata_fn.is_some())
            .finish()
    }
}

// == Load Options ==
/// Per-call load options.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Chunk size override in samples; None uses the configured default
    pub chunk_size: Option<u64>,
    /// Preload priority; higher loads earlier
    pub priority: i32,
}

impl LoadOptions {
    /// Options with the given preload priority and default chunking.
    pub fn with_priority(priority: i32) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            chunk_size: None,
            priority: 0,
        }
    }
}
