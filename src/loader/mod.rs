//! Loader Module
//!
//! On-demand segment loading: fetch sources, the load coordinator with
//! its deduplication registry, and the priority preload queue.

mod coordinator;
mod preload;
mod source;

pub use coordinator::LazyLoadCoordinator;
pub use preload::PreloadReport;
pub use source::{FetchFuture, LoadOptions, MetadataFuture, SampleRange, SegmentSource};

pub(crate) use coordinator::{chunk_prefix, metadata_key};
