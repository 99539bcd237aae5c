//! Preload Queue Module
//!
//! Priority-ordered queue of segments to load ahead of demand.

use serde::Serialize;
use tokio::sync::Mutex;

use crate::loader::source::{LoadOptions, SegmentSource};

// == Preload Request ==
/// A queued request waiting for the next processing pass.
#[derive(Debug, Clone)]
pub(crate) struct PreloadRequest {
    pub key: String,
    pub source: SegmentSource,
    pub options: LoadOptions,
}

// == Preload Report ==
/// Outcome of one queue processing pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PreloadReport {
    /// Requests drained from the queue
    pub attempted: usize,
    /// Requests that ended with a cached payload
    pub loaded: usize,
}

// == Preload Queue ==
/// Pending preload requests, kept sorted descending by priority.
///
/// The sort is stable, so requests with equal priority process in arrival
/// order.
#[derive(Debug, Default)]
pub(crate) struct PreloadQueue {
    requests: Mutex<Vec<PreloadRequest>>,
}

impl PreloadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a request and restores priority order.
    pub async fn push(&self, key: String, source: SegmentSource, options: LoadOptions) {
        let mut requests = self.requests.lock().await;
        requests.push(PreloadRequest {
            key,
            source,
            options,
        });
        requests.sort_by_key(|request| std::cmp::Reverse(request.options.priority));
    }

    /// Removes and returns up to `max` requests from the front of the queue.
    pub async fn take_batch(&self, max: usize) -> Vec<PreloadRequest> {
        let mut requests = self.requests.lock().await;
        let take = max.min(requests.len());
        requests.drain(..take).collect()
    }

    /// Number of queued requests.
    pub async fn len(&self) -> usize {
        self.requests.lock().await.len()
    }
}
