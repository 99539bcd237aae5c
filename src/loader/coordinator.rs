//! Lazy Load Coordinator Module
//!
//! Fills the cache through user-supplied fetch callbacks. Concurrent
//! requests for the same key share a single in-flight load, and chunked
//! loading assembles segments through a secondary chunk cache so partial
//! data survives eviction of the assembled payload.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, warn};

use crate::cache::EvictionStore;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::loader::preload::{PreloadQueue, PreloadReport};
use crate::loader::source::{LoadOptions, SampleRange, SegmentSource};
use crate::models::{SampleBuffer, SegmentMetadata};

// == Key Naming ==
/// Metadata cache key for a segment.
pub fn metadata_key(key: &str) -> String {
    format!("{}_meta", key)
}

/// Chunk cache key for one chunk of a segment.
pub fn chunk_key(key: &str, index: u64) -> String {
    format!("{}_chunk_{}", key, index)
}

/// Prefix shared by all chunk keys of a segment, for cascading removal.
pub fn chunk_prefix(key: &str) -> String {
    format!("{}_chunk_", key)
}

// == Load Task ==
/// In-flight load tracked by the deduplication registry.
///
/// The load itself runs in a spawned task, so a caller abandoning its
/// future cannot strand the registry entry. Waiters subscribe to the
/// broadcast; the worker removes the entry and broadcasts the outcome under
/// the registry lock, making subscribe-or-absent atomic.
struct LoadTask {
    outcome_tx: broadcast::Sender<Option<Arc<SampleBuffer>>>,
}

// == Lazy Load Coordinator ==
/// Coordinates segment loads into the shared stores.
///
/// Cloning is cheap; clones share the same stores and registry.
#[derive(Clone)]
pub struct LazyLoadCoordinator {
    /// Assembled segments
    segments: Arc<RwLock<EvictionStore<Arc<SampleBuffer>>>>,
    /// Individual chunks, keyed `"{key}_chunk_{index}"`
    chunks: Arc<RwLock<EvictionStore<Arc<SampleBuffer>>>>,
    /// Segment metadata, keyed `"{key}_meta"`
    metadata: Arc<RwLock<EvictionStore<SegmentMetadata>>>,
    /// One in-flight load per key
    pending: Arc<Mutex<HashMap<String, LoadTask>>>,
    /// Requests waiting for the next preload pass
    queue: Arc<PreloadQueue>,
    config: Arc<Config>,
}

impl LazyLoadCoordinator {
    // == Constructor ==
    pub fn new(
        segments: Arc<RwLock<EvictionStore<Arc<SampleBuffer>>>>,
        chunks: Arc<RwLock<EvictionStore<Arc<SampleBuffer>>>>,
        metadata: Arc<RwLock<EvictionStore<SegmentMetadata>>>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            segments,
            chunks,
            metadata,
            pending: Arc::new(Mutex::new(HashMap::new())),
            queue: Arc::new(PreloadQueue::new()),
            config,
        }
    }

    // == Get Or Load ==
    /// Returns the cached segment, or loads it through the source.
    ///
    /// At most one load per key is in flight at any time; callers arriving
    /// while a load is pending await its outcome instead of fetching again.
    /// Every failure path (fetch error, absent payload, malformed payload,
    /// timeout) collapses to `None` with the detail logged, and clears the
    /// registry so a later call retries cleanly.
    pub async fn get_or_load(
        &self,
        key: &str,
        source: &SegmentSource,
        options: &LoadOptions,
    ) -> Option<Arc<SampleBuffer>> {
        if let Some(buffer) = self.segments.write().await.get(key) {
            return Some(buffer);
        }

        let mut outcome_rx = {
            let mut pending = self.pending.lock().await;
            match pending.get(key) {
                Some(task) => task.outcome_tx.subscribe(),
                None => {
                    let (tx, rx) = broadcast::channel(1);
                    pending.insert(
                        key.to_string(),
                        LoadTask {
                            outcome_tx: tx,
                        },
                    );
                    let coordinator = self.clone();
                    let key = key.to_string();
                    let source = source.clone();
                    let options = options.clone();
                    tokio::spawn(async move {
                        coordinator.run_load(key, source, options).await;
                    });
                    rx
                }
            }
        };

        match outcome_rx.recv().await {
            Ok(outcome) => outcome,
            // Worker dropped without broadcasting; treat as a failed load
            Err(_) => None,
        }
    }

    // == Preload ==
    /// Queues a segment for the next preload pass. Higher priority loads
    /// earlier; equal priorities keep arrival order.
    pub async fn add_to_preload_queue(
        &self,
        key: &str,
        source: SegmentSource,
        options: LoadOptions,
    ) {
        self.queue.push(key.to_string(), source, options).await;
    }

    /// Drains up to `max_concurrent` queued requests and loads them
    /// concurrently, waiting for all of them to settle.
    ///
    /// Failures are logged and counted, never propagated, so one failing
    /// preload cannot abort the others.
    pub async fn process_preload_queue(&self, max_concurrent: usize) -> PreloadReport {
        let batch = self.queue.take_batch(max_concurrent).await;
        let attempted = batch.len();

        let mut handles = Vec::with_capacity(attempted);
        for request in batch {
            let coordinator = self.clone();
            handles.push(tokio::spawn(async move {
                coordinator
                    .get_or_load(&request.key, &request.source, &request.options)
                    .await
                    .is_some()
            }));
        }

        let mut loaded = 0;
        for handle in handles {
            match handle.await {
                Ok(true) => loaded += 1,
                Ok(false) => {}
                Err(e) => warn!(error = %e, "preload task panicked"),
            }
        }

        if attempted > 0 {
            debug!(attempted, loaded, "preload pass finished");
        }
        PreloadReport { attempted, loaded }
    }

    /// Number of requests currently queued for preload.
    pub async fn preload_queue_len(&self) -> usize {
        self.queue.len().await
    }

    // == Load Worker ==
    /// Runs one load to completion, then settles the registry entry.
    async fn run_load(&self, key: String, source: SegmentSource, options: LoadOptions) {
        let result = match tokio::time::timeout(
            self.config.load_timeout,
            self.load_and_store(&key, &source, &options),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(CacheError::LoadTimeout {
                key: key.clone(),
                timeout_ms: self.config.load_timeout.as_millis() as u64,
            }),
        };

        let outcome = match result {
            Ok(Some(buffer)) => Some(buffer),
            Ok(None) => {
                debug!(key = %key, "segment source returned no payload");
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "segment load failed");
                None
            }
        };

        // The successful payload is already stored. Removing the registry
        // entry and broadcasting under one lock means any caller either
        // subscribed in time or finds the registry empty and hits the cache.
        let mut pending = self.pending.lock().await;
        if let Some(task) = pending.remove(&key) {
            let _ = task.outcome_tx.send(outcome);
        }
    }

    /// Loads a segment (chunked or whole per configuration) and stores the
    /// assembled payload and its metadata.
    async fn load_and_store(
        &self,
        key: &str,
        source: &SegmentSource,
        options: &LoadOptions,
    ) -> Result<Option<Arc<SampleBuffer>>> {
        let loaded = if self.config.lazy_loading {
            self.load_chunked(key, source, options).await?
        } else {
            self.load_whole(key, source).await?
        };

        match loaded {
            Some(buffer) => {
                let meta = buffer.metadata();
                self.metadata
                    .write()
                    .await
                    .set(metadata_key(key), meta, meta.size_bytes());
                self.segments
                    .write()
                    .await
                    .set(key.to_string(), Arc::clone(&buffer), buffer.size_bytes());
                debug!(
                    key = %key,
                    size_bytes = buffer.size_bytes(),
                    channels = buffer.channel_count(),
                    "segment cached"
                );
                Ok(Some(buffer))
            }
            None => Ok(None),
        }
    }

    /// Fetches the entire payload in one call.
    async fn load_whole(
        &self,
        key: &str,
        source: &SegmentSource,
    ) -> Result<Option<Arc<SampleBuffer>>> {
        let payload = source.fetch().await.map_err(|cause| CacheError::FetchFailed {
            key: key.to_string(),
            cause,
        })?;
        Ok(payload.map(Arc::new))
    }

    // == Chunked Assembly ==
    /// Loads a segment chunk by chunk.
    ///
    /// Metadata is resolved once (cache, then the source's metadata
    /// capability, then derived from a whole fetch). Each chunk is served
    /// from the chunk cache when possible; misses fetch the sub-range when
    /// the source supports it, and otherwise slice a whole payload that is
    /// fetched at most once for the entire load.
    async fn load_chunked(
        &self,
        key: &str,
        source: &SegmentSource,
        options: &LoadOptions,
    ) -> Result<Option<Arc<SampleBuffer>>> {
        let chunk_size = self.effective_chunk_size(key, options);
        let mut whole: Option<Arc<SampleBuffer>> = None;

        let metadata = match self.resolve_metadata(key, source, &mut whole).await? {
            Some(metadata) => metadata,
            None => return Ok(None),
        };

        let chunk_count = metadata.chunk_count(chunk_size);
        if chunk_count == 0 {
            // Zero-length segment: nothing to chunk
            return Ok(Some(Arc::new(SampleBuffer::new(
                metadata.channel_count,
                0,
                metadata.sample_rate,
            ))));
        }

        let mut parts: Vec<Arc<SampleBuffer>> = Vec::with_capacity(chunk_count as usize);
        for index in 0..chunk_count {
            let cache_key = chunk_key(key, index);
            if let Some(chunk) = self.chunks.write().await.get(&cache_key) {
                parts.push(chunk);
                continue;
            }

            let start = index * chunk_size;
            let range = SampleRange {
                start,
                len: chunk_size.min(metadata.sample_length - start),
            };
            let chunk = match self
                .fetch_chunk(key, source, &metadata, range, &mut whole)
                .await?
            {
                Some(chunk) => chunk,
                // Source stopped producing data mid-load
                None => return Ok(None),
            };

            self.chunks
                .write()
                .await
                .set(cache_key, Arc::clone(&chunk), chunk.size_bytes());
            parts.push(chunk);
        }

        let refs: Vec<&SampleBuffer> = parts.iter().map(|p| p.as_ref()).collect();
        let assembled = SampleBuffer::concat(&refs).map_err(|e| CacheError::MalformedPayload {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        if assembled.sample_length() != metadata.sample_length
            || assembled.channel_count() != metadata.channel_count
        {
            return Err(CacheError::MalformedPayload {
                key: key.to_string(),
                reason: format!(
                    "assembled {} samples x {} channels, metadata says {} x {}",
                    assembled.sample_length(),
                    assembled.channel_count(),
                    metadata.sample_length,
                    metadata.channel_count
                ),
            });
        }

        Ok(Some(Arc::new(assembled)))
    }

    /// Chunk size for this load, falling back to the configured default.
    fn effective_chunk_size(&self, key: &str, options: &LoadOptions) -> u64 {
        match options.chunk_size {
            Some(0) => {
                warn!(key = %key, "chunk_size override of 0 ignored, using configured default");
                self.config.chunk_size
            }
            Some(size) => size,
            None => self.config.chunk_size,
        }
    }

    /// Resolves segment metadata: cache, then the source's metadata
    /// capability, then a whole-payload fetch. Resolved metadata is cached.
    async fn resolve_metadata(
        &self,
        key: &str,
        source: &SegmentSource,
        whole: &mut Option<Arc<SampleBuffer>>,
    ) -> Result<Option<SegmentMetadata>> {
        let cache_key = metadata_key(key);
        if let Some(metadata) = self.metadata.write().await.get(&cache_key) {
            return Ok(Some(metadata));
        }

        let fetched = match source.fetch_metadata() {
            Some(future) => future.await.map_err(|cause| CacheError::FetchFailed {
                key: key.to_string(),
                cause,
            })?,
            None => fetch_whole_once(key, source, whole)
                .await?
                .map(|buffer| buffer.metadata()),
        };

        match fetched {
            Some(metadata) => {
                self.metadata
                    .write()
                    .await
                    .set(cache_key, metadata, metadata.size_bytes());
                Ok(Some(metadata))
            }
            None => Ok(None),
        }
    }

    /// Produces one chunk, preferring a direct range fetch over slicing a
    /// memoized whole payload.
    async fn fetch_chunk(
        &self,
        key: &str,
        source: &SegmentSource,
        metadata: &SegmentMetadata,
        range: SampleRange,
        whole: &mut Option<Arc<SampleBuffer>>,
    ) -> Result<Option<Arc<SampleBuffer>>> {
        match source.fetch_range(range) {
            Some(future) => {
                let fetched = future.await.map_err(|cause| CacheError::FetchFailed {
                    key: key.to_string(),
                    cause,
                })?;
                match fetched {
                    Some(chunk) => {
                        self.validate_chunk(key, metadata, range, &chunk)?;
                        Ok(Some(Arc::new(chunk)))
                    }
                    None => Ok(None),
                }
            }
            None => match fetch_whole_once(key, source, whole).await? {
                Some(buffer) => Ok(Some(Arc::new(buffer.slice(range.start, range.len)))),
                None => Ok(None),
            },
        }
    }

    /// A range fetch must agree with the segment's metadata.
    fn validate_chunk(
        &self,
        key: &str,
        metadata: &SegmentMetadata,
        range: SampleRange,
        chunk: &SampleBuffer,
    ) -> Result<()> {
        if chunk.channel_count() != metadata.channel_count {
            return Err(CacheError::MalformedPayload {
                key: key.to_string(),
                reason: format!(
                    "range fetch returned {} channels, metadata says {}",
                    chunk.channel_count(),
                    metadata.channel_count
                ),
            });
        }
        if chunk.sample_rate() != metadata.sample_rate {
            return Err(CacheError::MalformedPayload {
                key: key.to_string(),
                reason: format!(
                    "range fetch returned sample rate {}, metadata says {}",
                    chunk.sample_rate(),
                    metadata.sample_rate
                ),
            });
        }
        if chunk.sample_length() != range.len {
            return Err(CacheError::MalformedPayload {
                key: key.to_string(),
                reason: format!(
                    "range fetch returned {} samples for a {}-sample range",
                    chunk.sample_length(),
                    range.len
                ),
            });
        }
        Ok(())
    }
}

/// Fetches the whole payload at most once per load, memoizing the result so
/// metadata derivation and every chunk slice share one fetch.
async fn fetch_whole_once(
    key: &str,
    source: &SegmentSource,
    slot: &mut Option<Arc<SampleBuffer>>,
) -> Result<Option<Arc<SampleBuffer>>> {
    if slot.is_none() {
        let fetched = source.fetch().await.map_err(|cause| CacheError::FetchFailed {
            key: key.to_string(),
            cause,
        })?;
        *slot = fetched.map(Arc::new);
    }
    Ok(slot.clone())
}
