//! Audio Cache Engine
//!
//! Facade wiring the segment, chunk, and metadata stores together with the
//! load coordinator and the memory pressure monitor. This is the type an
//! embedding application holds; everything else hangs off it.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::{CacheStatsSnapshot, EvictionStore};
use crate::config::Config;
use crate::error::Result;
use crate::loader::{
    chunk_prefix, metadata_key, LazyLoadCoordinator, LoadOptions, PreloadReport, SegmentSource,
};
use crate::models::{MemoryAlert, MemoryTrend, MemoryUsageSnapshot, SampleBuffer, SegmentMetadata};
use crate::tasks::MemoryPressureMonitor;

/// Capacity reserved for metadata records. Records are a few dozen bytes
/// each, so this never becomes the store that feels pressure.
const METADATA_CACHE_SIZE_BYTES: u64 = 1024 * 1024;

// == Audio Cache ==
/// Capacity-bounded cache for decoded audio segments.
///
/// Cloning is cheap; clones share the same stores, coordinator, and
/// monitor.
#[derive(Clone)]
pub struct AudioCache {
    /// Fully assembled segments
    segments: Arc<RwLock<EvictionStore<Arc<SampleBuffer>>>>,
    /// Chunks cached during partial loads
    chunks: Arc<RwLock<EvictionStore<Arc<SampleBuffer>>>>,
    /// Per-segment metadata records
    metadata: Arc<RwLock<EvictionStore<SegmentMetadata>>>,
    coordinator: LazyLoadCoordinator,
    monitor: MemoryPressureMonitor,
    config: Arc<Config>,
}

impl AudioCache {
    // == Constructors ==
    /// Creates a cache from a validated configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(Arc::new(config)))
    }

    /// Creates a cache with the default configuration.
    pub fn with_defaults() -> Self {
        Self::build(Arc::new(Config::default()))
    }

    fn build(config: Arc<Config>) -> Self {
        let segments = Arc::new(RwLock::new(EvictionStore::new(config.max_size_bytes)));
        let chunks = Arc::new(RwLock::new(EvictionStore::new(config.chunk_cache_size_bytes)));
        let metadata = Arc::new(RwLock::new(EvictionStore::new(METADATA_CACHE_SIZE_BYTES)));

        let coordinator = LazyLoadCoordinator::new(
            Arc::clone(&segments),
            Arc::clone(&chunks),
            Arc::clone(&metadata),
            Arc::clone(&config),
        );
        let monitor = MemoryPressureMonitor::new(
            Arc::clone(&segments),
            Arc::clone(&chunks),
            Arc::clone(&metadata),
            Arc::clone(&config),
        );

        info!(
            max_size_bytes = config.max_size_bytes,
            chunk_cache_size_bytes = config.chunk_cache_size_bytes,
            lazy_loading = config.lazy_loading,
            "audio cache initialized"
        );

        Self {
            segments,
            chunks,
            metadata,
            coordinator,
            monitor,
            config,
        }
    }

    // == Segment Access ==
    /// Cache-only lookup. Refreshes the segment's recency on a hit and
    /// never calls out to a source.
    pub async fn get(&self, key: &str) -> Option<Arc<SampleBuffer>> {
        self.segments.write().await.get(key)
    }

    /// Returns the cached segment, or loads it through `source`.
    ///
    /// Concurrent calls for the same key share one underlying load. A load
    /// that fails, times out, or produces nothing yields `None`.
    pub async fn get_or_load(
        &self,
        key: &str,
        source: &SegmentSource,
        options: &LoadOptions,
    ) -> Option<Arc<SampleBuffer>> {
        self.coordinator.get_or_load(key, source, options).await
    }

    /// Removes a segment along with its metadata record and cached chunks.
    ///
    /// Returns whether an assembled segment was present. Chunks and
    /// metadata are cleaned up even when it was not, since a partial load
    /// can leave them behind.
    pub async fn remove(&self, key: &str) -> bool {
        let removed = self.segments.write().await.delete(key);
        self.metadata.write().await.delete(&metadata_key(key));
        self.chunks.write().await.remove_prefix(&chunk_prefix(key));
        if removed {
            debug!(key = %key, "segment removed");
        }
        removed
    }

    /// Empties all three stores and resets their statistics.
    pub async fn clear(&self) {
        self.segments.write().await.clear();
        self.chunks.write().await.clear();
        self.metadata.write().await.clear();
        info!("cache cleared");
    }

    // == Preloading ==
    /// Queues a segment to be loaded by a later [`process_preload_queue`]
    /// pass. Higher priority loads earlier.
    ///
    /// [`process_preload_queue`]: AudioCache::process_preload_queue
    pub async fn add_to_preload_queue(
        &self,
        key: &str,
        source: SegmentSource,
        options: LoadOptions,
    ) {
        self.coordinator
            .add_to_preload_queue(key, source, options)
            .await;
    }

    /// Loads up to `max_concurrent` queued segments concurrently and waits
    /// for all of them to settle.
    pub async fn process_preload_queue(&self, max_concurrent: usize) -> PreloadReport {
        self.coordinator.process_preload_queue(max_concurrent).await
    }

    /// Number of requests waiting in the preload queue.
    pub async fn preload_queue_len(&self) -> usize {
        self.coordinator.preload_queue_len().await
    }

    // == Monitoring ==
    /// Starts the background pressure and sweep timers. Returns `false` if
    /// they were already running.
    pub async fn start_monitoring(&self) -> bool {
        self.monitor.start().await
    }

    /// Stops the background timers. Returns `false` if they were not
    /// running.
    pub async fn stop_monitoring(&self) -> bool {
        self.monitor.stop().await
    }

    /// The monitor itself, for manual ticks and cleanup calls.
    pub fn monitor(&self) -> &MemoryPressureMonitor {
        &self.monitor
    }

    // == Reporting ==
    /// Statistics for the primary segment store.
    pub async fn stats(&self) -> CacheStatsSnapshot {
        self.segments.read().await.get_stats()
    }

    /// Statistics for the chunk store.
    pub async fn chunk_stats(&self) -> CacheStatsSnapshot {
        self.chunks.read().await.get_stats()
    }

    /// Current memory usage across all stores.
    pub async fn memory_usage(&self) -> MemoryUsageSnapshot {
        self.monitor.get_current_memory_usage().await
    }

    /// Usage trend over recent monitoring ticks.
    pub async fn memory_trend(&self) -> MemoryTrend {
        self.monitor.memory_trend().await
    }

    /// Cleanup history recorded by the monitor, oldest first.
    pub async fn alerts(&self) -> Vec<MemoryAlert> {
        self.monitor.alerts().await
    }

    /// The configuration this cache was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }
}
