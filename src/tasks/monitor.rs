//! Memory Pressure Monitor
//!
//! Watchdog over the three cache stores. One timer samples aggregate usage
//! and runs frequency-based eviction when it crosses the configured
//! threshold; a second timer sweeps idle entries on the same interval.
//! Both timers are owned by the monitor and started/stopped explicitly.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{EvictionReport, EvictionStore};
use crate::config::Config;
use crate::loader::{chunk_prefix, metadata_key};
use crate::models::{
    MemoryAlert, MemoryTrend, MemoryUsageSnapshot, SampleBuffer, SegmentMetadata, TriggeredAction,
};

/// Fraction of the primary store's size that emergency cleanup removes.
pub const EMERGENCY_REDUCTION_RATIO: f64 = 0.3;

/// Alerts kept before the oldest are dropped.
pub const MAX_ALERT_HISTORY: usize = 20;

/// Usage-ratio samples kept for trend computation.
pub const MAX_USAGE_SAMPLES: usize = 20;

/// Running timer tasks, present only while the monitor is started.
struct MonitorTimers {
    pressure: JoinHandle<()>,
    sweep: JoinHandle<()>,
}

// == Memory Pressure Monitor ==
/// Periodically samples cache memory usage and cleans up under pressure.
///
/// Cloning is cheap; clones share the same stores, history, and timer
/// state, so starting one clone counts as starting them all.
#[derive(Clone)]
pub struct MemoryPressureMonitor {
    segments: Arc<RwLock<EvictionStore<Arc<SampleBuffer>>>>,
    chunks: Arc<RwLock<EvictionStore<Arc<SampleBuffer>>>>,
    metadata: Arc<RwLock<EvictionStore<SegmentMetadata>>>,
    config: Arc<Config>,
    /// Bounded history of cleanups the monitor performed
    alerts: Arc<Mutex<VecDeque<MemoryAlert>>>,
    /// Recent usage ratios, one per monitoring tick
    usage_samples: Arc<Mutex<VecDeque<f64>>>,
    timers: Arc<Mutex<Option<MonitorTimers>>>,
}

impl MemoryPressureMonitor {
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
            config,
            alerts: Arc::new(Mutex::new(VecDeque::new())),
            usage_samples: Arc::new(Mutex::new(VecDeque::new())),
            timers: Arc::new(Mutex::new(None)),
        }
    }

    // == Timer Control ==
    /// Starts the monitoring and sweep timers.
    ///
    /// Returns `false` without side effects if the timers are already
    /// running, so repeated calls never stack duplicate timers.
    pub async fn start(&self) -> bool {
        let mut timers = self.timers.lock().await;
        if timers.is_some() {
            return false;
        }

        info!(
            interval_ms = self.config.cleanup_interval.as_millis() as u64,
            threshold = self.config.memory_pressure_threshold,
            "starting memory pressure monitor"
        );

        let pressure = {
            let monitor = self.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(monitor.config.cleanup_interval).await;
                    monitor.check_memory_usage().await;
                }
            })
        };
        let sweep = {
            let monitor = self.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(monitor.config.cleanup_interval).await;
                    monitor.run_expiry_sweep().await;
                }
            })
        };

        *timers = Some(MonitorTimers { pressure, sweep });
        true
    }

    /// Stops both timers. Returns `false` if the monitor was not running.
    pub async fn stop(&self) -> bool {
        let mut timers = self.timers.lock().await;
        match timers.take() {
            Some(running) => {
                running.pressure.abort();
                running.sweep.abort();
                info!("memory pressure monitor stopped");
                true
            }
            None => false,
        }
    }

    /// Whether the timers are currently running.
    pub async fn is_running(&self) -> bool {
        self.timers.lock().await.is_some()
    }

    // == Monitoring ==
    /// Samples current usage and runs emergency cleanup if it exceeds the
    /// configured threshold. One monitoring-timer tick.
    ///
    /// Returns the snapshot taken before any cleanup ran.
    pub async fn check_memory_usage(&self) -> MemoryUsageSnapshot {
        let usage = self.get_current_memory_usage().await;
        self.record_usage_sample(usage.usage_ratio).await;

        if usage.usage_ratio > self.config.memory_pressure_threshold {
            warn!(
                usage_ratio = usage.usage_ratio,
                threshold = self.config.memory_pressure_threshold,
                total_bytes = usage.total_bytes,
                "memory pressure threshold exceeded"
            );
            self.record_alert(MemoryAlert::new(
                usage.clone(),
                TriggeredAction::EmergencyCleanup,
            ))
            .await;
            self.perform_emergency_cleanup().await;
        } else {
            debug!(
                usage_ratio = usage.usage_ratio,
                total_bytes = usage.total_bytes,
                "memory usage within bounds"
            );
        }

        usage
    }

    /// Evicts the least-valuable segments until roughly
    /// [`EMERGENCY_REDUCTION_RATIO`] of the primary store's size is freed,
    /// then drops the removed segments' metadata and chunks.
    pub async fn perform_emergency_cleanup(&self) -> EvictionReport {
        let report = self
            .segments
            .write()
            .await
            .remove_by_usage_frequency(EMERGENCY_REDUCTION_RATIO);

        {
            let mut metadata = self.metadata.write().await;
            for key in &report.removed_keys {
                metadata.delete(&metadata_key(key));
            }
        }
        {
            let mut chunks = self.chunks.write().await;
            for key in &report.removed_keys {
                chunks.remove_prefix(&chunk_prefix(key));
            }
        }

        if report.removed_count > 0 {
            info!(
                removed = report.removed_count,
                freed_bytes = report.removed_size,
                "emergency cleanup evicted segments"
            );
        } else {
            debug!("emergency cleanup found nothing to evict");
        }

        report
    }

    /// Removes entries idle for longer than the configured `max_age` from
    /// every store. Expired segments cascade to their metadata and chunks;
    /// the chunk and metadata stores are then swept on their own access
    /// times so orphans age out too. One cleanup-timer tick.
    pub async fn run_expiry_sweep(&self) {
        let usage_before = self.get_current_memory_usage().await;
        let max_age = self.config.max_age;

        let expired = self.segments.write().await.remove_expired_entries(max_age);
        {
            let mut metadata = self.metadata.write().await;
            for key in &expired {
                metadata.delete(&metadata_key(key));
            }
        }
        {
            let mut chunks = self.chunks.write().await;
            for key in &expired {
                chunks.remove_prefix(&chunk_prefix(key));
            }
        }

        let expired_chunks = self.chunks.write().await.remove_expired_entries(max_age);
        let expired_metadata = self.metadata.write().await.remove_expired_entries(max_age);

        let total = expired.len() + expired_chunks.len() + expired_metadata.len();
        if total > 0 {
            info!(
                segments = expired.len(),
                chunks = expired_chunks.len(),
                metadata = expired_metadata.len(),
                "expiry sweep removed idle entries"
            );
            self.record_alert(MemoryAlert::new(usage_before, TriggeredAction::ExpirySweep))
                .await;
        } else {
            debug!("expiry sweep found no idle entries");
        }
    }

    // == Reporting ==
    /// Aggregates current usage across all three stores.
    pub async fn get_current_memory_usage(&self) -> MemoryUsageSnapshot {
        let (segment_bytes, segment_max) = {
            let segments = self.segments.read().await;
            (segments.current_size(), segments.max_size())
        };
        let (chunk_bytes, chunk_max) = {
            let chunks = self.chunks.read().await;
            (chunks.current_size(), chunks.max_size())
        };
        let (metadata_bytes, metadata_max) = {
            let metadata = self.metadata.read().await;
            (metadata.current_size(), metadata.max_size())
        };
        MemoryUsageSnapshot::new(
            segment_bytes,
            chunk_bytes,
            metadata_bytes,
            segment_max + chunk_max + metadata_max,
        )
    }

    /// Cleanup history, oldest first.
    pub async fn alerts(&self) -> Vec<MemoryAlert> {
        self.alerts.lock().await.iter().cloned().collect()
    }

    /// Trend over the recent usage samples.
    pub async fn memory_trend(&self) -> MemoryTrend {
        let samples: Vec<f64> = self.usage_samples.lock().await.iter().copied().collect();
        MemoryTrend::from_samples(&samples)
    }

    async fn record_usage_sample(&self, ratio: f64) {
        let mut samples = self.usage_samples.lock().await;
        samples.push_back(ratio);
        while samples.len() > MAX_USAGE_SAMPLES {
            samples.pop_front();
        }
    }

    async fn record_alert(&self, alert: MemoryAlert) {
        let mut alerts = self.alerts.lock().await;
        alerts.push_back(alert);
        while alerts.len() > MAX_ALERT_HISTORY {
            alerts.pop_front();
        }
    }
}
