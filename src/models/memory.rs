//! Memory Reporting Models
//!
//! Snapshot, alert, and trend types produced by the memory pressure monitor
//! for external statistics consumers. Everything here is serializable and
//! carries no behavior beyond its own derivation.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Minimum history length before a trend is computed.
pub const MIN_TREND_SAMPLES: usize = 5;

/// Slope magnitude below which usage counts as stable.
pub const TREND_SLOPE_THRESHOLD: f64 = 0.01;

/// Point-in-time view of cache memory usage across all tracked stores.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryUsageSnapshot {
    /// Bytes held by fully assembled segments
    pub segment_bytes: u64,
    /// Bytes held by cached chunks
    pub chunk_bytes: u64,
    /// Bytes held by metadata records
    pub metadata_bytes: u64,
    /// Sum of all tracked stores
    pub total_bytes: u64,
    /// Combined capacity of all tracked stores
    pub max_bytes: u64,
    /// total_bytes / max_bytes
    pub usage_ratio: f64,
    /// When the snapshot was taken
    pub captured_at: DateTime<Utc>,
}

impl MemoryUsageSnapshot {
    /// Aggregates per-store byte counts into a snapshot.
    pub fn new(segment_bytes: u64, chunk_bytes: u64, metadata_bytes: u64, max_bytes: u64) -> Self {
        let total_bytes = segment_bytes + chunk_bytes + metadata_bytes;
        let usage_ratio = if max_bytes > 0 {
            total_bytes as f64 / max_bytes as f64
        } else {
            0.0
        };
        Self {
            segment_bytes,
            chunk_bytes,
            metadata_bytes,
            total_bytes,
            max_bytes,
            usage_ratio,
            captured_at: Utc::now(),
        }
    }
}

/// Cleanup action the monitor took in response to an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TriggeredAction {
    /// Usage crossed the pressure threshold; frequency-based eviction ran
    EmergencyCleanup,
    /// The periodic sweep removed idle entries
    ExpirySweep,
}

/// Record of a cleanup the monitor performed, kept in a bounded history.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryAlert {
    /// When the action was taken
    pub timestamp: DateTime<Utc>,
    /// Usage as observed before the action ran
    pub usage: MemoryUsageSnapshot,
    /// What the monitor did about it
    pub action: TriggeredAction,
}

impl MemoryAlert {
    pub fn new(usage: MemoryUsageSnapshot, action: TriggeredAction) -> Self {
        Self {
            timestamp: Utc::now(),
            usage,
            action,
        }
    }
}

/// Direction memory usage is moving in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// Linear trend over recent usage-ratio samples.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryTrend {
    pub direction: TrendDirection,
    /// Least-squares slope in usage ratio per sample
    pub slope: f64,
    /// Number of samples the trend was computed from
    pub samples: usize,
}

impl MemoryTrend {
    /// Fits a least-squares line through the samples and classifies its slope.
    ///
    /// Fewer than [`MIN_TREND_SAMPLES`] samples report as stable with a zero
    /// slope; there is not enough history to say anything else.
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n < MIN_TREND_SAMPLES {
            return Self {
                direction: TrendDirection::Stable,
                slope: 0.0,
                samples: n,
            };
        }

        let slope = linear_slope(samples);
        let direction = if slope > TREND_SLOPE_THRESHOLD {
            TrendDirection::Increasing
        } else if slope < -TREND_SLOPE_THRESHOLD {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };
        Self {
            direction,
            slope,
            samples: n,
        }
    }
}

/// Least-squares slope of `values` against their indices.
fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let sum_x: f64 = (0..values.len()).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_x2: f64 = (0..values.len()).map(|i| (i * i) as f64).sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}
