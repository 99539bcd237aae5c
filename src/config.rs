//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum total size in bytes of decoded segments held by the primary cache
    pub max_size_bytes: u64,
    /// Maximum total size in bytes of the chunk cache
    pub chunk_cache_size_bytes: u64,
    /// Interval between memory checks and expiry sweeps
    pub cleanup_interval: Duration,
    /// Usage ratio (0.0..=1.0) above which emergency cleanup triggers
    pub memory_pressure_threshold: f64,
    /// Entries idle longer than this are removed by the expiry sweep
    pub max_age: Duration,
    /// Samples per chunk when loading lazily
    pub chunk_size: u64,
    /// Whether segments are loaded chunk by chunk or in one piece
    pub lazy_loading: bool,
    /// Maximum time a single load may take before it counts as failed
    pub load_timeout: Duration,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `AUDIO_CACHE_MAX_SIZE_BYTES` - Primary cache capacity (default: 50 MB)
    /// - `AUDIO_CACHE_CHUNK_CACHE_SIZE_BYTES` - Chunk cache capacity (default: 16 MB)
    /// - `AUDIO_CACHE_CLEANUP_INTERVAL_MS` - Monitor tick interval (default: 30000)
    /// - `AUDIO_CACHE_MEMORY_PRESSURE_THRESHOLD` - Emergency trigger ratio (default: 0.8)
    /// - `AUDIO_CACHE_MAX_AGE_MS` - Idle age before expiry (default: 300000)
    /// - `AUDIO_CACHE_CHUNK_SIZE` - Samples per chunk (default: 65536)
    /// - `AUDIO_CACHE_LAZY_LOADING` - Chunked loading on/off (default: true)
    /// - `AUDIO_CACHE_LOAD_TIMEOUT_MS` - Per-load timeout (default: 30000)
    pub fn from_env() -> Self {
        Self {
            max_size_bytes: env::var("AUDIO_CACHE_MAX_SIZE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_SIZE_BYTES),
            chunk_cache_size_bytes: env::var("AUDIO_CACHE_CHUNK_CACHE_SIZE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CHUNK_CACHE_SIZE_BYTES),
            cleanup_interval: Duration::from_millis(
                env::var("AUDIO_CACHE_CLEANUP_INTERVAL_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_CLEANUP_INTERVAL_MS),
            ),
            memory_pressure_threshold: env::var("AUDIO_CACHE_MEMORY_PRESSURE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MEMORY_PRESSURE_THRESHOLD),
            max_age: Duration::from_millis(
                env::var("AUDIO_CACHE_MAX_AGE_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_MAX_AGE_MS),
            ),
            chunk_size: env::var("AUDIO_CACHE_CHUNK_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CHUNK_SIZE),
            lazy_loading: env::var("AUDIO_CACHE_LAZY_LOADING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            load_timeout: Duration::from_millis(
                env::var("AUDIO_CACHE_LOAD_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_LOAD_TIMEOUT_MS),
            ),
        }
    }

    /// Validates the configuration, rejecting values the cache cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_size_bytes == 0 {
            return Err(CacheError::InvalidConfig(
                "max_size_bytes must be > 0".to_string(),
            ));
        }
        if self.chunk_cache_size_bytes == 0 {
            return Err(CacheError::InvalidConfig(
                "chunk_cache_size_bytes must be > 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.memory_pressure_threshold) {
            return Err(CacheError::InvalidConfig(format!(
                "memory_pressure_threshold must be within 0.0..=1.0, got {}",
                self.memory_pressure_threshold
            )));
        }
        if self.chunk_size == 0 {
            return Err(CacheError::InvalidConfig(
                "chunk_size must be > 0".to_string(),
            ));
        }
        if self.cleanup_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "cleanup_interval must be > 0".to_string(),
            ));
        }
        if self.load_timeout.is_zero() {
            return Err(CacheError::InvalidConfig(
                "load_timeout must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

const DEFAULT_MAX_SIZE_BYTES: u64 = 50 * 1024 * 1024;
const DEFAULT_CHUNK_CACHE_SIZE_BYTES: u64 = 16 * 1024 * 1024;
const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 30_000;
const DEFAULT_MEMORY_PRESSURE_THRESHOLD: f64 = 0.8;
const DEFAULT_MAX_AGE_MS: u64 = 300_000;
const DEFAULT_CHUNK_SIZE: u64 = 65_536;
const DEFAULT_LOAD_TIMEOUT_MS: u64 = 30_000;

impl Default for Config {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            chunk_cache_size_bytes: DEFAULT_CHUNK_CACHE_SIZE_BYTES,
            cleanup_interval: Duration::from_millis(DEFAULT_CLEANUP_INTERVAL_MS),
            memory_pressure_threshold: DEFAULT_MEMORY_PRESSURE_THRESHOLD,
            max_age: Duration::from_millis(DEFAULT_MAX_AGE_MS),
            chunk_size: DEFAULT_CHUNK_SIZE,
            lazy_loading: true,
            load_timeout: Duration::from_millis(DEFAULT_LOAD_TIMEOUT_MS),
        }
    }
}
