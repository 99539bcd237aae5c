//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions, and
//! expiry-sweep removals.

use serde::Serialize;

// == Cache Stats ==
/// Mutable performance counters owned by a store.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not present)
    pub misses: u64,
    /// Number of entries evicted by capacity or frequency pressure
    pub evictions: u64,
    /// Number of entries removed by the expiry sweep
    pub expirations: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Eviction ==
    /// Increments the eviction counter.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    // == Record Expiration ==
    /// Increments the expiration counter.
    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }
}

// == Stats Snapshot ==
/// Read-only statistics report assembled by
/// [`EvictionStore::get_stats`](crate::cache::EvictionStore::get_stats).
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsSnapshot {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals
    pub misses: u64,
    /// Number of entries evicted by capacity or frequency pressure
    pub evictions: u64,
    /// Number of entries removed by the expiry sweep
    pub expirations: u64,
    /// hits + misses
    pub total_accesses: u64,
    /// hits / total_accesses
    pub hit_rate: f64,
    /// Current number of entries
    pub entry_count: usize,
    /// Sum of entry sizes in bytes
    pub current_size: u64,
    /// Capacity in bytes
    pub max_size: u64,
    /// current_size / max_size
    pub memory_usage_ratio: f64,
}

impl CacheStatsSnapshot {
    /// Combines the counters with the store's size bookkeeping.
    pub fn new(stats: &CacheStats, entry_count: usize, current_size: u64, max_size: u64) -> Self {
        let memory_usage_ratio = if max_size > 0 {
            current_size as f64 / max_size as f64
        } else {
            0.0
        };
        Self {
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            expirations: stats.expirations,
            total_accesses: stats.hits + stats.misses,
            hit_rate: stats.hit_rate(),
            entry_count,
            current_size,
            max_size,
            memory_usage_ratio,
        }
    }
}
