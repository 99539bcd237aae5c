//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with access tracking
//! and the eviction-score heuristic used under memory pressure.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Eviction score weights. Tunable policy: idle time dominates for rarely
// touched entries, large entries rank ahead of small ones, and every recorded
// hit buys an entry a small reprieve.
const IDLE_WEIGHT_PER_MIN: f64 = 1.0;
const SIZE_WEIGHT_PER_MB: f64 = 1.0;
const HIT_DISCOUNT: f64 = 0.1;

const MS_PER_MIN: f64 = 60_000.0;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

// == Cache Entry ==
/// Represents a single cache entry with its size and access metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The stored value
    pub value: T,
    /// Size of the value in bytes, as declared at insertion
    pub size: u64,
    /// Last access timestamp (Unix milliseconds)
    pub last_access: u64,
    /// Number of times the entry has been read since insertion
    pub hit_count: u64,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a new cache entry, stamped with the current time.
    pub fn new(value: T, size: u64) -> Self {
        Self {
            value,
            size,
            last_access: current_timestamp_ms(),
            hit_count: 0,
        }
    }

    // == Touch ==
    /// Records a read: refreshes the access timestamp and counts the hit.
    pub fn touch(&mut self) {
        self.last_access = current_timestamp_ms();
        self.hit_count += 1;
    }

    /// Milliseconds since the entry was last accessed.
    pub fn idle_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_access)
    }

    // == Is Older Than ==
    /// Checks whether the entry has been idle longer than `max_age`.
    ///
    /// Boundary condition: an entry idle for exactly `max_age` is retained;
    /// only strictly older entries are removed by the expiry sweep.
    pub fn is_older_than(&self, max_age: Duration, now_ms: u64) -> bool {
        self.idle_ms(now_ms) as u128 > max_age.as_millis()
    }

    // == Eviction Score ==
    /// Scores the entry for frequency-based eviction.
    ///
    /// `idle_minutes + size_in_mb - 0.1 * hit_count`: entries with the
    /// lowest score are evicted first.
    pub fn eviction_score(&self, now_ms: u64) -> f64 {
        let idle_minutes = self.idle_ms(now_ms) as f64 / MS_PER_MIN;
        let size_mb = self.size as f64 / BYTES_PER_MB;
        idle_minutes * IDLE_WEIGHT_PER_MIN + size_mb * SIZE_WEIGHT_PER_MB
            - self.hit_count as f64 * HIT_DISCOUNT
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
