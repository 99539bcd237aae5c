//! Eviction Store Module
//!
//! Size-weighted LRU cache combining HashMap storage with recency tracking,
//! idle-age expiry, and frequency-based eviction under memory pressure.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, CacheStats, CacheStatsSnapshot, RecencyList};

// == Eviction Report ==
/// Outcome of a frequency-based eviction pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvictionReport {
    /// Number of entries removed
    pub removed_count: usize,
    /// Total bytes reclaimed
    pub removed_size: u64,
    /// Keys removed, for cascading cleanup of dependent caches
    pub removed_keys: Vec<String>,
}

// == Eviction Store ==
/// Capacity-bounded cache keyed by string, generic over the payload type.
///
/// Capacity is measured in bytes, not entries: every `set` declares the
/// payload's size and the store evicts least-recently-used entries until the
/// total fits under `max_size` again. A single entry larger than the whole
/// capacity evicts everything, itself included.
#[derive(Debug)]
pub struct EvictionStore<T> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<T>>,
    /// Recency tracker, head = most recent
    recency: RecencyList,
    /// Performance statistics
    stats: CacheStats,
    /// Capacity in bytes
    max_size: u64,
    /// Sum of all entry sizes in bytes
    current_size: u64,
}

impl<T> EvictionStore<T> {
    // == Constructor ==
    /// Creates a new EvictionStore with the given capacity in bytes.
    pub fn new(max_size: u64) -> Self {
        Self {
            entries: HashMap::new(),
            recency: RecencyList::new(),
            stats: CacheStats::new(),
            max_size,
            current_size: 0,
        }
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// A hit moves the entry to the most-recently-used position, bumps its
    /// hit count, and refreshes its access timestamp. Both hits and misses
    /// are counted. Structural only; never suspends.
    pub fn get(&mut self, key: &str) -> Option<T>
    where
        T: Clone,
    {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.touch();
                self.recency.touch(key);
                self.stats.record_hit();
                Some(entry.value.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Set ==
    /// Stores a value under a key, declaring its size in bytes.
    ///
    /// Overwriting an existing key replaces value and size in place and
    /// starts its access bookkeeping over. Either way the entry lands at
    /// the most-recently-used position, and entries are evicted from the
    /// least-recently-used end until the store fits its capacity again.
    pub fn set(&mut self, key: String, value: T, size: u64) {
        match self.entries.get_mut(&key) {
            Some(existing) => {
                self.current_size = self.current_size - existing.size + size;
                *existing = CacheEntry::new(value, size);
            }
            None => {
                self.entries.insert(key.clone(), CacheEntry::new(value, size));
                self.current_size += size;
            }
        }
        self.recency.touch(&key);
        self.evict_to_capacity();
        self.debug_check_invariants();
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether anything was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = match self.entries.remove(key) {
            Some(entry) => {
                self.recency.remove(key);
                self.current_size -= entry.size;
                true
            }
            None => false,
        };
        self.debug_check_invariants();
        removed
    }

    // == Clear ==
    /// Removes all entries and resets the statistics counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
        self.stats = CacheStats::new();
        self.current_size = 0;
    }

    // == Remove Expired ==
    /// Removes entries idle for strictly longer than `max_age`.
    ///
    /// O(n) scan. Returns the removed keys so callers can cascade cleanup
    /// to dependent caches (metadata, chunks).
    pub fn remove_expired_entries(&mut self, max_age: Duration) -> Vec<String> {
        let now = current_timestamp_ms();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_older_than(max_age, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            if let Some(entry) = self.entries.remove(key) {
                self.recency.remove(key);
                self.current_size -= entry.size;
                self.stats.record_expiration();
            }
        }

        self.debug_check_invariants();
        expired
    }

    // == Remove By Usage Frequency ==
    /// Evicts entries by score until the reclaimed size reaches
    /// `target_reduction_ratio` of the current size.
    ///
    /// Each entry scores `idle_minutes + size_in_mb - 0.1 * hit_count` and
    /// eviction proceeds from the lowest score upward. Removal stops once
    /// the cumulative removed size reaches the target (overshooting by at
    /// most one entry) or the store is empty.
    pub fn remove_by_usage_frequency(&mut self, target_reduction_ratio: f64) -> EvictionReport {
        let now = current_timestamp_ms();
        // Negative or NaN ratios collapse to a zero target
        let target = (self.current_size as f64 * target_reduction_ratio) as u64;

        let mut candidates: Vec<(String, f64)> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.eviction_score(now)))
            .collect();
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut report = EvictionReport::default();
        for (key, _) in candidates {
            if report.removed_size >= target {
                break;
            }
            if let Some(entry) = self.entries.remove(&key) {
                self.recency.remove(&key);
                self.current_size -= entry.size;
                self.stats.record_eviction();
                report.removed_count += 1;
                report.removed_size += entry.size;
                report.removed_keys.push(key);
            }
        }

        self.debug_check_invariants();
        report
    }

    // == Remove Prefix ==
    /// Deletes every entry whose key starts with `prefix`; returns the
    /// removed keys. Used for cascading chunk cleanup, so removals are
    /// plain deletes and count toward no statistic.
    pub fn remove_prefix(&mut self, prefix: &str) -> Vec<String> {
        let matching: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();

        for key in &matching {
            if let Some(entry) = self.entries.remove(key) {
                self.recency.remove(key);
                self.current_size -= entry.size;
            }
        }

        self.debug_check_invariants();
        matching
    }

    // == Stats ==
    /// Returns a snapshot of the statistics counters and size bookkeeping.
    /// Pure read.
    pub fn get_stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot::new(
            &self.stats,
            self.entries.len(),
            self.current_size,
            self.max_size,
        )
    }

    // == Accessors ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all entry sizes in bytes.
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    /// Capacity in bytes.
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Checks for a key without touching recency or statistics.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Internal Eviction ==
    /// Evicts from the least-recently-used end until the store fits its
    /// capacity. May empty the store entirely when one entry is oversized.
    fn evict_to_capacity(&mut self) {
        while self.current_size > self.max_size {
            match self.recency.evict_oldest() {
                Some(oldest) => {
                    if let Some(entry) = self.entries.remove(&oldest) {
                        self.current_size -= entry.size;
                        self.stats.record_eviction();
                    }
                }
                None => break,
            }
        }
    }

    /// Size accounting and map/list bijection are structural invariants;
    /// a mismatch is a logic bug, so it fails fast in debug builds.
    fn debug_check_invariants(&self) {
        debug_assert_eq!(
            self.entries.values().map(|e| e.size).sum::<u64>(),
            self.current_size,
            "size accounting out of sync"
        );
        debug_assert_eq!(
            self.entries.len(),
            self.recency.len(),
            "recency list out of sync with entry map"
        );
    }
}
