//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify the store's structural invariants under arbitrary
//! operation sequences.

use proptest::prelude::*;
use std::collections::HashMap;
use std::thread::sleep;
use std::time::Duration;

use crate::cache::EvictionStore;

// == Test Configuration ==
const TEST_MAX_SIZE: u64 = 1_000_000;

// == Strategies ==
/// Generates cache keys (non-empty, short alphanumeric)
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9_]{1,16}".prop_map(String::from)
}

/// Generates entry sizes in bytes
fn size_strategy() -> impl Strategy<Value = u64> {
    1u64..=200
}

/// A single cache operation for sequence testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, size: u64 },
    Get { key: String },
    Delete { key: String },
    EvictByFrequency { ratio_percent: u8 },
    SweepExpired,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (key_strategy(), size_strategy())
            .prop_map(|(key, size)| CacheOp::Set { key, size }),
        3 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        2 => key_strategy().prop_map(|key| CacheOp::Delete { key }),
        1 => (0u8..=100).prop_map(|ratio_percent| CacheOp::EvictByFrequency { ratio_percent }),
        1 => Just(CacheOp::SweepExpired),
    ]
}

fn apply(store: &mut EvictionStore<String>, op: &CacheOp) {
    match op {
        CacheOp::Set { key, size } => {
            store.set(key.clone(), format!("payload_{}", key), *size);
        }
        CacheOp::Get { key } => {
            let _ = store.get(key);
        }
        CacheOp::Delete { key } => {
            let _ = store.delete(key);
        }
        CacheOp::EvictByFrequency { ratio_percent } => {
            let _ = store.remove_by_usage_frequency(*ratio_percent as f64 / 100.0);
        }
        CacheOp::SweepExpired => {
            let _ = store.remove_expired_entries(Duration::from_secs(3600));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any operation sequence, the store never exceeds its capacity and
    // its reported size/entry bookkeeping stays self-consistent. The exact
    // size accounting is additionally checked by the store's internal debug
    // assertions, which every operation here runs through.
    #[test]
    fn prop_size_accounting_stays_consistent(
        ops in prop::collection::vec(cache_op_strategy(), 1..60)
    ) {
        let max_size = 500;
        let mut store: EvictionStore<String> = EvictionStore::new(max_size);

        for op in &ops {
            apply(&mut store, op);

            let stats = store.get_stats();
            prop_assert!(
                store.current_size() <= max_size,
                "current_size {} exceeds capacity {}",
                store.current_size(),
                max_size
            );
            prop_assert_eq!(stats.current_size, store.current_size());
            prop_assert_eq!(stats.entry_count, store.len());
        }
    }

    // For any sequence of set/get/delete, the hit and miss counters reflect
    // exactly the observed get outcomes.
    #[test]
    fn prop_statistics_accuracy(
        ops in prop::collection::vec(cache_op_strategy(), 1..50)
    ) {
        let mut store: EvictionStore<String> = EvictionStore::new(TEST_MAX_SIZE);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in &ops {
            match op {
                CacheOp::Get { key } => {
                    match store.get(key) {
                        Some(_) => expected_hits += 1,
                        None => expected_misses += 1,
                    }
                }
                other => apply(&mut store, other),
            }
        }

        let stats = store.get_stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_accesses, expected_hits + expected_misses);
    }

    // For any store filled to capacity with equally sized entries, inserting
    // one more evicts exactly the least recently used key.
    #[test]
    fn prop_lru_eviction_order(
        initial_keys in prop::collection::hash_set(key_strategy(), 3..10),
        new_key in key_strategy()
    ) {
        let keys: Vec<String> = initial_keys.into_iter().collect();
        prop_assume!(!keys.contains(&new_key));

        let entry_size = 10u64;
        let capacity = entry_size * keys.len() as u64;
        let mut store: EvictionStore<String> = EvictionStore::new(capacity);

        let oldest_key = keys[0].clone();
        for key in &keys {
            store.set(key.clone(), format!("value_{}", key), entry_size);
        }
        prop_assert_eq!(store.current_size(), capacity);

        store.set(new_key.clone(), "new_value".to_string(), entry_size);

        // Still at capacity, with the oldest key gone and the rest intact
        prop_assert_eq!(store.current_size(), capacity);
        prop_assert!(
            store.get(&oldest_key).is_none(),
            "Oldest key '{}' should have been evicted",
            oldest_key
        );
        prop_assert!(store.get(&new_key).is_some(), "New key should exist");
        for key in keys.iter().skip(1) {
            prop_assert!(
                store.get(key).is_some(),
                "Key '{}' should still exist",
                key
            );
        }
    }

    // For any filled store, touching a key via get protects it from the next
    // eviction; the victim is the key after it in recency order.
    #[test]
    fn prop_lru_access_tracking(
        initial_keys in prop::collection::hash_set(key_strategy(), 3..8),
        new_key in key_strategy()
    ) {
        let keys: Vec<String> = initial_keys.into_iter().collect();
        prop_assume!(!keys.contains(&new_key));

        let entry_size = 10u64;
        let capacity = entry_size * keys.len() as u64;
        let mut store: EvictionStore<String> = EvictionStore::new(capacity);

        for key in &keys {
            store.set(key.clone(), format!("value_{}", key), entry_size);
        }

        // Touch the current LRU candidate so the next key becomes the victim
        let accessed_key = keys[0].clone();
        let _ = store.get(&accessed_key);
        let expected_evicted = keys[1].clone();

        store.set(new_key.clone(), "new_value".to_string(), entry_size);

        prop_assert!(
            store.get(&accessed_key).is_some(),
            "Accessed key '{}' should not be evicted",
            accessed_key
        );
        prop_assert!(
            store.get(&expected_evicted).is_none(),
            "Key '{}' should have been evicted",
            expected_evicted
        );
        prop_assert!(store.get(&new_key).is_some(), "New key should exist");
    }

    // For any population and target ratio, frequency eviction reclaims at
    // least the target size (or drains the store), overshooting by at most
    // the final removed entry.
    #[test]
    fn prop_frequency_eviction_bound(
        entries in prop::collection::hash_map(key_strategy(), 1u64..=100, 1..20),
        ratio_percent in 0u8..=100
    ) {
        let mut store: EvictionStore<String> = EvictionStore::new(TEST_MAX_SIZE);
        let sizes: HashMap<String, u64> = entries.clone();
        let total: u64 = sizes.values().sum();

        for (key, size) in &entries {
            store.set(key.clone(), format!("value_{}", key), *size);
        }

        let ratio = ratio_percent as f64 / 100.0;
        let target = (total as f64 * ratio) as u64;
        let report = store.remove_by_usage_frequency(ratio);

        prop_assert_eq!(report.removed_keys.len(), report.removed_count);
        prop_assert_eq!(store.current_size(), total - report.removed_size);
        prop_assert_eq!(store.get_stats().evictions, report.removed_count as u64);

        if target == 0 {
            prop_assert_eq!(report.removed_count, 0, "Zero target must not remove");
        } else if report.removed_size < target {
            prop_assert!(store.is_empty(), "Short of target only when drained");
        } else {
            // Dropping the final removal must land under the target
            let last_key = report.removed_keys.last().unwrap();
            let last_size = sizes[last_key];
            prop_assert!(
                report.removed_size - last_size < target,
                "Removed {} overshoots target {} by more than the last entry ({})",
                report.removed_size,
                target,
                last_size
            );
        }
    }

    // For any operation sequence, clear leaves an empty store with zeroed
    // counters, and any subsequent get is a miss.
    #[test]
    fn prop_clear_resets_everything(
        ops in prop::collection::vec(cache_op_strategy(), 1..40),
        probe_key in key_strategy()
    ) {
        let mut store: EvictionStore<String> = EvictionStore::new(500);
        for op in &ops {
            apply(&mut store, op);
        }

        store.clear();

        let stats = store.get_stats();
        prop_assert_eq!(stats.entry_count, 0);
        prop_assert_eq!(stats.current_size, 0);
        prop_assert_eq!(stats.hits, 0);
        prop_assert_eq!(stats.misses, 0);
        prop_assert_eq!(stats.evictions, 0);
        prop_assert!(store.get(&probe_key).is_none());
    }
}

// Separate proptest block with fewer cases for time-sensitive expiry tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // For any batch of entries left idle past max_age, the expiry sweep
    // removes all of them and spares entries accessed since.
    #[test]
    fn prop_expiry_sweep_removes_idle_entries(
        idle_keys in prop::collection::hash_set(key_strategy(), 1..6)
    ) {
        let fresh_key = "fresh_entry_key".to_string();
        prop_assume!(!idle_keys.contains(&fresh_key));

        let mut store: EvictionStore<String> = EvictionStore::new(TEST_MAX_SIZE);
        for key in &idle_keys {
            store.set(key.clone(), format!("value_{}", key), 10);
        }

        // Let the initial batch go idle, then add a fresh entry
        sleep(Duration::from_millis(80));
        store.set(fresh_key.clone(), "fresh".to_string(), 10);

        let mut removed = store.remove_expired_entries(Duration::from_millis(50));
        removed.sort();
        let mut expected: Vec<String> = idle_keys.iter().cloned().collect();
        expected.sort();

        prop_assert_eq!(removed, expected);
        prop_assert_eq!(store.len(), 1);
        prop_assert!(store.get(&fresh_key).is_some());
    }
}

// == Property Test for Concurrent Operation Correctness ==
// Exercises the store behind Arc<RwLock<_>>, the way the engine shares it

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // For any set of operations issued from concurrent tasks, the store
    // settles into a consistent state: within capacity, with sane counters.
    #[test]
    fn prop_concurrent_operation_correctness(
        initial_entries in prop::collection::hash_map(key_strategy(), 1u64..=50, 1..10),
        operations in prop::collection::vec(cache_op_strategy(), 10..30)
    ) {
        use std::sync::Arc;
        use tokio::sync::RwLock;

        let rt = tokio::runtime::Runtime::new().unwrap();

        rt.block_on(async {
            let store = Arc::new(RwLock::new(EvictionStore::<String>::new(1_000)));

            {
                let mut cache = store.write().await;
                for (key, size) in &initial_entries {
                    cache.set(key.clone(), format!("value_{}", key), *size);
                }
            }

            let mut handles = vec![];
            for op in operations {
                let store_clone = Arc::clone(&store);
                handles.push(tokio::spawn(async move {
                    let mut cache = store_clone.write().await;
                    apply(&mut cache, &op);
                }));
            }
            for handle in handles {
                handle.await.expect("Task should not panic");
            }

            let cache = store.read().await;
            let stats = cache.get_stats();
            prop_assert!(
                stats.current_size <= stats.max_size,
                "Cache exceeded capacity under concurrency"
            );
            prop_assert!((0.0..=1.0).contains(&stats.hit_rate));
            prop_assert_eq!(stats.entry_count, cache.len());
            Ok(())
        })?;
    }
}

// == Additional Unit Tests for Edge Cases ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_above_one_drains_store() {
        let mut store: EvictionStore<String> = EvictionStore::new(TEST_MAX_SIZE);
        store.set("a".to_string(), "a".to_string(), 10);
        store.set("b".to_string(), "b".to_string(), 10);

        // Ratios above 1.0 cannot remove more than everything
        let report = store.remove_by_usage_frequency(2.0);
        assert_eq!(report.removed_size, 20);
        assert!(store.is_empty());
    }

    #[test]
    fn test_negative_ratio_is_noop() {
        let mut store: EvictionStore<String> = EvictionStore::new(TEST_MAX_SIZE);
        store.set("a".to_string(), "a".to_string(), 10);

        let report = store.remove_by_usage_frequency(-0.5);
        assert_eq!(report.removed_count, 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_frequency_eviction_on_empty_store() {
        let mut store: EvictionStore<String> = EvictionStore::new(TEST_MAX_SIZE);
        let report = store.remove_by_usage_frequency(0.5);
        assert_eq!(report.removed_count, 0);
        assert_eq!(report.removed_size, 0);
        assert!(report.removed_keys.is_empty());
    }

    #[test]
    fn test_sweep_on_empty_store() {
        let mut store: EvictionStore<String> = EvictionStore::new(TEST_MAX_SIZE);
        let removed = store.remove_expired_entries(Duration::from_secs(1));
        assert!(removed.is_empty());
    }

    #[test]
    fn test_set_key_collision_in_sequence() {
        // HashSet strategies guarantee distinct keys; make sure repeated
        // sets of one key through the op path stay consistent too
        let mut store: EvictionStore<String> = EvictionStore::new(100);
        for i in 0..10 {
            apply(
                &mut store,
                &CacheOp::Set {
                    key: "same".to_string(),
                    size: 10 + i,
                },
            );
        }
        assert_eq!(store.len(), 1);
        assert_eq!(store.current_size(), 19);
    }
}
