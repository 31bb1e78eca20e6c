//! # sic-pool
//!
//! The sharded, thread-safe façade over `sic-table`'s single-threaded
//! intern tables: 32 independently-locked shards selected by the low
//! five bits of a candidate's first code unit, a scratch-buffer pool for
//! transcoding byte inputs, and a background trim scheduler reacting to
//! a host memory-pressure signal.

mod buffer;
mod pool;
mod shard;
mod stats;
mod trim;

pub use pool::{SharedInternPool, SHARD_COUNT};
pub use stats::Stats;
pub use trim::{MemoryPressureSource, PeriodicPressureSource, PressureLevel};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pool() -> SharedInternPool {
        SharedInternPool::new()
    }

    #[test]
    fn repeated_interning_returns_identical_instance() {
        let p = pool();
        let a = p.intern_str("shared").unwrap();
        let b = p.intern_str("shared").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_values_in_different_shards_both_land() {
        let p = pool();
        let a = p.intern_str("alpha").unwrap();
        let b = p.intern_str("zzz-totally-different").unwrap();
        assert_ne!(a.as_ref(), b.as_ref());
        assert!(p.contains("alpha"));
        assert!(p.contains("zzz-totally-different"));
    }

    #[test]
    fn all_four_input_flavors_agree_on_identity() {
        let p = pool();
        let native = p.intern(Some("alpha")).unwrap().unwrap();
        let units = p.intern_str("alpha").unwrap();
        let ascii = p.intern_ascii(b"alpha").unwrap();
        let utf8 = p.intern_utf8("alpha".as_bytes()).unwrap();
        assert!(Arc::ptr_eq(&native, &units));
        assert!(Arc::ptr_eq(&native, &ascii));
        assert!(Arc::ptr_eq(&native, &utf8));
    }

    #[test]
    fn null_candidate_returns_none() {
        let p = pool();
        assert!(p.intern(None).unwrap().is_none());
    }

    #[test]
    fn empty_candidate_returns_shared_canonical_empty() {
        let p = pool();
        let a = p.intern_str("").unwrap();
        let b = sic_table::canonical_empty();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn null_empty_and_over_length_calls_count_toward_considered_not_added() {
        let p = pool();
        let before = p.stats();

        assert!(p.intern(None).unwrap().is_none());
        p.intern_str("").unwrap();
        let long: String = "x".repeat(sic_table::MAX_CANDIDATE_LENGTH + 10);
        p.intern_str(&long).unwrap();

        let after = p.stats();
        assert_eq!(after.considered, before.considered + 3);
        assert_eq!(after.added, before.added);
        assert_eq!(after.deduped, before.deduped + 3);
        assert_eq!(after.count, before.count);
    }

    #[test]
    fn over_length_candidate_is_never_stored() {
        let p = pool();
        let long: String = "x".repeat(sic_table::MAX_CANDIDATE_LENGTH + 10);
        let out = p.intern_str(&long).unwrap();
        assert_eq!(out.as_ref(), long);
        assert!(!p.contains(&long));
    }

    #[test]
    fn remove_then_reinsert_is_a_fresh_instance() {
        let p = pool();
        let first = p.intern_str("evict-me").unwrap();
        assert!(p.remove("evict-me"));
        assert!(!p.contains("evict-me"));
        let second = p.intern_str("evict-me").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn concurrent_interning_of_the_same_value_converges_on_one_instance() {
        let pool = Arc::new(pool());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let pool = Arc::clone(&pool);
            handles.push(std::thread::spawn(move || pool.intern_str("contended").unwrap()));
        }
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for r in &results[1..] {
            assert!(Arc::ptr_eq(&results[0], r));
        }
    }

    #[test]
    fn stats_counts_adds_and_dedupes_across_shards() {
        let p = pool();
        for i in 0..50 {
            p.intern_str(&format!("item-{i}")).unwrap();
        }
        p.intern_str("item-0").unwrap();
        let stats = p.stats();
        assert_eq!(stats.count, 50);
        assert_eq!(stats.added, 50);
        assert_eq!(stats.deduped, 1);
    }

    #[test]
    fn clear_drops_all_shards_and_folds_stats_into_released_totals() {
        let p = pool();
        for i in 0..20 {
            p.intern_str(&format!("gone-{i}")).unwrap();
        }
        let before = p.stats();
        p.clear();
        let after = p.stats();
        assert_eq!(after.count, 0);
        assert_eq!(after.added, before.added);
        assert!(!p.contains("gone-0"));
    }

    struct FixedPressure {
        bytes_used: AtomicUsize,
        threshold: usize,
    }

    impl MemoryPressureSource for FixedPressure {
        fn bytes_used(&self) -> usize {
            self.bytes_used.load(Ordering::Relaxed)
        }
        fn high_load_threshold(&self) -> usize {
            self.threshold
        }
    }

    #[test]
    fn notify_under_high_pressure_detaches_every_shard() {
        let pool = Arc::new(pool());
        for i in 0..10 {
            pool.intern_str(&format!("hot-{i}")).unwrap();
        }
        pool.set_pressure_source(FixedPressure {
            bytes_used: AtomicUsize::new(95),
            threshold: 100,
        });
        pool.notify_collector_sweep();
        // The trim runs on a background thread; give it a moment.
        for _ in 0..50 {
            if !pool.contains("hot-0") {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        assert!(!pool.contains("hot-0"));
    }

    #[test]
    fn shared_singleton_returns_the_same_instance() {
        let a = SharedInternPool::shared();
        let b = SharedInternPool::shared();
        assert!(Arc::ptr_eq(a, b));
    }
}
