//! One intern table behind one lock, lazily constructed.
//!
//! A `Mutex` rather than an `RwLock`: every intern-table operation here,
//! including a pure hit, mutates the use-counter and possibly the churn
//! pool, so there is no useful read-only path.
//!
//! Construct-once-then-compare-and-swap is realized as
//! `Mutex<Option<InternTable>>`: the table is built the first time the
//! lock is held and the option is `None`, which gives the same "exactly
//! one table ever visible" guarantee as an explicit CAS without unsafe
//! atomics.

use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::Mutex;
use sic_common::InternResult;
use sic_table::{CanonicalString, HashModeHint, InternTable, TableConfig, TableStats, TrimLevel};

const SHARD_CAPACITY: usize = 10_000;
const SHARD_INITIAL_CAPACITY: usize = 1;

const MODE_HINT_DETERMINISTIC: u8 = 0;
const MODE_HINT_RANDOMIZED: u8 = 1;

pub(crate) struct Shard {
    table: Mutex<Option<InternTable>>,
    /// Best-effort, lock-free mirror of the table's hashing mode, read by
    /// the pool's fast path *before* acquiring `table`'s lock. Staleness
    /// is only possible in the safe direction (hint says deterministic,
    /// table already flipped to randomized) since the flip is one-way;
    /// `InternTable::lookup_or_insert_prehashed` recomputes the hash
    /// itself whenever the table's real mode disagrees with ours.
    mode_hint: AtomicU8,
}

impl Shard {
    pub(crate) fn new() -> Self {
        Shard { table: Mutex::new(None), mode_hint: AtomicU8::new(MODE_HINT_DETERMINISTIC) }
    }

    pub(crate) fn mode_hint(&self) -> HashModeHint {
        match self.mode_hint.load(Ordering::Relaxed) {
            MODE_HINT_RANDOMIZED => HashModeHint::Randomized,
            _ => HashModeHint::Deterministic,
        }
    }

    fn config(max_length: usize) -> TableConfig {
        TableConfig::new(max_length)
            .with_max_count(SHARD_CAPACITY)
            .with_initial_capacity(SHARD_INITIAL_CAPACITY)
    }

    /// Runs `f` against this shard's table, building it first if this is
    /// the shard's first use. Updates `mode_hint` afterward so the next
    /// fast-path read sees a flip that happened during `f`.
    pub(crate) fn with_table<R>(
        &self,
        max_length: usize,
        f: impl FnOnce(&mut InternTable) -> InternResult<R>,
    ) -> InternResult<R> {
        let mut guard = self.table.lock();
        if guard.is_none() {
            *guard = Some(InternTable::new(Self::config(max_length))?);
        }
        let table = guard.as_mut().expect("just constructed above");
        let result = f(table);
        if table.hash_mode() == HashModeHint::Randomized {
            self.mode_hint.store(MODE_HINT_RANDOMIZED, Ordering::Relaxed);
        }
        result
    }

    pub(crate) fn contains(&self, candidate: &str) -> bool {
        match self.table.lock().as_ref() {
            Some(table) => table.contains(candidate),
            None => false,
        }
    }

    pub(crate) fn remove(&self, candidate: &str) -> bool {
        match self.table.lock().as_mut() {
            Some(table) => table.remove(candidate),
            None => false,
        }
    }

    pub(crate) fn enumerate_into(&self, out: &mut Vec<CanonicalString>) {
        if let Some(table) = self.table.lock().as_ref() {
            out.extend(table.enumerate());
        }
    }

    pub(crate) fn ensure_capacity(&self, max_length: usize, target: usize) -> InternResult<()> {
        self.with_table(max_length, |t| t.ensure_capacity(target))
    }

    pub(crate) fn trim_excess(&self) {
        if let Some(table) = self.table.lock().as_mut() {
            table.trim_excess();
        }
    }

    pub(crate) fn trim(&self, level: TrimLevel) {
        if let Some(table) = self.table.lock().as_mut() {
            table.trim(level);
        }
    }

    pub(crate) fn stats(&self) -> Option<TableStats> {
        self.table.lock().as_ref().map(|t| t.stats())
    }

    /// Detaches this shard's table, if any, returning its final stats so
    /// the pool can fold them into its released-shard totals. The table
    /// itself is dropped; the next operation on this shard rebuilds one
    /// from scratch, losing canonical identity for anything it held.
    pub(crate) fn detach(&self) -> Option<TableStats> {
        self.mode_hint.store(MODE_HINT_DETERMINISTIC, Ordering::Relaxed);
        self.table.lock().take().map(|t| t.stats())
    }
}
