//! The single-threaded intern table: an open-addressed hash table with
//! free-list slot reuse and a churn-pool-driven approximate-LRU eviction
//! path, using parallel index-linked arrays instead of a pointer-based
//! arena so entries can be compacted and relocated without invalidating
//! references into the table.

use std::sync::Arc;

use sic_common::primes::{next_prime, FastMod};
use sic_common::{InternError, InternResult};

use crate::churn::{ChurnPool, Placement};
use crate::entry::{canonical_empty, CanonicalString, Entry, START_OF_FREE_LIST};
use crate::hash::{
    code_unit_len, code_units, hash_code_units, HashMode, HashModeHint, REHASH_CHAIN_THRESHOLD,
};

/// Upper bound on `max_length`: no single candidate may exceed this many
/// UTF-16 code units. Matches the sharded pool's own fixed ceiling so a
/// table constructed directly carries the same guarantee as one behind
/// the pool.
pub const MAX_CANDIDATE_LENGTH: usize = 640;

/// Construction parameters for an `InternTable`.
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Longest candidate (in UTF-16 code units) the table will accept.
    pub max_length: usize,
    /// Soft cap on live entries; `None` means unbounded. Reaching the cap
    /// triggers one churn-pool eviction before the next insert.
    pub max_count: Option<usize>,
    /// Bucket array size to allocate up front, rounded up to a prime.
    pub initial_capacity: usize,
}

impl TableConfig {
    /// A table with no count cap and a default small initial capacity.
    pub fn new(max_length: usize) -> Self {
        TableConfig { max_length, max_count: None, initial_capacity: 0 }
    }

    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = Some(max_count);
        self
    }

    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    fn validate(&self) -> InternResult<()> {
        if self.max_length == 0 {
            return Err(InternError::invalid_argument("max_length must be at least 1"));
        }
        if self.max_length > MAX_CANDIDATE_LENGTH {
            return Err(InternError::invalid_argument("max_length exceeds the 640 code-unit ceiling"));
        }
        if let Some(0) = self.max_count {
            return Err(InternError::invalid_argument("max_count must be at least 1 when set"));
        }
        Ok(())
    }
}

/// Aggressiveness of a `trim` pass. Each level tightens how far an
/// entry's use-stamp may lag behind the table's current-use counter
/// before it is evicted outright, regardless of churn-pool membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimLevel {
    Minor,
    Medium,
    Major,
}

/// Point-in-time counters for one table.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableStats {
    pub count: usize,
    pub considered: u64,
    pub added: u64,
    pub evicted: u64,
    pub capacity: usize,
}

/// An open-addressed, free-list-backed string intern table.
///
/// Not `Send`/`Sync` on its own — concurrent access is the sharded
/// pool's job (`sic-pool`), which puts one table behind one lock per
/// shard. A bare `InternTable` assumes single-threaded ownership; a
/// hash-chain walk that exceeds the table's own capacity is treated as
/// proof that assumption was violated (`InternError::ConcurrentModification`).
pub struct InternTable {
    buckets: Vec<i32>,
    entries: Vec<Entry>,
    free_list: i32,
    free_count: usize,
    count: usize,
    fast_mod: FastMod,
    mode: HashMode,
    current_use: i64,
    added: u64,
    evicted: u64,
    churn: ChurnPool,
    config: TableConfig,
}

impl InternTable {
    pub fn new(config: TableConfig) -> InternResult<Self> {
        config.validate()?;
        let bucket_len = next_prime(config.initial_capacity.max(1) * 2 + 1);
        Ok(InternTable {
            buckets: vec![0i32; bucket_len],
            entries: Vec::new(),
            free_list: -1,
            free_count: 0,
            count: 0,
            fast_mod: FastMod::new(bucket_len),
            mode: HashMode::Deterministic,
            current_use: 0,
            added: 0,
            evicted: 0,
            churn: ChurnPool::default(),
            config,
        })
    }

    /// Top-level `intern` entry point: handles the null, empty, and
    /// over-length short circuits itself before delegating to
    /// `lookup_or_insert` for the remaining case.
    pub fn intern(&mut self, candidate: Option<&str>) -> InternResult<Option<CanonicalString>> {
        let Some(s) = candidate else {
            self.tick();
            return Ok(None);
        };
        if s.is_empty() {
            self.tick();
            return Ok(Some(canonical_empty()));
        }
        if code_unit_len(s) > self.config.max_length {
            self.tick();
            return Ok(Some(Arc::from(s)));
        }
        self.lookup_or_insert(s).map(Some)
    }

    /// The table's core operation: find `candidate` or insert it,
    /// returning the canonical shared instance either way.
    ///
    /// Precondition: `candidate` is non-empty and at most `max_length`
    /// UTF-16 code units; violating this returns `InvalidArgument` rather
    /// than silently truncating or panicking.
    pub fn lookup_or_insert(&mut self, candidate: &str) -> InternResult<CanonicalString> {
        let units = code_units(candidate);
        let hash = hash_code_units(HashMode::Deterministic, &units);
        self.lookup_or_insert_prehashed(candidate, &units, hash)
    }

    /// Same operation, but the caller has already computed the UTF-16
    /// code units and a deterministic-mode hash — the sharded pool does
    /// this outside the shard lock so the lock is only held for the
    /// probe/insert itself. If this table has already flipped to
    /// randomized hashing, `deterministic_hash` is simply discarded and
    /// recomputed from `units`, which is still cheaper than re-encoding
    /// the candidate from `&str`.
    pub fn lookup_or_insert_prehashed(
        &mut self,
        candidate: &str,
        units: &[u16],
        deterministic_hash: u32,
    ) -> InternResult<CanonicalString> {
        if candidate.is_empty() {
            return Err(InternError::invalid_argument("candidate must not be empty"));
        }
        if units.len() > self.config.max_length {
            return Err(InternError::invalid_argument("candidate exceeds max_length"));
        }

        let stamp = self.tick();
        let mut hash = if self.mode == HashMode::Randomized {
            hash_code_units(self.mode, units)
        } else {
            deterministic_hash
        };

        loop {
            let bucket_idx = self.fast_mod.reduce(hash as u64);
            let mut slot = self.buckets[bucket_idx];
            let mut steps = 0usize;
            let limit = self.entries.len().max(1);

            while slot != 0 {
                steps += 1;
                if steps > limit {
                    return Err(InternError::ConcurrentModification);
                }
                let idx = (slot - 1) as usize;
                if self.entries[idx].hash == hash && self.entries[idx].value.as_ref() == candidate {
                    self.refresh_on_hit(idx, stamp);
                    return Ok(self.entries[idx].value.clone());
                }
                slot = self.entries[idx].next;
            }

            if steps > REHASH_CHAIN_THRESHOLD && self.mode == HashMode::Deterministic {
                self.flip_to_randomized();
                hash = hash_code_units(self.mode, &units);
                continue;
            }

            return Ok(self.insert_new(candidate, hash, stamp));
        }
    }

    pub fn contains(&self, candidate: &str) -> bool {
        if candidate.is_empty() {
            return true;
        }
        let units = code_units(candidate);
        let hash = hash_code_units(self.mode, &units);
        let bucket_idx = self.fast_mod.reduce(hash as u64);
        let mut slot = self.buckets[bucket_idx];
        while slot != 0 {
            let idx = (slot - 1) as usize;
            if self.entries[idx].hash == hash && self.entries[idx].value.as_ref() == candidate {
                return true;
            }
            slot = self.entries[idx].next;
        }
        false
    }

    /// Removes `candidate` if present, returning whether it was found.
    /// Unlike capacity/trim eviction this never touches `evicted` — it
    /// is a deliberate caller action, not a pressure response.
    pub fn remove(&mut self, candidate: &str) -> bool {
        let units = code_units(candidate);
        let hash = hash_code_units(self.mode, &units);
        let bucket_idx = self.fast_mod.reduce(hash as u64);
        let mut slot = self.buckets[bucket_idx];
        while slot != 0 {
            let idx = (slot - 1) as usize;
            if self.entries[idx].hash == hash && self.entries[idx].value.as_ref() == candidate {
                self.detach_from_churn_if_present(idx);
                self.unlink_from_bucket(bucket_idx, idx);
                self.finish_free(idx);
                return true;
            }
            slot = self.entries[idx].next;
        }
        false
    }

    /// All live values, in unspecified order.
    pub fn enumerate(&self) -> impl Iterator<Item = CanonicalString> + '_ {
        self.entries.iter().filter(|e| !e.is_free()).map(|e| e.value.clone())
    }

    /// Evicts entries whose use-stamp has lagged the table's current-use
    /// counter past `level`'s threshold, or that are already tracked by
    /// the churn pool. Escalates from `Minor` (gen-1 untouched) through
    /// `Major` (both generations held to the live count).
    pub fn trim(&mut self, level: TrimLevel) {
        let count = self.count as i64;
        let (max_dist0, max_dist1) = match level {
            TrimLevel::Minor => ((count + count / 2) * 2, i64::MAX),
            TrimLevel::Medium => (count * 2, count * 2 * 2),
            TrimLevel::Major => (count * 2, count * 2),
        };

        for idx in 0..self.entries.len() {
            if self.entries[idx].is_free() {
                continue;
            }
            let in_churn = self.entries[idx].in_churn();
            let abs = self.entries[idx].use_stamp_abs() as i64;
            let dist = self.current_use - abs;
            let over_budget = if self.entries[idx].generation() == 0 {
                dist > max_dist0
            } else {
                dist > max_dist1
            };

            if in_churn || over_budget {
                self.detach_from_churn_if_present(idx);
                let bucket_idx = self.fast_mod.reduce(self.entries[idx].hash as u64);
                self.unlink_from_bucket(bucket_idx, idx);
                self.finish_free(idx);
                self.evicted += 1;
            }
        }

        self.compact();
    }

    /// Resizes the backing arrays to the next prime at least `n`, so that
    /// `n` entries can be added afterward without a rehash mid-insert.
    /// `n` is an absolute target count, not an increment.
    pub fn ensure_capacity(&mut self, n: usize) -> InternResult<()> {
        let target_len = next_prime(n.max(self.count) * 2 + 1);
        if target_len > self.buckets.len() {
            self.resize_buckets(target_len);
        }
        Ok(())
    }

    /// Shrinks the bucket and entry arrays to fit the live count.
    pub fn trim_excess(&mut self) {
        self.compact();
        let target_len = next_prime(self.count * 2 + 1);
        if target_len < self.buckets.len() {
            self.resize_buckets(target_len);
        }
    }

    pub fn stats(&self) -> TableStats {
        TableStats {
            count: self.count,
            considered: self.considered(),
            added: self.added,
            evicted: self.evicted,
            capacity: self.buckets.len(),
        }
    }

    pub fn considered(&self) -> u64 {
        (self.current_use / 2) as u64
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Current hashing mode, for a caller (the sharded pool) that wants to
    /// cache a snapshot of it outside this table's lock. The flip from
    /// `Deterministic` to `Randomized` is one-way, so a stale snapshot is
    /// only ever stale in the safe direction — `lookup_or_insert_prehashed`
    /// recomputes the hash itself whenever the table has since flipped.
    pub fn hash_mode(&self) -> HashModeHint {
        self.mode.into()
    }

    // ---- internals -----------------------------------------------------

    fn tick(&mut self) -> i64 {
        self.current_use += 2;
        self.current_use
    }

    fn refresh_on_hit(&mut self, idx: usize, stamp: i64) {
        self.detach_from_churn_if_present(idx);
        self.entries[idx].last_use = stamp | 1;
    }

    fn insert_new(&mut self, candidate: &str, hash: u32, stamp: i64) -> CanonicalString {
        self.maybe_evict_for_capacity();
        self.grow_if_needed();

        let bucket_idx = self.fast_mod.reduce(hash as u64);
        let value: CanonicalString = Arc::from(candidate);
        let next = self.buckets[bucket_idx];
        let idx = self.alloc_slot(Entry { hash, next, value: value.clone(), last_use: stamp });
        self.buckets[bucket_idx] = (idx + 1) as i32;
        self.added += 1;
        self.count += 1;
        value
    }

    fn alloc_slot(&mut self, entry: Entry) -> usize {
        if self.free_list != -1 {
            let idx = self.free_list as usize;
            self.free_list = START_OF_FREE_LIST - self.entries[idx].next;
            self.free_count -= 1;
            self.entries[idx] = entry;
            idx
        } else {
            self.entries.push(entry);
            self.entries.len() - 1
        }
    }

    fn finish_free(&mut self, idx: usize) {
        self.entries[idx].next = START_OF_FREE_LIST - self.free_list;
        self.free_list = idx as i32;
        self.free_count += 1;
        self.count -= 1;
        self.entries[idx].value = canonical_empty();
        self.entries[idx].last_use = 0;
    }

    fn detach_from_churn_if_present(&mut self, idx: usize) {
        if self.entries[idx].in_churn() {
            let gen = self.entries[idx].generation();
            let stamp = self.entries[idx].use_stamp_abs();
            self.churn.list_mut(gen).remove(stamp);
        }
    }

    fn unlink_from_bucket(&mut self, bucket_idx: usize, idx: usize) {
        let target_slot = (idx + 1) as i32;
        let mut slot = self.buckets[bucket_idx];
        let mut prev: i32 = 0;
        while slot != 0 {
            if slot == target_slot {
                let next = self.entries[idx].next;
                if prev == 0 {
                    self.buckets[bucket_idx] = next;
                } else {
                    self.entries[(prev - 1) as usize].next = next;
                }
                return;
            }
            prev = slot;
            slot = self.entries[(slot - 1) as usize].next;
        }
    }

    fn grow_if_needed(&mut self) {
        if self.free_list == -1 && self.entries.len() >= self.buckets.len() {
            let new_len = next_prime(self.count * 2 + 1).max(self.buckets.len() + 1);
            self.resize_buckets(new_len);
        }
    }

    fn resize_buckets(&mut self, new_len: usize) {
        self.fast_mod = FastMod::new(new_len);
        self.buckets = vec![0i32; new_len];
        for idx in 0..self.entries.len() {
            if self.entries[idx].is_free() {
                continue;
            }
            let bucket_idx = self.fast_mod.reduce(self.entries[idx].hash as u64);
            self.entries[idx].next = self.buckets[bucket_idx];
            self.buckets[bucket_idx] = (idx + 1) as i32;
        }
    }

    /// Drops freed slots from the entry array and rebuilds bucket heads.
    fn compact(&mut self) {
        if self.free_count == 0 {
            return;
        }
        let mut survivors = Vec::with_capacity(self.count);
        for entry in self.entries.drain(..) {
            if !entry.is_free() {
                survivors.push(entry);
            }
        }
        self.entries = survivors;
        self.free_list = -1;
        self.free_count = 0;
        let len = self.buckets.len();
        self.resize_buckets(len);
    }

    fn maybe_evict_for_capacity(&mut self) {
        let Some(max_count) = self.config.max_count else { return };
        if self.count >= max_count {
            self.evict_one_victim();
        }
    }

    fn evict_one_victim(&mut self) {
        let Some((gen, stamp, value)) = self.select_victim() else { return };
        self.churn.list_mut(gen).remove(stamp);
        if let Some(idx) = self.find_entry_index_by_value(&value) {
            let bucket_idx = self.fast_mod.reduce(self.entries[idx].hash as u64);
            self.unlink_from_bucket(bucket_idx, idx);
            self.finish_free(idx);
            self.evicted += 1;
        }
    }

    /// Picks the globally oldest candidate across both generation
    /// fronts, regenerating the pool first if generation-0 ran dry.
    fn select_victim(&mut self) -> Option<(u8, u64, CanonicalString)> {
        if self.churn.gen0.is_empty() {
            self.regenerate_churn_pool();
        }
        let g0 = self.churn.gen0.front().cloned();
        let g1 = self.churn.gen1.front().cloned();
        match (g0, g1) {
            (Some(a), Some(b)) if a.0 <= b.0 => Some((0, a.0, a.1)),
            (Some(_), Some(b)) => Some((1, b.0, b.1)),
            (Some(a), None) => Some((0, a.0, a.1)),
            (None, Some(b)) => Some((1, b.0, b.1)),
            (None, None) => None,
        }
    }

    /// Walks every live, not-yet-in-churn entry and offers it to its
    /// generation's churn list. An offer that displaces that list's
    /// previous maximum un-marks the displaced entry so it is once again
    /// eligible (invariant: in-churn sign bit set iff tracked by a list).
    fn regenerate_churn_pool(&mut self) {
        for idx in 0..self.entries.len() {
            if self.entries[idx].is_free() || self.entries[idx].in_churn() {
                continue;
            }
            let stamp = self.entries[idx].use_stamp_abs();
            let gen = self.entries[idx].generation();
            let value = self.entries[idx].value.clone();

            match self.churn.list_mut(gen).try_insert(stamp, value) {
                Placement::Inserted => {
                    self.entries[idx].last_use = -self.entries[idx].last_use;
                }
                Placement::InsertedEvicting(evicted_stamp, evicted_value) => {
                    self.entries[idx].last_use = -self.entries[idx].last_use;
                    if let Some(evidx) = self.find_entry_index_by_value(&evicted_value) {
                        if self.entries[evidx].in_churn()
                            && self.entries[evidx].use_stamp_abs() == evicted_stamp
                        {
                            self.entries[evidx].last_use = evicted_stamp as i64;
                        }
                    }
                }
                Placement::Rejected => {}
            }
        }
    }

    fn find_entry_index_by_value(&self, value: &CanonicalString) -> Option<usize> {
        self.entries.iter().position(|e| !e.is_free() && Arc::ptr_eq(&e.value, value))
    }

    fn flip_to_randomized(&mut self) {
        tracing::warn!(
            capacity = self.buckets.len(),
            count = self.count,
            "hash chain exceeded {REHASH_CHAIN_THRESHOLD} steps; flipping to randomized hashing"
        );
        self.mode = HashMode::Randomized;
        for idx in 0..self.entries.len() {
            if self.entries[idx].is_free() {
                continue;
            }
            let units = code_units(self.entries[idx].value.as_ref());
            self.entries[idx].hash = hash_code_units(self.mode, &units);
        }
        let len = self.buckets.len();
        self.resize_buckets(len);
    }
}
