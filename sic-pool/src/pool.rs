//! The sharded, thread-safe façade over many single-threaded intern
//! tables: `SharedInternPool`.
//!
//! A fixed shard array with shard-index masking and one lock per shard,
//! selecting shards by the low five bits of a candidate's first code
//! unit; each shard's own churn-pool eviction (`sic-table`) does the
//! actual LRU-approximate eviction, so this façade only routes and locks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use sic_common::{Encoding, InternResult};
use sic_table::{CanonicalString, TrimLevel, MAX_CANDIDATE_LENGTH};

use crate::buffer::BufferPool;
use crate::shard::Shard;
use crate::stats::{ReleasedTotals, Stats};
use crate::trim::{MemoryPressureSource, PeriodicPressureSource, PressureLevel};

/// Fixed shard count (power of two, so masking replaces a modulo).
pub const SHARD_COUNT: usize = 32;

/// Above this many UTF-8 bytes we no longer trust the stack buffer to
/// hold the candidate's UTF-16 view (UTF-16 length never exceeds UTF-8
/// byte length, so this bound is always safe) and rent one instead.
const STACK_TRANSCODE_LIMIT: usize = 256;

/// A sharded, lock-per-shard string intern pool safe to share across
/// threads. Each shard is an independent `sic_table::InternTable`
/// bounded at 10,000 entries; no lock ever spans more than one shard.
///
/// Cheap to clone: a thin handle around an `Arc<Inner>`, so the
/// background trim thread can hold its own clone without requiring
/// callers to wrap the pool in an `Arc` themselves.
#[derive(Clone)]
pub struct SharedInternPool {
    inner: Arc<Inner>,
}

struct Inner {
    shards: Vec<Shard>,
    buffers: BufferPool,
    released: Mutex<ReleasedTotals>,
    pressure: Mutex<Option<Arc<dyn MemoryPressureSource>>>,
    trimming: AtomicBool,
    collections: AtomicU64,
    /// Counts null, empty, and over-length `intern` calls: none of these
    /// ever reach a shard's table, so they would otherwise vanish from
    /// `stats()` instead of counting toward `considered` (and therefore
    /// `deduped`) the way a bare `InternTable` counts them via its own
    /// `tick()`.
    short_circuited: AtomicU64,
}

impl Default for SharedInternPool {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedInternPool {
    pub fn new() -> Self {
        let mut shards = Vec::with_capacity(SHARD_COUNT);
        for _ in 0..SHARD_COUNT {
            shards.push(Shard::new());
        }
        SharedInternPool {
            inner: Arc::new(Inner {
                shards,
                buffers: BufferPool::new(),
                released: Mutex::new(ReleasedTotals::default()),
                pressure: Mutex::new(None),
                trimming: AtomicBool::new(false),
                collections: AtomicU64::new(0),
                short_circuited: AtomicU64::new(0),
            }),
        }
    }

    /// The process-wide pool, lazily constructed on first use (single
    /// check via `OnceLock`, equivalent to a single-check-then-compare-
    /// and-swap initializer).
    pub fn shared() -> &'static Arc<SharedInternPool> {
        static SHARED: OnceLock<Arc<SharedInternPool>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(SharedInternPool::new()))
    }

    // ---- interning -------------------------------------------------

    /// `intern` over an `Option`: `None` returns `None` without touching
    /// any shard.
    pub fn intern(&self, candidate: Option<&str>) -> InternResult<Option<CanonicalString>> {
        match candidate {
            Some(s) => self.intern_str(s).map(Some),
            None => {
                self.record_short_circuit();
                Ok(None)
            }
        }
    }

    /// Core non-null entry point. Empty strings and over-length
    /// candidates are short-circuited before any shard is touched.
    pub fn intern_str(&self, candidate: &str) -> InternResult<CanonicalString> {
        if candidate.is_empty() {
            self.record_short_circuit();
            return Ok(sic_table::canonical_empty());
        }

        if candidate.len() <= STACK_TRANSCODE_LIMIT {
            let mut stack = [0u16; STACK_TRANSCODE_LIMIT];
            let mut len = 0;
            for unit in candidate.encode_utf16() {
                stack[len] = unit;
                len += 1;
            }
            return self.intern_units(candidate, &stack[..len]);
        }

        let mut rented = self.inner.buffers.rent(candidate.len());
        rented.extend(candidate.encode_utf16());
        if rented.len() > MAX_CANDIDATE_LENGTH {
            self.record_short_circuit();
            return Ok(Arc::from(candidate));
        }
        self.intern_units(candidate, &rented)
    }

    /// `intern_ascii`: bytes interpreted as 7-bit ASCII code units.
    pub fn intern_ascii(&self, bytes: &[u8]) -> InternResult<CanonicalString> {
        let decoded = sic_common::decode_ascii(bytes)?;
        self.intern_str(&decoded)
    }

    /// `intern_utf8`: bytes decoded as UTF-8.
    pub fn intern_utf8(&self, bytes: &[u8]) -> InternResult<CanonicalString> {
        let decoded = sic_common::decode_utf8(bytes)?;
        self.intern_str(&decoded)
    }

    /// `intern(bytes, encoding)`: dispatches to the named encoding.
    pub fn intern_encoded(&self, bytes: &[u8], encoding: Encoding) -> InternResult<CanonicalString> {
        match encoding {
            Encoding::Ascii => self.intern_ascii(bytes),
            Encoding::Utf8 => self.intern_utf8(bytes),
        }
    }

    /// Routes an already-transcoded code-unit view to its shard and
    /// delegates to the shard's table, computing the hash outside the
    /// shard's lock to keep the critical section as short as possible.
    fn intern_units(&self, candidate: &str, units: &[u16]) -> InternResult<CanonicalString> {
        if units.len() > MAX_CANDIDATE_LENGTH {
            self.record_short_circuit();
            return Ok(Arc::from(candidate));
        }
        let shard = &self.inner.shards[shard_index(units)];
        let hash = sic_table::hash_with_mode(shard.mode_hint(), units);
        shard.with_table(MAX_CANDIDATE_LENGTH, |table| {
            table.lookup_or_insert_prehashed(candidate, units, hash)
        })
    }

    /// Ticks the pool-level counter for a null, empty, or over-length
    /// `intern` call — the façade equivalent of `InternTable::tick`,
    /// since none of these three cases ever reach a shard's own counter.
    fn record_short_circuit(&self) {
        self.inner.short_circuited.fetch_add(1, Ordering::Relaxed);
    }

    // ---- lookups / removal / enumeration ----------------------------

    pub fn contains(&self, s: &str) -> bool {
        if s.is_empty() {
            return true;
        }
        let units = sic_table::code_units(s);
        if units.is_empty() || units.len() > MAX_CANDIDATE_LENGTH {
            return false;
        }
        self.inner.shards[shard_index(&units)].contains(s)
    }

    pub fn remove(&self, s: &str) -> bool {
        if s.is_empty() {
            return false;
        }
        let units = sic_table::code_units(s);
        if units.is_empty() || units.len() > MAX_CANDIDATE_LENGTH {
            return false;
        }
        self.inner.shards[shard_index(&units)].remove(s)
    }

    /// Materializes every live value across every shard. Unlike a single
    /// table's `enumerate`, this cannot be a lazy, lock-held iterator —
    /// no lock here is ever allowed to span more than one shard, so the
    /// sequence is collected shard-by-shard into an owned `Vec` instead.
    pub fn enumerate(&self) -> Vec<CanonicalString> {
        let mut out = Vec::new();
        for shard in &self.inner.shards {
            shard.enumerate_into(&mut out);
        }
        out
    }

    /// Resizes every shard's backing arrays so the pool can hold at least
    /// `n` entries total without a rehash mid-insert, spread evenly
    /// across shards (`n` is an absolute target, not an increment).
    pub fn ensure_capacity(&self, n: usize) -> InternResult<()> {
        let per_shard = n.div_ceil(SHARD_COUNT).max(1);
        for shard in &self.inner.shards {
            shard.ensure_capacity(MAX_CANDIDATE_LENGTH, per_shard)?;
        }
        Ok(())
    }

    pub fn trim_excess(&self) {
        for shard in &self.inner.shards {
            shard.trim_excess();
        }
    }

    /// Drops every shard's table outright. Bypasses the churn pool
    /// entirely, the same way the trim scheduler's high-pressure path
    /// does — simplest possible recovery, at the cost of canonical
    /// identity for anything previously interned.
    pub fn clear(&self) {
        self.detach_all_shards();
    }

    pub fn stats(&self) -> Stats {
        let released = *self.inner.released.lock();
        let mut total = Stats {
            added: released.added,
            considered: released.considered + self.inner.short_circuited.load(Ordering::Relaxed),
            count: 0,
            deduped: 0,
            evicted: released.evicted,
        };
        for shard in &self.inner.shards {
            if let Some(s) = shard.stats() {
                total.count += s.count;
                total.considered += s.considered;
                total.added += s.added;
                total.evicted += s.evicted;
            }
        }
        total.deduped = total.considered.saturating_sub(total.added);
        total
    }

    // ---- trim scheduler ----------------------------------------------

    /// Registers a memory-pressure source without starting a background
    /// driver — use this when the host calls `notify_collector_sweep`
    /// itself once per generational sweep.
    pub fn set_pressure_source(&self, source: impl MemoryPressureSource + 'static) {
        *self.inner.pressure.lock() = Some(Arc::new(source));
    }

    /// Starts the default standalone driver: a background thread waking
    /// every `interval` and calling `notify_collector_sweep`, standing in
    /// for a host collector that has no generational-sweep hook of its
    /// own to offer.
    pub fn start_periodic_trim(
        &self,
        source: impl MemoryPressureSource + 'static,
        interval: Duration,
    ) -> PeriodicPressureSource {
        *self.inner.pressure.lock() = Some(Arc::new(source));
        let pool = self.clone();
        PeriodicPressureSource::spawn(interval, move || pool.notify_collector_sweep())
    }

    /// The one-shot handle the host invokes once per generational sweep.
    /// Guards against re-entry: if a trim is already in flight, this
    /// returns immediately rather than queuing a second one.
    pub fn notify_collector_sweep(&self) {
        if self.inner.trimming.swap(true, Ordering::AcqRel) {
            return;
        }
        let pool = self.clone();
        std::thread::spawn(move || pool.run_trim_cycle());
    }

    fn run_trim_cycle(&self) {
        let level = {
            let source = self.inner.pressure.lock().clone();
            match source {
                Some(src) => PressureLevel::from_usage(src.bytes_used(), src.high_load_threshold()),
                None => PressureLevel::Low,
            }
        };

        if level == PressureLevel::High {
            tracing::warn!("high memory pressure reported; detaching all shards");
            self.detach_all_shards();
        } else {
            let cycle = self.inner.collections.load(Ordering::Relaxed) % 3;
            let trim_level = match cycle {
                0 => TrimLevel::Minor,
                1 => TrimLevel::Medium,
                _ => TrimLevel::Major,
            };
            for shard in &self.inner.shards {
                shard.trim(trim_level);
            }
        }

        let n = self.inner.collections.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(collections = n, "trim sweep complete");
        self.inner.trimming.store(false, Ordering::Release);
    }

    fn detach_all_shards(&self) {
        let mut released = self.inner.released.lock();
        for shard in &self.inner.shards {
            if let Some(stats) = shard.detach() {
                released.considered += stats.considered;
                released.added += stats.added;
                released.evicted += stats.evicted;
            }
        }
    }
}

/// Shard index: the low five bits of the candidate's first UTF-16 code
/// unit. `units` is always non-empty here — callers short-circuit the
/// empty string before routing to a shard.
fn shard_index(units: &[u16]) -> usize {
    (units[0] as usize) & (SHARD_COUNT - 1)
}
