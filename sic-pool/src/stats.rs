//! Aggregate counters for the sharded pool's `stats()` snapshot: a plain,
//! cheaply-cloned struct handed back from a `snapshot()` call rather than
//! a live handle.

/// Point-in-time snapshot of the pool's counters, summed across every
/// present shard plus the running totals retained from shards released
/// under memory pressure (see `SharedInternPool::clear` and the trim
/// scheduler's high-pressure detach path).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Stats {
    pub added: u64,
    pub considered: u64,
    pub count: usize,
    pub deduped: u64,
    pub evicted: u64,
}

/// Running totals folded in from shards that have been detached (either
/// by an explicit `clear()` or by the trim scheduler's high-pressure
/// path). `count` is deliberately absent: a detached shard's live entries
/// are gone, not counted as still-present.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ReleasedTotals {
    pub(crate) considered: u64,
    pub(crate) added: u64,
    pub(crate) evicted: u64,
}
