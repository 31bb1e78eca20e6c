//! The two-generation "churn pool" used to approximate LRU eviction
//! without an intrusive doubly-linked list threaded through every entry:
//! two small bounded, sorted-by-use-stamp segments stand in for one true
//! LRU chain, trading exact recency order for O(log n) membership
//! updates and a single full-table pass to regenerate.

use crate::entry::CanonicalString;

/// Each generation list holds at most this many candidates.
pub(crate) const CHURN_CAPACITY: usize = 32;

/// One generation's sorted candidate list.
///
/// Entries are kept sorted ascending by `stamp` (always the *absolute*
/// use-stamp — the list itself is oblivious to the sign-based in-churn
/// marker living on the table's own `Entry`; that bookkeeping is the
/// table's job, not this list's).
#[derive(Debug, Default)]
pub(crate) struct ChurnList {
    entries: Vec<(u64, CanonicalString)>,
}

/// Outcome of attempting to place a candidate into a `ChurnList`.
pub(crate) enum Placement {
    /// The candidate was inserted; nothing was displaced.
    Inserted,
    /// The candidate was inserted by displacing the list's previous
    /// maximum, which is no longer tracked by any churn list.
    InsertedEvicting(u64, CanonicalString),
    /// The list was full and the candidate was not strictly older than
    /// the current maximum, so nothing changed.
    Rejected,
}

impl ChurnList {
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn front(&self) -> Option<&(u64, CanonicalString)> {
        self.entries.first()
    }

    /// Removes and returns the oldest (lowest-stamp) candidate.
    pub(crate) fn pop_front(&mut self) -> Option<(u64, CanonicalString)> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    /// Removes the candidate at the given stamp, if present. Used when an
    /// entry is dropped (removed or capacity-evicted) while still
    /// tracked in this list.
    pub(crate) fn remove(&mut self, stamp_abs: u64) -> bool {
        if let Ok(pos) = self.position(stamp_abs) {
            self.entries.remove(pos);
            true
        } else {
            false
        }
    }

    fn position(&self, stamp_abs: u64) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&stamp_abs, |(s, _)| *s)
    }

    /// Attempts to place `(stamp_abs, value)` into this list, keeping it
    /// sorted and bounded at `CHURN_CAPACITY`.
    pub(crate) fn try_insert(&mut self, stamp_abs: u64, value: CanonicalString) -> Placement {
        if self.entries.len() < CHURN_CAPACITY {
            let pos = self.entries.partition_point(|(s, _)| *s <= stamp_abs);
            self.entries.insert(pos, (stamp_abs, value));
            return Placement::Inserted;
        }

        let &(max_stamp, _) = self.entries.last().expect("capacity > 0");
        if stamp_abs >= max_stamp {
            return Placement::Rejected;
        }

        let (evicted_stamp, evicted_value) = self.entries.pop().expect("checked non-empty above");
        let pos = self.entries.partition_point(|(s, _)| *s <= stamp_abs);
        self.entries.insert(pos, (stamp_abs, value));
        Placement::InsertedEvicting(evicted_stamp, evicted_value)
    }
}

/// Owns both generation lists for one intern table.
#[derive(Debug, Default)]
pub(crate) struct ChurnPool {
    pub(crate) gen0: ChurnList,
    pub(crate) gen1: ChurnList,
}

impl ChurnPool {
    pub(crate) fn list_mut(&mut self, generation: u8) -> &mut ChurnList {
        if generation == 0 {
            &mut self.gen0
        } else {
            &mut self.gen1
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.gen0.is_empty() && self.gen1.is_empty()
    }
}
