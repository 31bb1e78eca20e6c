use std::sync::{Arc, OnceLock};

/// The canonical, shared instance a caller receives back from interning.
///
/// Identity (not just value) equality is what the table's contract
/// promises: two calls that return the same `CanonicalString` are
/// `Arc::ptr_eq`, not merely `==`.
pub type CanonicalString = Arc<str>;

/// A slot in the table's entry array.
///
/// `next` does triple duty as a free-list encoding:
/// `next >= 0` means "1-based index of the next entry in this bucket's
/// chain, or 0 for end of chain"; `next <= -2` means the slot is free,
/// with `-3 - next` giving the next free slot (or none, if that yields
/// a negative-one sentinel).
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub hash: u32,
    pub next: i32,
    pub value: CanonicalString,
    pub last_use: i64,
}

/// Marks a freed slot's `next` field; see `Entry`'s free-list doc above.
pub(crate) const START_OF_FREE_LIST: i32 = -3;

impl Entry {
    #[inline]
    pub(crate) fn is_free(&self) -> bool {
        self.next <= -2
    }

    /// `true` once this entry is being tracked by the churn pool.
    #[inline]
    pub(crate) fn in_churn(&self) -> bool {
        self.last_use < 0
    }

    /// Generation bit: 0 = seen only on insert, 1 = hit at least once.
    /// Stable under the sign flip since it reads the magnitude's low bit.
    #[inline]
    pub(crate) fn generation(&self) -> u8 {
        (self.last_use.unsigned_abs() & 1) as u8
    }

    #[inline]
    pub(crate) fn use_stamp_abs(&self) -> u64 {
        self.last_use.unsigned_abs()
    }
}

/// The single shared instance returned for every empty string, so that
/// even the degenerate "intern nothing" case preserves pointer identity.
/// Public so callers above this table (the sharded pool) can hand back
/// the same instance without going through a table at all.
pub fn canonical_empty() -> CanonicalString {
    static EMPTY: OnceLock<CanonicalString> = OnceLock::new();
    EMPTY.get_or_init(|| Arc::from("")).clone()
}
