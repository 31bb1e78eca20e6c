//! The table's two hash modes.
//!
//! Every table starts in `Deterministic` mode (cheap, reproducible, great
//! for benchmarking and tests) and flips permanently to `Randomized` the
//! first time a single insertion's chain walk looks like an attack rather
//! than an accident. The flip is one-way: once randomized, a table never
//! goes back to deterministic hashing, since there is no way to tell an
//! attacker has stopped.

use std::hash::{BuildHasher, Hasher};
use std::sync::OnceLock;

/// Chain length, during a single insertion, past which we assume the
/// collisions are adversarial rather than coincidental.
pub(crate) const REHASH_CHAIN_THRESHOLD: usize = 100;

const DJB2_SEED: u32 = 5381;
const DJB2_COMBINE: u32 = 1_566_083_941;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HashMode {
    /// Double-DJB2 over 16-bit code units, no per-process key. Cheap and
    /// fully reproducible across runs — the default until abuse is seen.
    Deterministic,
    /// Marvin-style keyed hash seeded once per process. Adopted
    /// permanently the first time `REHASH_CHAIN_THRESHOLD` is exceeded.
    Randomized,
}

/// Public mirror of `HashMode`, for callers above this crate (the sharded
/// pool) that need to snapshot a table's hashing mode without reaching
/// into its private fields — used for the pool's fast path, which hashes
/// a candidate before acquiring the shard lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashModeHint {
    Deterministic,
    Randomized,
}

impl From<HashMode> for HashModeHint {
    fn from(mode: HashMode) -> Self {
        match mode {
            HashMode::Deterministic => HashModeHint::Deterministic,
            HashMode::Randomized => HashModeHint::Randomized,
        }
    }
}

impl From<HashModeHint> for HashMode {
    fn from(hint: HashModeHint) -> Self {
        match hint {
            HashModeHint::Deterministic => HashMode::Deterministic,
            HashModeHint::Randomized => HashMode::Randomized,
        }
    }
}

/// Hashes `code_units` under a publicly-named mode, for callers that only
/// have a `HashModeHint` snapshot rather than the table's private `HashMode`.
pub fn hash_with_mode(mode: HashModeHint, code_units: &[u16]) -> u32 {
    hash_code_units(mode.into(), code_units)
}

/// Hashes `code_units` under the given mode.
pub(crate) fn hash_code_units(mode: HashMode, code_units: &[u16]) -> u32 {
    match mode {
        HashMode::Deterministic => djb2_double(code_units),
        HashMode::Randomized => marvin(code_units, process_seed()),
    }
}

/// Double-DJB2: two running hashes consumed in lockstep over 32-bit words
/// (each word is a pair of code units), mixed via rotate-left-5-xor and
/// swapped each step so both hashes see every word, then combined the
/// same way the deterministic .NET string hash combines its two halves.
fn djb2_double(code_units: &[u16]) -> u32 {
    let mut h1: u32 = DJB2_SEED;
    let mut h2: u32 = DJB2_SEED;

    let mut chunks = code_units.chunks_exact(2);
    for pair in &mut chunks {
        let word = (pair[0] as u32) | ((pair[1] as u32) << 16);
        h1 = h1.rotate_left(5) ^ word;
        std::mem::swap(&mut h1, &mut h2);
    }
    if let [last] = chunks.remainder() {
        h1 = h1.rotate_left(5) ^ (*last as u32);
    }

    h1.wrapping_add(h2.wrapping_mul(DJB2_COMBINE))
}

/// Marvin-style keyed mix: an add-rotate-multiply round folding each word
/// into `h1`, with `h2` tracking the running xor of `h1` after every
/// round so the final combine depends on the whole sequence, not just
/// its last word.
fn marvin(code_units: &[u16], seed: (u32, u32)) -> u32 {
    let (mut h1, mut h2) = seed;

    let mut chunks = code_units.chunks_exact(2);
    for pair in &mut chunks {
        let word = (pair[0] as u32) | ((pair[1] as u32) << 16);
        h1 = h1.wrapping_add(word);
        h1 = h1.rotate_left(5).wrapping_mul(0x9E37_79B1);
        h2 ^= h1;
        h2 = h2.rotate_left(13).wrapping_mul(0x85EB_CA77);
    }
    if let [last] = chunks.remainder() {
        h1 = h1.wrapping_add(*last as u32);
        h1 = h1.rotate_left(5).wrapping_mul(0x9E37_79B1);
        h2 ^= h1;
    }

    h1 ^= code_units.len() as u32;
    h1.wrapping_add(h2.rotate_left(15))
}

/// A per-process random seed for `Randomized` mode, generated once from
/// OS randomness via `std::collections::hash_map::RandomState` (no extra
/// dependency needed just to get a couple of random `u32`s).
fn process_seed() -> (u32, u32) {
    static SEED: OnceLock<(u32, u32)> = OnceLock::new();
    *SEED.get_or_init(|| {
        let builder = std::collections::hash_map::RandomState::new();
        let half = |tag: u8| {
            let mut hasher = builder.build_hasher();
            hasher.write_u8(tag);
            let v = hasher.finish();
            (v as u32) ^ ((v >> 32) as u32)
        };
        (half(0), half(1))
    })
}

/// Widens a `&str` into the UTF-16 code-unit view the table hashes and
/// compares over, rather than UTF-8 bytes or `char`s. Public so the
/// sharded pool can derive the same view for its pre-lock fast path.
pub fn code_units(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

/// Counts `s`'s UTF-16 code units without allocating, for length checks.
pub fn code_unit_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn djb2_is_deterministic_across_calls() {
        let units = code_units("hello, world");
        assert_eq!(djb2_double(&units), djb2_double(&units));
    }

    #[test]
    fn djb2_distinguishes_similar_strings() {
        let a = djb2_double(&code_units("abc"));
        let b = djb2_double(&code_units("abd"));
        assert_ne!(a, b);
    }

    #[test]
    fn marvin_is_deterministic_within_a_process() {
        let units = code_units("hello, world");
        let seed = process_seed();
        assert_eq!(marvin(&units, seed), marvin(&units, seed));
    }

    #[test]
    fn code_unit_len_matches_ascii_byte_len() {
        assert_eq!(code_unit_len("abcdef"), 6);
        assert_eq!(code_unit_len(""), 0);
    }
}
