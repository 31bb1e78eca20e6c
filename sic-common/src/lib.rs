//! # sic-common
//!
//! Shared error types, byte-encoding glue, and small numeric helpers used
//! by both the single-threaded intern table (`sic-table`) and the
//! sharded façade (`sic-pool`).

mod encoding;
mod error;
pub mod primes;

pub use encoding::{decode_ascii, decode_utf8, Encoding, TranscodeError};
pub use error::{InternError, InternResult};
