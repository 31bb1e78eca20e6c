//! Byte-to-code-unit transcoding for the two encodings the sharded pool
//! must support directly (`intern_ascii`, `intern_utf8`). Arbitrary
//! third-party encodings are out of scope — a caller with a different
//! encoding decodes to `&str` first and calls `intern`.

use std::fmt;

/// Named encoding a byte slice was decoded under, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// 7-bit ASCII, one byte per code unit.
    Ascii,
    /// UTF-8, standard Rust string encoding.
    Utf8,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Ascii => write!(f, "ASCII"),
            Encoding::Utf8 => write!(f, "UTF-8"),
        }
    }
}

/// A byte sequence did not decode cleanly under its named encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid {encoding} byte sequence at offset {offset}")]
pub struct TranscodeError {
    /// Encoding the bytes were interpreted under.
    pub encoding: Encoding,
    /// Byte offset of the first invalid byte.
    pub offset: usize,
}

/// Decodes `bytes` as 7-bit ASCII, rejecting any byte with the high bit set.
pub fn decode_ascii(bytes: &[u8]) -> Result<String, TranscodeError> {
    for (offset, &b) in bytes.iter().enumerate() {
        if b >= 0x80 {
            return Err(TranscodeError { encoding: Encoding::Ascii, offset });
        }
    }
    Ok(String::from_utf8(bytes.to_vec()).expect("validated ascii"))
}

/// Decodes `bytes` as UTF-8.
pub fn decode_utf8(bytes: &[u8]) -> Result<String, TranscodeError> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|err| TranscodeError { encoding: Encoding::Utf8, offset: err.valid_up_to() })
}
