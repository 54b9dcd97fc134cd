//! On-disk binary cache format for the API database.
//!
//! Layout (little-endian throughout):
//!
//! ```text
//! offset  0   magic            8 bytes  "APILVLDB"
//! offset  8   format version   u32
//! offset 12   platform         u32
//! offset 16   payload length   u64
//! offset 24   payload checksum u64      xxh3-64 of the payload bytes
//! offset 32   reserved         zeros up to HEADER_LEN
//! offset 64   payload          length-prefixed class records
//! ```
//!
//! The header is validated in full (magic, declared length, checksum)
//! before a single payload byte is decoded, so a damaged file is always
//! classified rather than misread. The layout is internal to this crate;
//! there is no cross-version compatibility promise beyond the format
//! version gate.

mod reader;
mod writer;

pub use reader::{decode_payload, validate};
pub use writer::encode;

use thiserror::Error;

/// File magic, first 8 bytes of every cache file.
pub const MAGIC: [u8; 8] = *b"APILVLDB";

/// Bumped whenever the payload layout changes.
pub const FORMAT_VERSION: u32 = 2;

/// Fixed header size; the payload starts here.
pub const HEADER_LEN: usize = 64;

/// Decoded cache file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub format_version: u32,
    pub platform: u32,
    pub payload_len: u64,
    pub checksum: u64,
}

/// Why a cache file cannot be trusted.
///
/// Every variant triggers the same recovery (warn once, rebuild from the
/// XML source); the distinction is carried into the diagnostic message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheDefect {
    #[error("file is shorter than the {HEADER_LEN}-byte header ({len} bytes)")]
    TruncatedHeader { len: u64 },
    #[error("magic number mismatch")]
    BadMagic,
    #[error("declared size {declared} bytes does not match actual size {actual} bytes")]
    LengthMismatch { declared: u64, actual: u64 },
    #[error("payload checksum mismatch")]
    ChecksumMismatch,
    #[error("malformed payload record")]
    MalformedRecord,
}
