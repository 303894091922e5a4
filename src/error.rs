//! Error taxonomy for the decoder, its byte sources and the loader.
//!
//! Decoder errors ([`LutError`]) abort the current parse attempt.  The one
//! condition that is *not* fatal by default is a Format 1.x checksum
//! mismatch: it is recorded in the table's [`ChecksumStatus`] and only
//! surfaces as [`LutError::ChecksumMismatch`] when strict checking is
//! requested via [`ParseOptions`].
//!
//! [`ChecksumStatus`]: crate::table::ChecksumStatus
//! [`ParseOptions`]: crate::ParseOptions

use std::io;
use std::path::PathBuf;
use thiserror::Error;

// ── Decoder ──────────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LutError {
    #[error("Unknown signature: not a BLZ lookup table")]
    SignatureMismatch,
    #[error("Unexpected end of buffer at offset {offset}: wanted {wanted} byte(s), {available} available")]
    UnexpectedEof { offset: usize, wanted: usize, available: usize },
    #[error("Byte 0x{byte:02x} not found before end of buffer")]
    EndOfBuffer { byte: u8 },
    #[error("Invalid delta control byte 0xff at offset {offset}")]
    InvalidDeltaByte { offset: usize },
    #[error("Checksum mismatch: stored 0x{stored:08x}, computed 0x{computed:08x}")]
    ChecksumMismatch { stored: u32, computed: u32 },
    #[error("DATA marker line not found")]
    MissingDataMarker,
    #[error("Required block type {block_type} missing from directory")]
    MissingRequiredBlock { block_type: u32 },
    #[error("Block type {block_type} at offset {offset} (+{size} B) exceeds file length {file_len}")]
    BlockOutOfRange { block_type: u32, offset: u32, size: u32, file_len: usize },
    #[error("Decompression error in block type {block_type}: {reason}")]
    Decompression { block_type: u32, reason: String },
}

// ── Byte sources ─────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("LUT file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Download of {url} failed: {reason}")]
    Download { url: String, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Loader ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("LUT source unavailable: {0}")]
    Source(#[from] SourceError),
    #[error("Malformed LUT source: {0}")]
    Malformed(#[from] LutError),
}
