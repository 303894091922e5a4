//! Signature dispatch to the generation-specific parsers.

use crate::error::LutError;
use crate::signature::{sniff, Format};
use crate::table::LutTable;
use crate::{directory, legacy};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Fail Format 1.x parses on a checksum mismatch instead of logging it.
    /// Off by default; has no effect on Format 2.0.
    pub strict_checksum: bool,
}

/// Parse with default (lenient) options.
pub fn parse(bytes: &[u8]) -> Result<LutTable, LutError> {
    parse_with(bytes, &ParseOptions::default())
}

pub fn parse_with(bytes: &[u8], opts: &ParseOptions) -> Result<LutTable, LutError> {
    match sniff(bytes)? {
        Format::V1_0 | Format::V1_1 => legacy::parse(bytes, opts),
        Format::V2_0                => directory::parse(bytes),
    }
}
