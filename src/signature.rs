//! Fixed 28-byte file signatures and format sniffing.

use serde::Serialize;
use std::fmt;
use crate::error::LutError;

pub const SIGNATURE_LEN: usize = 28;

pub const SIGNATURE_1_0: &[u8; SIGNATURE_LEN] = b"BLZ Lookup Table/Format 1.0\n";
pub const SIGNATURE_1_1: &[u8; SIGNATURE_LEN] = b"BLZ Lookup Table/Format 1.1\n";
pub const SIGNATURE_2_0: &[u8; SIGNATURE_LEN] = b"BLZ Lookup Table/Format 2.0\n";

/// Table generation, determined solely by the leading signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Format {
    #[serde(rename = "1.0")]
    V1_0,
    #[serde(rename = "1.1")]
    V1_1,
    #[serde(rename = "2.0")]
    V2_0,
}

impl Format {
    pub fn signature(self) -> &'static [u8; SIGNATURE_LEN] {
        match self {
            Format::V1_0 => SIGNATURE_1_0,
            Format::V1_1 => SIGNATURE_1_1,
            Format::V2_0 => SIGNATURE_2_0,
        }
    }

    /// Format 1.0 and 1.1 share the flat record layout.
    #[inline]
    pub fn is_legacy(self) -> bool {
        !matches!(self, Format::V2_0)
    }

    pub fn from_signature(sig: &[u8]) -> Option<Self> {
        [Format::V1_0, Format::V1_1, Format::V2_0]
            .into_iter()
            .find(|f| f.signature().as_slice() == sig)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::V1_0 => "1.0",
            Format::V1_1 => "1.1",
            Format::V2_0 => "2.0",
        })
    }
}

/// Identify the format of `bytes`.  Anything shorter than a signature, or
/// with an unknown signature, is rejected before any further parsing.
pub fn sniff(bytes: &[u8]) -> Result<Format, LutError> {
    bytes
        .get(..SIGNATURE_LEN)
        .and_then(Format::from_signature)
        .ok_or(LutError::SignatureMismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_are_28_bytes() {
        for f in [Format::V1_0, Format::V1_1, Format::V2_0] {
            assert_eq!(f.signature().len(), SIGNATURE_LEN);
            assert_eq!(sniff(f.signature()).unwrap(), f);
        }
    }

    #[test]
    fn short_or_unknown_input_is_rejected() {
        assert_eq!(sniff(&SIGNATURE_1_0[..27]), Err(LutError::SignatureMismatch));
        assert_eq!(sniff(b"BLZ Lookup Table/Format 3.0\nrest"), Err(LutError::SignatureMismatch));
        assert_eq!(sniff(&[]), Err(LutError::SignatureMismatch));
    }
}
