//! Variable-width delta coding of ascending bank codes.
//!
//! Two incompatible alphabets exist.  Format 1.x record streams use the
//! legacy alphabet; the inflated bank-code block of Format 2.0 uses the v2
//! alphabet.  Never decode one with the other.
//!
//! ## Legacy alphabet
//!
//! | control | meaning |
//! |---------|---------|
//! | 0–250   | `prev + control` |
//! | 251     | `prev - u16` |
//! | 252     | `prev - u8` |
//! | 253     | absolute `u32` |
//! | 254     | `prev + u16` |
//! | 255     | invalid |
//!
//! ## v2 alphabet
//!
//! | control | meaning |
//! |---------|---------|
//! | 0–253   | `prev + control` |
//! | 254     | `prev + u16` |
//! | 255     | absolute `u32` |
//!
//! All operands are little-endian.  Arithmetic wraps modulo 2^32, matching
//! the unsigned 32-bit running value of the on-disk encoding.

use crate::cursor::ByteCursor;
use crate::error::LutError;

pub const LEGACY_ADD_MAX: u8 = 250;
pub const LEGACY_SUB_U16: u8 = 251;
pub const LEGACY_SUB_U8:  u8 = 252;
pub const LEGACY_ABS_U32: u8 = 253;
pub const LEGACY_ADD_U16: u8 = 254;
pub const LEGACY_INVALID: u8 = 255;

pub const V2_ADD_MAX: u8 = 253;
pub const V2_ADD_U16: u8 = 254;
pub const V2_ABS_U32: u8 = 255;

// ── Decoding ─────────────────────────────────────────────────────────────────

/// Decode one legacy value.  `control` has already been consumed from
/// `cursor`; any operand bytes are read from it.
pub fn decode_legacy(prev: u32, control: u8, cursor: &mut ByteCursor<'_>) -> Result<u32, LutError> {
    match control {
        0..=LEGACY_ADD_MAX => Ok(prev.wrapping_add(control as u32)),
        LEGACY_SUB_U16     => Ok(prev.wrapping_sub(cursor.take_u16_le()? as u32)),
        LEGACY_SUB_U8      => Ok(prev.wrapping_sub(cursor.take_u8()? as u32)),
        LEGACY_ABS_U32     => cursor.take_u32_le(),
        LEGACY_ADD_U16     => Ok(prev.wrapping_add(cursor.take_u16_le()? as u32)),
        LEGACY_INVALID     => Err(LutError::InvalidDeltaByte {
            offset: cursor.position().saturating_sub(1),
        }),
    }
}

/// Decode one v2 value (Format 2.0 bank-code block only).
pub fn decode_v2(prev: u32, control: u8, cursor: &mut ByteCursor<'_>) -> Result<u32, LutError> {
    match control {
        0..=V2_ADD_MAX => Ok(prev.wrapping_add(control as u32)),
        V2_ADD_U16     => Ok(prev.wrapping_add(cursor.take_u16_le()? as u32)),
        V2_ABS_U32     => cursor.take_u32_le(),
    }
}

// ── Encoding ─────────────────────────────────────────────────────────────────

/// Append the shortest legacy encoding of `code` relative to `prev`.
pub fn encode_legacy(prev: u32, code: u32, out: &mut Vec<u8>) {
    if code >= prev {
        let d = code - prev;
        if d <= LEGACY_ADD_MAX as u32 {
            out.push(d as u8);
        } else if d <= u16::MAX as u32 {
            out.push(LEGACY_ADD_U16);
            out.extend_from_slice(&(d as u16).to_le_bytes());
        } else {
            push_abs(LEGACY_ABS_U32, code, out);
        }
    } else {
        let d = prev - code;
        if d <= u8::MAX as u32 {
            out.push(LEGACY_SUB_U8);
            out.push(d as u8);
        } else if d <= u16::MAX as u32 {
            out.push(LEGACY_SUB_U16);
            out.extend_from_slice(&(d as u16).to_le_bytes());
        } else {
            push_abs(LEGACY_ABS_U32, code, out);
        }
    }
}

/// Append the shortest v2 encoding of `code` relative to `prev`.
/// Descending steps have no relative form and fall back to absolute.
pub fn encode_v2(prev: u32, code: u32, out: &mut Vec<u8>) {
    match code.checked_sub(prev) {
        Some(d) if d <= V2_ADD_MAX as u32 => out.push(d as u8),
        Some(d) if d <= u16::MAX as u32 => {
            out.push(V2_ADD_U16);
            out.extend_from_slice(&(d as u16).to_le_bytes());
        }
        _ => push_abs(V2_ABS_U32, code, out),
    }
}

fn push_abs(control: u8, code: u32, out: &mut Vec<u8>) {
    out.push(control);
    out.extend_from_slice(&code.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy(prev: u32, bytes: &[u8]) -> Result<u32, LutError> {
        let mut c = ByteCursor::new(bytes);
        let control = c.take_u8()?;
        decode_legacy(prev, control, &mut c)
    }

    fn v2(prev: u32, bytes: &[u8]) -> Result<u32, LutError> {
        let mut c = ByteCursor::new(bytes);
        let control = c.take_u8()?;
        decode_v2(prev, control, &mut c)
    }

    #[test]
    fn legacy_alphabet() {
        assert_eq!(legacy(0, &[100]).unwrap(), 100);
        assert_eq!(legacy(10, &[250]).unwrap(), 260);
        assert_eq!(legacy(70_000, &[251, 0x10, 0x27]).unwrap(), 60_000);
        assert_eq!(legacy(300, &[252, 45]).unwrap(), 255);
        assert_eq!(legacy(5, &[253, 0x78, 0x56, 0x34, 0x12]).unwrap(), 0x1234_5678);
        assert_eq!(legacy(1, &[254, 0x00, 0x01]).unwrap(), 257);
        assert_eq!(legacy(1, &[255]), Err(LutError::InvalidDeltaByte { offset: 0 }));
    }

    #[test]
    fn v2_alphabet_differs_from_legacy() {
        // 251..=253 are plain additions in v2.
        assert_eq!(v2(0, &[251]).unwrap(), 251);
        assert_eq!(v2(0, &[253]).unwrap(), 253);
        assert_eq!(v2(2, &[254, 0x00, 0x01]).unwrap(), 258);
        assert_eq!(v2(9, &[255, 0x01, 0x00, 0x00, 0x00]).unwrap(), 1);
        // Legacy 253 is absolute; v2 253 is an addition.
        assert_ne!(legacy(0, &[253, 1, 0, 0, 0]).unwrap(), v2(0, &[253]).unwrap());
    }

    #[test]
    fn truncated_operand_is_eof() {
        assert!(matches!(legacy(0, &[254, 0x01]), Err(LutError::UnexpectedEof { .. })));
        assert!(matches!(v2(0, &[255, 0, 0]), Err(LutError::UnexpectedEof { .. })));
    }

    #[test]
    fn encoder_picks_shortest_form() {
        let mut out = Vec::new();
        encode_legacy(0, 250, &mut out);
        assert_eq!(out, [250]);

        out.clear();
        encode_legacy(1000, 900, &mut out);
        assert_eq!(out, [LEGACY_SUB_U8, 100]);

        out.clear();
        encode_legacy(0, 10_000_000, &mut out);
        assert_eq!(out[0], LEGACY_ABS_U32);

        out.clear();
        encode_v2(10, 5, &mut out);
        assert_eq!(out[0], V2_ABS_U32);
    }
}
