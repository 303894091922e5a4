//! Format 1.0 / 1.1 parser.
//!
//! # Layout
//!
//! ```text
//! signature        28 B   "BLZ Lookup Table/Format 1.x\n"
//! info line        ..\n   (1.1: a trailing '\' before '\n' means one more line follows)
//! entry_count      u32 LE
//! stored_checksum  u32 LE  = adler_like(records) ^ entry_count
//! records          entry_count × { delta-coded code, method id | 0xFF filler }
//! ```
//!
//! A record whose byte after the code is `0xFF` marks an invalid code: the
//! code still becomes the new delta baseline, one filler byte follows, and
//! no entry is emitted.
//!
//! The record loop is lenient about truncation: if the buffer ends exactly
//! on a record boundary before `entry_count` records were read, the table is
//! returned as-is and flagged `truncated`.  Running out of bytes inside a
//! record is an error.  Trailing bytes after the last record are ignored.

use tracing::{debug, warn};

use crate::checksum;
use crate::cursor::ByteCursor;
use crate::delta::decode_legacy;
use crate::error::LutError;
use crate::parse::ParseOptions;
use crate::signature::{sniff, Format, SIGNATURE_LEN};
use crate::table::{ChecksumStatus, LutTable, TableBuilder, TableInfo};

/// Byte following a decoded code that marks the record as skipped.
pub const SKIP_MARKER: u8 = 0xFF;

const LINE_FEED: u8 = b'\n';
const CONTINUATION: u8 = b'\\';

pub fn parse(bytes: &[u8], opts: &ParseOptions) -> Result<LutTable, LutError> {
    let format = sniff(bytes)?;
    if !format.is_legacy() {
        return Err(LutError::SignatureMismatch);
    }

    let mut cur  = ByteCursor::at(bytes, SIGNATURE_LEN);
    let mut info = TableInfo::new(format, bytes);

    let first = cur.skip_to_after(LINE_FEED)?;
    info.header_lines.push(String::from_utf8_lossy(first).into_owned());
    if format == Format::V1_1 && first.last() == Some(&CONTINUATION) {
        let second = cur.skip_to_after(LINE_FEED)?;
        info.header_lines.push(String::from_utf8_lossy(second).into_owned());
    }

    let entry_count = cur.take_u32_le()?;
    let stored      = cur.take_u32_le()?;
    info.declared_entries = entry_count;

    let computed = checksum::compute(cur.rest(), entry_count);
    info.checksum = if computed == stored {
        ChecksumStatus::Verified
    } else if opts.strict_checksum {
        return Err(LutError::ChecksumMismatch { stored, computed });
    } else {
        warn!(stored, computed, "LUT checksum mismatch, continuing");
        ChecksumStatus::Mismatch { stored, computed }
    };

    debug!(%format, entry_count, "parsing legacy records");

    let mut builder = TableBuilder::new(info);
    let mut prev: u32 = 0;
    for parsed in 0..entry_count {
        if cur.is_empty() {
            warn!(parsed, entry_count, "legacy record stream ended early");
            builder.info_mut().truncated = true;
            break;
        }
        let control = cur.take_u8()?;
        let code    = decode_legacy(prev, control, &mut cur)?;
        prev = code;

        if cur.peek_u8()? == SKIP_MARKER {
            cur.take_bytes(2)?;
            builder.info_mut().skipped += 1;
            continue;
        }
        let method = cur.take_u8()?;
        builder.insert(code, method);
    }

    if !cur.is_empty() {
        debug!(trailing = cur.remaining(), "ignoring bytes after last record");
    }
    Ok(builder.finish())
}
