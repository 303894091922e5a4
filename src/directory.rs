//! Format 2.0 parser: block directory → inflated blocks → table.
//!
//! # Layout
//!
//! ```text
//! signature     28 B   "BLZ Lookup Table/Format 2.0\n"
//! metadata      zero or more '\n'-terminated lines
//! "DATA\n"      marker line
//! slot_count    u16 LE
//! slots         slot_count × { block_type u32, offset u32, size u32 }  (LE)
//! ...           blocks, located by slot offset (see `block.rs`)
//! ```
//!
//! Only block types [`BLOCK_BANK_CODES`] and [`BLOCK_METHOD_IDS`] are read;
//! both are required.  Other types are skipped.  When a required type is
//! listed more than once the first slot is used.
//!
//! The inflated bank-code block starts with `main_office_count: u16` and
//! `total_count: u16`, followed by `main_office_count` codes in the v2 delta
//! alphabet.  The method-id block is one byte per code, matched by index.
//! No checksum is computed for this generation.

use tracing::{debug, warn};

use crate::block::inflate;
use crate::cursor::ByteCursor;
use crate::delta::decode_v2;
use crate::error::LutError;
use crate::signature::{sniff, Format, SIGNATURE_LEN};
use crate::table::{ChecksumStatus, LutTable, MethodId, TableBuilder, TableInfo};

pub const DATA_MARKER: &[u8] = b"DATA";
pub const SLOT_SIZE: usize = 12;

pub const BLOCK_BANK_CODES: u32 = 1;
pub const BLOCK_METHOD_IDS: u32 = 2;

/// One directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectorySlot {
    pub block_type: u32,
    pub offset:     u32,
    pub size:       u32,
}

impl DirectorySlot {
    fn read(cur: &mut ByteCursor<'_>) -> Result<Self, LutError> {
        Ok(Self {
            block_type: cur.take_u32_le()?,
            offset:     cur.take_u32_le()?,
            size:       cur.take_u32_le()?,
        })
    }

    fn inflate(&self, file_bytes: &[u8]) -> Result<Vec<u8>, LutError> {
        inflate(file_bytes, self.block_type, self.offset, self.size)
    }
}

/// Parsed header of a Format 2.0 file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDirectory {
    pub metadata: Vec<String>,
    pub slots:    Vec<DirectorySlot>,
}

impl BlockDirectory {
    pub fn read(bytes: &[u8]) -> Result<Self, LutError> {
        if sniff(bytes)? != Format::V2_0 {
            return Err(LutError::SignatureMismatch);
        }
        let mut cur = ByteCursor::at(bytes, SIGNATURE_LEN);

        let mut metadata = Vec::new();
        loop {
            let line = cur.skip_to_after(b'\n').map_err(|_| LutError::MissingDataMarker)?;
            if line == DATA_MARKER {
                break;
            }
            metadata.push(String::from_utf8_lossy(line).into_owned());
        }

        let slot_count = cur.take_u16_le()?;
        let slots = (0..slot_count)
            .map(|_| DirectorySlot::read(&mut cur))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { metadata, slots })
    }

    /// First slot of `block_type`; later duplicates are ignored.
    pub fn find(&self, block_type: u32) -> Option<&DirectorySlot> {
        let mut matching = self.slots.iter().filter(|s| s.block_type == block_type);
        let first = matching.next();
        let extra = matching.count();
        if extra > 0 {
            warn!(block_type, extra, "duplicate directory slots, using the first");
        }
        first
    }

    fn require(&self, block_type: u32) -> Result<&DirectorySlot, LutError> {
        self.find(block_type).ok_or(LutError::MissingRequiredBlock { block_type })
    }
}

/// Decoded contents of the bank-code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankCodeBlock {
    pub main_office_count: u16,
    pub total_count:       u16,
    pub codes:             Vec<u32>,
}

impl BankCodeBlock {
    /// Decode up to `main_office_count` codes, stopping early when the block
    /// ends on a value boundary.
    pub fn decode(inflated: &[u8]) -> Result<Self, LutError> {
        let mut cur = ByteCursor::new(inflated);
        let main_office_count = cur.take_u16_le()?;
        let total_count       = cur.take_u16_le()?;

        let mut codes = Vec::with_capacity(main_office_count as usize);
        let mut prev: u32 = 0;
        for _ in 0..main_office_count {
            if cur.is_empty() {
                warn!(decoded = codes.len(), main_office_count, "bank-code block ended early");
                break;
            }
            let control = cur.take_u8()?;
            prev = decode_v2(prev, control, &mut cur)?;
            codes.push(prev);
        }
        Ok(Self { main_office_count, total_count, codes })
    }
}

pub fn parse(bytes: &[u8]) -> Result<LutTable, LutError> {
    let directory = BlockDirectory::read(bytes)?;
    debug!(slots = directory.slots.len(), "read block directory");
    for slot in &directory.slots {
        if slot.block_type != BLOCK_BANK_CODES && slot.block_type != BLOCK_METHOD_IDS {
            debug!(block_type = slot.block_type, offset = slot.offset, "skipping unused block");
        }
    }

    let bank_slot   = directory.require(BLOCK_BANK_CODES)?;
    let method_slot = directory.require(BLOCK_METHOD_IDS)?;

    let banks   = BankCodeBlock::decode(&bank_slot.inflate(bytes)?)?;
    let methods: Vec<MethodId> = method_slot.inflate(bytes)?;

    if banks.codes.len() != methods.len() {
        warn!(codes = banks.codes.len(), methods = methods.len(),
              "bank-code and method-id blocks disagree in length, truncating");
    }

    let mut info = TableInfo::new(Format::V2_0, bytes);
    info.header_lines     = directory.metadata;
    info.declared_entries = banks.main_office_count as u32;
    info.declared_total   = Some(banks.total_count as u32);
    info.checksum         = ChecksumStatus::NotChecked;

    let mut builder = TableBuilder::new(info);
    for (&code, &method) in banks.codes.iter().zip(methods.iter()) {
        builder.insert(code, method);
    }
    Ok(builder.finish())
}
