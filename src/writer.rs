//! Encoders for every table generation.
//!
//! ```
//! use blzlut::writer::LegacyWriter;
//! use blzlut::Format;
//!
//! let bytes = LegacyWriter::new(Format::V1_0)
//!     .info("test table")
//!     .entry(10_020_030, 9)
//!     .to_bytes()?;
//! let table = blzlut::parse(&bytes)?;
//! assert_eq!(table.lookup("10020030"), Some(9));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use std::io::{self, Write};

use crate::block::{encode_block, BLOCK_HEADER_SIZE};
use crate::checksum;
use crate::delta::{encode_legacy, encode_v2};
use crate::directory::{BLOCK_BANK_CODES, BLOCK_METHOD_IDS, DATA_MARKER, SLOT_SIZE};
use crate::legacy::SKIP_MARKER;
use crate::signature::Format;
use crate::table::MethodId;

fn invalid(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg.to_owned())
}

fn check_line(line: &str) -> io::Result<()> {
    if line.contains('\n') {
        return Err(invalid("header lines must not contain a line feed"));
    }
    Ok(())
}

fn check_metadata_line(line: &str) -> io::Result<()> {
    check_line(line)?;
    if line.as_bytes() == DATA_MARKER {
        return Err(invalid("metadata line must not equal the DATA marker"));
    }
    Ok(())
}

// ── Format 1.0 / 1.1 ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyRecord {
    Entry { code: u32, method: MethodId },
    /// Invalid code: advances the delta baseline, emits no entry.
    Skipped { code: u32 },
}

#[derive(Debug, Clone)]
pub struct LegacyWriter {
    format:        Format,
    info:          String,
    continuation:  Option<String>,
    records:       Vec<LegacyRecord>,
    declared:      Option<u32>,
}

impl LegacyWriter {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            info:         String::new(),
            continuation: None,
            records:      Vec::new(),
            declared:     None,
        }
    }

    pub fn info(mut self, line: &str) -> Self {
        self.info = line.to_owned();
        self
    }

    /// Second info line (Format 1.1 only).
    pub fn continuation(mut self, line: &str) -> Self {
        self.continuation = Some(line.to_owned());
        self
    }

    pub fn entry(mut self, code: u32, method: MethodId) -> Self {
        self.records.push(LegacyRecord::Entry { code, method });
        self
    }

    pub fn skipped(mut self, code: u32) -> Self {
        self.records.push(LegacyRecord::Skipped { code });
        self
    }

    pub fn records<I: IntoIterator<Item = LegacyRecord>>(mut self, records: I) -> Self {
        self.records.extend(records);
        self
    }

    /// Override the header's `entry_count` (defaults to the record count).
    pub fn declared_count(mut self, count: u32) -> Self {
        self.declared = Some(count);
        self
    }

    /// Encoded record stream, without header.  Method ids are not validated
    /// here; [`write`](Self::write) rejects the skip marker.
    pub fn encode_records(&self) -> Vec<u8> {
        let mut out  = Vec::with_capacity(self.records.len() * 2);
        let mut prev = 0u32;
        for record in &self.records {
            match *record {
                LegacyRecord::Entry { code, method } => {
                    encode_legacy(prev, code, &mut out);
                    out.push(method);
                    prev = code;
                }
                LegacyRecord::Skipped { code } => {
                    encode_legacy(prev, code, &mut out);
                    out.extend_from_slice(&[SKIP_MARKER, 0x00]);
                    prev = code;
                }
            }
        }
        out
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        if !self.format.is_legacy() {
            return Err(invalid("LegacyWriter only writes Format 1.0 and 1.1"));
        }
        check_line(&self.info)?;
        if self.format == Format::V1_1
            && self.continuation.is_none()
            && self.info.ends_with('\\')
        {
            return Err(invalid("Format 1.1 info line ending in a backslash needs a continuation"));
        }
        let reserved = self.records.iter().any(|r| {
            matches!(r, LegacyRecord::Entry { method, .. } if *method == SKIP_MARKER)
        });
        if reserved {
            return Err(invalid("method id 0xFF is reserved for skip records"));
        }
        writer.write_all(self.format.signature())?;
        writer.write_all(self.info.as_bytes())?;
        match &self.continuation {
            Some(second) if self.format == Format::V1_1 => {
                check_line(second)?;
                writer.write_all(b"\\\n")?;
                writer.write_all(second.as_bytes())?;
                writer.write_all(b"\n")?;
            }
            Some(_) => return Err(invalid("continuation lines require Format 1.1")),
            None => writer.write_all(b"\n")?,
        }

        let records = self.encode_records();
        let count   = self.declared.unwrap_or(self.records.len() as u32);
        writer.write_u32::<LittleEndian>(count)?;
        writer.write_u32::<LittleEndian>(checksum::compute(&records, count))?;
        writer.write_all(&records)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        Ok(out)
    }
}

// ── Format 2.0 ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct BlockDirectoryWriter {
    metadata:    Vec<String>,
    bank_codes:  Option<Vec<u32>>,
    total_count: Option<u16>,
    method_ids:  Option<Vec<MethodId>>,
    extra:       Vec<(u32, Vec<u8>)>,
    level:       Compression,
}

impl Default for BlockDirectoryWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockDirectoryWriter {
    pub fn new() -> Self {
        Self {
            metadata:    Vec::new(),
            bank_codes:  None,
            total_count: None,
            method_ids:  None,
            extra:       Vec::new(),
            level:       Compression::default(),
        }
    }

    pub fn metadata(mut self, line: &str) -> Self {
        self.metadata.push(line.to_owned());
        self
    }

    pub fn bank_codes(mut self, codes: &[u32]) -> Self {
        self.bank_codes = Some(codes.to_vec());
        self
    }

    /// Header `total_count` (defaults to the number of bank codes).
    pub fn total_count(mut self, total: u16) -> Self {
        self.total_count = Some(total);
        self
    }

    pub fn method_ids(mut self, methods: &[MethodId]) -> Self {
        self.method_ids = Some(methods.to_vec());
        self
    }

    /// Additional block of an arbitrary type, stored uninterpreted.
    pub fn block(mut self, block_type: u32, data: &[u8]) -> Self {
        self.extra.push((block_type, data.to_vec()));
        self
    }

    pub fn level(mut self, level: Compression) -> Self {
        self.level = level;
        self
    }

    /// Raw (uncompressed) bank-code block contents.
    pub fn encode_bank_codes(codes: &[u32], total_count: u16) -> io::Result<Vec<u8>> {
        let count = u16::try_from(codes.len()).map_err(|_| invalid("too many bank codes for one block"))?;
        let mut out = Vec::with_capacity(4 + codes.len() * 2);
        out.write_u16::<LittleEndian>(count)?;
        out.write_u16::<LittleEndian>(total_count)?;
        let mut prev = 0u32;
        for &code in codes {
            encode_v2(prev, code, &mut out);
            prev = code;
        }
        Ok(out)
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let mut raw_blocks: Vec<(u32, Vec<u8>)> = Vec::new();
        if let Some(codes) = &self.bank_codes {
            let total = self.total_count.unwrap_or(codes.len().min(u16::MAX as usize) as u16);
            raw_blocks.push((BLOCK_BANK_CODES, Self::encode_bank_codes(codes, total)?));
        }
        if let Some(methods) = &self.method_ids {
            raw_blocks.push((BLOCK_METHOD_IDS, methods.clone()));
        }
        raw_blocks.extend(self.extra.iter().cloned());

        let slot_count = u16::try_from(raw_blocks.len()).map_err(|_| invalid("too many blocks"))?;
        let blocks = raw_blocks
            .iter()
            .map(|(t, data)| encode_block(*t, data, self.level).map(|b| (*t, b)))
            .collect::<io::Result<Vec<_>>>()?;

        let mut header = Vec::new();
        header.write_all(Format::V2_0.signature())?;
        for line in &self.metadata {
            check_metadata_line(line)?;
            header.write_all(line.as_bytes())?;
            header.write_all(b"\n")?;
        }
        header.write_all(DATA_MARKER)?;
        header.write_all(b"\n")?;
        header.write_u16::<LittleEndian>(slot_count)?;

        let mut offset = header.len() + blocks.len() * SLOT_SIZE;
        for (block_type, block) in &blocks {
            header.write_u32::<LittleEndian>(*block_type)?;
            header.write_u32::<LittleEndian>(offset as u32)?;
            header.write_u32::<LittleEndian>((block.len() - BLOCK_HEADER_SIZE) as u32)?;
            offset += block.len();
        }

        writer.write_all(&header)?;
        for (_, block) in &blocks {
            writer.write_all(block)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::SIGNATURE_LEN;

    #[test]
    fn legacy_header_layout() {
        let bytes = LegacyWriter::new(Format::V1_0).info("x").entry(100, 7).to_bytes().unwrap();
        assert_eq!(&bytes[..SIGNATURE_LEN], Format::V1_0.signature());
        assert_eq!(&bytes[SIGNATURE_LEN..SIGNATURE_LEN + 2], b"x\n");
        let count = &bytes[SIGNATURE_LEN + 2..SIGNATURE_LEN + 6];
        assert_eq!(count, 1u32.to_le_bytes());
        assert_eq!(&bytes[SIGNATURE_LEN + 10..], [100, 7]);
    }

    #[test]
    fn continuation_requires_1_1() {
        let w = LegacyWriter::new(Format::V1_0).info("a").continuation("b");
        assert_eq!(w.to_bytes().unwrap_err().kind(), io::ErrorKind::InvalidInput);
        let bytes = LegacyWriter::new(Format::V1_1).info("a").continuation("b").to_bytes().unwrap();
        assert_eq!(&bytes[SIGNATURE_LEN..SIGNATURE_LEN + 5], b"a\\\nb\n");
    }

    #[test]
    fn dangling_continuation_marker_rejected() {
        let w = LegacyWriter::new(Format::V1_1).info("ends\\").entry(100, 7);
        assert_eq!(w.to_bytes().unwrap_err().kind(), io::ErrorKind::InvalidInput);

        // Format 1.0 has no continuation lines, so the backslash is plain text.
        let bytes = LegacyWriter::new(Format::V1_0).info("ends\\").entry(100, 7).to_bytes().unwrap();
        assert_eq!(crate::parse(&bytes).unwrap().lookup("00000100"), Some(7));

        let bytes = LegacyWriter::new(Format::V1_1)
            .info("ends\\")
            .continuation("more")
            .entry(100, 7)
            .to_bytes()
            .unwrap();
        let table = crate::parse(&bytes).unwrap();
        assert_eq!(table.info().header_lines.len(), 2);
        assert_eq!(table.lookup("00000100"), Some(7));
    }

    #[test]
    fn skip_marker_method_rejected() {
        let w = LegacyWriter::new(Format::V1_0).info("x").entry(100, SKIP_MARKER).entry(200, 1);
        assert_eq!(w.to_bytes().unwrap_err().kind(), io::ErrorKind::InvalidInput);
        let bytes = LegacyWriter::new(Format::V1_0).info("x").entry(100, 0xFE).skipped(150).to_bytes().unwrap();
        assert_eq!(crate::parse(&bytes).unwrap().lookup("00000100"), Some(0xFE));
    }

    #[test]
    fn data_marker_metadata_rejected() {
        let w = BlockDirectoryWriter::new().metadata("DATA").bank_codes(&[10]).method_ids(&[3]);
        assert_eq!(w.to_bytes().unwrap_err().kind(), io::ErrorKind::InvalidInput);
        let bytes = BlockDirectoryWriter::new()
            .metadata("DATA ")
            .metadata("DATAX")
            .bank_codes(&[10])
            .method_ids(&[3])
            .to_bytes()
            .unwrap();
        let table = crate::parse(&bytes).unwrap();
        assert_eq!(table.info().header_lines, ["DATA ", "DATAX"]);
        assert_eq!(table.lookup("00000010"), Some(3));
    }

    #[test]
    fn v2_directory_offsets_point_at_blocks() {
        let bytes = BlockDirectoryWriter::new()
            .bank_codes(&[10, 15])
            .method_ids(&[3, 9])
            .to_bytes()
            .unwrap();
        let slots_at = SIGNATURE_LEN + DATA_MARKER.len() + 1 + 2;
        let offset = u32::from_le_bytes(bytes[slots_at + 4..slots_at + 8].try_into().unwrap()) as usize;
        assert_eq!(offset, slots_at + 2 * SLOT_SIZE);
        assert_eq!(&bytes[offset..offset + 4], BLOCK_BANK_CODES.to_le_bytes());
    }
}
