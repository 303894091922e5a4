//! Format 2.0 compressed data blocks.
//!
//! Each block sits at the offset given by its directory slot:
//!
//! ```text
//! block_type         u32 LE
//! compressed_size    u32 LE   advisory; the directory size is authoritative
//! decompressed_size  u32 LE   expected output length
//! reserved           u32 LE
//! payload            <directory size> bytes of zlib stream
//! ```

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use std::io::{self, Write};
use tracing::{debug, warn};

use crate::cursor::ByteCursor;
use crate::error::LutError;

pub const BLOCK_HEADER_SIZE: usize = 16;

/// Extra capacity on top of the declared output length.
const INFLATE_SLACK: usize = 1024;
/// Upper bound for trusting `decompressed_size` when pre-allocating.
const MAX_PREALLOC: usize = 64 * 1024 * 1024;
const GROW_STEP: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub block_type:        u32,
    pub compressed_size:   u32,
    pub decompressed_size: u32,
    pub reserved:          u32,
}

impl BlockHeader {
    pub fn read(cur: &mut ByteCursor<'_>) -> Result<Self, LutError> {
        Ok(Self {
            block_type:        cur.take_u32_le()?,
            compressed_size:   cur.take_u32_le()?,
            decompressed_size: cur.take_u32_le()?,
            reserved:          cur.take_u32_le()?,
        })
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.block_type)?;
        writer.write_u32::<LittleEndian>(self.compressed_size)?;
        writer.write_u32::<LittleEndian>(self.decompressed_size)?;
        writer.write_u32::<LittleEndian>(self.reserved)?;
        Ok(())
    }
}

/// Inflate the block of `block_type` whose sub-header starts at `offset`,
/// reading exactly `declared_size` payload bytes after it.
///
/// The zlib stream must reach its end-of-stream marker; a stream that simply
/// runs out of input is a [`LutError::Decompression`], even when the output
/// already has the declared length.  The returned buffer holds exactly the
/// bytes produced, which may be fewer than `decompressed_size`.
pub fn inflate(file_bytes: &[u8], block_type: u32, offset: u32, declared_size: u32) -> Result<Vec<u8>, LutError> {
    let start = offset as usize;
    let end = start
        .checked_add(BLOCK_HEADER_SIZE)
        .and_then(|p| p.checked_add(declared_size as usize))
        .filter(|&e| e <= file_bytes.len())
        .ok_or(LutError::BlockOutOfRange {
            block_type,
            offset,
            size: declared_size,
            file_len: file_bytes.len(),
        })?;

    let mut cur = ByteCursor::at(file_bytes, start);
    let header  = BlockHeader::read(&mut cur)?;
    if header.block_type != block_type {
        warn!(directory = block_type, sub_header = header.block_type, "block type disagrees with directory");
    }
    if header.compressed_size != declared_size {
        debug!(directory = declared_size, sub_header = header.compressed_size,
               "using directory size for compressed payload");
    }
    let payload = &file_bytes[start + BLOCK_HEADER_SIZE..end];

    let expected = header.decompressed_size as usize;
    let mut out  = Vec::with_capacity(expected.min(MAX_PREALLOC) + INFLATE_SLACK);
    let mut inflater = Decompress::new(true);
    loop {
        if out.len() == out.capacity() {
            out.reserve(GROW_STEP);
        }
        let (in_before, out_before) = (inflater.total_in(), inflater.total_out());
        let status = inflater
            .decompress_vec(&payload[in_before as usize..], &mut out, FlushDecompress::Finish)
            .map_err(|e| LutError::Decompression { block_type, reason: e.to_string() })?;
        if matches!(status, Status::StreamEnd) {
            break;
        }
        if inflater.total_in() == in_before && inflater.total_out() == out_before {
            return Err(LutError::Decompression {
                block_type,
                reason: format!("stream truncated after {} of {} input bytes", in_before, payload.len()),
            });
        }
    }

    if out.len() != expected {
        debug!(block_type, expected, actual = out.len(), "inflated size differs from declared size");
    }
    Ok(out)
}

/// Compress `data` into a complete block (sub-header + zlib payload).
pub fn encode_block(block_type: u32, data: &[u8], level: Compression) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), level);
    encoder.write_all(data)?;
    let payload = encoder.finish()?;

    let header = BlockHeader {
        block_type,
        compressed_size:   payload.len() as u32,
        decompressed_size: data.len() as u32,
        reserved:          0,
    };
    let mut out = Vec::with_capacity(BLOCK_HEADER_SIZE + payload.len());
    header.write(&mut out)?;
    out.extend_from_slice(&payload);
    Ok(out)
}
