//! Bounds-checked forward reader over an immutable byte buffer.
//!
//! Every decoder component reads through [`ByteCursor`].  Reads never go out
//! of bounds: a short read fails with [`LutError::UnexpectedEof`] and leaves
//! the offset where it was.

use byteorder::{ByteOrder, LittleEndian};
use crate::error::LutError;

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Cursor positioned at `pos`.  Positions past the end are clamped, so
    /// the first read reports EOF instead of panicking.
    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos: pos.min(buf.len()) }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Unread tail of the buffer.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn peek_u8(&self) -> Result<u8, LutError> {
        self.buf.get(self.pos).copied().ok_or_else(|| self.eof(1))
    }

    pub fn take_u8(&mut self) -> Result<u8, LutError> {
        let b = self.peek_u8()?;
        self.pos += 1;
        Ok(b)
    }

    pub fn take_u16_le(&mut self) -> Result<u16, LutError> {
        self.take_bytes(2).map(LittleEndian::read_u16)
    }

    pub fn take_u32_le(&mut self) -> Result<u32, LutError> {
        self.take_bytes(4).map(LittleEndian::read_u32)
    }

    pub fn take_bytes(&mut self, n: usize) -> Result<&'a [u8], LutError> {
        if self.remaining() < n {
            return Err(self.eof(n));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Advance past the next occurrence of `byte`, returning the bytes that
    /// preceded it (the delimiter itself is not included).
    pub fn skip_to_after(&mut self, byte: u8) -> Result<&'a [u8], LutError> {
        let rest = self.rest();
        match rest.iter().position(|&b| b == byte) {
            Some(i) => {
                self.pos += i + 1;
                Ok(&rest[..i])
            }
            None => Err(LutError::EndOfBuffer { byte }),
        }
    }

    fn eof(&self, wanted: usize) -> LutError {
        LutError::UnexpectedEof {
            offset:    self.pos,
            wanted,
            available: self.remaining(),
        }
    }
}
