//! Bounds-checked sequential reads over an in-memory byte buffer.
//!
//! Container fields are little-endian; the QFS frame header stores its
//! lengths big-endian.  Both are read through `byteorder` so the field
//! widths stay visible at the call site.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{FshError, Result};

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos:  usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize { self.pos }

    pub fn remaining(&self) -> usize { self.data.len().saturating_sub(self.pos) }

    /// Move to an absolute offset.  Seeking to the very end is allowed;
    /// seeking past it is a truncation.
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(FshError::Truncated {
                offset:    self.data.len(),
                needed:    offset - self.data.len(),
                available: 0,
            });
        }
        self.pos = offset;
        Ok(())
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(FshError::Truncated {
                offset:    self.pos,
                needed:    n,
                available: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_tag(&mut self) -> Result<[u8; 4]> {
        let mut tag = [0u8; 4];
        tag.copy_from_slice(self.take(4)?);
        Ok(tag)
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_u24_be(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u24(self.take(3)?))
    }
}
