//! ByteStream reader for mixed-endian binary data.
//!
//! The Shapefile container mixes big-endian header/record-header integers
//! with little-endian shape content, and the compact format is entirely
//! little-endian, so every read names its byte order explicitly.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{ShpzError, ShpzResult};

/// A bounds-checked cursor over a byte slice.
#[derive(Debug)]
pub struct ByteStream<'a> {
    /// The underlying byte data
    data: &'a [u8],
    /// Current byte position
    pos: usize,
}

impl<'a> ByteStream<'a> {
    /// Creates a new ByteStream from the given byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Consumes `n` bytes and returns them.
    ///
    /// # Errors
    ///
    /// Returns `ShpzError::EndOfStream` if fewer than `n` bytes remain.
    pub fn read_bytes(&mut self, n: usize) -> ShpzResult<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(ShpzError::EndOfStream)?;
        if end > self.data.len() {
            return Err(ShpzError::EndOfStream);
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> ShpzResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16_le(&mut self) -> ShpzResult<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u32_le(&mut self) -> ShpzResult<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_i32_le(&mut self) -> ShpzResult<i32> {
        Ok(LittleEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_i32_be(&mut self) -> ShpzResult<i32> {
        Ok(BigEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_f32_le(&mut self) -> ShpzResult<f32> {
        Ok(LittleEndian::read_f32(self.read_bytes(4)?))
    }

    pub fn read_f64_le(&mut self) -> ShpzResult<f64> {
        Ok(LittleEndian::read_f64(self.read_bytes(8)?))
    }

    /// Skips `n` bytes.
    pub fn skip(&mut self, n: usize) -> ShpzResult<()> {
        self.read_bytes(n).map(|_| ())
    }

    /// Returns true if more bytes are available.
    pub fn has_more_bytes(&self) -> bool {
        self.pos < self.data.len()
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Returns the current byte position in the stream.
    pub fn position(&self) -> usize {
        self.pos
    }
}
