//! Bit channel over a byte sink or source.
//!
//! Bits are packed MSB first within each byte, matching the order the range
//! coder shifts them out of its interval bounds.

use crate::error::Result;
use crate::io::{ByteSink, ByteSource};

/// Bit writer that packs bits into a byte sink.
pub struct BitWriter<S> {
    sink: S,
    /// Partial byte, filled from the low end.
    buffer: u8,
    /// Bits currently held in `buffer` (0..8).
    bits: u32,
}

impl<S: ByteSink> BitWriter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            buffer: 0,
            bits: 0,
        }
    }

    /// Write a single bit (only the lowest bit of `bit` is used).
    #[inline]
    pub fn write_bit(&mut self, bit: u32) -> Result<()> {
        self.buffer = (self.buffer << 1) | (bit & 1) as u8;
        self.bits += 1;
        if self.bits == 8 {
            self.sink.write_byte(self.buffer)?;
            self.buffer = 0;
            self.bits = 0;
        }
        Ok(())
    }

    /// Write `count` copies of the same bit.
    #[inline]
    pub fn write_run(&mut self, bit: u32, count: u32) -> Result<()> {
        for _ in 0..count {
            self.write_bit(bit)?;
        }
        Ok(())
    }

    /// Pad with zero bits until the partial byte has been flushed.
    pub fn pad_to_byte(&mut self) -> Result<()> {
        while self.bits > 0 {
            self.write_bit(0)?;
        }
        Ok(())
    }

    /// Bits buffered but not yet written to the sink.
    pub fn pending_bits(&self) -> u32 {
        self.bits
    }
}

/// Bit reader that pulls bytes from a byte source on demand.
pub struct BitReader<S> {
    source: S,
    buffer: u8,
    /// Bits left unread in `buffer`.
    bits: u32,
}

impl<S: ByteSource> BitReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            buffer: 0,
            bits: 0,
        }
    }

    /// Read a single bit. Past the end of the source every bit is zero.
    #[inline]
    pub fn read_bit(&mut self) -> u32 {
        if self.bits == 0 {
            self.buffer = self.source.read_byte().unwrap_or(0);
            self.bits = 8;
        }
        self.bits -= 1;
        u32::from((self.buffer >> self.bits) & 1)
    }

    /// Read `n` bits (n <= 32) as an MSB-first integer.
    #[inline]
    pub fn read_bits(&mut self, n: u32) -> u32 {
        debug_assert!(n <= 32);
        (0..n).fold(0u32, |acc, _| (acc << 1) | self.read_bit())
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}
