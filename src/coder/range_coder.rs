//! Carry-less binary arithmetic coder with 31-bit precision.
//!
//! The interval `[low, high]` is kept inside `[0, 2^31)`. Whenever both bounds
//! fall in the same half, the shared top bit is settled and shifted out.
//! Intervals that straddle the midpoint but sit inside the middle two quarters
//! are widened around the midpoint and the bits they would have settled are
//! counted in `pending`, to be emitted once the direction is known (E3
//! scaling).

use super::bit_io::{BitReader, BitWriter};
use crate::error::Result;
use crate::io::{ByteSink, ByteSource};

/// Working precision in bits.
pub const CODER_BITS: u32 = 31;

const FULL: u32 = 1 << CODER_BITS;
const QUARTER: u32 = FULL / 4;
const HALF: u32 = QUARTER * 2;
const THREE_QUARTERS: u32 = QUARTER * 3;
const CODE_MASK: u32 = FULL - 1;

/// Largest `scale` an interval may use.
pub const MAX_SCALE: u32 = QUARTER - 1;

/// Sub-range `[low_count, high_count)` out of `scale` total mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolInterval {
    pub low_count: u32,
    pub high_count: u32,
    pub scale: u32,
}

impl SymbolInterval {
    #[inline]
    pub const fn new(low_count: u32, high_count: u32, scale: u32) -> Self {
        Self {
            low_count,
            high_count,
            scale,
        }
    }

    /// Mass occupied by the interval.
    #[inline]
    pub const fn width(&self) -> u32 {
        self.high_count - self.low_count
    }

    #[inline]
    fn debug_check(&self) {
        debug_assert!(self.low_count < self.high_count, "empty interval {:?}", self);
        debug_assert!(self.high_count <= self.scale, "interval past scale {:?}", self);
        debug_assert!(self.scale <= MAX_SCALE, "scale too large {:?}", self);
    }
}

/// Encoding half of the coder.
///
/// The final disambiguating bits are written by [`RangeEncoder::finish`]. An
/// encoder dropped without calling it still terminates the stream, but any
/// sink error is lost.
pub struct RangeEncoder<S: ByteSink> {
    low: u32,
    high: u32,
    /// Deferred E3 bits, emitted inverted after the next settled bit.
    pending: u32,
    writer: BitWriter<S>,
    finished: bool,
}

impl<S: ByteSink> RangeEncoder<S> {
    pub fn new(sink: S) -> Self {
        Self {
            low: 0,
            high: FULL - 1,
            pending: 0,
            writer: BitWriter::new(sink),
            finished: false,
        }
    }

    /// Narrow the interval to `interval` and shift out settled bits.
    #[inline]
    pub fn encode(&mut self, interval: &SymbolInterval) -> Result<()> {
        interval.debug_check();

        let step = (self.high - self.low + 1) / interval.scale;
        self.high = self.low + step * interval.high_count - 1;
        self.low += step * interval.low_count;

        while self.low >= HALF || self.high < HALF {
            if self.high < HALF {
                self.writer.write_bit(0)?;
                self.writer.write_run(1, self.pending)?;
            } else {
                self.writer.write_bit(1)?;
                self.low &= HALF - 1;
                self.high &= HALF - 1;
                self.writer.write_run(0, self.pending)?;
            }
            self.pending = 0;
            self.low <<= 1;
            self.high = (self.high << 1) | 1;
        }

        while self.low >= QUARTER && self.high < THREE_QUARTERS {
            self.pending += 1;
            self.low &= QUARTER - 1;
            self.high ^= QUARTER | HALF;
            self.low <<= 1;
            self.high = (self.high << 1) | 1;
        }
        Ok(())
    }

    /// Write the termination bits and pad the last byte with zeros.
    pub fn finish(mut self) -> Result<()> {
        self.terminate()
    }

    fn terminate(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        // low < HALF <= high holds here, so one or two bits pin a value
        // inside the interval; the decoder supplies the trailing zeros.
        if self.low < QUARTER {
            self.writer.write_bit(0)?;
            self.writer.write_bit(1)?;
            self.writer.write_run(1, self.pending)?;
        } else {
            self.writer.write_bit(1)?;
        }
        self.pending = 0;
        self.writer.pad_to_byte()
    }
}

impl<S: ByteSink> Drop for RangeEncoder<S> {
    fn drop(&mut self) {
        if let Err(e) = self.terminate() {
            tracing::warn!(error = %e, "failed to terminate range encoder on drop");
        }
    }
}

/// Decoding half of the coder.
///
/// Decoding a value is a two-step handshake with the model: [`decode_count`]
/// maps the code register into the model's `scale`, the model resolves that
/// count to an interval, and [`consume`] removes the interval from the
/// stream.
///
/// [`decode_count`]: RangeDecoder::decode_count
/// [`consume`]: RangeDecoder::consume
pub struct RangeDecoder<S: ByteSource> {
    low: u32,
    high: u32,
    /// 31-bit window onto the encoded bitstream.
    code: u32,
    /// Step size computed by the last `decode_count`.
    step: u32,
    reader: BitReader<S>,
}

impl<S: ByteSource> RangeDecoder<S> {
    /// Create a decoder and pre-fill the code register with 31 bits.
    pub fn new(source: S) -> Self {
        let mut reader = BitReader::new(source);
        let code = reader.read_bits(CODER_BITS);
        Self {
            low: 0,
            high: FULL - 1,
            code,
            step: 1,
            reader,
        }
    }

    /// Position of the code register within `scale`. Does not consume input.
    #[inline]
    pub fn decode_count(&mut self, scale: u32) -> u32 {
        debug_assert!(scale > 0 && scale <= MAX_SCALE);
        self.step = (self.high - self.low + 1) / scale;
        // Corrupt input can leave the register below `low`
        self.code.wrapping_sub(self.low) / self.step
    }

    /// Remove `interval` (resolved from the last `decode_count`) from the stream.
    #[inline]
    pub fn consume(&mut self, interval: &SymbolInterval) {
        interval.debug_check();

        self.high = self.low + self.step * interval.high_count - 1;
        self.low += self.step * interval.low_count;

        while self.low >= HALF || self.high < HALF {
            if self.low >= HALF {
                self.low &= HALF - 1;
                self.high &= HALF - 1;
                self.code &= HALF - 1;
            }
            self.low <<= 1;
            self.high = (self.high << 1) | 1;
            self.code = ((self.code << 1) | self.reader.read_bit()) & CODE_MASK;
        }

        while self.low >= QUARTER && self.high < THREE_QUARTERS {
            self.low &= QUARTER - 1;
            self.high ^= QUARTER | HALF;
            self.code = self.code.wrapping_sub(QUARTER);
            self.low <<= 1;
            self.high = (self.high << 1) | 1;
            self.code = ((self.code << 1) | self.reader.read_bit()) & CODE_MASK;
        }
    }

    pub fn source(&self) -> &S {
        self.reader.source()
    }

    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::SliceSource;

    /// Static three-symbol distribution: 50% / 25% / 25%.
    const TABLE: [SymbolInterval; 3] = [
        SymbolInterval::new(0, 2, 4),
        SymbolInterval::new(2, 3, 4),
        SymbolInterval::new(3, 4, 4),
    ];

    fn lookup(count: u32) -> usize {
        TABLE
            .iter()
            .position(|s| count < s.high_count)
            .unwrap()
    }

    #[test]
    fn test_empty_stream_termination() {
        let mut out = Vec::new();
        RangeEncoder::new(&mut out).finish().unwrap();
        // low == 0: bits "01" then zero padding
        assert_eq!(out, vec![0x40]);
    }

    #[test]
    fn test_drop_terminates() {
        let mut out = Vec::new();
        {
            let mut encoder = RangeEncoder::new(&mut out);
            encoder.encode(&TABLE[1]).unwrap();
        }
        assert!(!out.is_empty());

        let mut explicit = Vec::new();
        let mut encoder = RangeEncoder::new(&mut explicit);
        encoder.encode(&TABLE[1]).unwrap();
        encoder.finish().unwrap();
        assert_eq!(out, explicit);
    }

    #[test]
    fn test_static_roundtrip() {
        let symbols: Vec<usize> = (0..5000u32)
            .map(|i| match i.wrapping_mul(2654435761) >> 29 {
                0..=3 => 0,
                4 | 5 => 1,
                _ => 2,
            })
            .collect();

        let mut out = Vec::new();
        let mut encoder = RangeEncoder::new(&mut out);
        for &s in &symbols {
            encoder.encode(&TABLE[s]).unwrap();
        }
        encoder.finish().unwrap();

        // Close to the 1.5 bits/symbol entropy of the table
        assert!(out.len() * 8 < symbols.len() * 16 / 10);

        let mut decoder = RangeDecoder::new(SliceSource::new(&out));
        for &expected in &symbols {
            let count = decoder.decode_count(4);
            let s = lookup(count);
            assert_eq!(s, expected);
            decoder.consume(&TABLE[s]);
        }
    }

    #[test]
    fn test_underflow_deferral_roundtrip() {
        // Skewed intervals straddling the midpoint force long runs of
        // pending bits before the next settled bit.
        let middle = SymbolInterval::new(499, 501, 1000);
        let edge = SymbolInterval::new(0, 1, 1000);
        let pattern = [middle, middle, middle, middle, edge, middle, middle];

        let mut out = Vec::new();
        let mut encoder = RangeEncoder::new(&mut out);
        for s in pattern.iter().cycle().take(700) {
            encoder.encode(s).unwrap();
        }
        encoder.finish().unwrap();

        let mut decoder = RangeDecoder::new(SliceSource::new(&out));
        for s in pattern.iter().cycle().take(700) {
            let count = decoder.decode_count(1000);
            assert!(count >= s.low_count && count < s.high_count);
            decoder.consume(s);
        }
    }

    #[test]
    fn test_full_scale_interval_emits_nothing() {
        let mut out = Vec::new();
        let mut encoder = RangeEncoder::new(&mut out);
        for _ in 0..100 {
            encoder.encode(&SymbolInterval::new(0, 1, 1)).unwrap();
        }
        encoder.finish().unwrap();
        assert_eq!(out, vec![0x40]);
    }

    #[test]
    fn test_max_scale() {
        let interval = SymbolInterval::new(MAX_SCALE - 1, MAX_SCALE, MAX_SCALE);
        let mut out = Vec::new();
        let mut encoder = RangeEncoder::new(&mut out);
        for _ in 0..10 {
            encoder.encode(&interval).unwrap();
        }
        encoder.finish().unwrap();

        let mut decoder = RangeDecoder::new(SliceSource::new(&out));
        for _ in 0..10 {
            assert_eq!(decoder.decode_count(MAX_SCALE), MAX_SCALE - 1);
            decoder.consume(&interval);
        }
    }
}
