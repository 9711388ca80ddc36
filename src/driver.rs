//! Glue between a model and the range coder.
//!
//! [`encode_symbol`] and [`decode_symbol`] code one value and update the
//! model afterwards. For [`ContextTrieModel`] that means looping over escapes
//! until some order resolves the value; [`BinaryContextModel`] is single-shot.
//!
//! ## Example
//!
//! ```rust
//! use ari_stream::{decode_symbol, encode_symbol, ContextTrieModel, ModelConfig};
//! use ari_stream::{RangeDecoder, RangeEncoder, SliceSource};
//!
//! let config = ModelConfig::new(256, 256, 0, 255);
//! let text = b"abracadabra";
//!
//! let mut packed = Vec::new();
//! let mut model = ContextTrieModel::new(config).unwrap();
//! let mut encoder = RangeEncoder::new(&mut packed);
//! for &b in text {
//!     encode_symbol(&mut encoder, &mut model, b as usize).unwrap();
//!     model.shift_context(b as usize).unwrap();
//! }
//! encoder.finish().unwrap();
//!
//! let mut model = ContextTrieModel::new(config).unwrap();
//! let mut decoder = RangeDecoder::new(SliceSource::new(&packed));
//! let mut out = Vec::new();
//! for _ in 0..text.len() {
//!     let b = decode_symbol(&mut decoder, &mut model).unwrap();
//!     model.shift_context(b).unwrap();
//!     out.push(b as u8);
//! }
//! assert_eq!(out, text);
//! ```

use crate::coder::{RangeDecoder, RangeEncoder};
use crate::error::Result;
use crate::io::{ByteSink, ByteSource};
use crate::model::{BinaryContextModel, ContextTrieModel, Decoded};

/// A model that can drive the range coder for one value at a time.
pub trait AdaptiveModel {
    /// Code `value` and update the statistics.
    fn encode_value<S: ByteSink>(&mut self, encoder: &mut RangeEncoder<S>, value: usize)
        -> Result<()>;

    /// Decode one value and update the statistics.
    fn decode_value<S: ByteSource>(&mut self, decoder: &mut RangeDecoder<S>) -> Result<usize>;
}

/// Encode `value` with `model`.
#[inline]
pub fn encode_symbol<M, S>(encoder: &mut RangeEncoder<S>, model: &mut M, value: usize) -> Result<()>
where
    M: AdaptiveModel + ?Sized,
    S: ByteSink,
{
    model.encode_value(encoder, value)
}

/// Decode one value with `model`.
#[inline]
pub fn decode_symbol<M, S>(decoder: &mut RangeDecoder<S>, model: &mut M) -> Result<usize>
where
    M: AdaptiveModel + ?Sized,
    S: ByteSource,
{
    model.decode_value(decoder)
}

impl AdaptiveModel for ContextTrieModel {
    fn encode_value<S: ByteSink>(
        &mut self,
        encoder: &mut RangeEncoder<S>,
        value: usize,
    ) -> Result<()> {
        loop {
            let (interval, escaped) = match self.resolve_for_encode(value) {
                Ok(resolved) => resolved,
                Err(e) => {
                    // Drop exclusions and the escape position for the next value
                    self.update(None)?;
                    return Err(e);
                }
            };
            encoder.encode(&interval)?;
            if !escaped {
                break;
            }
        }
        self.update(Some(value))
    }

    fn decode_value<S: ByteSource>(&mut self, decoder: &mut RangeDecoder<S>) -> Result<usize> {
        loop {
            let scale = self.symbol_scale()?;
            let count = decoder.decode_count(scale);
            let (decoded, interval) = match self.resolve_for_decode(count) {
                Ok(resolved) => resolved,
                Err(e) => {
                    self.update(None)?;
                    return Err(e);
                }
            };
            decoder.consume(&interval);
            if let Decoded::Symbol(value) = decoded {
                self.update(Some(value))?;
                return Ok(value);
            }
        }
    }
}

impl AdaptiveModel for BinaryContextModel {
    fn encode_value<S: ByteSink>(
        &mut self,
        encoder: &mut RangeEncoder<S>,
        value: usize,
    ) -> Result<()> {
        let interval = self.resolve_for_encode(value)?;
        encoder.encode(&interval)?;
        self.update(Some(value))
    }

    fn decode_value<S: ByteSource>(&mut self, decoder: &mut RangeDecoder<S>) -> Result<usize> {
        let scale = self.symbol_scale()?;
        let count = decoder.decode_count(scale);
        let (bit, interval) = self.resolve_for_decode(count)?;
        decoder.consume(&interval);
        self.update(Some(bit))?;
        Ok(bit)
    }
}
