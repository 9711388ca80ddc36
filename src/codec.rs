//! Byte-stream compressor built on the engine.
//!
//! Each input byte is coded with an order-N [`ContextTrieModel`] over 256
//! symbols and then shifted into the model's context window, so the stream
//! is plain PPM with no preprocessing.
//!
//! ## Container
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | Signature `ARI\x1a` |
//! | 4 | 1 | `max_order` (i8) |
//! | 5 | 2 | Rescale threshold (u16 LE) |
//! | 7 | 4 | Flush interval in bytes (u32 LE, 0 = never) |
//! | 11 | 8 | Decoded length (u64 LE) |
//! | 19 | .. | Engine bitstream |
//!
//! The block container (`ARB\x1a`, u32 block count, then a u32 length and a
//! single-stream container per block) codes fixed-size blocks independently.
//! With the `parallel` feature the blocks are coded on the rayon pool.
//!
//! ## Example
//!
//! ```rust
//! use ari_stream::codec::{compress, decompress, CodecOptions};
//!
//! let text = b"she sells sea shells by the sea shore";
//! let packed = compress(text, &CodecOptions::default()).unwrap();
//! assert_eq!(decompress(&packed).unwrap(), text);
//! ```

use crate::coder::{RangeDecoder, RangeEncoder};
use crate::driver::{decode_symbol, encode_symbol};
use crate::error::{AriError, Result};
use crate::io::SliceSource;
use crate::model::{ContextTrieModel, ModelConfig};
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Single-stream signature.
pub const SIGNATURE: [u8; 4] = *b"ARI\x1a";

/// Block container signature.
pub const BLOCK_SIGNATURE: [u8; 4] = *b"ARB\x1a";

const HEADER_LEN: usize = 19;

/// A valid stream never reads more than four bytes past its end.
const MAX_OVERRUN: usize = 8;

/// Parameters stored in the container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecOptions {
    /// Highest model order, `-1..=4`.
    pub max_order: i8,
    pub rescale_threshold: u16,
    /// Halve every count after this many bytes; 0 disables it.
    pub flush_interval: u32,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            max_order: 1,
            rescale_threshold: 1024,
            flush_interval: 0,
        }
    }
}

impl CodecOptions {
    /// Model parameters for byte coding.
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig::new(
            256,
            256,
            i32::from(self.max_order),
            u32::from(self.rescale_threshold),
        )
    }

    fn flush_due(&self, coded: usize) -> bool {
        self.flush_interval > 0 && coded % self.flush_interval as usize == 0
    }
}

/// Compress `data` into a single-stream container.
pub fn compress(data: &[u8], options: &CodecOptions) -> Result<Vec<u8>> {
    let mut model = ContextTrieModel::new(options.model_config())?;

    let mut out = Vec::with_capacity(HEADER_LEN + data.len() / 2);
    out.extend_from_slice(&SIGNATURE);
    out.push(options.max_order as u8);
    out.extend_from_slice(&options.rescale_threshold.to_le_bytes());
    out.extend_from_slice(&options.flush_interval.to_le_bytes());
    out.extend_from_slice(&(data.len() as u64).to_le_bytes());

    let mut encoder = RangeEncoder::new(&mut out);
    for (i, &byte) in data.iter().enumerate() {
        encode_symbol(&mut encoder, &mut model, usize::from(byte))?;
        model.shift_context(usize::from(byte))?;
        if options.flush_due(i + 1) {
            model.flush(1);
        }
    }
    encoder.finish()?;

    debug!(
        input = data.len(),
        output = out.len(),
        nodes = model.node_count(),
        "compressed stream"
    );
    Ok(out)
}

/// Parse a single-stream header, returning the options, decoded length and
/// bitstream.
fn read_header(data: &[u8]) -> Result<(CodecOptions, usize, &[u8])> {
    if data.len() < SIGNATURE.len() {
        return Err(AriError::InvalidHeader);
    }
    if data[..4] != SIGNATURE {
        return Err(AriError::InvalidSignature);
    }
    if data.len() < HEADER_LEN {
        return Err(AriError::InvalidHeader);
    }

    let options = CodecOptions {
        max_order: data[4] as i8,
        rescale_threshold: u16::from_le_bytes([data[5], data[6]]),
        flush_interval: u32::from_le_bytes([data[7], data[8], data[9], data[10]]),
    };
    options
        .model_config()
        .validate()
        .map_err(|_| AriError::InvalidHeader)?;

    let mut len = [0u8; 8];
    len.copy_from_slice(&data[11..HEADER_LEN]);
    let len = usize::try_from(u64::from_le_bytes(len)).map_err(|_| AriError::InvalidHeader)?;

    Ok((options, len, &data[HEADER_LEN..]))
}

/// Decompress a single-stream container produced by [`compress`].
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let (options, len, payload) = read_header(data)?;
    let mut model = ContextTrieModel::new(options.model_config())?;

    // The header length is untrusted; grow as bytes actually decode
    let mut out = Vec::with_capacity(len.min(payload.len().saturating_mul(8)));
    let mut decoder = RangeDecoder::new(SliceSource::new(payload));
    for i in 0..len {
        let value = decode_symbol(&mut decoder, &mut model)?;
        if decoder.source().overrun() > MAX_OVERRUN {
            warn!(decoded = i, expected = len, "stream ended before its declared length");
            return Err(AriError::CorruptStream);
        }
        // 256 symbols, so every decoded value is a byte
        let byte = value as u8;
        out.push(byte);
        model.shift_context(value)?;
        if options.flush_due(i + 1) {
            model.flush(1);
        }
    }

    debug!(input = data.len(), output = out.len(), "decompressed stream");
    Ok(out)
}

/// Compress `data` as independent blocks of `block_size` bytes.
pub fn compress_blocks(data: &[u8], block_size: usize, options: &CodecOptions) -> Result<Vec<u8>> {
    if block_size == 0 {
        return Err(AriError::InvalidParameter {
            name: "block_size",
            value: 0,
        });
    }
    options.model_config().validate()?;

    #[cfg(feature = "parallel")]
    let blocks: Vec<Vec<u8>> = data
        .par_chunks(block_size)
        .map(|chunk| compress(chunk, options))
        .collect::<Result<_>>()?;
    #[cfg(not(feature = "parallel"))]
    let blocks: Vec<Vec<u8>> = data
        .chunks(block_size)
        .map(|chunk| compress(chunk, options))
        .collect::<Result<_>>()?;

    let count = u32::try_from(blocks.len()).map_err(|_| AriError::InvalidParameter {
        name: "block_size",
        value: block_size as i64,
    })?;
    let total: usize = blocks.iter().map(|b| b.len() + 4).sum();
    let mut out = Vec::with_capacity(8 + total);
    out.extend_from_slice(&BLOCK_SIGNATURE);
    out.extend_from_slice(&count.to_le_bytes());
    for block in &blocks {
        let len = u32::try_from(block.len()).map_err(|_| AriError::InvalidParameter {
            name: "block_size",
            value: block_size as i64,
        })?;
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(block);
    }

    debug!(
        input = data.len(),
        output = out.len(),
        blocks = blocks.len(),
        "compressed blocks"
    );
    Ok(out)
}

/// Split a block container into its single-stream containers.
fn split_blocks(data: &[u8]) -> Result<Vec<&[u8]>> {
    if data.len() < 4 {
        return Err(AriError::InvalidHeader);
    }
    if data[..4] != BLOCK_SIGNATURE {
        return Err(AriError::InvalidSignature);
    }
    let mut rest = &data[4..];
    let count = read_u32(&mut rest)?;

    // Every block takes at least its length field, which bounds a forged count
    let mut blocks = Vec::with_capacity((count as usize).min(rest.len() / 4));
    for _ in 0..count {
        let len = read_u32(&mut rest)? as usize;
        if rest.len() < len {
            return Err(AriError::InvalidHeader);
        }
        let (block, tail) = rest.split_at(len);
        blocks.push(block);
        rest = tail;
    }
    if !rest.is_empty() {
        return Err(AriError::InvalidHeader);
    }
    Ok(blocks)
}

fn read_u32(rest: &mut &[u8]) -> Result<u32> {
    let Some((head, tail)) = rest.split_first_chunk::<4>() else {
        return Err(AriError::InvalidHeader);
    };
    *rest = tail;
    Ok(u32::from_le_bytes(*head))
}

/// Decompress a block container produced by [`compress_blocks`].
pub fn decompress_blocks(data: &[u8]) -> Result<Vec<u8>> {
    let blocks = split_blocks(data)?;

    #[cfg(feature = "parallel")]
    let decoded: Vec<Vec<u8>> = blocks
        .par_iter()
        .map(|block| decompress(block))
        .collect::<Result<_>>()?;
    #[cfg(not(feature = "parallel"))]
    let decoded: Vec<Vec<u8>> = blocks
        .iter()
        .map(|block| decompress(block))
        .collect::<Result<_>>()?;

    let out = decoded.concat();
    debug!(
        input = data.len(),
        output = out.len(),
        blocks = decoded.len(),
        "decompressed blocks"
    );
    Ok(out)
}
