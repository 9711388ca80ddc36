//! Adaptive arithmetic coding engine.
//!
//! A carry-less 31-bit range coder driven by adaptive context models:
//! [`ContextTrieModel`] (PPM with escapes and exclusion over any alphabet)
//! and [`BinaryContextModel`] (two symbols, top order only). Several models
//! can share one coder, so hosts interleave literals, flags and lengths in a
//! single bitstream.
//!
//! ## Features
//! - Core library depends only on `tracing`
//! - `parallel` - Multi-threaded block compression with rayon
//!
//! ## Quick start
//!
//! ```rust
//! use ari_stream::codec::{compress, decompress, CodecOptions};
//!
//! let data = b"to be or not to be, that is the question";
//! let packed = compress(data, &CodecOptions::default()).unwrap();
//! assert_eq!(decompress(&packed).unwrap(), data);
//! ```

pub mod codec;
pub mod coder;
pub mod driver;
pub mod error;
pub mod io;
pub mod model;

pub use coder::{RangeDecoder, RangeEncoder, SymbolInterval, MAX_SCALE};
pub use driver::{decode_symbol, encode_symbol, AdaptiveModel};
pub use error::{AriError, Result};
pub use io::{ByteSink, ByteSource, IoSink, IoSource, SliceSource};
pub use model::{
    BinaryContextModel, ContextTrieModel, Decoded, ExclusionRule, ModelConfig, MAX_CONTEXT,
    MAX_ORDER,
};

pub use codec::{compress, compress_blocks, decompress, decompress_blocks, CodecOptions};
