//! Bit-precise arithmetic coder.
//!
//! ```text
//!  model ──SymbolInterval──► RangeEncoder ──bits──► BitWriter ──bytes──► ByteSink
//!  model ◄──count / interval── RangeDecoder ◄──bits── BitReader ◄──bytes── ByteSource
//! ```
//!
//! The coder knows nothing about probabilities: callers (normally the
//! [`driver`](crate::driver) functions) hand it the interval a statistical
//! model assigned to the value being coded.

mod bit_io;
mod range_coder;

pub use bit_io::{BitReader, BitWriter};
pub use range_coder::{RangeDecoder, RangeEncoder, SymbolInterval, CODER_BITS, MAX_SCALE};
