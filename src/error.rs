//! Error types for the arithmetic coding engine.
//!
//! This module provides the [`AriError`] type which covers everything that can
//! go wrong when constructing models, coding values, or reading the codec
//! container.
//!
//! ## Error Categories
//!
//! | Category | Errors | Description |
//! |----------|--------|-------------|
//! | Resources | [`OutOfMemory`] | Trie node or table allocation failed |
//! | Caller misuse | [`InvalidParameter`], [`SymbolOutOfRange`], [`ContextOutOfRange`], [`ExcludedSymbol`] | Precondition violated at a model boundary |
//! | Stream | [`CorruptStream`], [`InvalidSignature`], [`InvalidHeader`] | Input was not produced by the encoder |
//! | I/O | [`Io`] | Underlying reader/writer failed |
//!
//! None of these are retryable: arithmetic coding has no notion of repeating a
//! step, so callers should abandon the pass that produced the error.
//!
//! ## Example
//!
//! ```rust
//! use ari_stream::{AriError, ContextTrieModel, ModelConfig};
//!
//! let mut model = ContextTrieModel::new(ModelConfig::new(16, 16, 1, 255)).unwrap();
//! match model.shift_context(99) {
//!     Err(AriError::ContextOutOfRange { context, max_context }) => {
//!         assert_eq!((context, max_context), (99, 16));
//!     }
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```
//!
//! [`OutOfMemory`]: AriError::OutOfMemory
//! [`InvalidParameter`]: AriError::InvalidParameter
//! [`SymbolOutOfRange`]: AriError::SymbolOutOfRange
//! [`ContextOutOfRange`]: AriError::ContextOutOfRange
//! [`ExcludedSymbol`]: AriError::ExcludedSymbol
//! [`CorruptStream`]: AriError::CorruptStream
//! [`InvalidSignature`]: AriError::InvalidSignature
//! [`InvalidHeader`]: AriError::InvalidHeader
//! [`Io`]: AriError::Io

use std::fmt;
use std::io;

/// Error type for engine operations.
#[derive(Debug)]
pub enum AriError {
    /// A trie node, link table or count table could not be allocated.
    ///
    /// `requested` is the size in bytes of the allocation that failed.
    OutOfMemory {
        /// Bytes requested.
        requested: usize,
    },

    /// A construction parameter is outside its supported range.
    InvalidParameter {
        /// Parameter name as it appears in [`ModelConfig`](crate::ModelConfig).
        name: &'static str,
        /// The rejected value.
        value: i64,
    },

    /// A value outside `0..max_symbol` was passed to a model.
    SymbolOutOfRange {
        /// The rejected value.
        symbol: usize,
        /// The model's alphabet size.
        max_symbol: usize,
    },

    /// A context byte outside `0..max_context` was shifted into a model.
    ContextOutOfRange {
        /// The rejected context byte.
        context: usize,
        /// The model's context alphabet size.
        max_context: usize,
    },

    /// The value to encode was excluded with
    /// [`ContextTrieModel::exclude`](crate::ContextTrieModel::exclude).
    ExcludedSymbol(usize),

    /// The decoder resolved an interval no encoder could have produced.
    ///
    /// This happens when the input is truncated, forged, or decoded with a
    /// model whose parameters or context sequence differ from the encoder's.
    CorruptStream,

    /// The codec container does not start with the expected signature.
    InvalidSignature,

    /// The codec container header is truncated or carries invalid options.
    InvalidHeader,

    /// An I/O error occurred in a byte source or sink.
    Io(io::Error),
}

impl fmt::Display for AriError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { requested } => {
                write!(f, "Out of memory allocating {} bytes", requested)
            }
            Self::InvalidParameter { name, value } => {
                write!(f, "Invalid model parameter {}: {}", name, value)
            }
            Self::SymbolOutOfRange { symbol, max_symbol } => {
                write!(f, "Symbol {} out of range (alphabet size {})", symbol, max_symbol)
            }
            Self::ContextOutOfRange {
                context,
                max_context,
            } => {
                write!(
                    f,
                    "Context {} out of range (context alphabet size {})",
                    context, max_context
                )
            }
            Self::ExcludedSymbol(s) => write!(f, "Symbol {} is excluded in this context", s),
            Self::CorruptStream => write!(f, "Corrupt arithmetic coded stream"),
            Self::InvalidSignature => write!(f, "Invalid stream signature"),
            Self::InvalidHeader => write!(f, "Invalid or truncated stream header"),
            Self::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for AriError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for AriError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, AriError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display() {
        let err = AriError::SymbolOutOfRange {
            symbol: 300,
            max_symbol: 256,
        };
        assert_eq!(err.to_string(), "Symbol 300 out of range (alphabet size 256)");

        let err = AriError::InvalidParameter {
            name: "max_order",
            value: 7,
        };
        assert_eq!(err.to_string(), "Invalid model parameter max_order: 7");
    }

    #[test]
    fn test_io_source() {
        let err: AriError = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(err, AriError::Io(_)));
        assert!(err.source().is_some());
        assert!(AriError::CorruptStream.source().is_none());
    }
}
