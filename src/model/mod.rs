//! Adaptive statistical models.
//!
//! | Model | Alphabet | Escapes | Orders used per value |
//! |-------|----------|---------|-----------------------|
//! | [`ContextTrieModel`] | `0..max_symbol` | yes, with exclusion | top order down to -1 |
//! | [`BinaryContextModel`] | `{0, 1}` | no | top order only |
//!
//! Both condition on the last `max_order + 1` context bytes fed through
//! `shift_context`, storing one frequency table per distinct context in a
//! lazily grown trie. Encoder and decoder must shift identical context
//! sequences at identical points; a mismatch desynchronizes the stream with
//! no detectable error.
//!
//! ## Memory
//!
//! Every non-top node carries a link table of `max_context` entries and
//! every used node a count table of `max_symbol` entries, so a model with
//! `max_context = 256` and `max_order = 4` can grow very large on varied
//! input. Allocation failure is reported as
//! [`AriError::OutOfMemory`](crate::AriError::OutOfMemory).

mod arena;
mod binary;
mod config;
mod context_trie;
mod trie;


pub use binary::BinaryContextModel;
pub use config::{ModelConfig, MAX_CONTEXT, MAX_ORDER};
pub use context_trie::{ContextTrieModel, Decoded, ExclusionRule};
