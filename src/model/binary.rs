//! Two-symbol adaptive model.
//!
//! Uses the same context trie as [`ContextTrieModel`](crate::ContextTrieModel)
//! but codes every bit in the top-order context only: there is no escape, so
//! both counts are kept at one or more and either bit is always codable.

use super::arena::try_alloc_slice;
use super::config::ModelConfig;
use super::trie::ContextTrie;
use crate::coder::SymbolInterval;
use crate::error::{AriError, Result};
use tracing::{debug, trace};

/// Adaptive model over the alphabet `{0, 1}`, conditioned on up to five
/// context bytes.
pub struct BinaryContextModel {
    trie: ContextTrie,
    rescale_threshold: u32,
}

impl BinaryContextModel {
    pub fn new(max_context: usize, max_order: i32, rescale_threshold: u32) -> Result<Self> {
        let config = ModelConfig::binary(max_context, max_order, rescale_threshold);
        config.validate()?;
        let null_counts = try_alloc_slice(2, 1u16)?;
        let trie = ContextTrie::new(config.max_context, config.levels(), null_counts)?;

        debug!(
            max_context,
            max_order, rescale_threshold, "binary context model initialized"
        );

        Ok(Self {
            trie,
            rescale_threshold,
        })
    }

    /// Counts of the active context, allocating `{1, 1}` on first use.
    fn active_counts(&mut self) -> Result<[u16; 2]> {
        let id = self.trie.top();
        let node = self.trie.node_mut(id);
        if node.counts.is_none() {
            node.counts = Some(try_alloc_slice(2, 1u16)?);
            node.max_count = 1;
            node.max_symbol = 2;
        }
        Ok(match node.counts.as_deref() {
            Some(&[zero, one]) => [zero, one],
            _ => [1, 1],
        })
    }

    fn check_bit(bit: usize) -> Result<()> {
        if bit > 1 {
            return Err(AriError::SymbolOutOfRange {
                symbol: bit,
                max_symbol: 2,
            });
        }
        Ok(())
    }

    /// Interval for `bit` in the active context.
    pub fn resolve_for_encode(&mut self, bit: usize) -> Result<SymbolInterval> {
        Self::check_bit(bit)?;
        let [zero, one] = self.active_counts()?;
        let (zero, one) = (u32::from(zero), u32::from(one));
        Ok(if bit == 0 {
            SymbolInterval::new(0, zero, zero + one)
        } else {
            SymbolInterval::new(zero, zero + one, zero + one)
        })
    }

    /// Scale of the active context.
    pub fn symbol_scale(&mut self) -> Result<u32> {
        let [zero, one] = self.active_counts()?;
        Ok(u32::from(zero) + u32::from(one))
    }

    /// Bit and interval for a count obtained with [`symbol_scale`].
    ///
    /// [`symbol_scale`]: BinaryContextModel::symbol_scale
    pub fn resolve_for_decode(&mut self, count: u32) -> Result<(usize, SymbolInterval)> {
        let [zero, one] = self.active_counts()?;
        let (zero, one) = (u32::from(zero), u32::from(one));
        Ok(if count < zero {
            (0, SymbolInterval::new(0, zero, zero + one))
        } else {
            (1, SymbolInterval::new(zero, zero + one, zero + one))
        })
    }

    /// Count `bit` in the active context, halving both counts (never below
    /// one) once it reaches the threshold. `None` is accepted for symmetry
    /// with the multi-symbol model and changes nothing.
    pub fn update(&mut self, bit: Option<usize>) -> Result<()> {
        let Some(bit) = bit else {
            return Ok(());
        };
        Self::check_bit(bit)?;
        self.active_counts()?;

        let id = self.trie.top();
        let node = self.trie.node_mut(id);
        if let Some(counts) = node.counts.as_deref_mut() {
            counts[bit] = counts[bit].saturating_add(1);
            let count = counts[bit];
            node.max_count = node.max_count.max(count);
            if u32::from(count) >= self.rescale_threshold {
                node.rescale(1, 1);
            }
        }
        Ok(())
    }

    /// Slide the context window forward by byte `c`.
    pub fn shift_context(&mut self, c: usize) -> Result<()> {
        self.trie.shift_context(c)
    }

    /// Shift several context bytes, oldest first.
    pub fn shift_model(&mut self, contexts: &[usize]) -> Result<()> {
        self.trie.shift_model(contexts)
    }

    /// Right-shift every count of every context by `shift`, keeping each at
    /// one or more.
    pub fn flush(&mut self, shift: u32) {
        self.trie.flush(shift, 1);
        trace!(nodes = self.trie.node_count(), shift, "flushed binary context model");
    }

    /// Counts `[zero, one]` of the active context, if it has been used.
    pub fn counts(&self) -> Option<[u16; 2]> {
        match self.trie.node(self.trie.top()).counts.as_deref() {
            Some(&[zero, one]) => Some([zero, one]),
            _ => None,
        }
    }

    pub fn node_count(&self) -> usize {
        self.trie.node_count()
    }

    #[cfg(test)]
    pub(crate) fn trie(&self) -> &ContextTrie {
        &self.trie
    }
}
