//! Model construction parameters.

use crate::coder::MAX_SCALE;
use crate::error::{AriError, Result};

/// Highest supported model order.
pub const MAX_ORDER: i32 = 4;

/// Largest context alphabet.
pub const MAX_CONTEXT: usize = 1 << 16;

/// Parameters shared by [`ContextTrieModel`](crate::ContextTrieModel) and
/// [`BinaryContextModel`](crate::BinaryContextModel).
///
/// `max_order` counts the context bytes a model conditions on minus one:
/// `-1` is a memoryless order-0 model, `0` uses the last context byte, up to
/// `4` for the last five bytes. Every level has its own table, so memory
/// grows quickly with `max_context` and `max_order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelConfig {
    /// Size of the coded alphabet; values are `0..max_symbol`.
    pub max_symbol: usize,
    /// Size of the context alphabet; context bytes are `0..max_context`.
    pub max_context: usize,
    /// Highest order, `-1..=4`.
    pub max_order: i32,
    /// A table is halved once any of its counts reaches this value.
    pub rescale_threshold: u32,
}

impl ModelConfig {
    pub const fn new(
        max_symbol: usize,
        max_context: usize,
        max_order: i32,
        rescale_threshold: u32,
    ) -> Self {
        Self {
            max_symbol,
            max_context,
            max_order,
            rescale_threshold,
        }
    }

    /// Parameters for a two-symbol model.
    pub const fn binary(max_context: usize, max_order: i32, rescale_threshold: u32) -> Self {
        Self::new(2, max_context, max_order, rescale_threshold)
    }

    /// Check every parameter against the range the engine supports.
    ///
    /// The last check bounds the largest possible `scale`: every count stays
    /// below `rescale_threshold`, and the escape estimate never exceeds
    /// `max_symbol + 1`.
    pub fn validate(&self) -> Result<()> {
        if self.max_symbol == 0 {
            return Err(invalid("max_symbol", self.max_symbol as i64));
        }
        if self.max_context == 0 || self.max_context > MAX_CONTEXT {
            return Err(invalid("max_context", self.max_context as i64));
        }
        if !(-1..=MAX_ORDER).contains(&self.max_order) {
            return Err(invalid("max_order", self.max_order as i64));
        }
        if !(2..=u32::from(u16::MAX)).contains(&self.rescale_threshold) {
            return Err(invalid("rescale_threshold", self.rescale_threshold as i64));
        }
        let worst_scale = (self.max_symbol as u64)
            .saturating_mul(u64::from(self.rescale_threshold))
            .saturating_add(self.max_symbol as u64 + 1);
        if worst_scale > u64::from(MAX_SCALE) {
            return Err(invalid("max_symbol", self.max_symbol as i64));
        }
        Ok(())
    }

    /// Number of trie levels above the order -1 node.
    pub(crate) fn levels(&self) -> usize {
        (self.max_order + 1) as usize
    }
}

fn invalid(name: &'static str, value: i64) -> AriError {
    AriError::InvalidParameter { name, value }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(config: ModelConfig) -> &'static str {
        match config.validate() {
            Err(AriError::InvalidParameter { name, .. }) => name,
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_configs() {
        ModelConfig::new(256, 256, 1, 1024).validate().unwrap();
        ModelConfig::new(1, 1, -1, 2).validate().unwrap();
        ModelConfig::binary(1024, 4, 4096).validate().unwrap();
        assert_eq!(ModelConfig::new(4, 4, -1, 2).levels(), 0);
        assert_eq!(ModelConfig::new(4, 4, 4, 2).levels(), 5);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert_eq!(rejected(ModelConfig::new(0, 8, 0, 16)), "max_symbol");
        assert_eq!(rejected(ModelConfig::new(8, 0, 0, 16)), "max_context");
        assert_eq!(rejected(ModelConfig::new(8, MAX_CONTEXT + 1, 0, 16)), "max_context");
        assert_eq!(rejected(ModelConfig::new(8, 8, -2, 16)), "max_order");
        assert_eq!(rejected(ModelConfig::new(8, 8, 5, 16)), "max_order");
        assert_eq!(rejected(ModelConfig::new(8, 8, 0, 1)), "rescale_threshold");
        assert_eq!(rejected(ModelConfig::new(8, 8, 0, 70000)), "rescale_threshold");
    }

    #[test]
    fn test_rejects_scale_overflow() {
        // 2^16 symbols * 2^15 threshold > 2^29
        assert_eq!(rejected(ModelConfig::new(1 << 16, 8, 0, 1 << 15)), "max_symbol");
        ModelConfig::new(1 << 16, 8, 0, 4096).validate().unwrap();
    }
}
