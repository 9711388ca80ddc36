//! Multi-symbol PPM model with escape and exclusion.
//!
//! Each value is coded against the highest-order context first. If that
//! context has never seen the value, an escape is coded and the next lower
//! order is tried, down to the uniform order -1 node which can code anything.
//! Symbols offered by a higher order are excluded from every lower order
//! tried for the same value, so no probability mass is spent twice.

use super::arena::try_alloc_slice;
use super::config::ModelConfig;
use super::trie::ContextTrie;
use crate::coder::SymbolInterval;
use crate::error::{AriError, Result};
use tracing::{debug, trace, warn};

/// Outcome of resolving a decoded count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Symbol(usize),
    /// The current order could not code the value; the model moved one
    /// order down.
    Escape,
}

/// Which values [`ContextTrieModel::exclude`] rules out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionRule {
    /// Every value greater than the bound.
    Above,
    /// Every value less than the bound.
    Below,
    /// Exactly the bound.
    Equal,
}

/// Order-0..N adaptive frequency model over `0..max_symbol`.
pub struct ContextTrieModel {
    trie: ContextTrie,
    max_symbol: usize,
    rescale_threshold: u32,
    /// Order being tried for the current value, `-1..=levels`.
    current_order: isize,
    /// Cumulative counts of the last totalized node. `totals[0]` is the scale,
    /// `[totals[1], totals[0])` the escape, `[totals[s + 2], totals[s + 1])`
    /// symbol `s`.
    totals: Box<[u32]>,
    /// Values already offered (or ruled out) while coding the current value.
    scoreboard: Box<[bool]>,
    /// Values not yet on the scoreboard.
    remaining: usize,
}

impl ContextTrieModel {
    pub fn new(config: ModelConfig) -> Result<Self> {
        config.validate()?;
        let levels = config.levels();
        let null_counts = try_alloc_slice(config.max_symbol, 1u16)?;
        let trie = ContextTrie::new(config.max_context, levels, null_counts)?;

        debug!(
            max_symbol = config.max_symbol,
            max_context = config.max_context,
            max_order = config.max_order,
            rescale_threshold = config.rescale_threshold,
            "context trie model initialized"
        );

        Ok(Self {
            trie,
            max_symbol: config.max_symbol,
            rescale_threshold: config.rescale_threshold,
            current_order: levels as isize,
            totals: try_alloc_slice(config.max_symbol + 2, 0u32)?,
            scoreboard: try_alloc_slice(config.max_symbol, false)?,
            remaining: config.max_symbol,
        })
    }

    pub fn max_symbol(&self) -> usize {
        self.max_symbol
    }

    /// Order the next resolve will use; -1 is the uniform fallback.
    pub fn current_order(&self) -> isize {
        self.current_order
    }

    /// Nodes allocated so far, including the two synthetic ones.
    pub fn node_count(&self) -> usize {
        self.trie.node_count()
    }

    /// Rebuild `totals` for `node`, excluding and then marking every symbol
    /// it offers, and append the escape estimate.
    fn totalize(&mut self, order: isize) -> Result<()> {
        let id = self.trie.active(order);
        let node = self.trie.node_mut(id);

        if node.counts.is_none() {
            // First visit: only the escape can be coded here
            node.counts = Some(try_alloc_slice(self.max_symbol, 0u16)?);
            self.totals[0] = 1;
            self.totals[1] = 0;
            return Ok(());
        }
        let Some(counts) = node.counts.as_deref() else {
            return Ok(());
        };

        let before = self.remaining;
        let top = node.max_symbol;
        self.totals[top + 1] = 0;
        let mut total = 0u32;
        for s in (0..top).rev() {
            if !self.scoreboard[s] && counts[s] > 0 {
                total += u32::from(counts[s]);
                self.scoreboard[s] = true;
                self.remaining -= 1;
            }
            self.totals[s + 1] = total;
        }

        let after = self.remaining;
        let escape = if before == after {
            1
        } else if after == 0 {
            0
        } else {
            let after = after as u64;
            let before = before as u64;
            (after * (before - after) / (before * u64::from(node.max_count))) as u32 + 1
        };
        self.totals[0] = self.totals[1] + escape;
        Ok(())
    }

    fn check_symbol(&self, value: usize) -> Result<()> {
        if value >= self.max_symbol {
            return Err(AriError::SymbolOutOfRange {
                symbol: value,
                max_symbol: self.max_symbol,
            });
        }
        Ok(())
    }

    /// Interval for `value` at the current order, or the escape interval.
    ///
    /// On escape the model drops to the next lower order and returns `true`;
    /// the caller codes the interval and asks again until it gets `false`.
    pub fn resolve_for_encode(&mut self, value: usize) -> Result<(SymbolInterval, bool)> {
        self.check_symbol(value)?;
        // A value still being searched for has a zero count in every order
        // tried so far, so only `exclude` can have marked it.
        if self.scoreboard[value] {
            return Err(AriError::ExcludedSymbol(value));
        }

        self.totalize(self.current_order)?;
        let node = self.trie.node(self.trie.active(self.current_order));
        let scale = self.totals[0];

        let known = value < node.max_symbol
            && node.counts.as_deref().is_some_and(|counts| counts[value] > 0);
        if known {
            let interval = SymbolInterval::new(self.totals[value + 2], self.totals[value + 1], scale);
            return Ok((interval, false));
        }

        debug_assert!(self.current_order >= 0, "order -1 cannot escape");
        let interval = SymbolInterval::new(self.totals[1], self.totals[0], scale);
        self.current_order -= 1;
        Ok((interval, true))
    }

    /// Totalize the current order and return its scale, ready for
    /// [`RangeDecoder::decode_count`](crate::RangeDecoder::decode_count).
    pub fn symbol_scale(&mut self) -> Result<u32> {
        self.totalize(self.current_order)?;
        Ok(self.totals[0])
    }

    /// Map a decoded count onto the totals built by [`symbol_scale`].
    ///
    /// [`symbol_scale`]: ContextTrieModel::symbol_scale
    pub fn resolve_for_decode(&mut self, count: u32) -> Result<(Decoded, SymbolInterval)> {
        let top = self.trie.node(self.trie.active(self.current_order)).max_symbol + 1;
        let mut c = 1;
        while c < top && count < self.totals[c] {
            c += 1;
        }
        let interval = SymbolInterval::new(self.totals[c], self.totals[c - 1], self.totals[0]);

        if c > 1 {
            return Ok((Decoded::Symbol(c - 2), interval));
        }
        if self.current_order < 0 || interval.low_count >= interval.high_count {
            warn!(order = self.current_order, count, "escape with no mass, stream is corrupt");
            return Err(AriError::CorruptStream);
        }
        self.current_order -= 1;
        Ok((Decoded::Escape, interval))
    }

    /// Count `value` in every order from the one that coded it up to the
    /// top, then reset exclusions and the active order for the next value.
    ///
    /// `None` only resets, leaving the statistics untouched.
    pub fn update(&mut self, value: Option<usize>) -> Result<()> {
        if let Some(value) = value {
            self.check_symbol(value)?;
            // The order -1 node stays uniform
            let from = self.current_order.max(0);
            for order in from..=self.trie.levels() as isize {
                self.increment(order, value)?;
            }
        }

        self.current_order = self.trie.levels() as isize;
        self.scoreboard.fill(false);
        self.remaining = self.max_symbol;
        Ok(())
    }

    fn increment(&mut self, order: isize, value: usize) -> Result<()> {
        let id = self.trie.active(order);
        let node = self.trie.node_mut(id);
        if node.counts.is_none() {
            node.counts = Some(try_alloc_slice(self.max_symbol, 0u16)?);
        }
        let Some(counts) = node.counts.as_deref_mut() else {
            return Ok(());
        };

        counts[value] += 1;
        let count = counts[value];
        if count > node.max_count {
            node.max_count = count;
        }
        if value >= node.max_symbol {
            node.max_symbol = value + 1;
        }
        if u32::from(count) >= self.rescale_threshold {
            node.rescale(1, 0);
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

    /// Right-shift every count of every context by `shift`, keeping the
    /// relative shape of the statistics while forgetting their weight.
    pub fn flush(&mut self, shift: u32) {
        self.trie.flush(shift, 0);
        trace!(nodes = self.trie.node_count(), shift, "flushed context trie model");
    }

    /// Rule out values for the next coded value only.
    ///
    /// The caller must not then code an excluded value. Exclusions are
    /// cleared by the next [`update`](ContextTrieModel::update).
    pub fn exclude(&mut self, rule: ExclusionRule, bound: usize) -> Result<()> {
        self.check_symbol(bound)?;
        let range = match rule {
            ExclusionRule::Above => bound + 1..self.max_symbol,
            ExclusionRule::Below => 0..bound,
            ExclusionRule::Equal => bound..bound + 1,
        };
        for flag in &mut self.scoreboard[range] {
            if !*flag {
                *flag = true;
                self.remaining -= 1;
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn trie(&self) -> &ContextTrie {
        &self.trie
    }

    #[cfg(test)]
    pub(crate) fn counts_at(&self, order: isize) -> Option<Vec<u16>> {
        let node = self.trie.node(self.trie.active(order));
        node.counts.as_deref().map(<[u16]>::to_vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(max_symbol: usize, max_order: i32, threshold: u32) -> ContextTrieModel {
        ContextTrieModel::new(ModelConfig::new(max_symbol, 8, max_order, threshold)).unwrap()
    }

    /// Resolve `value` through every escape, returning the intervals used.
    fn encode_path(m: &mut ContextTrieModel, value: usize) -> Vec<SymbolInterval> {
        let mut path = Vec::new();
        loop {
            let (interval, escaped) = m.resolve_for_encode(value).unwrap();
            path.push(interval);
            if !escaped {
                return path;
            }
        }
    }

    #[test]
    fn test_first_value_escapes_to_uniform() {
        let mut m = model(256, -1, 255);
        let path = encode_path(&mut m, 5);
        // fresh root: escape-only table, then uniform order -1
        assert_eq!(path[0], SymbolInterval::new(0, 1, 1));
        assert_eq!(path[1], SymbolInterval::new(250, 251, 256));
        assert_eq!(m.current_order(), -1);

        m.update(Some(5)).unwrap();
        assert_eq!(m.current_order(), 0);
        assert_eq!(m.counts_at(-1).unwrap(), vec![1; 256]);
        assert_eq!(m.counts_at(0).unwrap()[5], 1);
    }

    #[test]
    fn test_known_value_with_escape_estimate() {
        let mut m = model(256, -1, 255);
        encode_path(&mut m, 5);
        m.update(Some(5)).unwrap();

        // one symbol seen once: 255 * 1 / (256 * 1) + 1 = 1 escape
        let path = encode_path(&mut m, 5);
        assert_eq!(path, vec![SymbolInterval::new(0, 1, 2)]);
        m.update(Some(5)).unwrap();

        let path = encode_path(&mut m, 200);
        assert_eq!(path[0], SymbolInterval::new(2, 3, 3));
        // 5 is excluded at order -1: 255 symbols remain
        assert_eq!(path[1].scale, 255);
        assert_eq!(path[1].width(), 1);
    }

    #[test]
    fn test_escape_probability_formula() {
        let mut m = model(8, -1, 255);
        for v in [1, 1, 1, 3] {
            encode_path(&mut m, v);
            m.update(Some(v)).unwrap();
        }
        // root: counts[1] = 3, counts[3] = 1, max_count 3
        // escape = 6 * (8 - 6) / (8 * 3) + 1 = 1
        let (interval, escaped) = m.resolve_for_encode(3).unwrap();
        assert!(!escaped);
        assert_eq!(interval, SymbolInterval::new(0, 1, 5));
        m.update(None).unwrap();

        let (interval, _) = m.resolve_for_encode(1).unwrap();
        assert_eq!(interval, SymbolInterval::new(1, 4, 5));
    }

    #[test]
    fn test_escape_is_zero_when_nothing_remains() {
        let mut m = model(2, -1, 255);
        for v in [0, 1] {
            encode_path(&mut m, v);
            m.update(Some(v)).unwrap();
        }
        let scale = m.symbol_scale().unwrap();
        assert_eq!(scale, 2);
        // totals run from the highest symbol down
        let (decoded, interval) = m.resolve_for_decode(1).unwrap();
        assert_eq!(decoded, Decoded::Symbol(0));
        assert_eq!(interval, SymbolInterval::new(1, 2, 2));
        let (decoded, interval) = m.resolve_for_decode(0).unwrap();
        assert_eq!(decoded, Decoded::Symbol(1));
        assert_eq!(interval, SymbolInterval::new(0, 1, 2));
    }

    #[test]
    fn test_decode_matches_encode_intervals() {
        let mut enc = model(16, 1, 64);
        let mut dec = model(16, 1, 64);
        let values = [3usize, 3, 7, 3, 15, 0, 7, 7, 3, 9];
        for (i, &v) in values.iter().enumerate() {
            let ctx = i % 8;
            for interval in encode_path(&mut enc, v) {
                let scale = dec.symbol_scale().unwrap();
                assert_eq!(scale, interval.scale);
                let (decoded, got) = dec.resolve_for_decode(interval.low_count).unwrap();
                assert_eq!(got, interval);
                if decoded == Decoded::Escape {
                    continue;
                }
                assert_eq!(decoded, Decoded::Symbol(v));
            }
            enc.update(Some(v)).unwrap();
            dec.update(Some(v)).unwrap();
            enc.shift_context(ctx).unwrap();
            dec.shift_context(ctx).unwrap();
        }
    }

    #[test]
    fn test_escape_from_order_minus_one_is_corrupt() {
        let mut m = model(4, -1, 255);
        m.symbol_scale().unwrap();
        let (decoded, _) = m.resolve_for_decode(0).unwrap();
        assert_eq!(decoded, Decoded::Escape);
        assert_eq!(m.current_order(), -1);

        // every symbol is offered at order -1, so the escape has no mass
        m.symbol_scale().unwrap();
        assert!(matches!(m.resolve_for_decode(4), Err(AriError::CorruptStream)));
    }

    #[test]
    fn test_rescale_on_threshold() {
        let mut m = model(4, -1, 4);
        for _ in 0..3 {
            encode_path(&mut m, 2);
            m.update(Some(2)).unwrap();
        }
        encode_path(&mut m, 1);
        m.update(Some(1)).unwrap();
        assert_eq!(m.counts_at(0).unwrap(), vec![0, 1, 3, 0]);

        encode_path(&mut m, 2);
        m.update(Some(2)).unwrap();
        // 2 reached 4: every count halved
        assert_eq!(m.counts_at(0).unwrap(), vec![0, 0, 2, 0]);
    }

    #[test]
    fn test_update_none_only_resets() {
        let mut m = model(4, 0, 255);
        let (_, escaped) = m.resolve_for_encode(2).unwrap();
        assert!(escaped);
        m.update(None).unwrap();
        assert_eq!(m.current_order(), 1);
        assert_eq!(m.counts_at(1).unwrap(), vec![0; 4]);
    }

    #[test]
    fn test_flush_halves_counts() {
        let mut m = model(4, 0, 255);
        for v in [1, 1, 1, 1, 3, 3] {
            encode_path(&mut m, v);
            m.update(Some(v)).unwrap();
        }
        // only the orders that coded a value count it
        assert_eq!(m.counts_at(1).unwrap(), vec![0, 4, 0, 2]);
        assert_eq!(m.counts_at(0).unwrap(), vec![0, 1, 0, 1]);
        m.flush(1);
        assert_eq!(m.counts_at(1).unwrap(), vec![0, 2, 0, 1]);
        assert_eq!(m.counts_at(0).unwrap(), vec![0; 4]);
        m.flush(2);
        assert_eq!(m.counts_at(1).unwrap(), vec![0; 4]);
        assert_eq!(m.counts_at(-1).unwrap(), vec![1; 4]);
    }

    #[test]
    fn test_exclude_rules() {
        let mut m = model(8, -1, 255);
        m.exclude(ExclusionRule::Below, 2).unwrap();
        m.exclude(ExclusionRule::Equal, 5).unwrap();
        assert!(matches!(m.resolve_for_encode(1), Err(AriError::ExcludedSymbol(1))));
        assert!(matches!(m.resolve_for_encode(5), Err(AriError::ExcludedSymbol(5))));

        let path = encode_path(&mut m, 4);
        // 2, 3, 4, 6, 7 remain at order -1
        assert_eq!(path[1].scale, 5);
        m.update(Some(4)).unwrap();

        // cleared by update
        encode_path(&mut m, 1);
        m.update(Some(1)).unwrap();
        assert!(matches!(
            m.exclude(ExclusionRule::Above, 8),
            Err(AriError::SymbolOutOfRange { .. })
        ));
    }

    #[test]
    fn test_rejects_out_of_range_symbol() {
        let mut m = model(4, 0, 255);
        assert!(matches!(
            m.resolve_for_encode(4),
            Err(AriError::SymbolOutOfRange {
                symbol: 4,
                max_symbol: 4
            })
        ));
        assert!(m.update(Some(9)).is_err());
        assert!(m.shift_context(8).is_err());
    }
}
