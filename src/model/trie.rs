//! Order chain and lazy trie growth shared by both models.
//!
//! The trie has one level per order. Two synthetic nodes bound it: the order
//! -1 null node, whose counts are fixed by the owning model and whose links
//! all lead to the order-0 root, and the root itself. Shifting a context byte
//! walks one link down from every active node, creating missing nodes on the
//! way, so the chain always holds the tables for the last `1..=levels` bytes.

use super::arena::{try_alloc_slice, ContextNode, NodeArena, NodeId};
use crate::error::{AriError, Result};

pub(crate) struct ContextTrie {
    arena: NodeArena,
    /// Active node per order; `chain[order + 1]`, so the null node is at 0.
    chain: Vec<NodeId>,
    levels: usize,
    max_context: usize,
}

impl ContextTrie {
    /// Build the null node, the root and one node per order above it, as if
    /// a run of zero context bytes had been shifted in.
    pub fn new(max_context: usize, levels: usize, null_counts: Box<[u16]>) -> Result<Self> {
        let mut arena = NodeArena::new();

        let null = arena.alloc(-1, None, 0)?;
        let root = arena.alloc(0, Some(null), if levels > 0 { max_context } else { 0 })?;
        {
            let node = arena.node_mut(null);
            node.links = Some(try_alloc_slice(max_context, Some(root))?);
            node.max_count = null_counts.iter().copied().max().unwrap_or(0);
            node.max_symbol = null_counts.len();
            node.counts = Some(null_counts);
        }

        let mut chain = Vec::with_capacity(levels + 2);
        chain.push(null);
        chain.push(root);
        for order in 1..=levels {
            let lower = chain[order];
            let links = if order < levels { max_context } else { 0 };
            let id = arena.alloc(order as i8, Some(lower), links)?;
            set_link(arena.node_mut(lower), 0, id);
            chain.push(id);
        }

        Ok(Self {
            arena,
            chain,
            levels,
            max_context,
        })
    }

    /// Highest order index (`max_order + 1`).
    #[inline]
    pub fn levels(&self) -> usize {
        self.levels
    }

    pub fn max_context(&self) -> usize {
        self.max_context
    }

    /// Active node at `order` (-1 is the null node).
    #[inline]
    pub fn active(&self, order: isize) -> NodeId {
        self.chain[(order + 1) as usize]
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &ContextNode {
        self.arena.node(id)
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut ContextNode {
        self.arena.node_mut(id)
    }

    /// Node holding the statistics for the current top-order context.
    #[inline]
    pub fn top(&self) -> NodeId {
        self.chain[self.levels + 1]
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Advance the chain by context byte `c`.
    pub fn shift_context(&mut self, c: usize) -> Result<()> {
        if c >= self.max_context {
            return Err(AriError::ContextOutOfRange {
                context: c,
                max_context: self.max_context,
            });
        }
        if self.levels < 1 {
            return Ok(());
        }

        // Top-down, so chain[order - 1] still holds the previous order-(order-2)
        // node whose child under `c` is the new order-(order-1) context.
        for order in (1..=self.levels).rev() {
            let parent = self.chain[order];
            let next = match self.arena.node(parent).link(c) {
                Some(id) => id,
                None => {
                    let lesser = self.arena.node(self.chain[order - 1]).link(c);
                    let links = if order == self.levels { 0 } else { self.max_context };
                    let id = self.arena.alloc(order as i8, lesser, links)?;
                    set_link(self.arena.node_mut(parent), c, id);
                    id
                }
            };
            self.chain[order + 1] = next;
        }

        // Nodes created before their lesser context existed get it now.
        for order in 1..=self.levels {
            let lesser = self.chain[order];
            let node = self.arena.node_mut(self.chain[order + 1]);
            if node.lesser.is_none() {
                node.lesser = Some(lesser);
            }
        }
        Ok(())
    }

    /// Shift several context bytes, oldest first.
    pub fn shift_model(&mut self, contexts: &[usize]) -> Result<()> {
        contexts.iter().try_for_each(|&c| self.shift_context(c))
    }

    /// Rescale every node reachable from the root. The null node is left alone.
    pub fn flush(&mut self, shift: u32, floor: u16) {
        let root = self.chain[1];
        self.arena.walk_mut(root, |node| {
            node.rescale(shift, floor);
        });
    }

    /// Link structure of the whole trie, in allocation order.
    #[cfg(test)]
    pub fn shape(&self) -> Vec<(i8, Vec<(usize, usize)>)> {
        self.arena
            .iter()
            .map(|(_, node)| {
                let links = node
                    .links
                    .iter()
                    .flat_map(|l| l.iter().enumerate())
                    .filter_map(|(c, l)| l.map(|id| (c, id.index())))
                    .collect();
                (node.order, links)
            })
            .collect()
    }

    /// Check `lesser` links: one order down, and a suffix of the same context.
    #[cfg(test)]
    pub fn assert_lesser_links(&self) {
        for (id, node) in self.arena.iter() {
            if node.order < 0 {
                assert!(node.lesser.is_none());
                continue;
            }
            let lesser = node.lesser.unwrap_or_else(|| panic!("node {:?} has no lesser", id));
            assert_eq!(self.arena.node(lesser).order, node.order - 1);
        }
    }
}

fn set_link(node: &mut ContextNode, c: usize, id: NodeId) {
    if let Some(links) = node.links.as_mut() {
        links[c] = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie(levels: usize) -> ContextTrie {
        ContextTrie::new(4, levels, vec![1u16; 3].into_boxed_slice()).unwrap()
    }

    #[test]
    fn test_initial_chain() {
        let t = trie(2);
        // null + root + one node per order
        assert_eq!(t.node_count(), 4);
        for order in -1..=2isize {
            assert_eq!(t.node(t.active(order)).order as isize, order);
        }
        assert_eq!(t.top(), t.active(2));
        assert!(t.node(t.top()).links.is_none());
        t.assert_lesser_links();
    }

    #[test]
    fn test_order_minus_one_ignores_shifts() {
        let mut t = trie(0);
        t.shift_model(&[1, 2, 3]).unwrap();
        assert_eq!(t.node_count(), 2);
        assert_eq!(t.top(), t.active(0));
        assert!(t.node(t.top()).links.is_none());
    }

    #[test]
    fn test_shift_rejects_out_of_range() {
        let mut t = trie(1);
        assert!(matches!(
            t.shift_context(4),
            Err(AriError::ContextOutOfRange {
                context: 4,
                max_context: 4
            })
        ));
    }

    #[test]
    fn test_shift_builds_and_reuses_nodes() {
        let mut t = trie(2);
        t.shift_model(&[1, 2]).unwrap();
        // "1" at order 1; "2" at order 1; "0 1" and "1 2" at order 2
        assert_eq!(t.node_count(), 8);
        let top = t.top();

        t.shift_model(&[3, 1, 2]).unwrap();
        assert_eq!(t.top(), top);
        t.assert_lesser_links();
    }

    #[test]
    fn test_backfilled_lesser_is_suffix_context() {
        let mut t = trie(2);
        t.shift_context(3).unwrap();
        let order1 = t.active(1);
        let order2 = t.active(2);
        // "0 3" was created before "3" existed
        assert_eq!(t.node(order2).lesser, Some(order1));
        assert_eq!(t.node(t.active(0)).link(3), Some(order1));
    }

    #[test]
    fn test_flush_skips_null_node() {
        let mut t = trie(1);
        let root = t.active(0);
        t.node_mut(root).counts = Some(vec![8, 2, 0].into_boxed_slice());
        t.node_mut(root).max_count = 8;
        t.node_mut(root).max_symbol = 2;

        t.flush(1, 0);
        assert_eq!(t.node(root).counts.as_deref(), Some(&[4, 1, 0][..]));
        assert_eq!(t.node(t.active(-1)).counts.as_deref(), Some(&[1, 1, 1][..]));
    }
}
