//! Node arena for context tries.
//!
//! Nodes are addressed by [`NodeId`] instead of pointers, so back-filling a
//! `lesser` link is a plain write into an existing slot. Every allocation goes
//! through `try_reserve` and surfaces failure as [`AriError::OutOfMemory`].
//! Dropping the arena frees the whole trie.

use crate::error::{AriError, Result};
use std::mem::size_of;
use std::num::NonZeroU32;

/// Index of a node in its arena.
///
/// Stored off by one so `Option<NodeId>` stays four bytes, which keeps the
/// per-node link tables compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    fn from_index(index: usize) -> Option<Self> {
        let raw = u32::try_from(index).ok()?.checked_add(1)?;
        NonZeroU32::new(raw).map(Self)
    }

    /// Position of the node in allocation order.
    #[inline]
    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// One frequency table of a context trie.
#[derive(Debug)]
pub(crate) struct ContextNode {
    /// Trie level; -1 for the null node.
    pub order: i8,
    /// Fallback node one order down.
    pub lesser: Option<NodeId>,
    /// Children indexed by the next context byte; `None` at the top order.
    pub links: Option<Box<[Option<NodeId>]>>,
    /// One count per symbol, allocated the first time the node is coded from.
    pub counts: Option<Box<[u16]>>,
    /// Largest count in `counts` (kept across rescales).
    pub max_count: u16,
    /// One past the highest symbol with a nonzero count.
    pub max_symbol: usize,
}

impl ContextNode {
    #[inline]
    pub fn link(&self, c: usize) -> Option<NodeId> {
        self.links.as_ref().and_then(|links| links[c])
    }

    /// Halve every count `shift` times, keeping at least `floor`.
    ///
    /// Returns false if the node has no counts yet.
    pub fn rescale(&mut self, shift: u32, floor: u16) -> bool {
        let Some(counts) = self.counts.as_deref_mut() else {
            return false;
        };
        let top = if floor > 0 { counts.len() } else { self.max_symbol };
        for count in &mut counts[..top] {
            *count = count.checked_shr(shift).unwrap_or(0).max(floor);
        }
        self.max_count = self.max_count.checked_shr(shift).unwrap_or(0).max(floor);
        self.max_symbol = counts.iter().rposition(|&c| c > 0).map_or(0, |i| i + 1);
        true
    }
}

/// Allocate a boxed slice of `len` copies of `fill`, reporting failure.
pub(crate) fn try_alloc_slice<T: Clone>(len: usize, fill: T) -> Result<Box<[T]>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| AriError::OutOfMemory {
        requested: len.saturating_mul(size_of::<T>()),
    })?;
    v.resize(len, fill);
    Ok(v.into_boxed_slice())
}

/// Owner of every node of one trie.
#[derive(Debug, Default)]
pub(crate) struct NodeArena {
    nodes: Vec<ContextNode>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Allocate a node with an empty link table of `links` entries (none if 0).
    pub fn alloc(&mut self, order: i8, lesser: Option<NodeId>, links: usize) -> Result<NodeId> {
        let id = NodeId::from_index(self.nodes.len()).ok_or(AriError::OutOfMemory {
            requested: size_of::<ContextNode>(),
        })?;
        let links = if links > 0 {
            Some(try_alloc_slice(links, None)?)
        } else {
            None
        };
        self.nodes.try_reserve(1).map_err(|_| AriError::OutOfMemory {
            requested: size_of::<ContextNode>(),
        })?;
        self.nodes.push(ContextNode {
            order,
            lesser,
            links,
            counts: None,
            max_count: 0,
            max_symbol: 0,
        });
        Ok(id)
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &ContextNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut ContextNode {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ContextNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| NodeId::from_index(i).map(|id| (id, n)))
    }

    /// Visit `root` and every node reachable from it through links,
    /// depth first, children before parents.
    pub fn walk_mut(&mut self, root: NodeId, mut visit: impl FnMut(&mut ContextNode)) {
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                visit(self.node_mut(id));
                continue;
            }
            stack.push((id, true));
            if let Some(links) = &self.node(id).links {
                stack.extend(links.iter().rev().flatten().map(|&child| (child, false)));
            }
        }
    }
}
