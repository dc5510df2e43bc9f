use crate::{Digest, EMPTY_DIGEST};

/// Which operand a node is when combined with its sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// First operand; the sibling sits at `offset + 1`.
    Left,
    /// Second operand; the sibling sits at `offset - 1`.
    Right,
}

/// One slot of the tree arena.
///
/// Links are arena indices fixed at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    /// Current cached digest of this slot.
    pub hash: Digest,
    /// Arena index of the parent. Meaningless when `has_parent` is false.
    pub parent_offset: usize,
    /// Operand position relative to the sibling.
    pub side: Side,
    /// `false` for the root and for unused trailing slots.
    pub has_parent: bool,
}

impl Default for Node {
    fn default() -> Self {
        Node {
            hash: EMPTY_DIGEST,
            parent_offset: 0,
            side: Side::Left,
            has_parent: false,
        }
    }
}

impl Node {
    /// Arena index of this node's sibling, given the node's own index.
    pub fn sibling_offset(&self, offset: usize) -> usize {
        match self.side {
            Side::Left => offset + 1,
            Side::Right => offset - 1,
        }
    }
}

/// A digest tagged with its tree level and absolute arena offset.
///
/// Used both as an inclusion-proof element and as a padding ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathEntry {
    /// The digest.
    pub hash: Digest,
    /// Tree level, 0 for leaves.
    pub level: u32,
    /// Arena index of the slot.
    pub absolute_offset: usize,
}

impl PathEntry {
    /// Entry for `hash` at `absolute_offset` on `level`.
    pub fn new(hash: Digest, level: u32, absolute_offset: usize) -> Self {
        PathEntry {
            hash,
            level,
            absolute_offset,
        }
    }
}
