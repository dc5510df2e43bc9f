//! Arena layout arithmetic: level boundaries and parent/side links.

use crate::{Node, Side};

/// A contiguous run of arena slots forming one tree level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelRange {
    /// Arena index of the level's first slot.
    pub start: usize,
    /// Number of slots in the level.
    pub capacity: usize,
}

impl LevelRange {
    /// One past the level's last slot.
    pub fn end(&self) -> usize {
        self.start + self.capacity
    }

    /// Whether `offset` falls inside this level.
    pub fn contains(&self, offset: usize) -> bool {
        (self.start..self.end()).contains(&offset)
    }
}

/// Number of leaf-level slots for `leaf_count` leaves: the smallest power of
/// two that holds them, and never less than a single pair.
///
/// Returns `None` on overflow.
pub fn leaf_capacity(leaf_count: usize) -> Option<usize> {
    leaf_count.checked_next_power_of_two().map(|c| c.max(2))
}

/// Arena size for `leaf_count` leaves: `2^(floor(log2(leaf_count)) + 2) + 1`.
///
/// Always at least `2 * leaf_capacity - 1`, the slots the levels occupy.
/// Returns `None` for zero leaves or on overflow.
pub fn node_count_for(leaf_count: usize) -> Option<usize> {
    if leaf_count == 0 {
        return None;
    }
    let floor_log2 = usize::BITS - 1 - leaf_count.leading_zeros();
    1usize.checked_shl(floor_log2 + 2)?.checked_add(1)
}

/// Level ranges from the leaves (level 0) up to the singleton root.
pub(crate) fn level_ranges(leaf_capacity: usize) -> Vec<LevelRange> {
    let mut levels = Vec::new();
    let mut start = 0;
    let mut capacity = leaf_capacity;
    loop {
        levels.push(LevelRange { start, capacity });
        if capacity <= 1 {
            break;
        }
        start += capacity;
        capacity /= 2;
    }
    levels
}

/// Allocate the arena and link every non-root node to its parent.
pub(crate) fn link_arena(levels: &[LevelRange], node_count: usize) -> Vec<Node> {
    let mut arena = vec![Node::default(); node_count];
    for pair in levels.windows(2) {
        let (level, parent_level) = (pair[0], pair[1]);
        for j in 0..level.capacity {
            let node = &mut arena[level.start + j];
            node.parent_offset = parent_level.start + j / 2;
            node.side = if j % 2 == 0 { Side::Left } else { Side::Right };
            node.has_parent = true;
        }
    }
    arena
}

/// Occupied slot count per level before padding, leaves first.
pub(crate) fn occupied_counts(leaf_count: usize, level_count: usize) -> Vec<usize> {
    let mut counts = Vec::with_capacity(level_count);
    let mut occupied = leaf_count;
    for _ in 0..level_count {
        counts.push(occupied);
        occupied = occupied.div_ceil(2);
    }
    counts
}
