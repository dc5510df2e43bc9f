use std::sync::Arc;

use spv_task_pool::TaskPool;
use tracing::debug;

use crate::{
    layout::{leaf_capacity, level_ranges, link_arena, node_count_for},
    Digest, LevelRange, MerkleHasher, MerkleTreeError, Node, PathEntry, RandomPadGenerator,
    Sha256Hasher, Side, TreeOptions, EMPTY_DIGEST,
};

/// A binary Merkle tree over a fixed number of leaves.
///
/// The tree is sized once by [`initialize`](Self::initialize) and never
/// resized. A tree with zero leaves is uninitialized: construction returns
/// an empty result, path selection returns `None` and verification returns
/// [`EMPTY_DIGEST`].
///
/// The tree owns its pad generator and, once a parallel construction ran,
/// its worker pool.
pub struct MerkleTree<H: MerkleHasher = Sha256Hasher> {
    leaf_count: usize,
    node_count: usize,
    pub(crate) options: TreeOptions,
    pub(crate) arena: Vec<Node>,
    pub(crate) levels: Vec<LevelRange>,
    pub(crate) hasher: Arc<H>,
    pub(crate) pads: RandomPadGenerator,
    pub(crate) pool: Option<TaskPool>,
}

impl MerkleTree<Sha256Hasher> {
    /// SHA-256 tree for `leaf_count` leaves with default options.
    pub fn new(leaf_count: usize) -> Result<Self, MerkleTreeError> {
        Self::with_hasher(leaf_count, Sha256Hasher, TreeOptions::default())
    }
}

impl Default for MerkleTree<Sha256Hasher> {
    fn default() -> Self {
        Self::uninitialized(Sha256Hasher, TreeOptions::default())
    }
}

impl<H: MerkleHasher> MerkleTree<H> {
    /// Tree for `leaf_count` leaves using `hasher` and `options`.
    pub fn with_hasher(
        leaf_count: usize,
        hasher: H,
        options: TreeOptions,
    ) -> Result<Self, MerkleTreeError> {
        let mut tree = Self::uninitialized(hasher, options);
        tree.initialize(leaf_count)?;
        Ok(tree)
    }

    /// A tree with no arena yet. Call [`initialize`](Self::initialize).
    pub fn uninitialized(hasher: H, options: TreeOptions) -> Self {
        let pads = match options.pad_seed {
            Some(seed) => RandomPadGenerator::from_seed(seed),
            None => RandomPadGenerator::new(),
        };
        MerkleTree {
            leaf_count: 0,
            node_count: 0,
            options,
            arena: Vec::new(),
            levels: Vec::new(),
            hasher: Arc::new(hasher),
            pads,
            pool: None,
        }
    }

    /// Replace the pad generator.
    pub fn with_pad_generator(mut self, pads: RandomPadGenerator) -> Self {
        self.pads = pads;
        self
    }

    /// Size the arena for `leaf_count` leaves and link every node.
    ///
    /// Zero leaves leaves the tree uninitialized. An initialized tree cannot
    /// be initialized again.
    pub fn initialize(&mut self, leaf_count: usize) -> Result<(), MerkleTreeError> {
        if self.is_initialized() {
            return Err(MerkleTreeError::AlreadyInitialized {
                leaf_count: self.leaf_count,
            });
        }
        if leaf_count == 0 {
            return Ok(());
        }
        let capacity =
            leaf_capacity(leaf_count).ok_or(MerkleTreeError::CapacityOverflow(leaf_count))?;
        let node_count =
            node_count_for(leaf_count).ok_or(MerkleTreeError::CapacityOverflow(leaf_count))?;
        let levels = level_ranges(capacity);
        self.arena = link_arena(&levels, node_count);
        self.levels = levels;
        self.leaf_count = leaf_count;
        self.node_count = node_count;
        debug!(
            leaf_count,
            node_count,
            levels = self.levels.len(),
            "merkle tree initialized"
        );
        Ok(())
    }

    /// Whether an arena has been allocated.
    pub fn is_initialized(&self) -> bool {
        self.leaf_count != 0
    }

    /// Number of leaves, 0 when uninitialized.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Arena size in slots.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Options the tree was created with.
    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// The arena slot at `offset`.
    pub fn node(&self, offset: usize) -> Option<&Node> {
        self.arena.get(offset)
    }

    /// Number of levels, leaves and root included.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Arena range of `level` (0 = leaves).
    pub fn level_range(&self, level: usize) -> Option<LevelRange> {
        self.levels.get(level).copied()
    }

    /// Arena index of the root.
    pub fn root_offset(&self) -> Option<usize> {
        self.levels.last().map(|root| root.start)
    }

    /// The leaf at `leaf_offset` as a proof entry carrying its current digest.
    pub fn leaf_entry(&self, leaf_offset: usize) -> Option<PathEntry> {
        if leaf_offset >= self.leaf_count {
            return None;
        }
        Some(PathEntry::new(self.arena[leaf_offset].hash, 0, leaf_offset))
    }

    /// Pads recorded by the last construction run (`UseSpecialKeys` only).
    pub fn pad_ledger(&self) -> &[PathEntry] {
        self.pads.ledger()
    }

    /// Worker count of the pool kept from parallel construction, if any.
    pub fn pool_worker_count(&self) -> Option<usize> {
        self.pool.as_ref().map(TaskPool::worker_count)
    }

    /// Stop the worker pool. The next parallel construction starts a new one.
    pub fn shutdown_pool(&mut self) -> Result<(), MerkleTreeError> {
        if let Some(mut pool) = self.pool.take() {
            pool.shutdown()?;
        }
        Ok(())
    }

    /// Sibling digests from the leaf at `leaf_offset` up to the root.
    ///
    /// Entries are in leaf-to-root order, each tagged with its level and
    /// absolute arena offset. `None` for an out-of-range offset or an
    /// uninitialized tree.
    pub fn select_path(&self, leaf_offset: usize) -> Option<Vec<PathEntry>> {
        if leaf_offset >= self.leaf_count {
            return None;
        }
        let mut path = Vec::with_capacity(self.levels.len().saturating_sub(1));
        let mut offset = leaf_offset;
        let mut level = 0u32;
        let mut node = &self.arena[offset];
        while node.has_parent {
            let sibling = node.sibling_offset(offset);
            path.push(PathEntry::new(self.arena[sibling].hash, level, sibling));
            offset = node.parent_offset;
            node = &self.arena[offset];
            level += 1;
        }
        Some(path)
    }

    /// Recompute the root from `leaf` and its sibling `path`.
    ///
    /// Every path digest is first written into its arena slot, so afterwards
    /// those slots hold the supplied values, not the constructed ones.
    /// Returns [`EMPTY_DIGEST`] if the tree is uninitialized, the leaf offset
    /// is out of range, a path offset lies outside the arena, or hashing
    /// fails. Compare the result with a trusted root.
    pub fn verify(&mut self, leaf: &PathEntry, path: &[PathEntry]) -> Digest {
        self.recompute_root(leaf, path).unwrap_or(EMPTY_DIGEST)
    }

    /// Like [`verify`](Self::verify), but compares against `expected_root`
    /// and reports why verification failed.
    pub fn verify_root(
        &mut self,
        leaf: &PathEntry,
        path: &[PathEntry],
        expected_root: &Digest,
    ) -> Result<(), MerkleTreeError> {
        let computed = self.recompute_root(leaf, path)?;
        check_root(&computed, expected_root)
    }

    pub(crate) fn recompute_root(
        &mut self,
        leaf: &PathEntry,
        path: &[PathEntry],
    ) -> Result<Digest, MerkleTreeError> {
        self.check_leaf(leaf.absolute_offset)?;
        self.install(path)?;
        self.up_tree(leaf.absolute_offset, leaf.hash)
    }

    pub(crate) fn check_leaf(&self, leaf_offset: usize) -> Result<(), MerkleTreeError> {
        if !self.is_initialized() {
            return Err(MerkleTreeError::UninitializedTree);
        }
        if leaf_offset >= self.leaf_count {
            return Err(MerkleTreeError::OutOfRangeOffset {
                offset: leaf_offset,
                leaf_count: self.leaf_count,
            });
        }
        Ok(())
    }

    /// Overwrite the named slots. Nothing is written unless every offset is
    /// inside the arena.
    pub(crate) fn install(&mut self, entries: &[PathEntry]) -> Result<(), MerkleTreeError> {
        if let Some(bad) = entries
            .iter()
            .find(|entry| entry.absolute_offset >= self.node_count)
        {
            return Err(MerkleTreeError::InvalidPathEntry {
                offset: bad.absolute_offset,
                node_count: self.node_count,
            });
        }
        for entry in entries {
            self.arena[entry.absolute_offset].hash = entry.hash;
        }
        Ok(())
    }

    fn up_tree(&self, leaf_offset: usize, leaf_hash: Digest) -> Result<Digest, MerkleTreeError> {
        let mut hash = leaf_hash;
        let mut offset = leaf_offset;
        let mut level = 0u32;
        let mut node = &self.arena[offset];
        while node.has_parent {
            let sibling = &self.arena[node.sibling_offset(offset)].hash;
            let combined = match node.side {
                Side::Left => self.hasher.combine(&hash, sibling),
                Side::Right => self.hasher.combine(sibling, &hash),
            };
            level += 1;
            hash = combined.map_err(|source| MerkleTreeError::HashFailure { level, source })?;
            offset = node.parent_offset;
            node = &self.arena[offset];
        }
        Ok(hash)
    }
}

pub(crate) fn check_root(computed: &Digest, expected: &Digest) -> Result<(), MerkleTreeError> {
    if computed != expected {
        return Err(MerkleTreeError::RootMismatch {
            expected: hex::encode(expected),
            actual: hex::encode(computed),
        });
    }
    Ok(())
}
