use spv_task_pool::TaskPoolError;
use thiserror::Error;

/// Failure reported by a [`MerkleHasher`](crate::MerkleHasher).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("hash primitive failed: {0}")]
pub struct HashError(pub String);

impl HashError {
    /// Build a hash error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        HashError(message.into())
    }
}

/// Errors from Merkle tree operations.
#[derive(Debug, Error)]
pub enum MerkleTreeError {
    /// `initialize` was called on a sized tree.
    #[error("tree is already initialized with {leaf_count} leaves")]
    AlreadyInitialized {
        /// Leaf count of the existing arena.
        leaf_count: usize,
    },
    /// The arena size does not fit in `usize`.
    #[error("leaf count {0} exceeds the addressable arena size")]
    CapacityOverflow(usize),
    /// The chunk count differs from the leaf count.
    #[error("expected {expected} chunks, got {actual}")]
    ChunkCountMismatch {
        /// The tree's leaf count.
        expected: usize,
        /// Chunks supplied.
        actual: usize,
    },
    /// A chunk is shorter than the chunk size.
    #[error("chunk {index} has {len} bytes, fewer than the chunk size {chunk_size}")]
    ChunkTooShort {
        /// Position of the chunk.
        index: usize,
        /// Its length.
        len: usize,
        /// Required prefix length.
        chunk_size: usize,
    },
    /// The hash primitive failed; the run produced no root.
    #[error("hash failure at level {level}: {source}")]
    HashFailure {
        /// Level whose digests were being produced, 0 for leaves.
        level: u32,
        /// Error from the hash primitive.
        #[source]
        source: HashError,
    },
    /// Ledger replay found no pad for a padded slot.
    #[error("no pad supplied for level {level} at offset {offset}")]
    MissingPad {
        /// Level of the padded slot.
        level: u32,
        /// Arena index of the padded slot.
        offset: usize,
    },
    /// The leaf offset is not below the leaf count.
    #[error("leaf offset {offset} out of range (leaf count {leaf_count})")]
    OutOfRangeOffset {
        /// The rejected offset.
        offset: usize,
        /// The tree's leaf count.
        leaf_count: usize,
    },
    /// The operation needs an initialized tree.
    #[error("tree is not initialized")]
    UninitializedTree,
    /// A path or pad entry names a slot outside the arena.
    #[error("path entry offset {offset} is outside the arena (node count {node_count})")]
    InvalidPathEntry {
        /// The rejected offset.
        offset: usize,
        /// The arena size.
        node_count: usize,
    },
    /// The recomputed root differs from the expected one. Both are hex.
    #[error("root hash mismatch: expected {expected}, got {actual}")]
    RootMismatch {
        /// Trusted root.
        expected: String,
        /// Recomputed root.
        actual: String,
    },
    /// The worker pool failed.
    #[error("task pool error: {0}")]
    TaskPool(#[from] TaskPoolError),
}
