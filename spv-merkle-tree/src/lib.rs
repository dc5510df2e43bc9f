//! Binary Merkle tree over an ordered sequence of fixed-size chunks, with SPV
//! inclusion proofs.
//!
//! The tree lives in an arena allocated once by
//! [`MerkleTree::initialize`]. Levels are stored contiguously, leaves first
//! and root last, and every node refers to its parent by arena index:
//!
//! ```text
//! leaf_count = 5, leaf capacity 8, node_count = 17
//!
//! level 3:                          [14]
//! level 2:              [12]                    [13]
//! level 1:        [8]         [9]         [10]       [11]
//! level 0:     [0]  [1]    [2]  [3]    [4]  [5]    [6] [7]
//!               A    B      C    D      E   pad
//! ```
//!
//! A level with an odd number of occupied slots is padded according to the
//! tree's [`ExtensionPolicy`]: either a copy of the unmatched node or a random
//! pad recorded in an export ledger for the verifier.
//!
//! Construction runs on the calling thread, or on a
//! [`spv_task_pool::TaskPool`] with one synchronized batch per level.

#![warn(missing_docs)]

mod construct;
mod error;
mod hash;
mod layout;
mod node;
mod options;
mod pad;
mod proof;
mod tree;


pub use construct::ConstructionResult;
pub use error::{HashError, MerkleTreeError};
pub use hash::{Blake3Hasher, Digest, MerkleHasher, Sha256Hasher, EMPTY_DIGEST, HASH_LENGTH};
pub use layout::{leaf_capacity, node_count_for, LevelRange};
pub use node::{Node, PathEntry, Side};
pub use options::{ExtensionPolicy, TreeOptions};
pub use pad::RandomPadGenerator;
pub use proof::InclusionProof;
pub use spv_task_pool::{TaskPool, TaskPoolError};
pub use tree::MerkleTree;
