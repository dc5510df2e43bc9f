use sha2::{Digest as _, Sha256};

use crate::HashError;

/// Width in bytes of every digest stored in the tree.
pub const HASH_LENGTH: usize = 32;

/// A node digest.
pub type Digest = [u8; HASH_LENGTH];

/// The "no result" digest returned by no-op operations.
pub const EMPTY_DIGEST: Digest = [0u8; HASH_LENGTH];

/// The hash primitive the tree is built with.
///
/// Implementations must be deterministic and collision resistant for proofs
/// to mean anything. Swap algorithms by implementing this trait; the output
/// width is fixed by [`Digest`].
pub trait MerkleHasher: Send + Sync + 'static {
    /// Hash raw bytes (a leaf chunk, or a concatenation of two digests).
    fn hash(&self, data: &[u8]) -> Result<Digest, HashError>;

    /// Combine two sibling digests: `hash(left || right)`.
    fn combine(&self, left: &Digest, right: &Digest) -> Result<Digest, HashError> {
        let mut input = [0u8; 2 * HASH_LENGTH];
        input[..HASH_LENGTH].copy_from_slice(left);
        input[HASH_LENGTH..].copy_from_slice(right);
        self.hash(&input)
    }
}

/// SHA-256, the default primitive.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Hasher;

impl MerkleHasher for Sha256Hasher {
    fn hash(&self, data: &[u8]) -> Result<Digest, HashError> {
        Ok(Sha256::digest(data).into())
    }
}

/// Blake3 alternative.
#[derive(Debug, Default, Clone, Copy)]
pub struct Blake3Hasher;

impl MerkleHasher for Blake3Hasher {
    fn hash(&self, data: &[u8]) -> Result<Digest, HashError> {
        Ok(*blake3::hash(data).as_bytes())
    }

    fn combine(&self, left: &Digest, right: &Digest) -> Result<Digest, HashError> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(left);
        hasher.update(right);
        Ok(*hasher.finalize().as_bytes())
    }
}
