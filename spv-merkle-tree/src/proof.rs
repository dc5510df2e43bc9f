//! Self-contained inclusion proofs.

use crate::{tree::check_root, Digest, MerkleHasher, MerkleTree, MerkleTreeError, PathEntry};

/// Everything a verifier needs to check one leaf against a trusted root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionProof {
    /// The proved leaf: its digest at level 0 and its offset.
    pub leaf: PathEntry,
    /// Sibling digests, leaf to root.
    pub path: Vec<PathEntry>,
    /// Pad ledger of the construction run. Empty under `UseCopy`.
    pub pads: Vec<PathEntry>,
}

impl<H: MerkleHasher> MerkleTree<H> {
    /// Bundle the leaf at `leaf_offset`, its path and the current pad ledger.
    pub fn prove(&self, leaf_offset: usize) -> Option<InclusionProof> {
        let leaf = self.leaf_entry(leaf_offset)?;
        let path = self.select_path(leaf_offset)?;
        Some(InclusionProof {
            leaf,
            path,
            pads: self.pad_ledger().to_vec(),
        })
    }

    /// Check `proof` against `expected_root`.
    ///
    /// The path is installed first and the pads after it, so a pad slot on
    /// the path always carries the ledger's value.
    pub fn verify_proof(
        &mut self,
        proof: &InclusionProof,
        expected_root: &Digest,
    ) -> Result<(), MerkleTreeError> {
        self.check_leaf(proof.leaf.absolute_offset)?;
        self.install(&proof.path)?;
        self.install(&proof.pads)?;
        let computed = self.recompute_root(&proof.leaf, &[])?;
        check_root(&computed, expected_root)
    }
}
