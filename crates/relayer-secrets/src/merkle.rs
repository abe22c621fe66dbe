//! Merkle tree over per-fill secret hashes, for partial-fill orders. Real
//! SHA-256 leaf/node hashing, not a placeholder.

use relayer_model::Hash32;
use sha2::{Digest, Sha256};

pub(crate) fn hash_leaf(secret: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(b"leaf");
    hasher.update(secret);
    let digest = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    Hash32::new(bytes)
}

fn hash_node(left: &Hash32, right: &Hash32) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(b"node");
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    Hash32::new(bytes)
}

/// A complete Merkle tree of a known set of preimages, built once at
/// `setup_partial_fill` time. Odd levels duplicate the last node, the usual
/// convention for binary Merkle trees over a non-power-of-two leaf count.
#[derive(Clone, Debug)]
pub struct MerkleSecretTree {
    pub root: Hash32,
    pub leaves: Vec<Hash32>,
    levels: Vec<Vec<Hash32>>,
}

impl MerkleSecretTree {
    pub fn build(secrets: &[[u8; 32]]) -> Self {
        assert!(!secrets.is_empty(), "a merkle tree needs at least one leaf");
        let leaves: Vec<Hash32> = secrets.iter().map(|s| hash_leaf(s)).collect();
        let mut levels = vec![leaves.clone()];
        let mut current = leaves.clone();
        while current.len() > 1 {
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            for pair in current.chunks(2) {
                let node = match pair {
                    [left, right] => hash_node(left, right),
                    [only] => hash_node(only, only),
                    _ => unreachable!(),
                };
                next.push(node);
            }
            levels.push(next.clone());
            current = next;
        }
        let root = current[0];
        Self {
            root,
            leaves,
            levels,
        }
    }

    /// The sibling hash at each level from leaf to root, letting a verifier
    /// reconstruct the root from a single leaf.
    pub fn proof(&self, leaf_index: usize) -> Option<Vec<Hash32>> {
        if leaf_index >= self.leaves.len() {
            return None;
        }
        let mut proof = Vec::new();
        let mut index = leaf_index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_index = if index % 2 == 0 { index + 1 } else { index - 1 };
            let sibling = level.get(sibling_index).copied().unwrap_or(level[index]);
            proof.push(sibling);
            index /= 2;
        }
        Some(proof)
    }
}

/// Verifies that `leaf` at `leaf_index` is part of the tree rooted at
/// `root`, given its `proof`.
pub fn verify_proof(leaf: &Hash32, leaf_index: usize, proof: &[Hash32], root: &Hash32) -> bool {
    let mut acc = *leaf;
    let mut index = leaf_index;
    for sibling in proof {
        acc = if index % 2 == 0 {
            hash_node(&acc, sibling)
        } else {
            hash_node(sibling, &acc)
        };
        index /= 2;
    }
    acc == *root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_leaf_proof_verifies_against_root() {
        let secrets: Vec<[u8; 32]> = (0u8..5).map(|i| [i; 32]).collect();
        let tree = MerkleSecretTree::build(&secrets);
        for (i, leaf) in tree.leaves.iter().enumerate() {
            let proof = tree.proof(i).unwrap();
            assert!(verify_proof(leaf, i, &proof, &tree.root));
        }
    }

    #[test]
    fn tampered_leaf_fails_verification() {
        let secrets: Vec<[u8; 32]> = (0u8..4).map(|i| [i; 32]).collect();
        let tree = MerkleSecretTree::build(&secrets);
        let proof = tree.proof(1).unwrap();
        let wrong_leaf = hash_leaf(&[99u8; 32]);
        assert!(!verify_proof(&wrong_leaf, 1, &proof, &tree.root));
    }

    #[test]
    fn single_leaf_tree_roots_at_its_own_leaf_hash() {
        let secrets = [[3u8; 32]];
        let tree = MerkleSecretTree::build(&secrets);
        assert_eq!(tree.leaves.len(), 1);
        let proof = tree.proof(0).unwrap();
        assert!(verify_proof(&tree.leaves[0], 0, &proof, &tree.root));
    }
}
