//! # Domain Value Objects
//!
//! Immutable value types exchanged with the on-chain verifier.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Hash, U256};

/// Side on which a sibling hash sits relative to the running hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    /// Sibling is the left operand: `hash(sibling ‖ current)`.
    Left,
    /// Sibling is the right operand: `hash(current ‖ sibling)`.
    Right,
}

/// One step of an inclusion proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofNode {
    /// Sibling hash at this level.
    pub hash: Hash,
    /// Where the sibling sits.
    pub position: Position,
}

impl ProofNode {
    /// Sibling on the left.
    pub fn left(hash: Hash) -> Self {
        Self {
            hash,
            position: Position::Left,
        }
    }

    /// Sibling on the right.
    pub fn right(hash: Hash) -> Self {
        Self {
            hash,
            position: Position::Right,
        }
    }
}

/// Inclusion proof: sibling path from leaf to root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Siblings ordered leaf-to-root.
    pub path: Vec<ProofNode>,
}

impl MerkleProof {
    /// Wrap a sibling path.
    pub fn new(path: Vec<ProofNode>) -> Self {
        Self { path }
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.path.len()
    }

    /// True for a single-leaf tree.
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Sibling hashes only, in the order the verifier consumes them.
    pub fn sibling_hashes(&self) -> Vec<Hash> {
        self.path.iter().map(|node| node.hash).collect()
    }
}

/// One `(address, earnings)` leaf of the commitment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafEntry {
    /// Member identity.
    pub address: Address,
    /// Cumulative earnings.
    pub earnings: U256,
}

impl LeafEntry {
    /// Create a leaf entry.
    pub fn new(address: Address, earnings: impl Into<U256>) -> Self {
        Self {
            address,
            earnings: earnings.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_hashes_preserve_order() {
        let proof = MerkleProof::new(vec![ProofNode::right([1u8; 32]), ProofNode::left([2u8; 32])]);
        assert_eq!(proof.sibling_hashes(), vec![[1u8; 32], [2u8; 32]]);
        assert_eq!(proof.len(), 2);
        assert!(!proof.is_empty());
    }
}
