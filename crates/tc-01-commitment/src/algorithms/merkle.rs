//! # Merkle Commitment
//!
//! Binary Keccak-256 tree over members sorted by address.
//!
//! # Algorithm
//!
//! 1. Sort entries by address and hash each into a leaf
//! 2. Pair adjacent nodes: `node = keccak256(left ‖ right)`
//! 3. If a level has an odd count, the last node is paired with itself
//! 4. Repeat until one node remains; that node is the root
//!
//! Proof verification walks the sibling path:
//! - sibling on the left: `hash = keccak256(sibling ‖ current)`
//! - sibling on the right: `hash = keccak256(current ‖ sibling)`

use sha3::{Digest, Keccak256};
use shared_types::{u256_to_be_bytes, Address, Hash, U256, ZERO_HASH};

use crate::domain::{CommitmentError, LeafEntry, MerkleProof, Position, ProofNode};

/// Leaf hash: `keccak256(address ‖ uint256 earnings)`, packed encoding.
pub fn leaf_hash(address: &Address, earnings: &U256) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(address);
    hasher.update(u256_to_be_bytes(earnings));
    finalize(hasher)
}

/// Interior node hash: `keccak256(left ‖ right)`.
pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(left);
    hasher.update(right);
    finalize(hasher)
}

fn finalize(hasher: Keccak256) -> Hash {
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// A fully materialised commitment tree.
///
/// Every level is retained so proofs are O(log n) lookups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitmentTree {
    /// Entries in canonical (address) order.
    entries: Vec<LeafEntry>,
    /// `levels[0]` are the leaves, the last level holds the root.
    levels: Vec<Vec<Hash>>,
}

impl CommitmentTree {
    /// Build a tree. Entry order does not matter; duplicates are rejected.
    pub fn build<I>(entries: I) -> Result<Self, CommitmentError>
    where
        I: IntoIterator<Item = LeafEntry>,
    {
        let mut entries: Vec<LeafEntry> = entries.into_iter().collect();
        entries.sort_by(|a, b| a.address.cmp(&b.address));

        if let Some(pair) = entries.windows(2).find(|w| w[0].address == w[1].address) {
            return Err(CommitmentError::DuplicateLeaf(pair[0].address));
        }

        let leaves: Vec<Hash> = entries
            .iter()
            .map(|e| leaf_hash(&e.address, &e.earnings))
            .collect();

        Ok(Self {
            entries,
            levels: build_levels(leaves),
        })
    }

    /// Root digest. 32 zero bytes for an empty tree.
    pub fn root(&self) -> Hash {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or(ZERO_HASH)
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.entries.len()
    }

    /// Entries in canonical order.
    pub fn entries(&self) -> &[LeafEntry] {
        &self.entries
    }

    /// Leaf hash for an address, if present.
    pub fn leaf(&self, address: &Address) -> Option<Hash> {
        let index = self.index_of(address)?;
        self.levels.first().map(|leaves| leaves[index])
    }

    /// Inclusion proof for an address.
    pub fn proof(&self, address: &Address) -> Result<MerkleProof, CommitmentError> {
        let mut index = self
            .index_of(address)
            .ok_or(CommitmentError::NotAMember(*address))?;

        let mut path = Vec::with_capacity(self.levels.len().saturating_sub(1));
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_index = index ^ 1;
            if sibling_index < level.len() {
                if index % 2 == 0 {
                    path.push(ProofNode::right(level[sibling_index]));
                } else {
                    path.push(ProofNode::left(level[sibling_index]));
                }
            } else {
                // Last node of an odd level is paired with itself
                path.push(ProofNode::right(level[index]));
            }
            index /= 2;
        }

        Ok(MerkleProof::new(path))
    }

    fn index_of(&self, address: &Address) -> Option<usize> {
        self.entries
            .binary_search_by(|e| e.address.cmp(address))
            .ok()
    }
}

fn build_levels(leaves: Vec<Hash>) -> Vec<Vec<Hash>> {
    if leaves.is_empty() {
        return Vec::new();
    }

    let mut levels = vec![leaves];
    while let Some(level) = levels.last().filter(|level| level.len() > 1) {
        let next_level: Vec<Hash> = level
            .chunks(2)
            .map(|chunk| {
                let left = &chunk[0];
                let right = chunk.get(1).unwrap_or(left); // Duplicate last if odd
                hash_pair(left, right)
            })
            .collect();
        levels.push(next_level);
    }
    levels
}

/// Root digest of a member set.
pub fn compute_root(entries: &[LeafEntry]) -> Result<Hash, CommitmentError> {
    Ok(CommitmentTree::build(entries.iter().cloned())?.root())
}

/// Inclusion proof for one address within a member set.
pub fn compute_proof(entries: &[LeafEntry], address: &Address) -> Result<MerkleProof, CommitmentError> {
    CommitmentTree::build(entries.iter().cloned())?.proof(address)
}

/// Recompute the root from a leaf and its proof and compare.
///
/// # Time Complexity: O(log n)
/// # Space Complexity: O(1)
pub fn verify(leaf: &Hash, proof: &MerkleProof, expected_root: &Hash) -> bool {
    let mut current = *leaf;
    for node in &proof.path {
        current = match node.position {
            Position::Left => hash_pair(&node.hash, &current),
            Position::Right => hash_pair(&current, &node.hash),
        };
    }
    current == *expected_root
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr(n: u8) -> Address {
        let mut a = [0u8; 20];
        a[19] = n;
        a
    }

    fn entry(n: u8, earnings: u64) -> LeafEntry {
        LeafEntry::new(addr(n), earnings)
    }

    #[test]
    fn test_keccak_empty_vector() {
        // Known Keccak-256 (not NIST SHA3) digest of the empty string
        let digest = finalize(Keccak256::new());
        assert_eq!(
            hex::encode(digest),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_leaf_hash_is_packed_encoding() {
        let address = addr(7);
        let earnings = U256::from(500u64);
        let mut packed = Vec::with_capacity(52);
        packed.extend_from_slice(&address);
        packed.extend_from_slice(&u256_to_be_bytes(&earnings));
        assert_eq!(packed.len(), 52);

        let expected = finalize({
            let mut h = Keccak256::new();
            h.update(&packed);
            h
        });
        assert_eq!(leaf_hash(&address, &earnings), expected);
    }

    #[test]
    fn test_empty_root_is_zero() {
        assert_eq!(compute_root(&[]).unwrap(), ZERO_HASH);
    }

    #[test]
    fn test_single_leaf_root_is_leaf() {
        let e = entry(1, 10);
        let root = compute_root(&[e.clone()]).unwrap();
        assert_eq!(root, leaf_hash(&e.address, &e.earnings));
        assert!(compute_proof(&[e.clone()], &e.address).unwrap().is_empty());
    }

    #[test]
    fn test_three_leaves_duplicate_last() {
        let entries = vec![entry(1, 1), entry(2, 2), entry(3, 3)];
        let leaves: Vec<Hash> = entries
            .iter()
            .map(|e| leaf_hash(&e.address, &e.earnings))
            .collect();
        let expected = hash_pair(
            &hash_pair(&leaves[0], &leaves[1]),
            &hash_pair(&leaves[2], &leaves[2]),
        );
        assert_eq!(compute_root(&entries).unwrap(), expected);

        let proof = compute_proof(&entries, &addr(3)).unwrap();
        assert_eq!(proof.path[0], ProofNode::right(leaves[2]));
        assert_eq!(proof.path[1].position, Position::Left);
        assert!(verify(&leaves[2], &proof, &expected));
    }

    #[test]
    fn test_five_leaves_odd_upper_level() {
        let entries: Vec<LeafEntry> = (1..=5).map(|n| entry(n, n as u64 * 100)).collect();
        let l: Vec<Hash> = entries
            .iter()
            .map(|e| leaf_hash(&e.address, &e.earnings))
            .collect();
        let ab = hash_pair(&l[0], &l[1]);
        let cd = hash_pair(&l[2], &l[3]);
        let ee = hash_pair(&l[4], &l[4]);
        let abcd = hash_pair(&ab, &cd);
        let eeee = hash_pair(&ee, &ee);
        assert_eq!(compute_root(&entries).unwrap(), hash_pair(&abcd, &eeee));
    }

    #[test]
    fn test_order_independent() {
        let forward = vec![entry(1, 5), entry(2, 6), entry(3, 7), entry(4, 8)];
        let mut backward = forward.clone();
        backward.reverse();
        assert_eq!(compute_root(&forward).unwrap(), compute_root(&backward).unwrap());
    }

    #[test]
    fn test_duplicate_leaf_rejected() {
        let result = compute_root(&[entry(1, 5), entry(1, 6)]);
        assert_eq!(result, Err(CommitmentError::DuplicateLeaf(addr(1))));
    }

    #[test]
    fn test_proof_for_absent_member() {
        let entries = vec![entry(1, 5), entry(2, 6)];
        let result = compute_proof(&entries, &addr(9));
        assert_eq!(result, Err(CommitmentError::NotAMember(addr(9))));
    }

    #[test]
    fn test_tampered_earnings_fail() {
        let entries = vec![entry(1, 500), entry(2, 500), entry(3, 0)];
        let tree = CommitmentTree::build(entries).unwrap();
        let proof = tree.proof(&addr(1)).unwrap();
        let forged_leaf = leaf_hash(&addr(1), &U256::from(50_000u64));
        assert!(!verify(&forged_leaf, &proof, &tree.root()));
        assert!(verify(&tree.leaf(&addr(1)).unwrap(), &proof, &tree.root()));
    }

    proptest! {
        #[test]
        fn prop_every_member_verifies(
            raw in proptest::collection::btree_map(any::<[u8; 20]>(), any::<u64>(), 1..40)
        ) {
            let entries: Vec<LeafEntry> = raw
                .iter()
                .map(|(a, e)| LeafEntry::new(*a, *e))
                .collect();
            let tree = CommitmentTree::build(entries.clone()).unwrap();
            let root = tree.root();
            for e in &entries {
                let proof = tree.proof(&e.address).unwrap();
                prop_assert!(verify(&leaf_hash(&e.address, &e.earnings), &proof, &root));
            }
        }
    }
}
