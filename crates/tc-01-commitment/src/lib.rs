//! # TC-01 Commitment
//!
//! Deterministic Merkle commitment over a member set, plus inclusion proofs.
//!
//! **Subsystem ID:** 1  
//! **Architecture:** Hexagonal (domain + pure algorithms, no I/O)
//!
//! ## Purpose
//!
//! The revenue ledger publishes a single 32-byte digest on the root chain.
//! Each member later withdraws by presenting a short proof that their
//! `(address, earnings)` leaf is part of that digest. The on-chain verifier
//! recomputes the root, so everything here must match it bit-for-bit:
//!
//! | Rule | Value |
//! |------|-------|
//! | Hash | Keccak-256 |
//! | Leaf | `keccak256(address[20] ‖ earnings[32, big-endian])` |
//! | Node | `keccak256(left ‖ right)` |
//! | Leaf order | ascending by address |
//! | Odd level | last node is paired with itself |
//! | Empty set | 32 zero bytes |
//!
//! ## Module Structure
//!
//! ```text
//! tc-01-commitment/
//! ├── domain/          # ProofNode, MerkleProof, LeafEntry, errors
//! └── algorithms/      # leaf/pair hashing, tree build, proof, verify
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithms;
pub mod domain;

pub use algorithms::{compute_proof, compute_root, hash_pair, leaf_hash, verify, CommitmentTree};
pub use domain::{CommitmentError, LeafEntry, MerkleProof, Position, ProofNode};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
