//! # Algorithms Module
//!
//! Pure hashing and tree algorithms. No I/O, no clocks, no randomness.

pub mod merkle;

pub use merkle::{compute_proof, compute_root, hash_pair, leaf_hash, verify, CommitmentTree};
