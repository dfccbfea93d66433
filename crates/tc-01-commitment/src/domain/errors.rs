//! # Domain Errors

use shared_types::{format_address, Address};
use thiserror::Error;

/// Commitment errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitmentError {
    /// The requested identity has no leaf in the set.
    #[error("Not a member: {}", format_address(.0))]
    NotAMember(Address),

    /// The same identity appears twice in the leaf set.
    #[error("Duplicate leaf for {}", format_address(.0))]
    DuplicateLeaf(Address),
}
