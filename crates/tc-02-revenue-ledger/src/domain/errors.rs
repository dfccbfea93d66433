//! # Domain Errors
//!
//! Caller errors are returned synchronously and never change ledger state.

use shared_types::{format_address, Address};
use tc_01_commitment::CommitmentError;
use thiserror::Error;

/// Revenue ledger errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Identity is not part of the committed set.
    #[error("Not a member: {}", format_address(.0))]
    NotAMember(Address),

    /// No checkpoint was stored under this reference.
    #[error("Checkpoint not found: external ref {external_ref}")]
    CheckpointNotFound { external_ref: u64 },

    /// A checkpoint already exists for this reference.
    #[error("Duplicate checkpoint: external ref {external_ref}")]
    DuplicateCheckpoint { external_ref: u64 },

    /// 256-bit arithmetic overflow; the operation was not applied.
    #[error("Arithmetic overflow in {operation}")]
    Overflow { operation: &'static str },

    /// A checkpoint's stored digest disagrees with its member set.
    #[error("Corrupt checkpoint {external_ref}: {reason}")]
    CorruptCheckpoint { external_ref: u64, reason: String },

    /// The accounting invariant does not hold.
    #[error("Accounting invariant violated: {0}")]
    InvariantViolated(String),
}

impl From<CommitmentError> for LedgerError {
    fn from(err: CommitmentError) -> Self {
        match err {
            CommitmentError::NotAMember(address) => LedgerError::NotAMember(address),
            CommitmentError::DuplicateLeaf(address) => LedgerError::InvariantViolated(format!(
                "duplicate member {}",
                format_address(&address)
            )),
        }
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Checkpoint store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    /// Backend I/O failed.
    #[error("Persistence I/O failed during {operation}: {reason}")]
    Io {
        /// Store operation label (`save_checkpoint`, `save_event`, ...).
        operation: &'static str,
        /// Backend message.
        reason: String,
    },

    /// A record could not be encoded or decoded.
    #[error("Persistence serialization failed during {operation}: {reason}")]
    Serialization {
        /// Store operation label.
        operation: &'static str,
        /// Codec message.
        reason: String,
    },

    /// Backend refused the request (e.g. injected failure, read-only).
    #[error("Store unavailable for {operation}")]
    Unavailable {
        /// Store operation label.
        operation: &'static str,
    },
}

impl PersistenceError {
    /// Operation label, used as a metrics dimension.
    pub fn operation(&self) -> &'static str {
        match self {
            PersistenceError::Io { operation, .. }
            | PersistenceError::Serialization { operation, .. }
            | PersistenceError::Unavailable { operation } => operation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_checkpoint_message() {
        let err = LedgerError::DuplicateCheckpoint { external_ref: 42 };
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_commitment_not_a_member_maps_through() {
        let err: LedgerError = CommitmentError::NotAMember([1u8; 20]).into();
        assert_eq!(err, LedgerError::NotAMember([1u8; 20]));
    }

    #[test]
    fn test_persistence_operation_label() {
        let err = PersistenceError::Unavailable {
            operation: "save_event",
        };
        assert_eq!(err.operation(), "save_event");
    }
}
