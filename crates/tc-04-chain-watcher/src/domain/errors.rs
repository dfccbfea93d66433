//! # Watcher Errors
//!
//! | Error | Severity |
//! |-------|----------|
//! | `ConfigMismatch` | fatal, startup only |
//! | `ChainReorg` | fatal at runtime, restart from an earlier checkpoint |
//! | `Persistence` | fatal during startup/replay, alert-only when live |
//! | `NotAMember` / `CheckpointNotFound` / `DuplicateCheckpoint` | caller errors |
//! | `EventSource` | fatal during startup/replay, retry by restarting |

use shared_types::{format_address, Address, BlockNumber};
use tc_02_revenue_ledger::{LedgerError, PersistenceError};
use tc_03_event_merger::MergeError;
use thiserror::Error;

/// A chain query, subscription or feed call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {reason}")]
pub struct EventSourceError {
    /// Port operation (`past_events`, `subscribe`, ...).
    pub operation: &'static str,
    /// Backend message.
    pub reason: String,
}

impl EventSourceError {
    /// Build an error for `operation`.
    pub fn new(operation: &'static str, reason: impl Into<String>) -> Self {
        Self {
            operation,
            reason: reason.into(),
        }
    }
}

/// Chain watcher errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatcherError {
    /// Configured, persisted and live contract identity disagree.
    #[error("Config mismatch on {field}: expected {expected}, found {found}")]
    ConfigMismatch {
        /// Which setting disagreed.
        field: &'static str,
        /// Configured value.
        expected: String,
        /// Value found in the store or on-chain.
        found: String,
    },

    /// An already-applied event was retracted.
    #[error("Chain reorganisation at block {block_number}; restart from an earlier checkpoint")]
    ChainReorg {
        /// Block of the retracted event.
        block_number: BlockNumber,
    },

    /// Store failure.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Identity is not part of the committed set.
    #[error("Not a member: {}", format_address(.0))]
    NotAMember(Address),

    /// No checkpoint was stored under this reference.
    #[error("Checkpoint not found: external ref {external_ref}")]
    CheckpointNotFound {
        /// Requested reference.
        external_ref: u64,
    },

    /// A checkpoint already exists for this reference.
    #[error("Duplicate checkpoint: external ref {external_ref}")]
    DuplicateCheckpoint {
        /// Offending reference.
        external_ref: u64,
    },

    /// Chain or feed failure.
    #[error(transparent)]
    EventSource(#[from] EventSourceError),

    /// The processing loop has ended.
    #[error("Watcher stopped")]
    Stopped,

    /// Ledger rejected an operation (overflow, corrupt checkpoint).
    #[error(transparent)]
    Ledger(LedgerError),
}

impl From<LedgerError> for WatcherError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotAMember(address) => WatcherError::NotAMember(address),
            LedgerError::CheckpointNotFound { external_ref } => {
                WatcherError::CheckpointNotFound { external_ref }
            }
            LedgerError::DuplicateCheckpoint { external_ref } => {
                WatcherError::DuplicateCheckpoint { external_ref }
            }
            other => WatcherError::Ledger(other),
        }
    }
}

impl From<MergeError> for WatcherError {
    fn from(err: MergeError) -> Self {
        WatcherError::EventSource(EventSourceError::new("merge_events", err.to_string()))
    }
}

impl WatcherError {
    /// Whether the caller can simply retry (restart) without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WatcherError::EventSource(_) | WatcherError::Persistence(_)
        )
    }
}

/// Result type for watcher operations.
pub type WatcherResult<T> = Result<T, WatcherError>;
