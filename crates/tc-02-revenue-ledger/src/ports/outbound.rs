//! # Outbound Ports
//!
//! The checkpoint store. Implementations must make every call idempotent
//! from the caller's perspective: saving the same record twice is safe.

use async_trait::async_trait;
use shared_types::{BlockNumber, ChainEvent};

use crate::domain::{Checkpoint, LedgerState, PersistenceError};

/// How to address a stored checkpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckpointKey {
    /// Highest local sequence number.
    Latest,
    /// Local sequence number.
    Sequence(u64),
    /// On-chain reference number.
    External(u64),
}

/// Persistence backend for the revenue ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Load a checkpoint, `None` if absent.
    async fn load_checkpoint(&self, key: CheckpointKey) -> Result<Option<Checkpoint>, PersistenceError>;

    /// Store a checkpoint. Overwrites a record with the same external ref.
    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError>;

    /// Replace the persisted full ledger state.
    async fn save_ledger_state(&self, state: &LedgerState) -> Result<(), PersistenceError>;

    /// Last persisted full ledger state.
    async fn load_ledger_state(&self) -> Result<Option<LedgerState>, PersistenceError>;

    /// Append a raw event record keyed by block.
    async fn save_event(&self, block_number: BlockNumber, event: &ChainEvent) -> Result<(), PersistenceError>;

    /// Events with `from <= block <= to`, ordered by block then insertion.
    async fn load_events(
        &self,
        from: BlockNumber,
        to: BlockNumber,
    ) -> Result<Vec<ChainEvent>, PersistenceError>;
}
