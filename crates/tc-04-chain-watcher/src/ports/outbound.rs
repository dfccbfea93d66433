//! # Outbound Ports
//!
//! Interfaces to the root contract and the membership feed. Live delivery
//! goes through bounded channels owned by the watcher, so adapters never
//! call back into ledger code.

use async_trait::async_trait;
use shared_types::{Address, BlockNumber, ChainEvent, EventKind};
use tokio::sync::mpsc;

use crate::domain::{ChainNotification, EventSourceError, MembershipChange};

/// Where the root contract delivers live notifications.
pub type ChainEventSink = mpsc::Sender<ChainNotification>;

/// Where the membership feed delivers join/part batches.
pub type MembershipSink = mpsc::Sender<MembershipChange>;

/// Read/subscribe access to the root contract. This core never writes.
#[async_trait]
pub trait RootContract: Send + Sync {
    /// Identifier of the contract this connection reaches.
    fn contract_address(&self) -> Address;

    /// Whether code is deployed at [`Self::contract_address`].
    async fn is_deployed(&self) -> Result<bool, EventSourceError>;

    /// Asset (token) contract the root contract accepts.
    async fn token_address(&self) -> Result<Address, EventSourceError>;

    /// Freeze period in seconds.
    async fn commitment_interval(&self) -> Result<u64, EventSourceError>;

    /// Current chain head.
    async fn block_number(&self) -> Result<BlockNumber, EventSourceError>;

    /// Historical events of one kind with `from <= block <= to`, block-ordered.
    /// Only `RevenueDeposited` and `CommitmentConfirmed` are chain events.
    async fn past_events(
        &self,
        kind: EventKind,
        from: BlockNumber,
        to: BlockNumber,
    ) -> Result<Vec<ChainEvent>, EventSourceError>;

    /// Start delivering new deposits, confirmations and retractions.
    async fn subscribe(&self, sink: ChainEventSink) -> Result<(), EventSourceError>;

    /// Stop live delivery. Idempotent.
    async fn unsubscribe(&self);
}

/// External join/part channel.
#[async_trait]
pub trait MembershipFeed: Send + Sync {
    /// Begin delivery.
    async fn listen(&self, sink: MembershipSink) -> Result<(), EventSourceError>;

    /// Stop delivery. Idempotent.
    async fn close(&self);
}
