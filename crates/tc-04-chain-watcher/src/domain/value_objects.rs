//! # Value Objects
//!
//! Lifecycle phase, role policy, operator alerts and the notifications
//! delivered by the two live subscriptions.

use serde::{Deserialize, Serialize};
use shared_types::{Address, BlockNumber, ChainEvent, EventKind, Hash};

/// Watcher lifecycle.
///
/// ```text
/// Starting → Replaying → Live → Stopped
///                          └──→ Halted (reorg)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatcherPhase {
    /// Validating configuration and seeding the ledger.
    Starting,
    /// Applying historical events.
    Replaying,
    /// Caught up; live events mutate the ledger.
    Live,
    /// Stopped after a reorg; no further mutation.
    Halted,
    /// Stopped on request.
    Stopped,
}

impl WatcherPhase {
    /// Whether the processing loop has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WatcherPhase::Halted | WatcherPhase::Stopped)
    }
}

/// Which live events the watcher reacts to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatcherRole {
    /// Deposits and membership changes.
    #[default]
    Observer,
    /// Observer plus confirmations: checkpoints each published commitment and
    /// checks its digest against the local one.
    Validator,
}

impl WatcherRole {
    /// Whether a live event of `kind` is applied under this role.
    pub fn applies_live(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::MemberJoined | EventKind::MemberParted | EventKind::RevenueDeposited => true,
            EventKind::CommitmentConfirmed => *self == WatcherRole::Validator,
        }
    }
}

/// Structured operator alert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WatcherAlert {
    /// A fire-and-forget store write failed.
    PersistenceFailed {
        /// Store operation.
        operation: &'static str,
        /// Backend message.
        reason: String,
    },
    /// An applied event was retracted; the watcher halted.
    ChainReorg {
        /// Block of the retracted event.
        block_number: BlockNumber,
    },
    /// The published digest differs from the locally computed one.
    DigestMismatch {
        /// On-chain reference.
        external_ref: u64,
        /// Digest recorded on-chain.
        published: Hash,
        /// Digest computed from the local member set.
        local: Hash,
    },
    /// The ledger refused a live event (e.g. arithmetic overflow).
    EventRejected {
        /// Block of the rejected event.
        block_number: BlockNumber,
        /// Ledger message.
        reason: String,
    },
}

/// Notification from the root contract subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainNotification {
    /// A new deposit or confirmation.
    Event(ChainEvent),
    /// A previously delivered event was removed from the canonical chain.
    Retracted(ChainEvent),
}

/// Notification from the membership feed. Carries no block number; the
/// watcher tags it with its current watermark.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MembershipChange {
    /// Identities joined.
    Join(Vec<Address>),
    /// Identities left.
    Part(Vec<Address>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observer_ignores_confirmations() {
        assert!(WatcherRole::Observer.applies_live(EventKind::RevenueDeposited));
        assert!(WatcherRole::Observer.applies_live(EventKind::MemberParted));
        assert!(!WatcherRole::Observer.applies_live(EventKind::CommitmentConfirmed));
        assert!(WatcherRole::Validator.applies_live(EventKind::CommitmentConfirmed));
    }

    #[test]
    fn test_terminal_phases() {
        assert!(WatcherPhase::Halted.is_terminal());
        assert!(WatcherPhase::Stopped.is_terminal());
        assert!(!WatcherPhase::Live.is_terminal());
    }
}
