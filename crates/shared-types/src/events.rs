//! # Ledger Events
//!
//! The tagged union of facts that drive the revenue ledger. Deposit and
//! confirmation events originate on the root chain; join/part events come
//! from the membership feed and are tagged with the watermark block at which
//! they were observed.

use serde::{Deserialize, Serialize};

use crate::entities::{Address, BlockNumber, Hash, U256};

/// Discriminant of a [`ChainEvent`], used for filtering and ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    /// Members joined (membership feed).
    MemberJoined,
    /// Members parted (membership feed).
    MemberParted,
    /// Tokens transferred to the root contract.
    RevenueDeposited,
    /// A commitment digest was recorded on the root contract.
    CommitmentConfirmed,
}

impl EventKind {
    /// Whether this kind comes from the membership feed rather than the chain.
    pub fn is_membership(&self) -> bool {
        matches!(self, EventKind::MemberJoined | EventKind::MemberParted)
    }

    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MemberJoined => "member_joined",
            EventKind::MemberParted => "member_parted",
            EventKind::RevenueDeposited => "revenue_deposited",
            EventKind::CommitmentConfirmed => "commitment_confirmed",
        }
    }
}

/// An immutable, block-tagged fact applied to the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ChainEvent {
    /// `Transfer(to = rootContract, value)` on the asset contract.
    RevenueDeposited {
        /// Transferred amount.
        amount: U256,
        /// Block containing the transfer.
        block_number: BlockNumber,
    },
    /// A commitment was published on the root contract.
    CommitmentConfirmed {
        /// On-chain reference number the digest was recorded under.
        external_ref: u64,
        /// Published digest.
        digest: Hash,
        /// Off-chain storage reference for the full member set.
        storage_ref: String,
        /// Block containing the confirmation.
        block_number: BlockNumber,
    },
    /// Identities joined the revenue-sharing set.
    MemberJoined {
        /// Joined identities.
        members: Vec<Address>,
        /// Watermark block at which the join was observed.
        block_number: BlockNumber,
    },
    /// Identities left the revenue-sharing set.
    MemberParted {
        /// Parted identities.
        members: Vec<Address>,
        /// Watermark block at which the part was observed.
        block_number: BlockNumber,
    },
}

impl ChainEvent {
    /// Block the event belongs to.
    pub fn block_number(&self) -> BlockNumber {
        match self {
            ChainEvent::RevenueDeposited { block_number, .. }
            | ChainEvent::CommitmentConfirmed { block_number, .. }
            | ChainEvent::MemberJoined { block_number, .. }
            | ChainEvent::MemberParted { block_number, .. } => *block_number,
        }
    }

    /// Discriminant.
    pub fn kind(&self) -> EventKind {
        match self {
            ChainEvent::RevenueDeposited { .. } => EventKind::RevenueDeposited,
            ChainEvent::CommitmentConfirmed { .. } => EventKind::CommitmentConfirmed,
            ChainEvent::MemberJoined { .. } => EventKind::MemberJoined,
            ChainEvent::MemberParted { .. } => EventKind::MemberParted,
        }
    }

    /// Convenience constructor for deposits.
    pub fn deposit(amount: impl Into<U256>, block_number: BlockNumber) -> Self {
        ChainEvent::RevenueDeposited {
            amount: amount.into(),
            block_number,
        }
    }

    /// Convenience constructor for joins.
    pub fn joined(members: Vec<Address>, block_number: BlockNumber) -> Self {
        ChainEvent::MemberJoined {
            members,
            block_number,
        }
    }

    /// Convenience constructor for parts.
    pub fn parted(members: Vec<Address>, block_number: BlockNumber) -> Self {
        ChainEvent::MemberParted {
            members,
            block_number,
        }
    }
}
