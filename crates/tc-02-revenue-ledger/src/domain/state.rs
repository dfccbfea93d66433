//! # Ledger State
//!
//! The persisted form of the ledger plus the read-only snapshot published
//! to query callers.

use serde::{Deserialize, Serialize};
use shared_types::{Address, BlockNumber, U256};

use super::entities::{Member, MemberStatus};

/// Contract-level metadata carried alongside the member set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMetadata {
    /// Root contract being watched.
    pub contract_address: Address,
    /// Asset (token) contract, read from the root contract at startup.
    pub token_address: Address,
    /// Seconds a published commitment stays frozen before withdrawals.
    pub commitment_interval_secs: u64,
    /// Highest block whose events have been applied.
    pub last_processed_block: BlockNumber,
    /// Most recent external reference confirmed on-chain.
    pub last_published_ref: Option<u64>,
}

/// Full serialisable ledger state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Metadata.
    pub metadata: LedgerMetadata,
    /// Members in address order (active and inactive).
    pub members: Vec<Member>,
    /// Undistributed remainder.
    pub remainder: U256,
    /// Σ of all deposits applied.
    pub total_deposited: U256,
    /// Monotonic mutation counter.
    pub version: u64,
}

/// Read-only view handed out to concurrent queries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Version of the ledger this snapshot was taken at.
    pub version: u64,
    /// Metadata at snapshot time.
    pub metadata: LedgerMetadata,
    /// Members in address order.
    pub members: Vec<Member>,
    /// Undistributed remainder.
    pub remainder: U256,
    /// Σ of all deposits applied.
    pub total_deposited: U256,
    /// Number of checkpoints held in memory.
    pub checkpoint_count: usize,
}

impl LedgerSnapshot {
    /// Look up a member by address.
    pub fn member(&self, address: &Address) -> Option<&Member> {
        self.members
            .binary_search_by(|m| m.address.cmp(address))
            .ok()
            .map(|i| &self.members[i])
    }

    /// Active member count.
    pub fn active_count(&self) -> usize {
        self.count(MemberStatus::Active)
    }

    /// Inactive member count.
    pub fn inactive_count(&self) -> usize {
        self.count(MemberStatus::Inactive)
    }

    /// Σ earnings across all members.
    pub fn total_earnings(&self) -> U256 {
        self.members
            .iter()
            .fold(U256::zero(), |acc, m| acc.saturating_add(m.earnings))
    }

    fn count(&self, status: MemberStatus) -> usize {
        self.members.iter().filter(|m| m.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_aggregates() {
        let snapshot = LedgerSnapshot {
            members: vec![
                Member::with_earnings([1u8; 20], 10u64, MemberStatus::Active),
                Member::with_earnings([2u8; 20], 5u64, MemberStatus::Inactive),
                Member::with_earnings([3u8; 20], 7u64, MemberStatus::Active),
            ],
            ..Default::default()
        };
        assert_eq!(snapshot.active_count(), 2);
        assert_eq!(snapshot.inactive_count(), 1);
        assert_eq!(snapshot.total_earnings(), U256::from(22u64));
        assert_eq!(snapshot.member(&[2u8; 20]).map(|m| m.earnings), Some(U256::from(5u64)));
        assert!(snapshot.member(&[9u8; 20]).is_none());
    }

    #[test]
    fn test_state_json_roundtrip_preserves_status() {
        let state = LedgerState {
            members: vec![Member::with_earnings([4u8; 20], 1u64, MemberStatus::Inactive)],
            remainder: U256::from(3u64),
            total_deposited: U256::from(4u64),
            version: 9,
            ..Default::default()
        };
        let json = serde_json::to_string(&state).unwrap();
        let back: LedgerState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
