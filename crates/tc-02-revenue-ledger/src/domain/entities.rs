//! # Domain Entities
//!
//! Members, checkpoints and the proof bundle handed to withdrawing members.

use serde::{Deserialize, Serialize};
use shared_types::{Address, BlockNumber, Hash, U256};
use tc_01_commitment::{leaf_hash, verify, CommitmentTree, LeafEntry, MerkleProof};

use super::errors::LedgerError;

/// Membership status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberStatus {
    /// Receives a share of every deposit.
    Active,
    /// Parted: earnings frozen but still committed and withdrawable.
    Inactive,
}

/// A revenue-sharing member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Identity.
    pub address: Address,
    /// Cumulative earnings. Never decreases.
    pub earnings: U256,
    /// Current status.
    pub status: MemberStatus,
}

impl Member {
    /// A freshly joined member with zero earnings.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            earnings: U256::zero(),
            status: MemberStatus::Active,
        }
    }

    /// Member with explicit earnings and status.
    pub fn with_earnings(address: Address, earnings: impl Into<U256>, status: MemberStatus) -> Self {
        Self {
            address,
            earnings: earnings.into(),
            status,
        }
    }

    /// Whether the member accrues revenue.
    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }

    /// Commitment leaf for this member.
    pub fn leaf_entry(&self) -> LeafEntry {
        LeafEntry::new(self.address, self.earnings)
    }

    /// Leaf hash for this member.
    pub fn leaf_hash(&self) -> Hash {
        leaf_hash(&self.address, &self.earnings)
    }
}

/// Outcome of one `add_revenue` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Distribution {
    /// Amount credited to each active member.
    pub share: U256,
    /// Number of members credited.
    pub recipients: usize,
    /// Undistributed remainder carried forward.
    pub remainder: U256,
}

/// Immutable snapshot of the member set tied to an on-chain reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Local sequence number (0, 1, 2, ...).
    pub sequence: u64,
    /// On-chain reference number the digest was published under.
    pub external_ref: u64,
    /// Block at which the snapshot was taken.
    pub block_number: BlockNumber,
    /// Commitment digest over `members`.
    pub digest: Hash,
    /// Member set in canonical (address) order.
    pub members: Vec<Member>,
    /// Undistributed remainder at snapshot time.
    pub remainder: U256,
}

impl Checkpoint {
    /// Build a checkpoint, computing its digest from `members`.
    pub fn new(
        sequence: u64,
        external_ref: u64,
        block_number: BlockNumber,
        mut members: Vec<Member>,
        remainder: U256,
    ) -> Result<Self, LedgerError> {
        members.sort_by(|a, b| a.address.cmp(&b.address));
        let tree = CommitmentTree::build(members.iter().map(Member::leaf_entry))?;
        Ok(Self {
            sequence,
            external_ref,
            block_number,
            digest: tree.root(),
            members,
            remainder,
        })
    }

    /// Look up a member by address.
    pub fn member(&self, address: &Address) -> Option<&Member> {
        self.members
            .binary_search_by(|m| m.address.cmp(address))
            .ok()
            .map(|i| &self.members[i])
    }

    /// Proof for `address` against this checkpoint's digest.
    pub fn proof(&self, address: &Address) -> Result<MemberProof, LedgerError> {
        let member = self
            .member(address)
            .ok_or(LedgerError::NotAMember(*address))?;
        let tree = CommitmentTree::build(self.members.iter().map(Member::leaf_entry))?;
        if tree.root() != self.digest {
            return Err(LedgerError::CorruptCheckpoint {
                external_ref: self.external_ref,
                reason: "stored digest does not match member set".to_string(),
            });
        }
        Ok(MemberProof {
            address: *address,
            earnings: member.earnings,
            external_ref: Some(self.external_ref),
            root: self.digest,
            proof: tree.proof(address)?,
        })
    }

    /// Σ earnings + remainder.
    pub fn total_accounted(&self) -> U256 {
        self.members
            .iter()
            .fold(self.remainder, |acc, m| acc.saturating_add(m.earnings))
    }
}

/// Everything a member needs to call `withdraw` on the root contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProof {
    /// Withdrawing member.
    pub address: Address,
    /// Earnings committed in `root`.
    pub earnings: U256,
    /// Checkpoint reference, `None` when proven against live state.
    pub external_ref: Option<u64>,
    /// Digest the proof resolves to.
    pub root: Hash,
    /// Sibling path.
    pub proof: MerkleProof,
}

impl MemberProof {
    /// Recompute the root locally.
    pub fn verify(&self) -> bool {
        verify(&leaf_hash(&self.address, &self.earnings), &self.proof, &self.root)
    }
}
