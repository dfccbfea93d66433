//! # Revenue Ledger
//!
//! Single-owner accounting state: members, equal-split distribution with
//! remainder carry-forward, a lazily rebuilt commitment tree, and retained
//! checkpoints for historical proofs.
//!
//! The ledger is not `Sync`-shared. The chain watcher owns it exclusively and
//! hands out [`LedgerSnapshot`] values to readers.

use std::collections::BTreeMap;
use std::sync::Arc;

use shared_types::{Address, BlockNumber, Hash, U256};
use tc_01_commitment::CommitmentTree;
use tracing::{debug, info};

use crate::domain::{
    invariant_accounting, invariant_remainder_bound, Checkpoint, Distribution, LedgerError,
    LedgerMetadata, LedgerResult, LedgerSnapshot, LedgerState, Member, MemberProof, MemberStatus,
};

/// The accounting engine.
#[derive(Debug, Default)]
pub struct RevenueLedger {
    metadata: LedgerMetadata,
    members: BTreeMap<Address, Member>,
    remainder: U256,
    total_deposited: U256,
    /// `None` while stale.
    tree: Option<CommitmentTree>,
    /// Keyed by external reference.
    checkpoints: BTreeMap<u64, Arc<Checkpoint>>,
    next_sequence: u64,
    version: u64,
}

impl RevenueLedger {
    /// Empty ledger.
    pub fn new(metadata: LedgerMetadata) -> Self {
        Self {
            metadata,
            ..Default::default()
        }
    }

    /// Seed from a checkpoint. The watermark moves to the checkpoint block and
    /// the checkpoint is retained for historical proofs.
    pub fn from_checkpoint(checkpoint: Checkpoint, mut metadata: LedgerMetadata) -> LedgerResult<Self> {
        let tree = CommitmentTree::build(checkpoint.members.iter().map(Member::leaf_entry))?;
        if tree.root() != checkpoint.digest {
            return Err(LedgerError::CorruptCheckpoint {
                external_ref: checkpoint.external_ref,
                reason: "stored digest does not match member set".to_string(),
            });
        }

        let mut total_deposited = checkpoint.remainder;
        for member in &checkpoint.members {
            total_deposited = total_deposited
                .checked_add(member.earnings)
                .ok_or(LedgerError::Overflow {
                    operation: "from_checkpoint",
                })?;
        }

        metadata.last_processed_block = checkpoint.block_number;
        metadata.last_published_ref = Some(checkpoint.external_ref);

        let members = checkpoint
            .members
            .iter()
            .map(|m| (m.address, m.clone()))
            .collect();
        let remainder = checkpoint.remainder;
        let next_sequence = checkpoint.sequence + 1;
        let mut checkpoints = BTreeMap::new();
        checkpoints.insert(checkpoint.external_ref, Arc::new(checkpoint));

        Ok(Self {
            metadata,
            members,
            remainder,
            total_deposited,
            tree: Some(tree),
            checkpoints,
            next_sequence,
            version: 0,
        })
    }

    /// Restore from a persisted full state. Rejects states that break the
    /// accounting invariant.
    pub fn from_state(state: LedgerState) -> LedgerResult<Self> {
        invariant_accounting(&state.members, state.remainder, state.total_deposited)?;
        Ok(Self {
            metadata: state.metadata,
            members: state.members.into_iter().map(|m| (m.address, m)).collect(),
            remainder: state.remainder,
            total_deposited: state.total_deposited,
            tree: None,
            checkpoints: BTreeMap::new(),
            next_sequence: 0,
            version: state.version,
        })
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    /// Activate identities. Returns those whose state changed (absent or
    /// inactive before). Rejoining members keep their frozen earnings.
    pub fn add_members<I>(&mut self, addresses: I) -> Vec<Address>
    where
        I: IntoIterator<Item = Address>,
    {
        let changed: Vec<Address> = addresses
            .into_iter()
            .filter(|address| self.activate(*address))
            .collect();
        if !changed.is_empty() {
            self.touch();
            debug!(count = changed.len(), "[tc-02] members activated");
        }
        changed
    }

    /// Activate a single identity.
    pub fn add_member(&mut self, address: Address) -> bool {
        !self.add_members([address]).is_empty()
    }

    /// Deactivate identities, freezing their earnings. Unknown or already
    /// inactive identities are ignored.
    pub fn remove_members<I>(&mut self, addresses: I) -> Vec<Address>
    where
        I: IntoIterator<Item = Address>,
    {
        let mut changed = Vec::new();
        for address in addresses {
            if let Some(member) = self.members.get_mut(&address) {
                if member.status == MemberStatus::Active {
                    member.status = MemberStatus::Inactive;
                    changed.push(address);
                }
            }
        }
        if !changed.is_empty() {
            self.touch();
            debug!(count = changed.len(), "[tc-02] members deactivated");
        }
        changed
    }

    /// Deactivate a single identity.
    pub fn remove_member(&mut self, address: Address) -> bool {
        !self.remove_members([address]).is_empty()
    }

    fn activate(&mut self, address: Address) -> bool {
        match self.members.get_mut(&address) {
            Some(member) if member.status == MemberStatus::Active => false,
            Some(member) => {
                member.status = MemberStatus::Active;
                true
            }
            None => {
                self.members.insert(address, Member::new(address));
                true
            }
        }
    }

    // =========================================================================
    // REVENUE
    // =========================================================================

    /// Split `amount` plus the carried remainder equally among active
    /// members. All-or-nothing: on overflow nothing is changed.
    pub fn add_revenue(&mut self, amount: impl Into<U256>) -> LedgerResult<Distribution> {
        let amount = amount.into();
        let pool = self
            .remainder
            .checked_add(amount)
            .ok_or(LedgerError::Overflow {
                operation: "add_revenue",
            })?;
        let total_deposited = self
            .total_deposited
            .checked_add(amount)
            .ok_or(LedgerError::Overflow {
                operation: "add_revenue",
            })?;

        let recipients: Vec<Address> = self
            .members
            .values()
            .filter(|m| m.is_active())
            .map(|m| m.address)
            .collect();

        let distribution = if recipients.is_empty() {
            Distribution {
                share: U256::zero(),
                recipients: 0,
                remainder: pool,
            }
        } else {
            let count = U256::from(recipients.len());
            let share = pool / count;
            let remainder = pool % count;

            let mut credited = Vec::with_capacity(recipients.len());
            for address in &recipients {
                let earnings = self.members[address]
                    .earnings
                    .checked_add(share)
                    .ok_or(LedgerError::Overflow {
                        operation: "add_revenue",
                    })?;
                credited.push((*address, earnings));
            }
            for (address, earnings) in credited {
                if let Some(member) = self.members.get_mut(&address) {
                    member.earnings = earnings;
                }
            }

            Distribution {
                share,
                recipients: recipients.len(),
                remainder,
            }
        };

        self.remainder = distribution.remainder;
        self.total_deposited = total_deposited;
        self.touch();
        debug_assert!(invariant_remainder_bound(self.remainder, distribution.recipients));
        debug!(
            amount = %amount,
            share = %distribution.share,
            recipients = distribution.recipients,
            remainder = %distribution.remainder,
            "[tc-02] revenue distributed"
        );
        Ok(distribution)
    }

    // =========================================================================
    // COMMITMENT & CHECKPOINTS
    // =========================================================================

    /// Digest of the current member set. Rebuilds the tree if stale.
    pub fn digest(&mut self) -> LedgerResult<Hash> {
        Ok(self.tree()?.root())
    }

    /// Snapshot the current member set under an on-chain reference.
    pub fn store_block(
        &mut self,
        external_ref: u64,
        block_number: BlockNumber,
    ) -> LedgerResult<Arc<Checkpoint>> {
        if self.checkpoints.contains_key(&external_ref) {
            return Err(LedgerError::DuplicateCheckpoint { external_ref });
        }
        let digest = self.tree()?.root();
        let checkpoint = Arc::new(Checkpoint {
            sequence: self.next_sequence,
            external_ref,
            block_number,
            digest,
            members: self.members.values().cloned().collect(),
            remainder: self.remainder,
        });
        self.checkpoints.insert(external_ref, Arc::clone(&checkpoint));
        self.next_sequence += 1;
        self.metadata.last_published_ref = Some(external_ref);
        self.version += 1;
        info!(
            sequence = checkpoint.sequence,
            external_ref,
            block_number,
            members = checkpoint.members.len(),
            "[tc-02] checkpoint stored"
        );
        Ok(checkpoint)
    }

    /// Proof for `address`, against the live set or a retained checkpoint.
    pub fn get_proof(
        &mut self,
        address: &Address,
        external_ref: Option<u64>,
    ) -> LedgerResult<MemberProof> {
        match external_ref {
            Some(external_ref) => self
                .checkpoints
                .get(&external_ref)
                .ok_or(LedgerError::CheckpointNotFound { external_ref })?
                .proof(address),
            None => {
                let member = self
                    .members
                    .get(address)
                    .ok_or(LedgerError::NotAMember(*address))?;
                let earnings = member.earnings;
                let tree = self.tree()?;
                Ok(MemberProof {
                    address: *address,
                    earnings,
                    external_ref: None,
                    root: tree.root(),
                    proof: tree.proof(address)?,
                })
            }
        }
    }

    /// Retained checkpoint for an external reference.
    pub fn checkpoint(&self, external_ref: u64) -> Option<Arc<Checkpoint>> {
        self.checkpoints.get(&external_ref).cloned()
    }

    /// Most recently created checkpoint.
    pub fn latest_checkpoint(&self) -> Option<Arc<Checkpoint>> {
        self.checkpoints
            .values()
            .max_by_key(|cp| cp.sequence)
            .cloned()
    }

    fn tree(&mut self) -> LedgerResult<&CommitmentTree> {
        if self.tree.is_none() {
            let tree = CommitmentTree::build(self.members.values().map(Member::leaf_entry))?;
            self.tree = Some(tree);
        }
        match &self.tree {
            Some(tree) => Ok(tree),
            None => Err(LedgerError::InvariantViolated(
                "commitment tree missing after rebuild".to_string(),
            )),
        }
    }

    fn touch(&mut self) {
        self.tree = None;
        self.version += 1;
    }

    // =========================================================================
    // METADATA
    // =========================================================================

    /// Advance the block watermark. Never moves backwards.
    pub fn advance_watermark(&mut self, block_number: BlockNumber) {
        if block_number > self.metadata.last_processed_block {
            self.metadata.last_processed_block = block_number;
            self.version += 1;
        }
    }

    /// Record contract-derived metadata read at startup.
    pub fn set_contract_info(&mut self, token_address: Address, commitment_interval_secs: u64) {
        self.metadata.token_address = token_address;
        self.metadata.commitment_interval_secs = commitment_interval_secs;
        self.version += 1;
    }

    /// Metadata.
    pub fn metadata(&self) -> &LedgerMetadata {
        &self.metadata
    }

    /// Highest applied block.
    pub fn last_processed_block(&self) -> BlockNumber {
        self.metadata.last_processed_block
    }

    // =========================================================================
    // READ ACCESSORS
    // =========================================================================

    /// Member record.
    pub fn member(&self, address: &Address) -> Option<&Member> {
        self.members.get(address)
    }

    /// Members in canonical order.
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    /// Active member count.
    pub fn active_count(&self) -> usize {
        self.members.values().filter(|m| m.is_active()).count()
    }

    /// Inactive member count.
    pub fn inactive_count(&self) -> usize {
        self.members.len() - self.active_count()
    }

    /// Σ earnings over every member.
    pub fn total_earnings(&self) -> U256 {
        self.members
            .values()
            .fold(U256::zero(), |acc, m| acc.saturating_add(m.earnings))
    }

    /// Carried remainder.
    pub fn remainder(&self) -> U256 {
        self.remainder
    }

    /// Σ deposits applied.
    pub fn total_deposited(&self) -> U256 {
        self.total_deposited
    }

    /// Mutation counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Continue numbering after a version persisted by an earlier run.
    /// Never moves the counter backwards.
    pub fn resume_version(&mut self, persisted: u64) {
        self.version = self.version.max(persisted);
    }

    /// Owned read view.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            version: self.version,
            metadata: self.metadata.clone(),
            members: self.members.values().cloned().collect(),
            remainder: self.remainder,
            total_deposited: self.total_deposited,
            checkpoint_count: self.checkpoints.len(),
        }
    }

    /// Persistable full state.
    pub fn to_state(&self) -> LedgerState {
        LedgerState {
            metadata: self.metadata.clone(),
            members: self.members.values().cloned().collect(),
            remainder: self.remainder,
            total_deposited: self.total_deposited,
            version: self.version,
        }
    }

    /// Verify the accounting invariant.
    pub fn check_invariants(&self) -> LedgerResult<()> {
        let members: Vec<Member> = self.members.values().cloned().collect();
        invariant_accounting(&members, self.remainder, self.total_deposited)
    }
}
