//! # Inbound Ports
//!
//! Read-side API exposed by a running watcher.

use async_trait::async_trait;
use shared_types::{Address, Hash};
use tc_02_revenue_ledger::{LedgerSnapshot, MemberProof};

use crate::domain::{WatcherPhase, WatcherResult};

/// Queries answered by the watcher without sharing mutable state.
#[async_trait]
pub trait LedgerQueryApi: Send + Sync {
    /// Latest published snapshot.
    fn snapshot(&self) -> LedgerSnapshot;

    /// Current lifecycle phase.
    fn phase(&self) -> WatcherPhase;

    /// Withdrawal proof against live state (`None`) or a checkpoint.
    async fn proof(&self, address: Address, external_ref: Option<u64>) -> WatcherResult<MemberProof>;

    /// Digest of the live member set.
    async fn digest(&self) -> WatcherResult<Hash>;
}
