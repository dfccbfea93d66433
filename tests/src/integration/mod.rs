//! Cross-crate integration flows.

pub mod determinism;
pub mod restart;

use shared_types::{Address, BlockNumber, ChainEvent, Hash};

/// Deterministic test identity.
pub fn member(n: u8) -> Address {
    let mut address = [0u8; 20];
    address[0] = 0xC0;
    address[19] = n;
    address
}

/// Confirmation event with a placeholder storage reference.
pub fn confirmation(external_ref: u64, digest: Hash, block_number: BlockNumber) -> ChainEvent {
    ChainEvent::CommitmentConfirmed {
        external_ref,
        digest,
        storage_ref: format!("ipfs://checkpoint-{external_ref}"),
        block_number,
    }
}

/// Block until the watcher publishes a snapshot matching `predicate`.
pub async fn wait_for_snapshot(
    handle: &tc_04_chain_watcher::WatcherHandle,
    predicate: impl FnMut(&tc_02_revenue_ledger::LedgerSnapshot) -> bool,
) -> tc_02_revenue_ledger::LedgerSnapshot {
    let mut rx = handle.watch_snapshots();
    let snapshot = tokio::time::timeout(std::time::Duration::from_secs(5), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for ledger snapshot")
        .expect("watcher dropped its snapshot channel");
    snapshot.clone()
}
