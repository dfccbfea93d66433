//! # Replay Determinism
//!
//! Independent watchers replaying the same history, and a ledger driven
//! directly from the merged streams, must agree on every digest.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use primitive_types::U256;
    use shared_types::{Address, BlockNumber, ChainEvent};
    use tc_01_commitment::{compute_root, LeafEntry};
    use tc_02_revenue_ledger::{InMemoryLedgerStore, LedgerStore, RevenueLedger};
    use tc_03_event_merger::merge_event_streams;
    use tc_04_chain_watcher::{
        ChainWatcher, ChannelMembershipFeed, InMemoryRootContract, WatcherConfig, WatcherHandle,
    };

    use crate::integration::member;

    const CONTRACT: Address = [0xAB; 20];

    fn membership_history() -> Vec<(BlockNumber, ChainEvent)> {
        vec![
            (0, ChainEvent::joined(vec![member(1), member(2), member(3)], 0)),
            (4, ChainEvent::joined(vec![member(4)], 4)),
            (7, ChainEvent::parted(vec![member(2)], 7)),
            (9, ChainEvent::joined(vec![member(2), member(5)], 9)),
        ]
    }

    fn deposit_history() -> Vec<ChainEvent> {
        [(1u64, 1000u64), (4, 999), (4, 7), (7, 5), (8, 12_345), (9, 1), (11, 2)]
            .into_iter()
            .map(|(block, amount)| ChainEvent::deposit(amount, block))
            .collect()
    }

    async fn replay(chunk: u64) -> WatcherHandle {
        let contract = Arc::new(InMemoryRootContract::new(CONTRACT));
        for event in deposit_history() {
            contract.push_event(event).await;
        }
        let store = Arc::new(InMemoryLedgerStore::new());
        for (block, event) in membership_history() {
            store.save_event(block, &event).await.unwrap();
        }
        let mut config = WatcherConfig::for_testing();
        config.replay_chunk_blocks = chunk;
        let (feed, _controller) = ChannelMembershipFeed::new();
        ChainWatcher::new(config, contract, Arc::new(feed), store)
            .start()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_chunk_size_does_not_change_digest() {
        let mut digests = Vec::new();
        for chunk in [1, 3, 4, 1000] {
            let handle = replay(chunk).await;
            digests.push(handle.digest().await.unwrap());
            handle.stop().await.unwrap();
        }
        assert!(digests.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_watcher_matches_direct_ledger() {
        let handle = replay(4).await;
        let watched = handle.snapshot();

        let membership: Vec<ChainEvent> = membership_history().into_iter().map(|(_, e)| e).collect();
        let mut ledger = RevenueLedger::default();
        // stream order passed to the merger is irrelevant
        for event in merge_event_streams([deposit_history(), membership]).unwrap() {
            match event {
                ChainEvent::RevenueDeposited { amount, .. } => {
                    ledger.add_revenue(amount).unwrap();
                }
                ChainEvent::MemberJoined { members, .. } => {
                    ledger.add_members(members);
                }
                ChainEvent::MemberParted { members, .. } => {
                    ledger.remove_members(members);
                }
                ChainEvent::CommitmentConfirmed { .. } => unreachable!(),
            }
        }

        assert_eq!(handle.digest().await.unwrap(), ledger.digest().unwrap());
        assert_eq!(watched.total_deposited, ledger.total_deposited());
        assert_eq!(watched.remainder, ledger.remainder());
        assert_eq!(
            watched.total_earnings() + watched.remainder,
            U256::from(1000u64 + 999 + 7 + 5 + 12_345 + 1 + 2)
        );

        // the digest is exactly the root over (address, earnings) leaves
        let leaves: Vec<LeafEntry> = watched
            .members
            .iter()
            .map(|m| LeafEntry::new(m.address, m.earnings))
            .collect();
        assert_eq!(compute_root(&leaves).unwrap(), ledger.digest().unwrap());

        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_every_member_proves_against_live_digest() {
        let handle = replay(2).await;
        let digest = handle.digest().await.unwrap();
        for n in 1..=5 {
            let proof = handle.proof(member(n), None).await.unwrap();
            assert_eq!(proof.root, digest);
            assert!(proof.verify(), "member {n} failed to verify");
        }
        assert!(handle.proof(member(42), None).await.is_err());
        handle.stop().await.unwrap();
    }
}
