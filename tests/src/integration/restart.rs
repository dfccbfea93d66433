//! # Restart Flow
//!
//! A validator runs live over the JSON file store, publishes a checkpoint,
//! and is stopped. A second process opens the same directory, seeds from the
//! checkpoint and replays the blocks it missed.
//!
//! Membership changes are issued before the chain events of the block they
//! are recorded under, so replay reproduces the live order exactly.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use primitive_types::U256;
    use shared_types::{Address, ChainEvent};
    use tc_02_revenue_ledger::{CheckpointKey, JsonFileLedgerStore, LedgerStore, MemberStatus};
    use tc_04_chain_watcher::{
        ChainWatcher, ChannelMembershipFeed, InMemoryRootContract, WatcherConfig, WatcherPhase,
        WatcherRole,
    };

    use crate::integration::{confirmation, member, wait_for_snapshot};

    const CONTRACT: Address = [0xAB; 20];
    const TOKEN: Address = [0x70; 20];

    fn validator_config() -> WatcherConfig {
        WatcherConfig::for_testing().with_role(WatcherRole::Validator)
    }

    #[tokio::test]
    async fn test_restart_resumes_from_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let contract = Arc::new(InMemoryRootContract::new(CONTRACT).with_token(TOKEN, 600));

        // ---- first run: live ----
        let store = Arc::new(JsonFileLedgerStore::open(dir.path()).await.unwrap());
        let (feed, controller) = ChannelMembershipFeed::new();
        let handle = ChainWatcher::new(
            validator_config(),
            Arc::clone(&contract),
            Arc::new(feed),
            Arc::clone(&store),
        )
        .start()
        .await
        .unwrap();

        controller.join(vec![member(1), member(2), member(3)]).await;
        wait_for_snapshot(&handle, |s| s.active_count() == 3).await;
        contract.push_event(ChainEvent::deposit(300u64, 1)).await;
        contract.push_event(ChainEvent::deposit(100u64, 2)).await;
        wait_for_snapshot(&handle, |s| s.total_deposited == U256::from(400u64)).await;

        controller.part(vec![member(3)]).await;
        wait_for_snapshot(&handle, |s| s.inactive_count() == 1).await;

        let published = handle.digest().await.unwrap();
        contract.push_event(confirmation(1, published, 3)).await;
        wait_for_snapshot(&handle, |s| s.checkpoint_count == 1).await;

        contract.push_event(ChainEvent::deposit(20u64, 4)).await;
        let before_stop =
            wait_for_snapshot(&handle, |s| s.total_deposited == U256::from(420u64)).await;
        assert_eq!(before_stop.member(&member(1)).unwrap().earnings, U256::from(143u64));
        assert_eq!(before_stop.remainder, U256::one());

        handle.stop().await.unwrap();
        assert_eq!(handle.phase(), WatcherPhase::Stopped);

        // ---- on disk ----
        let state = store.load_ledger_state().await.unwrap().unwrap();
        assert_eq!(state.metadata.last_processed_block, 4);
        assert_eq!(state.metadata.contract_address, CONTRACT);
        assert_eq!(state.metadata.token_address, TOKEN);
        assert_eq!(
            store.load_events(0, 10).await.unwrap(),
            vec![
                ChainEvent::joined(vec![member(1), member(2), member(3)], 0),
                ChainEvent::parted(vec![member(3)], 2),
            ]
        );
        let checkpoint = store
            .load_checkpoint(CheckpointKey::Latest)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(checkpoint.digest, published);
        assert_eq!(checkpoint.block_number, 3);

        // ---- downtime ----
        contract.push_event(ChainEvent::deposit(41u64, 5)).await;

        // ---- second run: seed + replay ----
        let reopened = Arc::new(JsonFileLedgerStore::open(dir.path()).await.unwrap());
        let (feed, _controller) = ChannelMembershipFeed::new();
        let handle = ChainWatcher::new(
            validator_config(),
            Arc::clone(&contract),
            Arc::new(feed),
            Arc::clone(&reopened),
        )
        .start()
        .await
        .unwrap();

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.metadata.last_processed_block, 5);
        assert_eq!(snapshot.total_deposited, U256::from(461u64));
        assert_eq!(snapshot.member(&member(1)).unwrap().earnings, U256::from(164u64));
        assert_eq!(snapshot.member(&member(2)).unwrap().earnings, U256::from(164u64));
        let parted = snapshot.member(&member(3)).unwrap();
        assert_eq!(parted.status, MemberStatus::Inactive);
        assert_eq!(parted.earnings, U256::from(133u64));
        assert_eq!(snapshot.remainder, U256::zero());
        assert_eq!(snapshot.total_earnings() + snapshot.remainder, snapshot.total_deposited);

        // withdrawal proof against the published digest
        let proof = handle.proof(member(3), Some(1)).await.unwrap();
        assert_eq!(proof.root, published);
        assert_eq!(proof.earnings, U256::from(133u64));
        assert!(proof.verify());

        // live proof reflects post-checkpoint earnings
        let live = handle.proof(member(1), None).await.unwrap();
        assert_eq!(live.earnings, U256::from(164u64));
        assert_eq!(live.root, handle.digest().await.unwrap());
        assert!(live.verify());

        handle.stop().await.unwrap();
        let state = reopened.load_ledger_state().await.unwrap().unwrap();
        assert_eq!(state.metadata.last_processed_block, 5);
    }

    #[tokio::test]
    async fn test_restart_against_other_contract_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let contract = Arc::new(InMemoryRootContract::new(CONTRACT));
        let store = Arc::new(JsonFileLedgerStore::open(dir.path()).await.unwrap());
        let (feed, _controller) = ChannelMembershipFeed::new();
        let handle = ChainWatcher::new(
            WatcherConfig::for_testing(),
            contract,
            Arc::new(feed),
            Arc::clone(&store),
        )
        .start()
        .await
        .unwrap();
        handle.stop().await.unwrap();

        let other: Address = [0xCD; 20];
        let mut config = WatcherConfig::for_testing();
        config.contract_address = other;
        let (feed, _controller) = ChannelMembershipFeed::new();
        let result = ChainWatcher::new(
            config,
            Arc::new(InMemoryRootContract::new(other)),
            Arc::new(feed),
            store,
        )
        .start()
        .await;
        assert!(matches!(
            result.err(),
            Some(tc_04_chain_watcher::WatcherError::ConfigMismatch { .. })
        ));
    }
}
