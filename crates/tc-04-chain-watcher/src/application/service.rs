//! # Chain Watcher Service
//!
//! Startup validation, ledger seeding and catch-up replay. Every step here is
//! awaited and fails fast; once caught up, the ledger moves into the
//! processing loop and [`ChainWatcher::start`] returns a [`WatcherHandle`].

use std::sync::Arc;

use shared_types::{format_address, BlockNumber, EventKind};
use tally_telemetry::register_metrics;
use tc_02_revenue_ledger::{CheckpointKey, LedgerMetadata, LedgerState, LedgerStore, RevenueLedger};
use tc_03_event_merger::merge_event_streams;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use super::handle::WatcherHandle;
use super::processing::{run, LedgerProcessor, LoopChannels};
use crate::config::WatcherConfig;
use crate::domain::{
    ChainNotification, MembershipChange, WatcherAlert, WatcherError, WatcherPhase, WatcherResult,
};
use crate::ports::{MembershipFeed, RootContract};

const ALERT_CAPACITY: usize = 64;
const QUERY_CAPACITY: usize = 64;

/// Chain watcher, generic over its three external collaborators.
pub struct ChainWatcher<C, F, S> {
    config: WatcherConfig,
    contract: Arc<C>,
    feed: Arc<F>,
    store: Arc<S>,
    alerts: broadcast::Sender<WatcherAlert>,
    phase: watch::Sender<WatcherPhase>,
}

impl<C, F, S> ChainWatcher<C, F, S>
where
    C: RootContract + 'static,
    F: MembershipFeed + 'static,
    S: LedgerStore + 'static,
{
    /// Create a watcher. Nothing is contacted until [`Self::start`].
    pub fn new(config: WatcherConfig, contract: Arc<C>, feed: Arc<F>, store: Arc<S>) -> Self {
        let (alerts, _) = broadcast::channel(ALERT_CAPACITY);
        let (phase, _) = watch::channel(WatcherPhase::Starting);
        Self {
            config,
            contract,
            feed,
            store,
            alerts,
            phase,
        }
    }

    /// Alerts raised from startup onwards, including during replay.
    pub fn subscribe_alerts(&self) -> broadcast::Receiver<WatcherAlert> {
        self.alerts.subscribe()
    }

    /// Phase receiver that also observes `Starting` and `Replaying`.
    pub fn watch_phase(&self) -> watch::Receiver<WatcherPhase> {
        self.phase.subscribe()
    }

    /// Validate, seed, replay to the current head, then go live.
    pub async fn start(self) -> WatcherResult<WatcherHandle> {
        info!(
            contract = %format_address(&self.config.contract_address),
            role = ?self.config.role,
            "[tc-04] Initializing ledger state"
        );
        if let Err(e) = register_metrics() {
            warn!(error = %e, "[tc-04] Metrics unavailable");
        }

        // 1. identity
        let persisted = self.check_contract().await?;

        // 2. contract-derived metadata
        let token_address = self.contract.token_address().await?;
        let commitment_interval = self.contract.commitment_interval().await?;

        // 3. seed
        let (mut ledger, seeded_block) = self.seed_ledger().await?;
        ledger.set_contract_info(token_address, commitment_interval);
        if let Some(state) = &persisted {
            ledger.resume_version(state.version);
        }

        let (snapshot_tx, snapshot_rx) = watch::channel(ledger.snapshot());
        let mut processor = LedgerProcessor::new(
            ledger,
            Arc::clone(&self.store),
            self.config.role,
            self.alerts.clone(),
            snapshot_tx,
        );

        // 4. subscribe first so nothing falls between head and live delivery
        let capacity = self.config.channel_capacity.max(1);
        let (chain_tx, chain_rx) = mpsc::channel::<ChainNotification>(capacity);
        let (member_tx, member_rx) = mpsc::channel::<MembershipChange>(capacity);
        self.contract.subscribe(chain_tx).await?;
        if let Err(e) = self.feed.listen(member_tx).await {
            self.contract.unsubscribe().await;
            return Err(e.into());
        }

        if let Err(e) = self.catch_up(&mut processor, seeded_block).await {
            warn!(error = %e, "[tc-04] Startup aborted");
            self.contract.unsubscribe().await;
            self.feed.close().await;
            return Err(e);
        }

        // 6. live
        let (query_tx, query_rx) = mpsc::channel(QUERY_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.phase.send_replace(WatcherPhase::Live);
        info!(
            last_processed_block = processor.ledger().last_processed_block(),
            members = processor.ledger().members().count(),
            "[tc-04] Listening to chain events and membership feed"
        );

        let channels = LoopChannels {
            chain: chain_rx,
            membership: member_rx,
            queries: query_rx,
            shutdown: shutdown_rx,
            phase: self.phase.clone(),
        };
        let task = tokio::spawn(run(
            processor,
            Arc::clone(&self.contract),
            Arc::clone(&self.feed),
            channels,
        ));

        let store: Arc<dyn LedgerStore> = self.store;
        Ok(WatcherHandle::new(
            query_tx,
            snapshot_rx,
            self.phase.subscribe(),
            self.alerts,
            shutdown_tx,
            store,
            task,
        ))
    }

    /// Identity checks. Returns the persisted state, if any.
    async fn check_contract(&self) -> WatcherResult<Option<LedgerState>> {
        let configured = self.config.contract_address;
        let live = self.contract.contract_address();
        if configured != live {
            return Err(WatcherError::ConfigMismatch {
                field: "contract_address",
                expected: format_address(&configured),
                found: format_address(&live),
            });
        }
        if !self.contract.is_deployed().await? {
            return Err(WatcherError::ConfigMismatch {
                field: "contract_code",
                expected: "deployed contract".to_string(),
                found: format!("no code at {}", format_address(&live)),
            });
        }
        let state = self.store.load_ledger_state().await?;
        if let Some(state) = &state {
            let persisted = state.metadata.contract_address;
            if persisted != [0u8; 20] && persisted != configured {
                return Err(WatcherError::ConfigMismatch {
                    field: "persisted contract_address",
                    expected: format_address(&configured),
                    found: format_address(&persisted),
                });
            }
        }
        Ok(state)
    }

    /// Ledger plus the block of the checkpoint it was seeded from.
    async fn seed_ledger(&self) -> WatcherResult<(RevenueLedger, Option<BlockNumber>)> {
        let metadata = LedgerMetadata {
            contract_address: self.config.contract_address,
            ..LedgerMetadata::default()
        };
        match self.store.load_checkpoint(CheckpointKey::Latest).await? {
            Some(checkpoint) => {
                info!(
                    sequence = checkpoint.sequence,
                    external_ref = checkpoint.external_ref,
                    block_number = checkpoint.block_number,
                    members = checkpoint.members.len(),
                    "[tc-04] Seeding ledger from checkpoint"
                );
                let block_number = checkpoint.block_number;
                let ledger = RevenueLedger::from_checkpoint(checkpoint, metadata)?;
                Ok((ledger, Some(block_number)))
            }
            None => {
                info!(
                    start_block = self.config.start_block,
                    "[tc-04] No checkpoint found, starting from an empty ledger"
                );
                Ok((RevenueLedger::new(metadata), None))
            }
        }
    }

    /// Steps 4 and 5: read the head, replay, persist.
    async fn catch_up(
        &self,
        processor: &mut LedgerProcessor<S>,
        seeded_block: Option<BlockNumber>,
    ) -> WatcherResult<()> {
        let replay_from = match seeded_block {
            Some(block_number) => {
                self.replay_checkpoint_block(processor, block_number).await?;
                block_number + 1
            }
            None => self.config.start_block,
        };
        let head = self.contract.block_number().await?;
        if replay_from <= head {
            self.phase.send_replace(WatcherPhase::Replaying);
            info!(from = replay_from, to = head, "[tc-04] Playing back events");
            self.replay(processor, replay_from, head).await?;
        } else {
            debug!(head, "[tc-04] Nothing to play back");
        }
        processor.caught_up(head);

        self.store
            .save_ledger_state(&processor.ledger().to_state())
            .await?;
        Ok(())
    }

    /// Membership records share the checkpoint's block when they arrived
    /// after it was taken. Re-applying the whole block is harmless: joins and
    /// parts are idempotent, kept in arrival order, and leave earnings alone.
    async fn replay_checkpoint_block(
        &self,
        processor: &mut LedgerProcessor<S>,
        block_number: BlockNumber,
    ) -> WatcherResult<()> {
        let records = self.store.load_events(block_number, block_number).await?;
        let mut applied = 0usize;
        for event in records.into_iter().filter(|e| e.kind().is_membership()) {
            processor.apply_replayed(event).await?;
            applied += 1;
        }
        debug!(
            block_number,
            records = applied,
            "[tc-04] Re-applied membership records of the checkpoint block"
        );
        Ok(())
    }

    async fn replay(
        &self,
        processor: &mut LedgerProcessor<S>,
        from: BlockNumber,
        to: BlockNumber,
    ) -> WatcherResult<()> {
        let chunk = self.config.replay_chunk_blocks.max(1);
        let mut start = from;
        loop {
            let end = start.saturating_add(chunk - 1).min(to);

            let membership = self.store.load_events(start, end).await?;
            let deposits = self
                .contract
                .past_events(EventKind::RevenueDeposited, start, end)
                .await?;
            let confirmations = self
                .contract
                .past_events(EventKind::CommitmentConfirmed, start, end)
                .await?;
            let merged = merge_event_streams([membership, deposits, confirmations])?;
            debug!(from = start, to = end, events = merged.len(), "[tc-04] Playback chunk");

            for event in merged {
                processor.apply_replayed(event).await?;
            }
            processor.advance_watermark(end);

            if end >= to {
                return Ok(());
            }
            start = end + 1;
        }
    }
}
