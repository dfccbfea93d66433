//! # Processing Loop
//!
//! [`LedgerProcessor`] is the only code that mutates the ledger. Startup
//! drives it through replay with awaited persistence; afterwards [`run`]
//! moves it into the live loop where persistence is fire-and-forget.
//!
//! Live writes go through one queue drained by a single worker task, so
//! they reach the store in the order the ledger issued them.

use std::sync::Arc;

use shared_types::{format_address, format_hash, short_hash, Address, BlockNumber, ChainEvent, Hash};
use tally_telemetry::{
    record_checkpoint, record_event_applied, record_persistence_failure, record_reorg,
    set_last_processed_block, set_member_counts,
};
use tc_02_revenue_ledger::{
    Checkpoint, LedgerError, LedgerSnapshot, LedgerState, LedgerStore, MemberProof, RevenueLedger,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::{
    ChainNotification, MembershipChange, WatcherAlert, WatcherError, WatcherPhase, WatcherResult,
    WatcherRole,
};
use crate::ports::{MembershipFeed, RootContract};

/// Request answered by the loop.
pub(crate) enum Query {
    Proof {
        address: Address,
        external_ref: Option<u64>,
        reply: oneshot::Sender<WatcherResult<MemberProof>>,
    },
    Digest {
        reply: oneshot::Sender<WatcherResult<Hash>>,
    },
}

/// Store write issued from the live path.
enum WriteJob {
    State(LedgerState),
    Event {
        block_number: BlockNumber,
        event: ChainEvent,
    },
    Checkpoint(Arc<Checkpoint>),
}

impl WriteJob {
    fn operation(&self) -> &'static str {
        match self {
            WriteJob::State(_) => "save_ledger_state",
            WriteJob::Event { .. } => "save_event",
            WriteJob::Checkpoint(_) => "save_checkpoint",
        }
    }
}

/// Applies queued writes one at a time, in issue order. Failures are
/// reported and the next job proceeds.
async fn persistence_worker<S>(
    store: Arc<S>,
    mut jobs: mpsc::UnboundedReceiver<WriteJob>,
    alerts: broadcast::Sender<WatcherAlert>,
) where
    S: LedgerStore + 'static,
{
    while let Some(job) = jobs.recv().await {
        let operation = job.operation();
        let result = match job {
            WriteJob::State(state) => store.save_ledger_state(&state).await,
            WriteJob::Event {
                block_number,
                event,
            } => store.save_event(block_number, &event).await,
            WriteJob::Checkpoint(checkpoint) => store.save_checkpoint(&checkpoint).await,
        };
        if let Err(e) = result {
            warn!(operation, error = %e, "[tc-04] Persistence failed; store is behind memory");
            record_persistence_failure(operation);
            let _ = alerts.send(WatcherAlert::PersistenceFailed {
                operation,
                reason: e.to_string(),
            });
        }
    }
    debug!("[tc-04] Persistence queue closed");
}

/// Owns the ledger and applies events to it.
pub(crate) struct LedgerProcessor<S> {
    ledger: RevenueLedger,
    store: Arc<S>,
    role: WatcherRole,
    alerts: broadcast::Sender<WatcherAlert>,
    snapshots: watch::Sender<LedgerSnapshot>,
    writes: Option<mpsc::UnboundedSender<WriteJob>>,
    writer: Option<JoinHandle<()>>,
    /// Live events at or below this block were already replayed.
    live_floor: BlockNumber,
}

impl<S> LedgerProcessor<S>
where
    S: LedgerStore + 'static,
{
    pub(crate) fn new(
        ledger: RevenueLedger,
        store: Arc<S>,
        role: WatcherRole,
        alerts: broadcast::Sender<WatcherAlert>,
        snapshots: watch::Sender<LedgerSnapshot>,
    ) -> Self {
        let (writes, jobs) = mpsc::unbounded_channel();
        let writer = tokio::spawn(persistence_worker(
            Arc::clone(&store),
            jobs,
            alerts.clone(),
        ));
        Self {
            ledger,
            store,
            role,
            alerts,
            snapshots,
            writes: Some(writes),
            writer: Some(writer),
            live_floor: 0,
        }
    }

    pub(crate) fn ledger(&self) -> &RevenueLedger {
        &self.ledger
    }

    /// Move the watermark to the end of a replayed window.
    pub(crate) fn advance_watermark(&mut self, block_number: BlockNumber) {
        self.ledger.advance_watermark(block_number);
    }

    /// Mark replay complete up to `head`.
    pub(crate) fn caught_up(&mut self, head: BlockNumber) {
        self.ledger.advance_watermark(head);
        self.live_floor = head;
        self.publish();
    }

    /// Push a fresh snapshot to readers and refresh gauges.
    pub(crate) fn publish(&self) {
        set_last_processed_block(self.ledger.last_processed_block());
        set_member_counts(self.ledger.active_count(), self.ledger.inactive_count());
        self.snapshots.send_replace(self.ledger.snapshot());
    }

    // =========================================================================
    // REPLAY (awaited persistence, errors are fatal)
    // =========================================================================

    pub(crate) async fn apply_replayed(&mut self, event: ChainEvent) -> WatcherResult<()> {
        let kind = event.kind();
        match event {
            ChainEvent::RevenueDeposited {
                amount,
                block_number,
            } => {
                self.ledger.advance_watermark(block_number);
                let distribution = self.ledger.add_revenue(amount)?;
                debug!(
                    block_number,
                    amount = %amount,
                    share = %distribution.share,
                    "[tc-04] Playback: tokens received"
                );
            }
            ChainEvent::MemberJoined {
                members,
                block_number,
            } => {
                self.ledger.advance_watermark(block_number);
                self.ledger.add_members(members);
            }
            ChainEvent::MemberParted {
                members,
                block_number,
            } => {
                self.ledger.advance_watermark(block_number);
                self.ledger.remove_members(members);
            }
            ChainEvent::CommitmentConfirmed {
                external_ref,
                digest,
                block_number,
                ..
            } => {
                self.ledger.advance_watermark(block_number);
                match self.ledger.store_block(external_ref, block_number) {
                    Ok(checkpoint) => {
                        self.store.save_checkpoint(&checkpoint).await?;
                        record_checkpoint();
                        self.check_digest(&checkpoint, digest);
                    }
                    Err(LedgerError::DuplicateCheckpoint { .. }) => {
                        debug!(external_ref, "[tc-04] Playback: checkpoint already held");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        record_event_applied(kind.as_str());
        Ok(())
    }

    // =========================================================================
    // LIVE (fire-and-forget persistence, errors isolated per event)
    // =========================================================================

    /// Apply a chain notification. Only a reorg is returned as an error.
    pub(crate) fn apply_chain(&mut self, notification: ChainNotification) -> WatcherResult<()> {
        match notification {
            ChainNotification::Retracted(event) => {
                let block_number = event.block_number();
                if block_number <= self.ledger.last_processed_block() {
                    error!(
                        block_number,
                        kind = event.kind().as_str(),
                        "[tc-04] Event removed in re-org; halting"
                    );
                    record_reorg();
                    let _ = self.alerts.send(WatcherAlert::ChainReorg { block_number });
                    return Err(WatcherError::ChainReorg { block_number });
                }
                warn!(block_number, "[tc-04] Retraction of an unapplied event ignored");
                Ok(())
            }
            ChainNotification::Event(event) => {
                let block_number = event.block_number();
                if block_number <= self.live_floor {
                    debug!(block_number, "[tc-04] Live event already replayed, skipping");
                    return Ok(());
                }
                if !self.role.applies_live(event.kind()) {
                    debug!(
                        block_number,
                        kind = event.kind().as_str(),
                        role = ?self.role,
                        "[tc-04] Live event not handled by this role"
                    );
                    return Ok(());
                }
                self.apply_live_event(event);
                self.publish();
                Ok(())
            }
        }
    }

    fn apply_live_event(&mut self, event: ChainEvent) {
        let kind = event.kind();
        match event {
            ChainEvent::RevenueDeposited {
                amount,
                block_number,
            } => {
                self.ledger.advance_watermark(block_number);
                match self.ledger.add_revenue(amount) {
                    Ok(distribution) => {
                        info!(
                            block_number,
                            amount = %amount,
                            recipients = distribution.recipients,
                            "[tc-04] {} tokens received",
                            amount
                        );
                        record_event_applied(kind.as_str());
                    }
                    Err(e) => self.reject(block_number, e),
                }
                self.persist_state();
            }
            ChainEvent::CommitmentConfirmed {
                external_ref,
                digest,
                block_number,
                ..
            } => {
                self.ledger.advance_watermark(block_number);
                match self.ledger.store_block(external_ref, block_number) {
                    Ok(checkpoint) => {
                        record_checkpoint();
                        record_event_applied(kind.as_str());
                        self.check_digest(&checkpoint, digest);
                        self.persist_checkpoint(checkpoint);
                        self.persist_state();
                    }
                    Err(LedgerError::DuplicateCheckpoint { .. }) => {
                        warn!(external_ref, "[tc-04] Confirmation for an existing checkpoint");
                    }
                    Err(e) => self.reject(block_number, e),
                }
            }
            ChainEvent::MemberJoined { members, .. } => {
                self.apply_membership(MembershipChange::Join(members));
            }
            ChainEvent::MemberParted { members, .. } => {
                self.apply_membership(MembershipChange::Part(members));
            }
        }
    }

    /// Apply a join/part batch, tagged with the current watermark.
    pub(crate) fn apply_membership(&mut self, change: MembershipChange) {
        let block_number = self.ledger.last_processed_block();
        let (changed, event) = match change {
            MembershipChange::Join(members) => {
                let added = self.ledger.add_members(members);
                info!(
                    block_number,
                    "[tc-04] Added or activated {} new member(s) at block {}",
                    added.len(),
                    block_number
                );
                (added.len(), ChainEvent::joined(added, block_number))
            }
            MembershipChange::Part(members) => {
                let removed = self.ledger.remove_members(members);
                info!(
                    block_number,
                    "[tc-04] De-activated {} member(s) at block {}",
                    removed.len(),
                    block_number
                );
                (removed.len(), ChainEvent::parted(removed, block_number))
            }
        };
        if changed == 0 {
            return;
        }
        record_event_applied(event.kind().as_str());
        self.persist_event(block_number, event);
        self.publish();
    }

    fn check_digest(&self, checkpoint: &Checkpoint, published: Hash) {
        if checkpoint.digest == published {
            debug!(
                external_ref = checkpoint.external_ref,
                digest = %short_hash(&published),
                "[tc-04] Published digest matches"
            );
            return;
        }
        warn!(
            external_ref = checkpoint.external_ref,
            published = %format_hash(&published),
            local = %format_hash(&checkpoint.digest),
            "[tc-04] Published digest differs from local state"
        );
        let _ = self.alerts.send(WatcherAlert::DigestMismatch {
            external_ref: checkpoint.external_ref,
            published,
            local: checkpoint.digest,
        });
    }

    fn reject(&self, block_number: BlockNumber, err: LedgerError) {
        error!(block_number, error = %err, "[tc-04] Ledger rejected live event");
        let _ = self.alerts.send(WatcherAlert::EventRejected {
            block_number,
            reason: err.to_string(),
        });
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub(crate) fn answer(&mut self, query: Query) {
        match query {
            Query::Proof {
                address,
                external_ref,
                reply,
            } => {
                let result = self
                    .ledger
                    .get_proof(&address, external_ref)
                    .map_err(WatcherError::from);
                if let Err(e) = &result {
                    debug!(member = %format_address(&address), error = %e, "[tc-04] Proof query failed");
                }
                let _ = reply.send(result);
            }
            Query::Digest { reply } => {
                let _ = reply.send(self.ledger.digest().map_err(WatcherError::from));
            }
        }
    }

    // =========================================================================
    // FIRE-AND-FORGET PERSISTENCE
    // =========================================================================

    fn persist_state(&self) {
        self.queue(WriteJob::State(self.ledger.to_state()));
    }

    fn persist_event(&self, block_number: BlockNumber, event: ChainEvent) {
        self.queue(WriteJob::Event {
            block_number,
            event,
        });
    }

    fn persist_checkpoint(&self, checkpoint: Arc<Checkpoint>) {
        self.queue(WriteJob::Checkpoint(checkpoint));
    }

    fn queue(&self, job: WriteJob) {
        let operation = job.operation();
        let sent = self
            .writes
            .as_ref()
            .map(|writes| writes.send(job).is_ok())
            .unwrap_or(false);
        if !sent {
            warn!(operation, "[tc-04] Persistence queue closed, write dropped");
            record_persistence_failure(operation);
        }
    }

    /// Close the write queue and wait until every queued write has run.
    pub(crate) async fn drain(&mut self) {
        self.writes.take();
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.await {
                warn!(error = %e, "[tc-04] Persistence worker aborted");
            }
        }
    }
}

/// Receivers and signals consumed by [`run`].
pub(crate) struct LoopChannels {
    pub(crate) chain: mpsc::Receiver<ChainNotification>,
    pub(crate) membership: mpsc::Receiver<MembershipChange>,
    pub(crate) queries: mpsc::Receiver<Query>,
    pub(crate) shutdown: watch::Receiver<bool>,
    pub(crate) phase: watch::Sender<WatcherPhase>,
}

/// The live loop. Ends on shutdown (`Ok`) or reorg (`Err`).
pub(crate) async fn run<C, F, S>(
    mut processor: LedgerProcessor<S>,
    contract: Arc<C>,
    feed: Arc<F>,
    channels: LoopChannels,
) -> WatcherResult<()>
where
    C: RootContract + 'static,
    F: MembershipFeed + 'static,
    S: LedgerStore + 'static,
{
    let LoopChannels {
        chain: mut chain_rx,
        membership: mut membership_rx,
        queries: mut query_rx,
        shutdown: mut shutdown_rx,
        phase,
    } = channels;
    let mut chain_open = true;
    let mut feed_open = true;

    let outcome = loop {
        tokio::select! {
            biased;

            // Err: every handle is gone, nobody can stop us later
            _ = shutdown_rx.changed() => {
                info!("[tc-04] Shutdown requested");
                break Ok(());
            }

            Some(query) = query_rx.recv() => processor.answer(query),

            notification = chain_rx.recv(), if chain_open => match notification {
                Some(notification) => {
                    if let Err(e) = processor.apply_chain(notification) {
                        break Err(e);
                    }
                }
                None => {
                    warn!("[tc-04] Chain subscription closed");
                    chain_open = false;
                }
            },

            change = membership_rx.recv(), if feed_open => match change {
                Some(change) => processor.apply_membership(change),
                None => {
                    warn!("[tc-04] Membership feed closed");
                    feed_open = false;
                }
            },
        }
    };

    if outcome.is_err() {
        phase.send_replace(WatcherPhase::Halted);
    }

    contract.unsubscribe().await;
    feed.close().await;
    processor.drain().await;

    if outcome.is_ok() {
        phase.send_replace(WatcherPhase::Stopped);
    }
    info!(
        last_processed_block = processor.ledger().last_processed_block(),
        version = processor.ledger().version(),
        "[tc-04] Watcher loop ended"
    );
    outcome
}
