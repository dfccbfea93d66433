//! # Watcher Handle
//!
//! Caller-facing side of a running watcher. Reads come from watch channels
//! or oneshot replies; nothing here touches the ledger directly.
//!
//! Dropping the last handle stops the processing loop.

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::{Address, Hash};
use tc_02_revenue_ledger::{CheckpointKey, LedgerSnapshot, LedgerStore, MemberProof};
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::processing::Query;
use crate::domain::{WatcherAlert, WatcherError, WatcherPhase, WatcherResult};
use crate::ports::LedgerQueryApi;

enum LoopState {
    Running(JoinHandle<WatcherResult<()>>),
    Finished(WatcherResult<()>),
}

/// Handle to a running [`ChainWatcher`](super::ChainWatcher).
pub struct WatcherHandle {
    queries: mpsc::Sender<Query>,
    snapshots: watch::Receiver<LedgerSnapshot>,
    phase: watch::Receiver<WatcherPhase>,
    alerts: broadcast::Sender<WatcherAlert>,
    shutdown: watch::Sender<bool>,
    store: Arc<dyn LedgerStore>,
    task: Mutex<LoopState>,
}

impl WatcherHandle {
    pub(crate) fn new(
        queries: mpsc::Sender<Query>,
        snapshots: watch::Receiver<LedgerSnapshot>,
        phase: watch::Receiver<WatcherPhase>,
        alerts: broadcast::Sender<WatcherAlert>,
        shutdown: watch::Sender<bool>,
        store: Arc<dyn LedgerStore>,
        task: JoinHandle<WatcherResult<()>>,
    ) -> Self {
        Self {
            queries,
            snapshots,
            phase,
            alerts,
            shutdown,
            store,
            task: Mutex::new(LoopState::Running(task)),
        }
    }

    /// Latest ledger snapshot.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every published snapshot.
    pub fn watch_snapshots(&self) -> watch::Receiver<LedgerSnapshot> {
        self.snapshots.clone()
    }

    /// Current phase.
    pub fn phase(&self) -> WatcherPhase {
        *self.phase.borrow()
    }

    /// Receiver notified on every phase change.
    pub fn watch_phase(&self) -> watch::Receiver<WatcherPhase> {
        self.phase.clone()
    }

    /// Operator alert stream.
    pub fn subscribe_alerts(&self) -> broadcast::Receiver<WatcherAlert> {
        self.alerts.subscribe()
    }

    /// Withdrawal proof. Historical references the loop no longer holds are
    /// served from the store.
    pub async fn proof(
        &self,
        address: Address,
        external_ref: Option<u64>,
    ) -> WatcherResult<MemberProof> {
        let (reply, response) = oneshot::channel();
        self.request(Query::Proof {
            address,
            external_ref,
            reply,
        })
        .await?;
        match response.await.map_err(|_| WatcherError::Stopped)? {
            Err(WatcherError::CheckpointNotFound { external_ref }) => {
                debug!(external_ref, "[tc-04] Checkpoint not in memory, loading from store");
                let checkpoint = self
                    .store
                    .load_checkpoint(CheckpointKey::External(external_ref))
                    .await?
                    .ok_or(WatcherError::CheckpointNotFound { external_ref })?;
                Ok(checkpoint.proof(&address)?)
            }
            other => other,
        }
    }

    /// Digest of the live member set.
    pub async fn digest(&self) -> WatcherResult<Hash> {
        let (reply, response) = oneshot::channel();
        self.request(Query::Digest { reply }).await?;
        response.await.map_err(|_| WatcherError::Stopped)?
    }

    /// Request shutdown and wait for the loop. Idempotent: later calls return
    /// the same terminal result.
    pub async fn stop(&self) -> WatcherResult<()> {
        self.shutdown.send_replace(true);
        self.wait().await
    }

    /// Wait for the loop to end without requesting shutdown.
    pub async fn wait(&self) -> WatcherResult<()> {
        let mut task = self.task.lock().await;
        if let LoopState::Running(join) = &mut *task {
            let result = match join.await {
                Ok(result) => result,
                Err(e) => {
                    error!(error = %e, "[tc-04] Processing loop panicked");
                    Err(WatcherError::Stopped)
                }
            };
            *task = LoopState::Finished(result);
        }
        match &*task {
            LoopState::Finished(result) => result.clone(),
            LoopState::Running(_) => Err(WatcherError::Stopped),
        }
    }

    async fn request(&self, query: Query) -> WatcherResult<()> {
        self.queries
            .send(query)
            .await
            .map_err(|_| WatcherError::Stopped)
    }
}

#[async_trait]
impl LedgerQueryApi for WatcherHandle {
    fn snapshot(&self) -> LedgerSnapshot {
        WatcherHandle::snapshot(self)
    }

    fn phase(&self) -> WatcherPhase {
        WatcherHandle::phase(self)
    }

    async fn proof(&self, address: Address, external_ref: Option<u64>) -> WatcherResult<MemberProof> {
        WatcherHandle::proof(self, address, external_ref).await
    }

    async fn digest(&self) -> WatcherResult<Hash> {
        WatcherHandle::digest(self).await
    }
}
