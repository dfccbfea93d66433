//! In-memory `LedgerStore` for tests and ephemeral runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{BlockNumber, ChainEvent};

use crate::domain::{Checkpoint, LedgerState, PersistenceError};
use crate::ports::{CheckpointKey, LedgerStore};

/// In-memory checkpoint store with write-failure injection.
pub struct InMemoryLedgerStore {
    /// Keyed by external reference.
    checkpoints: RwLock<BTreeMap<u64, Checkpoint>>,
    state: RwLock<Option<LedgerState>>,
    events: RwLock<Vec<(BlockNumber, ChainEvent)>>,
    fail_writes: AtomicBool,
    state_writes: AtomicUsize,
}

impl InMemoryLedgerStore {
    /// Empty store.
    pub fn new() -> Self {
        Self {
            checkpoints: RwLock::new(BTreeMap::new()),
            state: RwLock::new(None),
            events: RwLock::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            state_writes: AtomicUsize::new(0),
        }
    }

    /// Make every subsequent write fail with `Unavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `save_ledger_state` calls.
    pub fn state_writes(&self) -> usize {
        self.state_writes.load(Ordering::SeqCst)
    }

    /// Number of stored checkpoints.
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.read().len()
    }

    /// Every stored raw event.
    pub fn events(&self) -> Vec<(BlockNumber, ChainEvent)> {
        self.events.read().clone()
    }

    fn check_writable(&self, operation: &'static str) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable { operation });
        }
        Ok(())
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn load_checkpoint(&self, key: CheckpointKey) -> Result<Option<Checkpoint>, PersistenceError> {
        let checkpoints = self.checkpoints.read();
        let found = match key {
            CheckpointKey::External(external_ref) => checkpoints.get(&external_ref),
            CheckpointKey::Sequence(sequence) => {
                checkpoints.values().find(|cp| cp.sequence == sequence)
            }
            CheckpointKey::Latest => checkpoints.values().max_by_key(|cp| cp.sequence),
        };
        Ok(found.cloned())
    }

    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        self.check_writable("save_checkpoint")?;
        self.checkpoints
            .write()
            .insert(checkpoint.external_ref, checkpoint.clone());
        Ok(())
    }

    async fn save_ledger_state(&self, state: &LedgerState) -> Result<(), PersistenceError> {
        self.check_writable("save_ledger_state")?;
        *self.state.write() = Some(state.clone());
        self.state_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_ledger_state(&self) -> Result<Option<LedgerState>, PersistenceError> {
        Ok(self.state.read().clone())
    }

    async fn save_event(&self, block_number: BlockNumber, event: &ChainEvent) -> Result<(), PersistenceError> {
        self.check_writable("save_event")?;
        let mut events = self.events.write();
        // a retried save lands right after the original
        if events.last().map_or(false, |(b, e)| *b == block_number && e == event) {
            return Ok(());
        }
        events.push((block_number, event.clone()));
        Ok(())
    }

    async fn load_events(
        &self,
        from: BlockNumber,
        to: BlockNumber,
    ) -> Result<Vec<ChainEvent>, PersistenceError> {
        let mut selected: Vec<(BlockNumber, ChainEvent)> = self
            .events
            .read()
            .iter()
            .filter(|(block, _)| (from..=to).contains(block))
            .cloned()
            .collect();
        // stable: insertion order kept within a block
        selected.sort_by_key(|(block, _)| *block);
        Ok(selected.into_iter().map(|(_, event)| event).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::U256;

    fn checkpoint(sequence: u64, external_ref: u64) -> Checkpoint {
        Checkpoint::new(sequence, external_ref, 10 * external_ref, Vec::new(), U256::zero()).unwrap()
    }

    #[tokio::test]
    async fn test_checkpoint_lookup_by_key() {
        let store = InMemoryLedgerStore::new();
        store.save_checkpoint(&checkpoint(0, 5)).await.unwrap();
        store.save_checkpoint(&checkpoint(1, 9)).await.unwrap();

        let latest = store.load_checkpoint(CheckpointKey::Latest).await.unwrap().unwrap();
        assert_eq!(latest.external_ref, 9);
        let by_seq = store.load_checkpoint(CheckpointKey::Sequence(0)).await.unwrap().unwrap();
        assert_eq!(by_seq.external_ref, 5);
        assert!(store
            .load_checkpoint(CheckpointKey::External(6))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_events_inclusive_range_and_order() {
        let store = InMemoryLedgerStore::new();
        store.save_event(5, &ChainEvent::joined(vec![[1u8; 20]], 5)).await.unwrap();
        store.save_event(3, &ChainEvent::joined(vec![[2u8; 20]], 3)).await.unwrap();
        store.save_event(5, &ChainEvent::parted(vec![[1u8; 20]], 5)).await.unwrap();
        store.save_event(8, &ChainEvent::joined(vec![[3u8; 20]], 8)).await.unwrap();

        let events = store.load_events(3, 5).await.unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].block_number(), 3);
        assert_eq!(events[1], ChainEvent::joined(vec![[1u8; 20]], 5));
        assert_eq!(events[2], ChainEvent::parted(vec![[1u8; 20]], 5));
    }

    #[tokio::test]
    async fn test_retried_event_save_is_idempotent() {
        let store = InMemoryLedgerStore::new();
        let event = ChainEvent::joined(vec![[1u8; 20]], 2);
        store.save_event(2, &event).await.unwrap();
        store.save_event(2, &event).await.unwrap();
        assert_eq!(store.events().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = InMemoryLedgerStore::new();
        store.set_fail_writes(true);
        let err = store.save_ledger_state(&LedgerState::default()).await.unwrap_err();
        assert_eq!(err.operation(), "save_ledger_state");
        assert_eq!(store.state_writes(), 0);

        store.set_fail_writes(false);
        store.save_ledger_state(&LedgerState::default()).await.unwrap();
        assert_eq!(store.state_writes(), 1);
        assert!(store.load_ledger_state().await.unwrap().is_some());
    }
}
