//! # JSON File Store
//!
//! Directory layout:
//!
//! ```text
//! <data_dir>/
//! ├── state.json              # latest LedgerState
//! ├── events.jsonl            # append-only raw event log
//! └── checkpoints/
//!     └── <external_ref>.json # one file per checkpoint
//! ```
//!
//! Whole-file writes go through a temp file and a rename so a crash never
//! leaves a half-written record behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{BlockNumber, ChainEvent};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::{Checkpoint, LedgerState, PersistenceError};
use crate::ports::{CheckpointKey, LedgerStore};

const STATE_FILE: &str = "state.json";
const EVENTS_FILE: &str = "events.jsonl";
const CHECKPOINT_DIR: &str = "checkpoints";

#[derive(Serialize, Deserialize, PartialEq)]
struct EventRecord {
    block_number: BlockNumber,
    event: ChainEvent,
}

/// File-backed `LedgerStore`.
pub struct JsonFileLedgerStore {
    root: PathBuf,
    /// Serialises appends to the event log.
    append_lock: Mutex<()>,
    /// Serialises state writes; holds the `(version, watermark)` last written.
    state_lock: Mutex<Option<(u64, BlockNumber)>>,
}

impl JsonFileLedgerStore {
    /// Open (creating if needed) a store rooted at `data_dir`.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let root = data_dir.into();
        fs::create_dir_all(root.join(CHECKPOINT_DIR))
            .await
            .map_err(|e| io_error("open", e))?;
        debug!(path = %root.display(), "[tc-02] file store opened");
        Ok(Self {
            root,
            append_lock: Mutex::new(()),
            state_lock: Mutex::new(None),
        })
    }

    /// Data directory.
    pub fn path(&self) -> &Path {
        &self.root
    }

    fn checkpoint_path(&self, external_ref: u64) -> PathBuf {
        self.root
            .join(CHECKPOINT_DIR)
            .join(format!("{external_ref}.json"))
    }

    async fn write_atomic(
        &self,
        path: &Path,
        bytes: Vec<u8>,
        operation: &'static str,
    ) -> Result<(), PersistenceError> {
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)
            .await
            .map_err(|e| io_error(operation, e))?;
        fs::rename(&tmp, path)
            .await
            .map_err(|e| io_error(operation, e))
    }

    async fn read_json<T>(path: &Path, operation: &'static str) -> Result<Option<T>, PersistenceError>
    where
        T: for<'de> Deserialize<'de>,
    {
        match fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| serde_error(operation, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(operation, e)),
        }
    }

    async fn all_checkpoints(&self) -> Result<Vec<Checkpoint>, PersistenceError> {
        let mut entries = fs::read_dir(self.root.join(CHECKPOINT_DIR))
            .await
            .map_err(|e| io_error("load_checkpoint", e))?;
        let mut checkpoints = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error("load_checkpoint", e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(checkpoint) = Self::read_json::<Checkpoint>(&path, "load_checkpoint").await? {
                checkpoints.push(checkpoint);
            }
        }
        Ok(checkpoints)
    }
}

fn io_error(operation: &'static str, err: std::io::Error) -> PersistenceError {
    PersistenceError::Io {
        operation,
        reason: err.to_string(),
    }
}

fn serde_error(operation: &'static str, err: serde_json::Error) -> PersistenceError {
    PersistenceError::Serialization {
        operation,
        reason: err.to_string(),
    }
}

#[async_trait]
impl LedgerStore for JsonFileLedgerStore {
    async fn load_checkpoint(&self, key: CheckpointKey) -> Result<Option<Checkpoint>, PersistenceError> {
        match key {
            CheckpointKey::External(external_ref) => {
                Self::read_json(&self.checkpoint_path(external_ref), "load_checkpoint").await
            }
            CheckpointKey::Sequence(sequence) => Ok(self
                .all_checkpoints()
                .await?
                .into_iter()
                .find(|cp| cp.sequence == sequence)),
            CheckpointKey::Latest => Ok(self
                .all_checkpoints()
                .await?
                .into_iter()
                .max_by_key(|cp| cp.sequence)),
        }
    }

    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        let bytes =
            serde_json::to_vec_pretty(checkpoint).map_err(|e| serde_error("save_checkpoint", e))?;
        self.write_atomic(
            &self.checkpoint_path(checkpoint.external_ref),
            bytes,
            "save_checkpoint",
        )
        .await
    }

    async fn save_ledger_state(&self, state: &LedgerState) -> Result<(), PersistenceError> {
        let position = (state.version, state.metadata.last_processed_block);
        let mut last_written = self.state_lock.lock().await;
        if last_written.is_some_and(|last| position < last) {
            debug!(
                version = state.version,
                "[tc-02] skipping state older than the one on disk"
            );
            return Ok(());
        }
        let bytes = serde_json::to_vec_pretty(state).map_err(|e| serde_error("save_ledger_state", e))?;
        self.write_atomic(&self.root.join(STATE_FILE), bytes, "save_ledger_state")
            .await?;
        *last_written = Some(position);
        Ok(())
    }

    async fn load_ledger_state(&self) -> Result<Option<LedgerState>, PersistenceError> {
        Self::read_json(&self.root.join(STATE_FILE), "load_ledger_state").await
    }

    async fn save_event(&self, block_number: BlockNumber, event: &ChainEvent) -> Result<(), PersistenceError> {
        let record = EventRecord {
            block_number,
            event: event.clone(),
        };
        let mut line = serde_json::to_vec(&record).map_err(|e| serde_error("save_event", e))?;
        line.push(b'\n');

        let _guard = self.append_lock.lock().await;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join(EVENTS_FILE))
            .await
            .map_err(|e| io_error("save_event", e))?;
        file.write_all(&line)
            .await
            .map_err(|e| io_error("save_event", e))?;
        file.flush().await.map_err(|e| io_error("save_event", e))
    }

    async fn load_events(
        &self,
        from: BlockNumber,
        to: BlockNumber,
    ) -> Result<Vec<ChainEvent>, PersistenceError> {
        let contents = match fs::read_to_string(self.root.join(EVENTS_FILE)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("load_events", e)),
        };

        let mut records: Vec<EventRecord> = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: EventRecord = match serde_json::from_str(line) {
                Ok(record) => record,
                Err(e) => {
                    // torn tail after a crash
                    warn!(line = index + 1, error = %e, "[tc-02] skipping unreadable event record");
                    continue;
                }
            };
            if !(from..=to).contains(&record.block_number) {
                continue;
            }
            // a retried save lands right after the original
            if records.last() == Some(&record) {
                continue;
            }
            records.push(record);
        }
        records.sort_by_key(|r| r.block_number);
        Ok(records.into_iter().map(|r| r.event).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Member, MemberStatus};
    use shared_types::U256;
    use tempfile::TempDir;

    async fn store() -> (TempDir, JsonFileLedgerStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonFileLedgerStore::open(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_checkpoint_survives_reopen() {
        let (dir, store) = store().await;
        let members = vec![
            Member::with_earnings([1u8; 20], 500u64, MemberStatus::Active),
            Member::with_earnings([2u8; 20], 500u64, MemberStatus::Inactive),
        ];
        let cp = Checkpoint::new(0, 3, 99, members, U256::one()).unwrap();
        store.save_checkpoint(&cp).await.unwrap();
        drop(store);

        let reopened = JsonFileLedgerStore::open(dir.path()).await.unwrap();
        let loaded = reopened
            .load_checkpoint(CheckpointKey::External(3))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, cp);
        assert!(loaded.proof(&[2u8; 20]).unwrap().verify());
    }

    #[tokio::test]
    async fn test_latest_is_highest_sequence() {
        let (_dir, store) = store().await;
        for (seq, ext) in [(0u64, 10u64), (2, 4), (1, 7)] {
            let cp = Checkpoint::new(seq, ext, ext, Vec::new(), U256::zero()).unwrap();
            store.save_checkpoint(&cp).await.unwrap();
        }
        let latest = store.load_checkpoint(CheckpointKey::Latest).await.unwrap().unwrap();
        assert_eq!(latest.sequence, 2);
        let by_seq = store.load_checkpoint(CheckpointKey::Sequence(1)).await.unwrap().unwrap();
        assert_eq!(by_seq.external_ref, 7);
    }

    #[tokio::test]
    async fn test_empty_store_loads_nothing() {
        let (_dir, store) = store().await;
        assert!(store.load_checkpoint(CheckpointKey::Latest).await.unwrap().is_none());
        assert!(store.load_ledger_state().await.unwrap().is_none());
        assert!(store.load_events(0, u64::MAX).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_state_overwrite() {
        let (_dir, store) = store().await;
        let mut state = LedgerState::default();
        store.save_ledger_state(&state).await.unwrap();
        state.version = 5;
        state.metadata.last_processed_block = 77;
        store.save_ledger_state(&state).await.unwrap();
        assert_eq!(store.load_ledger_state().await.unwrap(), Some(state.clone()));

        let mut stale = state.clone();
        stale.version = 4;
        store.save_ledger_state(&stale).await.unwrap();
        assert_eq!(store.load_ledger_state().await.unwrap(), Some(state));
    }

    #[tokio::test]
    async fn test_concurrent_state_writes_keep_newest() {
        let (_dir, store) = store().await;
        let store = std::sync::Arc::new(store);
        let mut tasks = tokio::task::JoinSet::new();
        for version in 1..=8u64 {
            let store = std::sync::Arc::clone(&store);
            tasks.spawn(async move {
                let mut state = LedgerState::default();
                state.version = version;
                store.save_ledger_state(&state).await
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }
        assert_eq!(store.load_ledger_state().await.unwrap().unwrap().version, 8);
    }

    #[tokio::test]
    async fn test_event_log_range_and_retry() {
        let (_dir, store) = store().await;
        let join = ChainEvent::joined(vec![[1u8; 20]], 4);
        store.save_event(4, &join).await.unwrap();
        store.save_event(4, &join).await.unwrap();
        store.save_event(6, &ChainEvent::parted(vec![[1u8; 20]], 6)).await.unwrap();
        store.save_event(9, &ChainEvent::joined(vec![[2u8; 20]], 9)).await.unwrap();

        let events = store.load_events(4, 6).await.unwrap();
        assert_eq!(events, vec![join, ChainEvent::parted(vec![[1u8; 20]], 6)]);
    }

    #[tokio::test]
    async fn test_torn_tail_is_skipped() {
        let (dir, store) = store().await;
        store.save_event(1, &ChainEvent::joined(vec![[1u8; 20]], 1)).await.unwrap();
        let path = dir.path().join(EVENTS_FILE);
        let mut contents = std::fs::read_to_string(&path).unwrap();
        contents.push_str("{\"block_number\":2,\"ev");
        std::fs::write(&path, contents).unwrap();

        assert_eq!(store.load_events(0, 10).await.unwrap().len(), 1);
    }
}
