//! Scriptable in-process root contract.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{Address, BlockNumber, ChainEvent, EventKind};
use tracing::debug;

use crate::domain::{ChainNotification, EventSourceError};
use crate::ports::{ChainEventSink, RootContract};

#[derive(Default)]
struct ChainState {
    head: BlockNumber,
    /// Deposits and confirmations in emission order.
    events: Vec<ChainEvent>,
}

/// Root contract whose history, head and live feed are driven by the caller.
pub struct InMemoryRootContract {
    address: Address,
    token_address: Address,
    commitment_interval: u64,
    deployed: AtomicBool,
    fail_queries: AtomicBool,
    chain: RwLock<ChainState>,
    sink: Mutex<Option<ChainEventSink>>,
    queries: Mutex<Vec<(EventKind, BlockNumber, BlockNumber)>>,
}

impl InMemoryRootContract {
    /// Deployed contract at `address` with a zero token and no freeze period.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            token_address: [0u8; 20],
            commitment_interval: 0,
            deployed: AtomicBool::new(true),
            fail_queries: AtomicBool::new(false),
            chain: RwLock::new(ChainState::default()),
            sink: Mutex::new(None),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Set the token address and freeze period reported at startup.
    pub fn with_token(mut self, token_address: Address, commitment_interval: u64) -> Self {
        self.token_address = token_address;
        self.commitment_interval = commitment_interval;
        self
    }

    /// Toggle whether code is deployed at the address.
    pub fn set_deployed(&self, deployed: bool) {
        self.deployed.store(deployed, Ordering::SeqCst);
    }

    /// Make every query fail.
    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Append a deposit or confirmation to history, moving the head up to
    /// its block, and deliver it to the live subscriber if any.
    pub async fn push_event(&self, event: ChainEvent) {
        {
            let mut chain = self.chain.write();
            chain.head = chain.head.max(event.block_number());
            chain.events.push(event.clone());
        }
        self.deliver(ChainNotification::Event(event)).await;
    }

    /// Move the head without emitting anything.
    pub fn advance_head(&self, block_number: BlockNumber) {
        let mut chain = self.chain.write();
        chain.head = chain.head.max(block_number);
    }

    /// Drop an event from history and notify the subscriber.
    pub async fn retract(&self, event: ChainEvent) {
        self.chain.write().events.retain(|e| *e != event);
        self.deliver(ChainNotification::Retracted(event)).await;
    }

    /// Current head.
    pub fn head(&self) -> BlockNumber {
        self.chain.read().head
    }

    /// Whether a live subscriber is attached.
    pub fn is_subscribed(&self) -> bool {
        self.sink.lock().is_some()
    }

    /// Every `(kind, from, to)` historical query served so far.
    pub fn past_event_queries(&self) -> Vec<(EventKind, BlockNumber, BlockNumber)> {
        self.queries.lock().clone()
    }

    async fn deliver(&self, notification: ChainNotification) {
        let sink = self.sink.lock().clone();
        if let Some(sink) = sink {
            if sink.send(notification).await.is_err() {
                debug!("[tc-04] live subscriber dropped");
            }
        }
    }

    fn check(&self, operation: &'static str) -> Result<(), EventSourceError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(EventSourceError::new(operation, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl RootContract for InMemoryRootContract {
    fn contract_address(&self) -> Address {
        self.address
    }

    async fn is_deployed(&self) -> Result<bool, EventSourceError> {
        self.check("is_deployed")?;
        Ok(self.deployed.load(Ordering::SeqCst))
    }

    async fn token_address(&self) -> Result<Address, EventSourceError> {
        self.check("token_address")?;
        Ok(self.token_address)
    }

    async fn commitment_interval(&self) -> Result<u64, EventSourceError> {
        self.check("commitment_interval")?;
        Ok(self.commitment_interval)
    }

    async fn block_number(&self) -> Result<BlockNumber, EventSourceError> {
        self.check("block_number")?;
        Ok(self.head())
    }

    async fn past_events(
        &self,
        kind: EventKind,
        from: BlockNumber,
        to: BlockNumber,
    ) -> Result<Vec<ChainEvent>, EventSourceError> {
        self.check("past_events")?;
        self.queries.lock().push((kind, from, to));
        let mut events: Vec<ChainEvent> = self
            .chain
            .read()
            .events
            .iter()
            .filter(|e| e.kind() == kind && (from..=to).contains(&e.block_number()))
            .cloned()
            .collect();
        events.sort_by_key(ChainEvent::block_number);
        Ok(events)
    }

    async fn subscribe(&self, sink: ChainEventSink) -> Result<(), EventSourceError> {
        self.check("subscribe")?;
        *self.sink.lock() = Some(sink);
        Ok(())
    }

    async fn unsubscribe(&self) {
        self.sink.lock().take();
    }
}
