//! # TC-04 Chain Watcher
//!
//! Keeps the revenue ledger consistent with the root chain and the
//! membership feed: catch-up replay after downtime, then live processing.
//!
//! **Subsystem ID:** 4  
//! **Architecture:** Hexagonal (DDD + Ports/Adapters), single-owner actor loop
//!
//! ## Startup Sequence
//!
//! ```text
//! 1. contract identity check ─────────→ ConfigMismatch (fatal)
//! 2. token address + commitment interval
//! 3. seed ledger from latest checkpoint (or empty)
//! 4. open live subscriptions, read head, replay [watermark+1, head]
//! 5. persist ledger state
//! 6. phase = Live, spawn processing loop
//! ```
//!
//! ## Processing Loop
//!
//! ```text
//!   RootContract ──ChainNotification──┐
//!                                     ├──→ [loop: owns RevenueLedger] ──→ watch<LedgerSnapshot>
//!   MembershipFeed ─MembershipChange──┤              │                 ──→ broadcast<WatcherAlert>
//!                                     │              └──queue──→ persistence worker (ordered store writes)
//!   WatcherHandle ───Query + oneshot──┘
//! ```
//!
//! Exactly one task mutates the ledger. Readers get owned snapshots or
//! answers over oneshot channels, never references into live state.
//!
//! ## Durability Tradeoff
//!
//! Live persistence is not awaited. A failed write is logged, counted in
//! `tc_watcher_persistence_failures_total` and broadcast as
//! [`WatcherAlert::PersistenceFailed`]; processing continues. Writes made
//! during startup and replay are awaited and fatal on failure.
//!
//! ## Module Structure
//!
//! ```text
//! tc-04-chain-watcher/
//! ├── config.rs        # WatcherConfig (defaults, env overrides)
//! ├── domain/          # errors, phase, role, alerts, notifications
//! ├── ports/           # inbound LedgerQueryApi, outbound RootContract/MembershipFeed
//! ├── adapters/        # InMemoryRootContract, ChannelMembershipFeed
//! └── application/     # ChainWatcher startup, processing loop, WatcherHandle
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::{ChannelMembershipFeed, InMemoryRootContract, MembershipFeedController};
pub use application::{ChainWatcher, WatcherHandle};
pub use config::WatcherConfig;
pub use domain::{
    ChainNotification, EventSourceError, MembershipChange, WatcherAlert, WatcherError,
    WatcherPhase, WatcherResult, WatcherRole,
};
pub use ports::{ChainEventSink, LedgerQueryApi, MembershipFeed, MembershipSink, RootContract};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
