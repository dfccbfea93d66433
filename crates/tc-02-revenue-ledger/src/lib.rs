//! # TC-02 Revenue Ledger
//!
//! Off-chain accounting engine: membership, equal-split revenue
//! distribution, commitment digests and historical checkpoints.
//!
//! **Subsystem ID:** 2  
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Member Lifecycle
//!
//! ```text
//! [absent] ──add──→ [active] ──remove──→ [inactive]
//!                      ↑                     │
//!                      └───────add───────────┘   (frozen earnings kept)
//! ```
//!
//! ## Accounting Invariant
//!
//! `Σ earnings (active + inactive) + remainder == Σ deposits applied`
//!
//! Revenue is split with integer division across active members; whatever
//! does not divide evenly is carried forward in `remainder` to the next
//! deposit. Nothing is ever lost, only deferred.
//!
//! ## Module Structure
//!
//! ```text
//! tc-02-revenue-ledger/
//! ├── domain/          # Member, Checkpoint, LedgerState, errors, invariants
//! ├── application/     # RevenueLedger (single-owner state machine)
//! ├── ports/           # LedgerStore (outbound persistence port)
//! └── adapters/        # InMemoryLedgerStore, JsonFileLedgerStore
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

pub use adapters::{InMemoryLedgerStore, JsonFileLedgerStore};
pub use application::RevenueLedger;
pub use domain::{
    invariant_accounting, Checkpoint, Distribution, LedgerError, LedgerMetadata, LedgerResult,
    LedgerSnapshot, LedgerState, Member, MemberProof, MemberStatus, PersistenceError,
};
pub use ports::{CheckpointKey, LedgerStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
