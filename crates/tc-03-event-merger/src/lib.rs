//! # TC-03 Event Merger
//!
//! Combines independently sourced event streams, each ordered by block
//! number, into one globally ordered sequence.
//!
//! **Subsystem ID:** 3  
//! **Architecture:** Pure algorithm crate (no I/O)
//!
//! ## Ordering Convention
//!
//! Merge key: `(block_number, priority, stream_index, position)`
//!
//! | Event | Priority |
//! |-------|----------|
//! | `MemberJoined` / `MemberParted` | 0 |
//! | `RevenueDeposited` | 1 |
//! | `CommitmentConfirmed` | 2 |
//!
//! Within a block, membership changes apply before deposits, and deposits
//! before confirmations, regardless of which source delivered first. Ties
//! fall back to stream index and then to position in the stream, so the
//! output depends only on the inputs.
//!
//! ## Complexity
//!
//! O(E log N) time over E events and N streams, O(N) auxiliary state: the
//! heap only ever holds the current head of each stream.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithms;
pub mod domain;

pub use algorithms::{merge_event_streams, EventMerger};
pub use domain::{event_priority, MergeError, MergeKey, MergeResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
