//! # Ports
//!
//! Outbound persistence port for checkpoints, full state and raw events.

pub mod outbound;

pub use outbound::{CheckpointKey, LedgerStore};
