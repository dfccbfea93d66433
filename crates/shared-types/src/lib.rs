//! # Shared Types Crate
//!
//! Value types used across the Tally-Chain workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: identities, hashes, amounts and events that
//!   cross a crate boundary are defined here and nowhere else.
//! - **Immutable Facts**: a [`ChainEvent`] is never edited after it is
//!   observed; corrections arrive as new facts (or as a reorg notification).
//! - **EVM-compatible widths**: [`Address`] is 20 bytes, [`Hash`] is 32 bytes,
//!   amounts are 256-bit unsigned integers.

pub mod entities;
pub mod errors;
pub mod events;

pub use entities::*;
pub use errors::*;
pub use events::*;
