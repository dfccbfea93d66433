//! # Domain Module
//!
//! Core domain types for the revenue ledger.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod state;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use state::*;
