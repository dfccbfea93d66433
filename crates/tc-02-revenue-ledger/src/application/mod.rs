//! # Application Layer
//!
//! The revenue ledger state machine.

pub mod ledger;

pub use ledger::RevenueLedger;
