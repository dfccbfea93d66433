//! # Adapters
//!
//! `LedgerStore` implementations.

pub mod json_file_store;
pub mod memory_store;

pub use json_file_store::JsonFileLedgerStore;
pub use memory_store::InMemoryLedgerStore;
