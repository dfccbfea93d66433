//! # Tally-Chain Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks (commitment, merge, ledger)
//! └── src/integration/  # Cross-crate flows
//!     ├── restart.rs      # Watcher over the file store across restarts
//!     └── determinism.rs  # Independent replays agree on the digest
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p tc-tests
//! cargo bench -p tc-tests
//! ```

#![allow(dead_code)]

pub mod integration;
