//! # Application Layer
//!
//! Startup and replay (`service`), the single-owner processing loop
//! (`processing`), and the caller-facing handle (`handle`).

pub mod handle;
mod processing;
pub mod service;

pub use handle::WatcherHandle;
pub use service::ChainWatcher;
