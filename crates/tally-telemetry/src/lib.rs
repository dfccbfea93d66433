//! # Tally Telemetry
//!
//! Logging initialisation and Prometheus metrics for the revenue ledger and
//! chain watcher.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_telemetry::{init_logging, register_metrics, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_logging(&config)?;
//! register_metrics()?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TC_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `TC_JSON_LOGS` | `false` | Emit JSON log lines |
//! | `TC_SERVICE_NAME` | `tally-chain` | Service name attached to log lines |

#![warn(missing_docs)]

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    gather_metrics, record_checkpoint, record_event_applied, record_persistence_failure,
    record_reorg, register_metrics, set_last_processed_block, set_member_counts,
    LEDGER_CHECKPOINTS, LEDGER_MEMBERS, WATCHER_EVENTS_APPLIED, WATCHER_LAST_PROCESSED_BLOCK,
    WATCHER_PERSISTENCE_FAILURES, WATCHER_REORGS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The log filter directive could not be parsed.
    #[error("Invalid log filter '{directive}': {reason}")]
    InvalidFilter {
        /// Offending directive.
        directive: String,
        /// Parser message.
        reason: String,
    },

    /// Registering or encoding metrics failed.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}
