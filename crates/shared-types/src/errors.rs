//! # Error Types
//!
//! Errors for parsing shared value types.

use thiserror::Error;

/// Errors produced while parsing an [`Address`](crate::Address).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    /// Not exactly 40 hex characters after the optional prefix.
    #[error("Invalid address length for {input:?}: {got} hex chars, expected 40")]
    InvalidLength { input: String, got: usize },

    /// Contains non-hex characters.
    #[error("Invalid hex in address {input:?}: {reason}")]
    InvalidHex { input: String, reason: String },
}
