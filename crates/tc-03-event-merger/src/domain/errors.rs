//! Error types for the event merger.

use shared_types::BlockNumber;
use thiserror::Error;

/// Merge failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// An input stream went backwards in block number.
    #[error("Stream {stream} is not block-ordered: block {found} after block {previous}")]
    UnorderedStream {
        /// Index of the offending stream.
        stream: usize,
        /// Block of the previous event in that stream.
        previous: BlockNumber,
        /// Block of the out-of-order event.
        found: BlockNumber,
    },
}

/// Result type for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;
