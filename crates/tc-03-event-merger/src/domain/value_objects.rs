//! Merge key and intra-block priority.

use shared_types::{BlockNumber, EventKind};

/// Intra-block priority of an event kind. Lower applies first.
pub fn event_priority(kind: EventKind) -> u8 {
    match kind {
        EventKind::MemberJoined | EventKind::MemberParted => 0,
        EventKind::RevenueDeposited => 1,
        EventKind::CommitmentConfirmed => 2,
    }
}

/// Total order used by the merge heap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct MergeKey {
    /// Block number.
    pub block_number: BlockNumber,
    /// Kind priority within the block.
    pub priority: u8,
    /// Source stream index.
    pub stream: usize,
    /// Position within the source stream.
    pub position: usize,
}
