//! # Ports
//!
//! - **Inbound**: `LedgerQueryApi` (what status surfaces and members call)
//! - **Outbound**: `RootContract`, `MembershipFeed` (external systems)

pub mod inbound;
pub mod outbound;

pub use inbound::LedgerQueryApi;
pub use outbound::{ChainEventSink, MembershipFeed, MembershipSink, RootContract};
