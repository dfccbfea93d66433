//! # Adapters
//!
//! In-process implementations of the outbound ports. They back the test
//! suite and local runs; a JSON-RPC chain client would live alongside them.

pub mod channel_feed;
pub mod in_memory_contract;

pub use channel_feed::{ChannelMembershipFeed, MembershipFeedController};
pub use in_memory_contract::InMemoryRootContract;
