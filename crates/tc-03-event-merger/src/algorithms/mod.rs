//! Algorithms module for the event merger.

pub mod k_way_merge;

pub use k_way_merge::{merge_event_streams, EventMerger};
