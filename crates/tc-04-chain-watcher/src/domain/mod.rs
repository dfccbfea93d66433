//! # Domain Module
//!
//! Watcher errors, lifecycle phases, roles, alerts and inbound notifications.

pub mod errors;
pub mod value_objects;

pub use errors::*;
pub use value_objects::*;
