//! # Domain Module
//!
//! Value types for the commitment primitive.

pub mod errors;
pub mod value_objects;

pub use errors::*;
pub use value_objects::*;
