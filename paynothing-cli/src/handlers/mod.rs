//! Shared command logic returning serializable results.

pub mod inbox;
pub mod message;
