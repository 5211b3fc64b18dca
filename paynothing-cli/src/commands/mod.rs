//! Command implementations.

pub mod inbox;
pub mod message;
