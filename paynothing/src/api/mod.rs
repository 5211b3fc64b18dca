//! API modules.

mod message;
mod user;

pub use message::{MessageApi, MESSAGES_COLLECTION};
pub use user::{UserApi, USERS_COLLECTION};
