//! Data models for inbox entities.

mod conversation;
mod ids;
mod message;
mod user;

pub use conversation::{ConversationDraft, ConversationSummary};
pub use ids::{ConversationId, MessageId, UserId, CONVERSATION_SEPARATOR};
pub use message::{Message, NewMessage};
pub use user::{UserProfile, UNKNOWN_USERNAME};
