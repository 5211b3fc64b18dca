//! Inbox conversation summaries.

use serde::{Deserialize, Serialize};

use super::{ConversationId, UserId};

/// One inbox row: the latest state of a conversation with one counterpart.
///
/// Always derived from the message set, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Pairwise conversation key.
    pub conversation_id: ConversationId,
    /// The other participant.
    pub counterpart_id: UserId,
    /// Resolved username, or a placeholder.
    pub counterpart_username: String,
    /// Text of the most recent message.
    pub last_message_text: String,
    /// Timestamp of the most recent message, ms since epoch.
    pub last_message_timestamp: i64,
    /// Messages from the counterpart not yet read.
    pub unread_count: u32,
}

impl ConversationSummary {
    /// Whether the conversation has anything unread.
    pub fn has_unread(&self) -> bool {
        self.unread_count > 0
    }
}

/// A conversation summary before the counterpart's username is known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversationDraft {
    pub conversation_id: ConversationId,
    pub counterpart_id: UserId,
    pub last_message_text: String,
    pub last_message_timestamp: i64,
    pub unread_count: u32,
}

impl ConversationDraft {
    /// Attach the resolved username.
    pub fn with_username(self, username: impl Into<String>) -> ConversationSummary {
        ConversationSummary {
            conversation_id: self.conversation_id,
            counterpart_id: self.counterpart_id,
            counterpart_username: username.into(),
            last_message_text: self.last_message_text,
            last_message_timestamp: self.last_message_timestamp,
            unread_count: self.unread_count,
        }
    }
}
