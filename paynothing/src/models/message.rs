//! Direct message models.

use serde::{Deserialize, Serialize};

use super::{ConversationId, MessageId, UserId, CONVERSATION_SEPARATOR};
use crate::error::{Error, Result};

/// A direct message as stored in the `messages` collection.
///
/// Records are append-only; only `read` changes after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Document ID.
    #[serde(default)]
    pub id: MessageId,
    /// Pairwise conversation key.
    pub conversation_id: ConversationId,
    /// Author of the message.
    pub sender_id: UserId,
    /// Recipient of the message.
    #[serde(default)]
    pub receiver_id: UserId,
    /// Both participants, stored for membership queries.
    #[serde(default)]
    pub participants: Vec<UserId>,
    /// Display name the sender had when sending, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_username: Option<String>,
    /// Message body.
    pub text: String,
    /// Sender clock, milliseconds since epoch.
    pub timestamp: i64,
    /// Whether the recipient has seen the message.
    #[serde(default)]
    pub read: bool,
}

impl Message {
    /// Whether `user` is listed as a participant.
    ///
    /// Records without a participant list are accepted; the conversation key
    /// decides membership for them.
    pub fn involves(&self, user: &UserId) -> bool {
        self.participants.is_empty() || self.participants.contains(user)
    }

    /// Whether this message is unread from the point of view of `reader`.
    pub fn is_unread_for(&self, reader: &UserId) -> bool {
        !self.read && self.sender_id != *reader
    }
}

/// A validated message that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub participants: Vec<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_username: Option<String>,
    pub text: String,
    pub timestamp: i64,
    pub read: bool,
}

impl NewMessage {
    /// Compose an outgoing message.
    ///
    /// Rejects blank text, messages addressed to the sender, and user IDs
    /// containing the conversation key separator.
    pub fn compose(
        sender: &UserId,
        receiver: &UserId,
        text: impl Into<String>,
        timestamp: i64,
    ) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "Message content cannot be empty".into(),
            ));
        }
        if sender.is_empty() || receiver.is_empty() {
            return Err(Error::InvalidArgument(
                "Sender and recipient are required".into(),
            ));
        }
        if [sender, receiver]
            .iter()
            .any(|id| id.as_str().contains(CONVERSATION_SEPARATOR))
        {
            return Err(Error::InvalidArgument(format!(
                "User IDs cannot contain '{}'",
                CONVERSATION_SEPARATOR
            )));
        }
        if sender == receiver {
            return Err(Error::InvalidArgument(
                "Cannot send a message to yourself".into(),
            ));
        }

        Ok(Self {
            conversation_id: ConversationId::between(sender, receiver),
            sender_id: sender.clone(),
            receiver_id: receiver.clone(),
            participants: vec![sender.clone(), receiver.clone()],
            sender_username: None,
            text,
            timestamp,
            read: false,
        })
    }

    /// Compose an outgoing message stamped with the local clock.
    pub fn compose_now(
        sender: &UserId,
        receiver: &UserId,
        text: impl Into<String>,
    ) -> Result<Self> {
        Self::compose(sender, receiver, text, chrono::Utc::now().timestamp_millis())
    }

    /// Record the sender's display name on the message.
    pub fn with_sender_username(mut self, username: impl Into<String>) -> Self {
        self.sender_username = Some(username.into());
        self
    }

    /// Turn into a stored message once the backing store assigned an ID.
    pub fn into_message(self, id: MessageId) -> Message {
        Message {
            id,
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            participants: self.participants,
            sender_username: self.sender_username,
            text: self.text,
            timestamp: self.timestamp,
            read: self.read,
        }
    }
}
