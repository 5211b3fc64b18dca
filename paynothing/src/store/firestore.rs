//! Collaborator contracts backed by the Firestore REST client.

use async_trait::async_trait;

use super::traits::{MessageSink, ProfileLookup, SnapshotSource};
use crate::client::FirestoreClient;
use crate::error::Result;
use crate::models::{ConversationId, Message, MessageId, NewMessage, UserId, UserProfile};

#[async_trait]
impl ProfileLookup for FirestoreClient {
    async fn profile(&self, user: &UserId) -> Result<Option<UserProfile>> {
        self.users().get(user).await
    }
}

#[async_trait]
impl MessageSink for FirestoreClient {
    async fn send(&self, message: NewMessage) -> Result<MessageId> {
        self.messages().send(message).await
    }

    async fn mark_read(&self, ids: &[MessageId]) -> Result<()> {
        self.messages().mark_read(ids).await
    }
}

#[async_trait]
impl SnapshotSource for FirestoreClient {
    async fn snapshot(&self, user: &UserId) -> Result<Vec<Message>> {
        self.messages().for_participant(user).await
    }

    async fn conversation(&self, conversation: &ConversationId) -> Result<Vec<Message>> {
        self.messages().conversation(conversation).await
    }
}
