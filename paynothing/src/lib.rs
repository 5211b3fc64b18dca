//! Inbox client for the PayNothing marketplace.
//!
//! Folds the flat stream of direct messages a user takes part in into one
//! conversation summary per counterpart, and keeps that list current as the
//! backing store pushes new snapshots.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod inbox;
pub mod models;
pub mod parser;
pub mod session;
pub mod store;

// Re-export main types
pub use client::{AuthInfo, FirestoreClient, FirestoreClientBuilder, HttpConfig};
pub use config::InboxConfig;
pub use error::{Error, Result};
pub use session::Session;

// Re-export commonly used models
pub use models::{
    ConversationDraft, ConversationId, ConversationSummary, Message, MessageId, NewMessage,
    UserId, UserProfile, UNKNOWN_USERNAME,
};

// Re-export inbox and store types
pub use inbox::{load_inbox, InboxView, LiveInbox, UsernameResolver};
pub use store::{
    FileStore, Fixture, MemoryStore, MessageFeed, MessageSink, PollingFeed, ProfileLookup,
    SnapshotSource, Subscription,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let client = FirestoreClient::builder().project("demo").build();
        assert!(client.is_ok());

        let client = client.unwrap();
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_client_with_auth() {
        let client = FirestoreClient::builder()
            .project("demo")
            .auth("test_token", "u1")
            .build()
            .unwrap();

        assert!(client.is_authenticated());
        assert_eq!(client.current_uid().map(UserId::as_str), Some("u1"));
    }
}
