//! Collaborator contracts for the backing store.

use async_trait::async_trait;
use tokio::{sync::watch, task::JoinHandle};

use crate::error::{Error, Result};
use crate::inbox::conversation_thread;
use crate::models::{ConversationId, Message, MessageId, NewMessage, UserId, UserProfile};

/// Looks up user profiles by ID.
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    /// Fetch a profile. `Ok(None)` means the user has no profile document.
    async fn profile(&self, user: &UserId) -> Result<Option<UserProfile>>;
}

/// Writes messages to the store.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Store a new message and return the assigned ID.
    async fn send(&self, message: NewMessage) -> Result<MessageId>;

    /// Set the `read` flag on the given messages.
    async fn mark_read(&self, ids: &[MessageId]) -> Result<()>;
}

/// One-shot message queries.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Every message `user` participates in.
    async fn snapshot(&self, user: &UserId) -> Result<Vec<Message>>;

    /// Every message stored under one conversation key, oldest first.
    ///
    /// Unlike [`snapshot`](Self::snapshot) this also finds records written
    /// without a participant list. The default filters the snapshot of the
    /// key's first participant.
    async fn conversation(&self, conversation: &ConversationId) -> Result<Vec<Message>> {
        let (first, _) = conversation.participants().ok_or_else(|| {
            Error::InvalidArgument(format!("Malformed conversation key {}", conversation))
        })?;
        let snapshot = self.snapshot(&first).await?;
        Ok(conversation_thread(&snapshot, conversation))
    }
}

/// Push-based delivery of full message snapshots.
#[async_trait]
pub trait MessageFeed: Send + Sync {
    /// Subscribe to every message `user` participates in.
    ///
    /// The current snapshot is delivered first, then one snapshot per change.
    async fn subscribe(&self, user: &UserId) -> Result<Subscription>;
}

/// A live subscription to message snapshots.
///
/// Snapshots that arrive faster than they are received coalesce into the
/// latest one. Dropping the subscription unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: watch::Receiver<Vec<Message>>,
    primed: bool,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wrap a snapshot channel. Its current value is delivered first.
    pub fn new(rx: watch::Receiver<Vec<Message>>) -> Self {
        Self {
            rx,
            primed: true,
            task: None,
        }
    }

    /// Wrap a snapshot channel fed by a task that lives as long as the subscription.
    pub fn with_task(rx: watch::Receiver<Vec<Message>>, task: JoinHandle<()>) -> Self {
        Self {
            rx,
            primed: true,
            task: Some(task),
        }
    }

    /// Wait for the next snapshot. `None` once the source has gone away.
    pub async fn recv(&mut self) -> Option<Vec<Message>> {
        if self.primed {
            self.primed = false;
        } else {
            self.rx.changed().await.ok()?;
        }
        Some(self.rx.borrow_and_update().clone())
    }

    /// Stop receiving snapshots.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<Message>);

    #[async_trait]
    impl SnapshotSource for Fixed {
        async fn snapshot(&self, user: &UserId) -> Result<Vec<Message>> {
            Ok(self.0.iter().filter(|m| m.involves(user)).cloned().collect())
        }
    }

    fn message(id: &str, conversation: &str, ts: i64) -> Message {
        Message {
            id: id.into(),
            conversation_id: conversation.into(),
            timestamp: ts,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_default_conversation_query() {
        let source = Fixed(vec![
            message("2", "u1_u2", 20),
            message("9", "u1_u3", 15),
            message("1", "u1_u2", 10),
        ]);

        let thread = source.conversation(&"u1_u2".into()).await.unwrap();
        let ids: Vec<&str> = thread.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);

        let err = source.conversation(&"u1".into()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_first_snapshot_is_immediate() {
        let (tx, rx) = watch::channel(vec![Message::default()]);
        let mut sub = Subscription::new(rx);

        assert_eq!(sub.recv().await.map(|s| s.len()), Some(1));

        tx.send_replace(Vec::new());
        assert_eq!(sub.recv().await.map(|s| s.len()), Some(0));
    }

    #[tokio::test]
    async fn test_closed_source_ends_subscription() {
        let (tx, rx) = watch::channel(Vec::new());
        let mut sub = Subscription::new(rx);
        assert!(sub.recv().await.is_some());

        drop(tx);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_bursts_coalesce() {
        let (tx, rx) = watch::channel(Vec::new());
        let mut sub = Subscription::new(rx);
        sub.recv().await;

        for n in 1..=3 {
            tx.send_replace(vec![Message::default(); n]);
        }
        assert_eq!(sub.recv().await.map(|s| s.len()), Some(3));
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_feeding_task() {
        let (_tx, rx) = watch::channel(Vec::new());
        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _done = done_tx;
            std::future::pending::<()>().await;
        });

        Subscription::with_task(rx, task).unsubscribe();
        assert!(done_rx.await.is_err());
    }
}
