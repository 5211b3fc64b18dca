//! Live inbox: recompute conversation summaries on every snapshot.

use log::{debug, warn};
use serde::Serialize;
use std::sync::Arc;
use tokio::{
    sync::watch,
    task::{JoinHandle, JoinSet},
};

use super::{aggregate::aggregate, resolve::UsernameResolver};
use crate::error::Result;
use crate::models::{ConversationSummary, UserId};
use crate::store::MessageFeed;

/// A published inbox state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InboxView {
    /// Number of the snapshot this view was computed from. `0` before the first.
    pub generation: u64,
    /// Conversations, newest first.
    pub conversations: Vec<ConversationSummary>,
}

/// Publish `view` unless a newer generation is already showing.
///
/// Username lookups make recomputations finish out of order; this keeps a slow
/// stale computation from overwriting a fresher result.
fn publish(tx: &watch::Sender<InboxView>, view: InboxView) -> bool {
    tx.send_if_modified(|current| {
        if view.generation > current.generation {
            *current = view;
            true
        } else {
            debug!(
                "dropping inbox generation {} (showing {})",
                view.generation, current.generation
            );
            false
        }
    })
}

/// Handle to a running live inbox. Dropping it stops the inbox.
#[derive(Debug)]
pub struct LiveInbox {
    user: UserId,
    updates: watch::Receiver<InboxView>,
    driver: JoinHandle<()>,
}

impl LiveInbox {
    /// Subscribe to `user`'s messages and keep an inbox view up to date.
    ///
    /// Every snapshot triggers a full recomputation (fold, then username
    /// resolution). Recomputations run concurrently.
    pub async fn start(
        feed: &dyn MessageFeed,
        resolver: Arc<UsernameResolver>,
        user: UserId,
    ) -> Result<Self> {
        let mut subscription = feed.subscribe(&user).await?;
        let (tx, rx) = watch::channel(InboxView::default());
        let tx = Arc::new(tx);
        let me = user.clone();

        let driver = tokio::spawn(async move {
            let mut generation = 0u64;
            let mut running = JoinSet::new();

            loop {
                tokio::select! {
                    snapshot = subscription.recv() => {
                        let Some(snapshot) = snapshot else {
                            debug!("message feed for {} closed", me);
                            break;
                        };
                        generation += 1;

                        let tx = tx.clone();
                        let resolver = resolver.clone();
                        let me = me.clone();
                        running.spawn(async move {
                            let drafts = aggregate(&snapshot, &me);
                            let conversations = resolver.resolve(drafts).await;
                            publish(&tx, InboxView { generation, conversations });
                        });
                    }
                    Some(joined) = running.join_next(), if !running.is_empty() => {
                        if let Err(e) = joined {
                            warn!("inbox recomputation for {} failed: {}", me, e);
                        }
                    }
                }
            }

            while let Some(joined) = running.join_next().await {
                if let Err(e) = joined {
                    warn!("inbox recomputation for {} failed: {}", me, e);
                }
            }
        });

        Ok(Self {
            user,
            updates: rx,
            driver,
        })
    }

    /// The user whose inbox this is.
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// A receiver notified whenever a newer view is published.
    pub fn updates(&self) -> watch::Receiver<InboxView> {
        self.updates.clone()
    }

    /// The latest published view.
    pub fn current(&self) -> InboxView {
        self.updates.borrow().clone()
    }

    /// Stop recomputing and unsubscribe from the feed.
    pub fn stop(self) {}
}

impl Drop for LiveInbox {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Message, NewMessage, UserProfile};
    use crate::store::{MemoryStore, MessageSink, ProfileLookup};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn summary(username: &str) -> ConversationSummary {
        ConversationSummary {
            counterpart_username: username.into(),
            ..Default::default()
        }
    }

    async fn wait_for(rx: &mut watch::Receiver<InboxView>, generation: u64) -> InboxView {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if rx.borrow_and_update().generation >= generation {
                    return rx.borrow().clone();
                }
                rx.changed().await.expect("inbox stopped");
            }
        })
        .await
        .expect("inbox did not reach generation")
    }

    #[test]
    fn test_publish_drops_stale_generations() {
        let (tx, rx) = watch::channel(InboxView::default());

        assert!(publish(&tx, InboxView { generation: 2, conversations: vec![summary("new")] }));
        assert!(!publish(&tx, InboxView { generation: 1, conversations: vec![summary("old")] }));
        assert!(!publish(&tx, InboxView { generation: 2, conversations: Vec::new() }));

        let view = rx.borrow().clone();
        assert_eq!(view.generation, 2);
        assert_eq!(view.conversations[0].counterpart_username, "new");
    }

    #[tokio::test]
    async fn test_live_inbox_follows_store() {
        let store = Arc::new(MemoryStore::new());
        store.put_user(UserProfile::new("u2", "casey"));
        let resolver = Arc::new(UsernameResolver::new(store.clone()));

        let inbox = LiveInbox::start(store.as_ref(), resolver, "u1".into())
            .await
            .unwrap();
        let mut rx = inbox.updates();
        assert!(wait_for(&mut rx, 1).await.conversations.is_empty());

        let hello = NewMessage::compose(&"u2".into(), &"u1".into(), "hello", 1000).unwrap();
        let id = store.send(hello).await.unwrap();

        let view = wait_for(&mut rx, 2).await;
        assert_eq!(view.conversations.len(), 1);
        assert_eq!(view.conversations[0].counterpart_username, "casey");
        assert_eq!(view.conversations[0].unread_count, 1);

        store.mark_read(&[id]).await.unwrap();
        let view = wait_for(&mut rx, 3).await;
        assert_eq!(view.conversations[0].unread_count, 0);
        assert_eq!(inbox.current(), view);
    }

    #[tokio::test]
    async fn test_stop_unsubscribes() {
        let store = Arc::new(MemoryStore::new());
        let resolver = Arc::new(UsernameResolver::new(store.clone()));
        let inbox = LiveInbox::start(store.as_ref(), resolver, "u1".into())
            .await
            .unwrap();
        assert_eq!(store.subscriber_count(), 1);

        inbox.stop();
        tokio::time::timeout(Duration::from_secs(5), async {
            while store.subscriber_count() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    /// Profile lookups where the very first call blocks until released.
    struct GatedProfiles {
        gate: Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ProfileLookup for GatedProfiles {
        async fn profile(&self, user: &UserId) -> crate::error::Result<Option<UserProfile>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.gate.notified().await;
            }
            Ok(Some(UserProfile::new(user.clone(), format!("name-{}", user))))
        }
    }

    #[tokio::test]
    async fn test_slow_stale_computation_does_not_overwrite() {
        let store = Arc::new(MemoryStore::new());
        store.insert(Message {
            id: "m1".into(),
            conversation_id: "u1_u2".into(),
            sender_id: "u2".into(),
            text: "first".into(),
            timestamp: 100,
            ..Default::default()
        });

        let profiles = Arc::new(GatedProfiles {
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let resolver = Arc::new(UsernameResolver::new(profiles.clone()));
        let inbox = LiveInbox::start(store.as_ref(), resolver, "u1".into())
            .await
            .unwrap();
        let mut rx = inbox.updates();

        // Generation 1 is now stuck resolving u2.
        tokio::time::timeout(Duration::from_secs(5), async {
            while profiles.calls.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        store.insert(Message {
            id: "m2".into(),
            conversation_id: "u1_u3".into(),
            sender_id: "u3".into(),
            text: "second".into(),
            timestamp: 200,
            ..Default::default()
        });
        let fresh = wait_for(&mut rx, 2).await;
        assert_eq!(fresh.conversations.len(), 2);

        profiles.gate.notify_one();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let shown = inbox.current();
        assert_eq!(shown.generation, 2);
        assert_eq!(shown, fresh);
    }
}
