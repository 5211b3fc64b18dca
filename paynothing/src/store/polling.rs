//! Live feed emulated by re-querying a snapshot source.

use async_trait::async_trait;
use log::{debug, warn};
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, time::MissedTickBehavior};

use super::traits::{MessageFeed, SnapshotSource, Subscription};
use crate::error::Result;
use crate::models::{Message, UserId};

/// Turns a [`SnapshotSource`] into a [`MessageFeed`] by polling it.
///
/// A snapshot is delivered only when it differs from the previous one. Failed
/// polls are logged and retried on the next tick.
#[derive(Debug)]
pub struct PollingFeed<S: ?Sized> {
    source: Arc<S>,
    interval: Duration,
}

impl<S: ?Sized> PollingFeed<S> {
    /// Create a feed polling `source` every `interval`.
    pub fn new(source: Arc<S>, interval: Duration) -> Self {
        Self { source, interval }
    }
}

// Snapshot order is not meaningful; compare by id so reordering is not a change.
fn normalize(mut snapshot: Vec<Message>) -> Vec<Message> {
    snapshot.sort_by(|a, b| a.id.cmp(&b.id));
    snapshot
}

#[async_trait]
impl<S: SnapshotSource + ?Sized + 'static> MessageFeed for PollingFeed<S> {
    async fn subscribe(&self, user: &UserId) -> Result<Subscription> {
        let first = normalize(self.source.snapshot(user).await?);
        let (tx, rx) = watch::channel(first);

        let source = self.source.clone();
        let user = user.clone();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let task = tokio::spawn(async move {
            // The first tick completes immediately; the initial snapshot is already out.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = tx.closed() => break,
                }
                match source.snapshot(&user).await {
                    Ok(snapshot) => {
                        let snapshot = normalize(snapshot);
                        let changed = tx.send_if_modified(|current| {
                            if *current == snapshot {
                                false
                            } else {
                                *current = snapshot;
                                true
                            }
                        });
                        if changed {
                            debug!("new message snapshot for {}", user);
                        }
                    }
                    Err(e) => warn!("polling messages for {} failed: {}", user, e),
                }
            }
            debug!("polling for {} stopped", user);
        });

        Ok(Subscription::with_task(rx, task))
    }
}
