//! Inbox: conversation aggregation, username resolution, live updates.

pub mod aggregate;
mod live;
mod resolve;

pub use aggregate::{aggregate, conversation_thread, total_unread, unread_to_mark};
pub use live::{InboxView, LiveInbox};
pub use resolve::UsernameResolver;

use crate::models::{ConversationSummary, UserId};
use crate::store::SnapshotSource;

/// Compute `user`'s inbox once: fetch, fold, resolve usernames.
pub async fn load_inbox(
    source: &dyn SnapshotSource,
    resolver: &UsernameResolver,
    user: &UserId,
) -> crate::error::Result<Vec<ConversationSummary>> {
    let snapshot = source.snapshot(user).await?;
    Ok(resolver.resolve(aggregate(&snapshot, user)).await)
}
