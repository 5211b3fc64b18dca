//! Counterpart username resolution.

use futures::future::join_all;
use log::{debug, warn};
use std::sync::Arc;

use crate::cache::{CacheStorage, CacheStorageExt, MemoryCache};
use crate::config::InboxConfig;
use crate::models::{ConversationDraft, ConversationSummary, UserId};
use crate::store::ProfileLookup;

const CACHE_PREFIX: &str = "username/";

fn cache_key(user: &UserId) -> String {
    format!("{}{}", CACHE_PREFIX, user)
}

/// Resolves counterpart usernames through a profile lookup and a cache.
///
/// Resolution never fails: missing profiles, errors and timeouts all yield
/// the configured placeholder. Only successful lookups are cached.
pub struct UsernameResolver {
    profiles: Arc<dyn ProfileLookup>,
    cache: Arc<dyn CacheStorage>,
    config: InboxConfig,
}

impl std::fmt::Debug for UsernameResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsernameResolver")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish()
    }
}

impl UsernameResolver {
    /// Create a resolver with an in-memory cache and default settings.
    pub fn new(profiles: Arc<dyn ProfileLookup>) -> Self {
        Self {
            profiles,
            cache: Arc::new(MemoryCache::new()),
            config: InboxConfig::default(),
        }
    }

    /// Use a different cache.
    pub fn with_cache(mut self, cache: Arc<dyn CacheStorage>) -> Self {
        self.cache = cache;
        self
    }

    /// Use different settings.
    pub fn with_config(mut self, config: InboxConfig) -> Self {
        self.config = config;
        self
    }

    /// The placeholder used for unresolved users.
    pub fn placeholder(&self) -> &str {
        &self.config.placeholder_username
    }

    /// Resolve one username.
    pub async fn username(&self, user: &UserId) -> String {
        let key = cache_key(user);
        if let Some(name) = self.cache.get_json::<String>(&key).await {
            return name;
        }

        let lookup = self.profiles.profile(user);
        match tokio::time::timeout(self.config.lookup_timeout, lookup).await {
            Ok(Ok(Some(profile))) => match profile.display_name() {
                Some(name) => {
                    let name = name.to_owned();
                    if let Err(e) = self
                        .cache
                        .set_json(&key, &name, Some(self.config.username_ttl))
                        .await
                    {
                        warn!("could not cache username for {}: {}", user, e);
                    }
                    name
                }
                None => {
                    debug!("profile of {} has no username", user);
                    self.placeholder().to_owned()
                }
            },
            Ok(Ok(None)) => {
                debug!("no profile for {}", user);
                self.placeholder().to_owned()
            }
            Ok(Err(e)) => {
                warn!("username lookup for {} failed: {}", user, e);
                self.placeholder().to_owned()
            }
            Err(_) => {
                warn!(
                    "username lookup for {} timed out after {:?}",
                    user, self.config.lookup_timeout
                );
                self.placeholder().to_owned()
            }
        }
    }

    /// Attach usernames to drafts, looking all counterparts up concurrently.
    ///
    /// Returns once every lookup has settled; order is preserved.
    pub async fn resolve(&self, drafts: Vec<ConversationDraft>) -> Vec<ConversationSummary> {
        let names = join_all(drafts.iter().map(|d| self.username(&d.counterpart_id))).await;
        drafts
            .into_iter()
            .zip(names)
            .map(|(draft, name)| draft.with_username(name))
            .collect()
    }

    /// Drop the cached username of one user.
    pub async fn forget(&self, user: &UserId) {
        self.cache.remove(&cache_key(user)).await;
    }

    /// Drop every cached username.
    pub async fn clear(&self) {
        let dropped = self.cache.remove_prefix(CACHE_PREFIX).await;
        debug!("dropped {} cached usernames", dropped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::models::UserProfile;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Profiles {
        names: HashMap<String, String>,
        failing: Vec<String>,
        slow: Vec<String>,
        calls: AtomicUsize,
    }

    impl Profiles {
        fn with(mut self, id: &str, name: &str) -> Self {
            self.names.insert(id.into(), name.into());
            self
        }
    }

    #[async_trait]
    impl ProfileLookup for Profiles {
        async fn profile(&self, user: &UserId) -> Result<Option<UserProfile>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.slow.iter().any(|s| s == user.as_str()) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if self.failing.iter().any(|s| s == user.as_str()) {
                return Err(Error::backend("503", "unavailable"));
            }
            Ok(self
                .names
                .get(user.as_str())
                .map(|n| UserProfile::new(user.clone(), n.clone())))
        }
    }

    fn draft(who: &str, ts: i64) -> ConversationDraft {
        ConversationDraft {
            conversation_id: format!("me_{}", who).into(),
            counterpart_id: who.into(),
            last_message_text: "x".into(),
            last_message_timestamp: ts,
            unread_count: 0,
        }
    }

    #[tokio::test]
    async fn test_resolve_preserves_order_and_degrades() {
        let profiles = Profiles {
            failing: vec!["bad".into()],
            ..Default::default()
        }
        .with("u2", "casey")
        .with("blank", "   ");
        let resolver = UsernameResolver::new(Arc::new(profiles));

        let summaries = resolver
            .resolve(vec![
                draft("u2", 30),
                draft("ghost", 20),
                draft("bad", 10),
                draft("blank", 5),
            ])
            .await;

        let names: Vec<&str> = summaries
            .iter()
            .map(|s| s.counterpart_username.as_str())
            .collect();
        assert_eq!(names, vec!["casey", "Unknown User", "Unknown User", "Unknown User"]);
        assert_eq!(summaries[0].last_message_timestamp, 30);
    }

    #[tokio::test]
    async fn test_successful_lookups_are_cached() {
        let profiles = Arc::new(Profiles::default().with("u2", "casey"));
        let resolver = UsernameResolver::new(profiles.clone());

        assert_eq!(resolver.username(&"u2".into()).await, "casey");
        assert_eq!(resolver.username(&"u2".into()).await, "casey");
        assert_eq!(profiles.calls.load(Ordering::SeqCst), 1);

        resolver.forget(&"u2".into()).await;
        resolver.username(&"u2".into()).await;
        assert_eq!(profiles.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_misses_are_not_cached() {
        let profiles = Arc::new(Profiles::default());
        let resolver = UsernameResolver::new(profiles.clone());

        resolver.username(&"ghost".into()).await;
        resolver.username(&"ghost".into()).await;
        assert_eq!(profiles.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_only_touches_usernames() {
        let cache = Arc::new(MemoryCache::new());
        cache.set("other/key", b"1", None).await;
        let resolver = UsernameResolver::new(Arc::new(Profiles::default().with("u2", "casey")))
            .with_cache(cache.clone());

        resolver.username(&"u2".into()).await;
        assert_eq!(cache.len(), 2);

        resolver.clear().await;
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_lookup_times_out_to_placeholder() {
        let profiles = Profiles {
            slow: vec!["u3".into()],
            ..Default::default()
        }
        .with("u2", "casey")
        .with("u3", "never");
        let resolver = UsernameResolver::new(Arc::new(profiles)).with_config(
            InboxConfig::default()
                .lookup_timeout(Duration::from_secs(2))
                .placeholder_username("?"),
        );

        let summaries = resolver.resolve(vec![draft("u3", 2), draft("u2", 1)]).await;
        assert_eq!(summaries[0].counterpart_username, "?");
        assert_eq!(summaries[1].counterpart_username, "casey");
    }
}
