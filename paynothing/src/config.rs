//! Inbox tuning knobs.

use std::time::Duration;

use crate::models::UNKNOWN_USERNAME;

/// Configuration shared by the username resolver and live feeds.
#[derive(Debug, Clone)]
pub struct InboxConfig {
    /// Shown when a counterpart's username cannot be resolved.
    pub placeholder_username: String,
    /// Upper bound on a single profile lookup.
    pub lookup_timeout: Duration,
    /// How long a resolved username stays cached.
    pub username_ttl: Duration,
    /// Re-query interval for feeds without push delivery.
    pub poll_interval: Duration,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            placeholder_username: UNKNOWN_USERNAME.to_owned(),
            lookup_timeout: Duration::from_secs(5),
            username_ttl: Duration::from_secs(600),
            poll_interval: Duration::from_secs(3),
        }
    }
}

impl InboxConfig {
    /// Set the placeholder username.
    pub fn placeholder_username(mut self, name: impl Into<String>) -> Self {
        self.placeholder_username = name.into();
        self
    }

    /// Set the profile lookup timeout.
    pub fn lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Set the username cache TTL.
    pub fn username_ttl(mut self, ttl: Duration) -> Self {
        self.username_ttl = ttl;
        self
    }

    /// Set the polling interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
