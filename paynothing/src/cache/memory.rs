//! In-memory cache implementation.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::{Duration, Instant},
};

use super::traits::CacheStorage;

/// Process-local cache with optional per-entry TTL.
#[derive(Debug, Default)]
pub struct MemoryCache {
    data: RwLock<HashMap<String, CacheEntry>>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(data: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            data,
            expires_at: ttl.map(|d| Instant::now() + d),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|e| Instant::now() > e)
    }
}

impl MemoryCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries.
    pub fn cleanup(&self) {
        self.write().retain(|_, v| !v.is_expired());
    }

    /// Number of entries, expired ones included until the next cleanup.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Every write is a single map call, so a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CacheStorage for MemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.read().get(key).and_then(|entry| {
            if entry.is_expired() {
                None
            } else {
                Some(entry.data.clone())
            }
        })
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) {
        self.write()
            .insert(key.to_owned(), CacheEntry::new(value.to_vec(), ttl));
    }

    async fn remove(&self, key: &str) {
        self.write().remove(key);
    }

    async fn clear(&self) {
        self.write().clear();
    }

    async fn scan_prefix(&self, prefix: &str) -> Vec<String> {
        self.read()
            .iter()
            .filter(|(k, v)| k.starts_with(prefix) && !v.is_expired())
            .map(|(k, _)| k.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_basic_operations() {
        let cache = MemoryCache::new();

        cache.set("username/u1", b"\"sam\"", None).await;
        assert_eq!(cache.get("username/u1").await, Some(b"\"sam\"".to_vec()));

        cache.remove("username/u1").await;
        assert_eq!(cache.get("username/u1").await, None);
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let cache = MemoryCache::new();

        cache
            .set("username/u2", b"\"casey\"", Some(Duration::from_millis(60)))
            .await;
        assert!(cache.get("username/u2").await.is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.get("username/u2").await.is_none());
        assert!(cache.scan_prefix("username/").await.is_empty());

        assert_eq!(cache.len(), 1);
        cache.cleanup();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = MemoryCache::new();

        cache.set("a", b"1", None).await;
        cache.set("b", b"2", None).await;
        cache.clear().await;

        assert!(cache.is_empty());
    }
}
