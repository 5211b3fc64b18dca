//! Cache storage trait definitions.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Error, Result};

/// Trait for cache storage backends.
#[async_trait]
pub trait CacheStorage: Send + Sync + std::fmt::Debug {
    /// Get a live value by key.
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Set a value with optional TTL.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>);

    /// Remove a value by key.
    async fn remove(&self, key: &str);

    /// Clear all cached values.
    async fn clear(&self);

    /// List live keys starting with `prefix`.
    async fn scan_prefix(&self, prefix: &str) -> Vec<String>;

    /// Remove every key starting with `prefix`, returning how many were dropped.
    async fn remove_prefix(&self, prefix: &str) -> usize {
        let keys = self.scan_prefix(prefix).await;
        for key in &keys {
            self.remove(key).await;
        }
        keys.len()
    }
}

/// Typed JSON access on top of any cache storage.
#[async_trait]
pub trait CacheStorageExt: CacheStorage {
    /// Get a JSON-deserialized value. Undecodable entries read as a miss.
    async fn get_json<T: serde::de::DeserializeOwned + Send>(&self, key: &str) -> Option<T> {
        let data = self.get(key).await?;
        serde_json::from_slice(&data).ok()
    }

    /// Set a JSON-serialized value.
    async fn set_json<T: serde::Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let data = serde_json::to_vec(value).map_err(|e| Error::Cache(e.to_string()))?;
        self.set(key, &data, ttl).await;
        Ok(())
    }
}

impl<T: CacheStorage + ?Sized> CacheStorageExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_json_through_trait_object() {
        let cache: Arc<dyn CacheStorage> = Arc::new(MemoryCache::new());

        cache
            .set_json("username/u2", &"casey".to_string(), None)
            .await
            .unwrap();
        let name: Option<String> = cache.get_json("username/u2").await;
        assert_eq!(name.as_deref(), Some("casey"));
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let cache = MemoryCache::new();
        cache.set("username/u3", b"\xff\xfe", None).await;

        let name: Option<String> = cache.get_json("username/u3").await;
        assert!(name.is_none());
    }

    #[tokio::test]
    async fn test_remove_prefix() {
        let cache = MemoryCache::new();
        cache.set("username/a", b"\"1\"", None).await;
        cache.set("username/b", b"\"2\"", None).await;
        cache.set("session/token", b"\"t\"", None).await;

        assert_eq!(cache.remove_prefix("username/").await, 2);
        assert!(cache.get("username/a").await.is_none());
        assert!(cache.get("session/token").await.is_some());
    }
}
