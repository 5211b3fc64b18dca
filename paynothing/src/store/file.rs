//! Store persisted as a JSON fixture file.

use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};

use super::memory::MemoryStore;
use super::traits::{MessageSink, ProfileLookup, SnapshotSource};
use crate::error::Result;
use crate::models::{Message, MessageId, NewMessage, UserId, UserProfile};

/// A [`MemoryStore`] loaded from and saved back to a JSON file per operation.
///
/// The file uses the [`Fixture`](super::Fixture) layout. A missing file reads
/// as an empty store. Pair it with [`PollingFeed`](super::PollingFeed) to pick
/// up changes written by other processes.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Use the fixture file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file into a fresh in-memory store.
    pub async fn load(&self) -> Result<MemoryStore> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => MemoryStore::from_json(&json),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} does not exist yet", self.path.display());
                Ok(MemoryStore::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write `store` back, replacing the file atomically.
    pub async fn save(&self, store: &MemoryStore) -> Result<()> {
        let json = serde_json::to_string_pretty(&store.fixture())?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotSource for FileStore {
    async fn snapshot(&self, user: &UserId) -> Result<Vec<Message>> {
        self.load().await?.snapshot(user).await
    }
}

#[async_trait]
impl ProfileLookup for FileStore {
    async fn profile(&self, user: &UserId) -> Result<Option<UserProfile>> {
        self.load().await?.profile(user).await
    }
}

#[async_trait]
impl MessageSink for FileStore {
    async fn send(&self, message: NewMessage) -> Result<MessageId> {
        let store = self.load().await?;
        let id = store.send(message).await?;
        self.save(&store).await?;
        Ok(id)
    }

    async fn mark_read(&self, ids: &[MessageId]) -> Result<()> {
        let store = self.load().await?;
        store.mark_read(ids).await?;
        self.save(&store).await
    }
}
