//! In-process backing store.

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};
use tokio::sync::watch;

use super::traits::{MessageFeed, MessageSink, ProfileLookup, SnapshotSource, Subscription};
use crate::error::{Error, Result};
use crate::models::{Message, MessageId, NewMessage, UserId, UserProfile};

/// Seed data for a [`MemoryStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub users: Vec<UserProfile>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Messages and profiles held in memory, with live snapshot delivery.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    messages: Vec<Message>,
    users: HashMap<UserId, UserProfile>,
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

#[derive(Debug)]
struct Subscriber {
    user: UserId,
    tx: watch::Sender<Vec<Message>>,
}

impl State {
    fn assign_id(&mut self) -> MessageId {
        loop {
            self.next_id += 1;
            let id = MessageId::new(format!("m{:06}", self.next_id));
            if !self.messages.iter().any(|m| m.id == id) {
                return id;
            }
        }
    }

    fn push(&mut self, mut message: Message) -> MessageId {
        if message.id.is_empty() {
            message.id = self.assign_id();
        }
        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    /// Push fresh snapshots to every live subscriber in `affected`.
    fn notify(&mut self, affected: &[UserId]) {
        self.subscribers.retain(|s| !s.tx.is_closed());
        for sub in &self.subscribers {
            if affected.contains(&sub.user) {
                sub.tx.send_replace(snapshot_for(&self.messages, &sub.user));
            }
        }
    }
}

/// Membership query: the participant list when present, else the conversation key.
fn is_member(message: &Message, user: &UserId) -> bool {
    if message.participants.is_empty() {
        message
            .conversation_id
            .participants()
            .is_some_and(|(a, b)| a == *user || b == *user)
    } else {
        message.participants.contains(user)
    }
}

fn snapshot_for(messages: &[Message], user: &UserId) -> Vec<Message> {
    messages
        .iter()
        .filter(|m| is_member(m, user))
        .cloned()
        .collect()
}

fn members(message: &Message) -> Vec<UserId> {
    if !message.participants.is_empty() {
        return message.participants.clone();
    }
    message
        .conversation_id
        .participants()
        .map(|(a, b)| vec![a, b])
        .unwrap_or_default()
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with users and messages.
    pub fn from_fixture(fixture: Fixture) -> Self {
        let store = Self::new();
        {
            let mut state = store.lock();
            for user in fixture.users {
                state.users.insert(user.id.clone(), user);
            }
            for message in fixture.messages {
                state.push(message);
            }
        }
        store
    }

    /// Parse a JSON fixture (`{"users": [...], "messages": [...]}`).
    pub fn from_json(json: &str) -> Result<Self> {
        let fixture: Fixture = serde_json::from_str(json)?;
        Ok(Self::from_fixture(fixture))
    }

    /// Add or replace a user profile.
    pub fn put_user(&self, profile: UserProfile) {
        self.lock().users.insert(profile.id.clone(), profile);
    }

    /// Insert a message record as-is, notifying subscribers.
    ///
    /// Unlike [`MessageSink::send`] this performs no validation.
    pub fn insert(&self, message: Message) -> MessageId {
        let mut state = self.lock();
        let affected = members(&message);
        let id = state.push(message);
        state.notify(&affected);
        id
    }

    /// Export users and messages in fixture form.
    pub fn fixture(&self) -> Fixture {
        let state = self.lock();
        let mut users: Vec<UserProfile> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Fixture {
            users,
            messages: state.messages.clone(),
        }
    }

    /// Every stored message.
    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        let mut state = self.lock();
        state.subscribers.retain(|s| !s.tx.is_closed());
        state.subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ProfileLookup for MemoryStore {
    async fn profile(&self, user: &UserId) -> Result<Option<UserProfile>> {
        Ok(self.lock().users.get(user).cloned())
    }
}

#[async_trait]
impl MessageSink for MemoryStore {
    async fn send(&self, message: NewMessage) -> Result<MessageId> {
        let mut state = self.lock();
        let id = state.assign_id();
        let message = message.into_message(id.clone());
        let affected = members(&message);
        state.push(message);
        state.notify(&affected);
        Ok(id)
    }

    async fn mark_read(&self, ids: &[MessageId]) -> Result<()> {
        let mut state = self.lock();
        let mut affected: Vec<UserId> = Vec::new();

        if let Some(missing) = ids
            .iter()
            .find(|id| !state.messages.iter().any(|m| m.id == **id))
        {
            return Err(Error::backend("404", format!("No message {}", missing)));
        }

        for id in ids {
            let Some(message) = state.messages.iter_mut().find(|m| m.id == *id) else {
                continue;
            };
            if message.read {
                continue;
            }
            message.read = true;
            for member in members(message) {
                if !affected.contains(&member) {
                    affected.push(member);
                }
            }
        }

        if !affected.is_empty() {
            state.notify(&affected);
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotSource for MemoryStore {
    async fn snapshot(&self, user: &UserId) -> Result<Vec<Message>> {
        Ok(snapshot_for(&self.lock().messages, user))
    }
}

#[async_trait]
impl MessageFeed for MemoryStore {
    async fn subscribe(&self, user: &UserId) -> Result<Subscription> {
        let mut state = self.lock();
        let (tx, rx) = watch::channel(snapshot_for(&state.messages, user));
        state.subscribers.push(Subscriber {
            user: user.clone(),
            tx,
        });
        debug!("{} subscribed to message snapshots", user);
        Ok(Subscription::new(rx))
    }
}
