//! Message handlers.

use anyhow::{Context, Result};
use colored::Colorize;
use paynothing::{
    inbox::{conversation_thread, unread_to_mark},
    ConversationId, Message, NewMessage, SnapshotSource, UserId,
};
use rust_i18n::t;
use serde::Serialize;

use crate::config::Backend;
use crate::output::{format_relative_time, PlainPrint, TableRow};

/// One message in a thread.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRow {
    pub id: String,
    pub from: String,
    pub from_uid: String,
    pub is_mine: bool,
    pub text: String,
    pub timestamp: i64,
    pub read: bool,
}

impl MessageRow {
    fn new(message: &Message, me: &UserId, counterpart_name: &str) -> Self {
        let is_mine = message.sender_id == *me;
        Self {
            id: message.id.to_string(),
            from: if is_mine {
                t!("you_label").to_string()
            } else {
                counterpart_name.to_string()
            },
            from_uid: message.sender_id.to_string(),
            is_mine,
            text: message.text.clone(),
            timestamp: message.timestamp,
            read: message.read,
        }
    }
}

impl TableRow for MessageRow {
    fn headers() -> Vec<&'static str> {
        vec!["From", "Text", "Time"]
    }
    fn row(&self) -> Vec<String> {
        vec![
            self.from.clone(),
            self.text.clone(),
            format_relative_time(self.timestamp),
        ]
    }
}

impl PlainPrint for MessageRow {
    fn plain_print(&self) {
        let from = if self.is_mine {
            self.from.green().to_string()
        } else {
            self.from.cyan().to_string()
        };
        println!("{} {}", from, format_relative_time(self.timestamp).dimmed());
        for line in self.text.lines() {
            if !line.trim().is_empty() {
                println!("   {}", line);
            }
        }
        println!();
    }
}

/// Conversation thread result.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadResult {
    pub conversation_id: String,
    pub counterpart_id: String,
    pub counterpart_username: String,
    /// Messages flagged as read by opening the thread.
    pub marked_read: usize,
    pub messages: Vec<MessageRow>,
}

/// Send message result.
#[derive(Debug, Clone, Serialize)]
pub struct SendResult {
    pub id: String,
    pub to: String,
    pub conversation_id: String,
}

/// Open the conversation with `with`, marking what the acting user received as read.
pub async fn read_thread(backend: &Backend, with: &str) -> Result<ThreadResult> {
    let counterpart = UserId::new(with);
    let conversation = ConversationId::between(&backend.user, &counterpart);
    let stored = backend.source.conversation(&conversation).await?;

    let to_mark = unread_to_mark(&stored, &backend.user, &conversation);
    if !to_mark.is_empty() {
        backend
            .sink
            .mark_read(&to_mark)
            .await
            .context("Failed to mark messages as read")?;
    }

    let username = backend.resolver().username(&counterpart).await;
    let messages = conversation_thread(&stored, &conversation)
        .iter()
        .map(|m| MessageRow::new(m, &backend.user, &username))
        .collect();

    Ok(ThreadResult {
        conversation_id: conversation.to_string(),
        counterpart_id: counterpart.to_string(),
        counterpart_username: username,
        marked_read: to_mark.len(),
        messages,
    })
}

/// Send `text` from the acting user to `to`.
pub async fn send_message(backend: &Backend, to: &str, text: &str) -> Result<SendResult> {
    let receiver = UserId::new(to);
    let mut message = NewMessage::compose_now(&backend.user, &receiver, text)?;

    match backend.profiles.profile(&backend.user).await {
        Ok(Some(profile)) => {
            if let Some(name) = profile.display_name() {
                message = message.with_sender_username(name);
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("could not load own profile: {}", e),
    }

    let conversation_id = message.conversation_id.to_string();
    let id = backend.sink.send(message).await?;

    Ok(SendResult {
        id: id.to_string(),
        to: receiver.to_string(),
        conversation_id,
    })
}
