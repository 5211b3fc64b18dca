//! Inbox handlers.

use anyhow::Result;
use colored::Colorize;
use paynothing::{inbox::total_unread, load_inbox, ConversationSummary, UserId};
use serde::Serialize;

use crate::config::Backend;
use crate::output::{format_relative_time, PlainPrint, TableRow};

/// One inbox line.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationRow {
    pub conversation_id: String,
    pub counterpart_id: String,
    pub counterpart_username: String,
    pub last_message_text: String,
    pub last_message_timestamp: i64,
    pub unread_count: u32,
}

impl From<&ConversationSummary> for ConversationRow {
    fn from(c: &ConversationSummary) -> Self {
        Self {
            conversation_id: c.conversation_id.to_string(),
            counterpart_id: c.counterpart_id.to_string(),
            counterpart_username: c.counterpart_username.clone(),
            last_message_text: c.last_message_text.clone(),
            last_message_timestamp: c.last_message_timestamp,
            unread_count: c.unread_count,
        }
    }
}

impl TableRow for ConversationRow {
    fn headers() -> Vec<&'static str> {
        vec!["With", "Last message", "When", "Unread"]
    }
    fn row(&self) -> Vec<String> {
        vec![
            self.counterpart_username.clone(),
            self.last_message_text.clone(),
            format_relative_time(self.last_message_timestamp),
            if self.unread_count > 0 {
                self.unread_count.to_string()
            } else {
                String::new()
            },
        ]
    }
}

impl PlainPrint for ConversationRow {
    fn plain_print(&self) {
        let badge = if self.unread_count > 0 {
            format!("({}) ", self.unread_count).red().bold().to_string()
        } else {
            String::new()
        };
        println!(
            "{}{} {} {}",
            badge,
            self.counterpart_username.green(),
            format!("[{}]", self.counterpart_id).dimmed(),
            format_relative_time(self.last_message_timestamp).dimmed()
        );
        println!("   {}", self.last_message_text);
    }
}

/// Inbox result.
#[derive(Debug, Clone, Serialize)]
pub struct InboxResult {
    pub user: String,
    /// Live update number, absent for one-shot listings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<u64>,
    pub total_unread: u32,
    pub conversations: Vec<ConversationRow>,
}

impl InboxResult {
    pub fn new(user: &UserId, conversations: &[ConversationSummary]) -> Self {
        Self {
            user: user.to_string(),
            generation: None,
            total_unread: total_unread(conversations),
            conversations: conversations.iter().map(ConversationRow::from).collect(),
        }
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }
}

/// Load the acting user's inbox once.
pub async fn list_inbox(backend: &Backend) -> Result<InboxResult> {
    let resolver = backend.resolver();
    let conversations = load_inbox(backend.source.as_ref(), &resolver, &backend.user).await?;
    Ok(InboxResult::new(&backend.user, &conversations))
}
