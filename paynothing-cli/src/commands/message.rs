//! Message commands.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use rust_i18n::t;

use crate::config::{open_backend, Target};
use crate::handlers::message as handlers;
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Subcommand)]
pub enum MessageAction {
    /// Show the conversation with a user and mark received messages read
    Read {
        /// The other user's ID
        with: String,
    },

    /// Send a message
    Send {
        /// Recipient user ID
        to: String,
        /// Message text
        text: String,
    },
}

pub async fn handle(action: MessageAction, target: &Target, format: OutputFormat) -> Result<()> {
    match action {
        MessageAction::Read { with } => read_thread(&with, target, format).await,
        MessageAction::Send { to, text } => send_message(&to, &text, target, format).await,
    }
}

async fn read_thread(with: &str, target: &Target, format: OutputFormat) -> Result<()> {
    let backend = open_backend(target)?;
    let result = handlers::read_thread(&backend, with).await?;

    if let OutputFormat::Json = format {
        print_json(&result);
        return Ok(());
    }

    println!(
        "{}\n",
        t!("conversation_with", user = result.counterpart_username.green())
    );
    print_table(&result.messages, format);
    if result.marked_read > 0 {
        println!("{}", t!("marked_read", count = result.marked_read).dimmed());
    }
    Ok(())
}

async fn send_message(to: &str, text: &str, target: &Target, format: OutputFormat) -> Result<()> {
    let backend = open_backend(target)?;
    let result = handlers::send_message(&backend, to, text).await?;

    if let OutputFormat::Json = format {
        print_json(&result);
    } else {
        println!("{}", t!("message_sent_to", user = result.to, id = result.id));
    }
    Ok(())
}
