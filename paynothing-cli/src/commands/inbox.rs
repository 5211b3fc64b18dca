//! Inbox commands.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use paynothing::{InboxView, LiveInbox};
use rust_i18n::t;

use crate::config::{open_backend, Target};
use crate::handlers::inbox::{self as handlers, InboxResult};
use crate::output::{format_time, print_json, print_table, OutputFormat};

#[derive(Subcommand)]
pub enum InboxAction {
    /// List conversations, newest first
    #[command(alias = "ls")]
    List,

    /// Keep the inbox on screen and reprint it whenever it changes
    Watch,
}

pub async fn handle(action: InboxAction, target: &Target, format: OutputFormat) -> Result<()> {
    match action {
        InboxAction::List => list_inbox(target, format).await,
        InboxAction::Watch => watch_inbox(target, format).await,
    }
}

fn print_inbox(result: &InboxResult, format: OutputFormat) {
    if let OutputFormat::Json = format {
        print_json(result);
        return;
    }

    println!(
        "{}\n",
        t!(
            "inbox_header",
            user = result.user.green(),
            count = result.conversations.len(),
            unread = result.total_unread
        )
    );
    print_table(&result.conversations, format);
}

async fn list_inbox(target: &Target, format: OutputFormat) -> Result<()> {
    let backend = open_backend(target)?;
    let result = handlers::list_inbox(&backend).await?;
    print_inbox(&result, format);
    Ok(())
}

async fn watch_inbox(target: &Target, format: OutputFormat) -> Result<()> {
    let backend = open_backend(target)?;
    let feed = backend.feed();
    let inbox = LiveInbox::start(&feed, backend.resolver(), backend.user.clone()).await?;
    let mut updates = inbox.updates();

    if !matches!(format, OutputFormat::Json) {
        println!("{}", t!("watching", user = inbox.user().to_string().green()));
    }

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return Err(paynothing::Error::SubscriptionClosed.into());
                }
                let view: InboxView = updates.borrow_and_update().clone();
                let result = InboxResult::new(inbox.user(), &view.conversations)
                    .with_generation(view.generation);

                if !matches!(format, OutputFormat::Json) {
                    println!();
                    println!(
                        "{}",
                        t!(
                            "inbox_updated",
                            time = format_time(chrono::Local::now().timestamp_millis()),
                            generation = view.generation
                        )
                        .dimmed()
                    );
                }
                print_inbox(&result, format);
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    inbox.stop();
    if !matches!(format, OutputFormat::Json) {
        println!("{}", t!("stopped"));
    }
    Ok(())
}
