//! PayNothing inbox CLI.

mod commands;
mod config;
mod handlers;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{inbox, message};
use paynothing::{AuthInfo, Session};
use rust_i18n::t;
use tracing_subscriber::EnvFilter;

rust_i18n::i18n!("src/locales", fallback = "en");

/// PayNothing inbox from the command line
#[derive(Parser)]
#[command(name = "paynothing")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "plain")]
    format: output::OutputFormat,

    /// Show verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Language for output
    #[arg(short, long, global = true, default_value = "en")]
    lang: String,

    #[command(flatten)]
    target: config::Target,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage authentication
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Inbox operations
    #[command(alias = "i")]
    Inbox {
        #[command(subcommand)]
        action: inbox::InboxAction,
    },

    /// Message operations
    #[command(alias = "m")]
    Message {
        #[command(subcommand)]
        action: message::MessageAction,
    },

    /// Show or update configuration
    Config {
        /// Store this Firestore project ID
        #[arg(long)]
        set_project: Option<String>,
        /// Store this Firebase web API key
        #[arg(long)]
        set_api_key: Option<String>,
    },
}

#[derive(Subcommand)]
enum AuthAction {
    /// Login with an ID token and uid
    Login {
        /// ID token
        #[arg(short, long)]
        token: String,
        /// User ID
        #[arg(short, long)]
        uid: String,
    },
    /// Logout
    Logout,
    /// Show current auth status
    Status,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_logging(cli.verbose);
    rust_i18n::set_locale(&cli.lang);

    let command = cli
        .command
        .ok_or_else(|| anyhow::anyhow!("{}", t!("no_command")))?;

    match command {
        Commands::Auth { action } => handle_auth(action).await,
        Commands::Inbox { action } => inbox::handle(action, &cli.target, cli.format).await,
        Commands::Message { action } => message::handle(action, &cli.target, cli.format).await,
        Commands::Config {
            set_project,
            set_api_key,
        } => handle_config(set_project, set_api_key),
    }
}

fn handle_config(set_project: Option<String>, set_api_key: Option<String>) -> Result<()> {
    let mut cfg = config::load_config()?;
    if set_project.is_some() || set_api_key.is_some() {
        if set_project.is_some() {
            cfg.firebase.project_id = set_project;
        }
        if set_api_key.is_some() {
            cfg.firebase.api_key = set_api_key;
        }
        config::save_config(&cfg)?;
        println!("{}", t!("config_saved"));
    }

    println!(
        "{}",
        t!("config_file", path = config::config_path()?.display())
    );
    println!(
        "{}",
        t!(
            "project",
            project = cfg.firebase.project_id.as_deref().unwrap_or("-")
        )
    );
    println!(
        "{}",
        t!("api_key_set", status = cfg.firebase.api_key.is_some())
    );
    println!("{}", t!("authenticated", status = cfg.auth.is_some()));
    if let Some(auth) = &cfg.auth {
        println!("{}", t!("user_id", uid = &auth.uid));
    }
    Ok(())
}

async fn handle_auth(action: AuthAction) -> Result<()> {
    match action {
        AuthAction::Login { token, uid } => {
            let session = Session::signed_in(AuthInfo::new(token.as_str(), uid.as_str()))?;
            let uid = session.require_uid()?;

            let mut cfg = config::load_config()?;
            cfg.auth = Some(config::AuthConfig {
                token,
                uid: uid.to_string(),
            });
            config::save_config(&cfg)?;
            println!("{}", t!("logged_in_as", uid = uid));
            Ok(())
        }
        AuthAction::Logout => {
            let mut cfg = config::load_config()?;
            cfg.auth = None;
            config::save_config(&cfg)?;
            println!("{}", t!("logged_out"));
            Ok(())
        }
        AuthAction::Status => {
            let cfg = config::load_config()?;
            let session = Session::new();
            if let Some(auth) = &cfg.auth {
                let stored = AuthInfo::new(auth.token.as_str(), auth.uid.as_str());
                if let Err(e) = session.sign_in(stored) {
                    tracing::warn!("stored credentials are invalid: {}", e);
                }
            }
            match session.current_uid() {
                Some(uid) => println!("{}", t!("logged_in_as", uid = uid)),
                None => println!("{}", t!("not_logged_in")),
            }
            Ok(())
        }
    }
}
