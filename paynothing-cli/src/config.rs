//! Configuration management for the PayNothing CLI.

use anyhow::{Context, Result};
use clap::Args;
use paynothing::{
    FileStore, FirestoreClient, InboxConfig, MessageSink, PollingFeed, ProfileLookup,
    SnapshotSource, UserId, UsernameResolver,
};
use rust_i18n::t;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// CLI configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Firestore project settings.
    #[serde(default)]
    pub firebase: FirebaseConfig,
    /// Authentication credentials.
    pub auth: Option<AuthConfig>,
    /// Inbox tuning.
    #[serde(default)]
    pub inbox: InboxSettings,
}

/// Firestore project configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct FirebaseConfig {
    pub project_id: Option<String>,
    pub api_key: Option<String>,
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// ID token.
    pub token: String,
    /// User ID.
    pub uid: String,
}

/// Optional overrides of the library defaults.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct InboxSettings {
    pub placeholder_username: Option<String>,
    pub lookup_timeout_secs: Option<u64>,
    pub username_ttl_secs: Option<u64>,
    pub poll_interval_secs: Option<u64>,
}

impl InboxSettings {
    /// Apply the overrides on top of [`InboxConfig::default`].
    pub fn to_inbox_config(&self) -> InboxConfig {
        let mut config = InboxConfig::default();
        if let Some(name) = &self.placeholder_username {
            config = config.placeholder_username(name);
        }
        if let Some(secs) = self.lookup_timeout_secs {
            config = config.lookup_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.username_ttl_secs {
            config = config.username_ttl(Duration::from_secs(secs));
        }
        if let Some(secs) = self.poll_interval_secs {
            config = config.poll_interval(Duration::from_secs(secs.max(1)));
        }
        config
    }
}

/// Where inbox data comes from, shared by every data command.
#[derive(Debug, Clone, Default, Args)]
pub struct Target {
    /// Use a local JSON fixture file instead of Firestore
    #[arg(long, global = true, env = "PAYNOTHING_FIXTURE")]
    pub fixture: Option<PathBuf>,

    /// Act as this user (defaults to the logged-in UID)
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Firestore project ID
    #[arg(long, global = true, env = "PAYNOTHING_PROJECT")]
    pub project: Option<String>,

    /// Firebase web API key
    #[arg(long, global = true, env = "PAYNOTHING_API_KEY")]
    pub api_key: Option<String>,
}

/// Get the configuration file path.
pub fn config_path() -> Result<PathBuf> {
    let exe_path = env::current_exe().context("Could not determine executable path")?;
    let exe_dir = exe_path
        .parent()
        .context("Could not determine executable directory")?;

    Ok(exe_dir.join("paynothing.toml"))
}

/// Load configuration from file.
pub fn load_config() -> Result<Config> {
    let path = config_path()?;

    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path).context("Failed to read config file")?;

    toml::from_str(&content).context("Failed to parse config file")
}

/// Save configuration to file.
pub fn save_config(config: &Config) -> Result<()> {
    let path = config_path()?;
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(&path, content).context("Failed to write config file")?;

    Ok(())
}

/// The collaborators a command works against, as the acting user.
pub struct Backend {
    pub user: UserId,
    pub source: Arc<dyn SnapshotSource>,
    pub profiles: Arc<dyn ProfileLookup>,
    pub sink: Arc<dyn MessageSink>,
    pub config: InboxConfig,
}

impl Backend {
    /// A username resolver over this backend's profiles.
    pub fn resolver(&self) -> Arc<UsernameResolver> {
        Arc::new(UsernameResolver::new(self.profiles.clone()).with_config(self.config.clone()))
    }

    /// A live feed re-querying the snapshot source.
    pub fn feed(&self) -> PollingFeed<dyn SnapshotSource> {
        PollingFeed::new(self.source.clone(), self.config.poll_interval)
    }
}

/// Open the fixture file or the Firestore project selected by `target`.
pub fn open_backend(target: &Target) -> Result<Backend> {
    let config = load_config()?;
    select_backend(target, &config)
}

fn select_backend(target: &Target, config: &Config) -> Result<Backend> {
    let inbox = config.inbox.to_inbox_config();

    if let Some(path) = &target.fixture {
        let user = target
            .user
            .clone()
            .or_else(|| config.auth.as_ref().map(|a| a.uid.clone()))
            .filter(|u| !u.trim().is_empty())
            .with_context(|| t!("no_user").to_string())?;
        tracing::debug!("using fixture {}", path.display());

        let store = Arc::new(FileStore::new(path));
        return Ok(Backend {
            user: UserId::new(user),
            source: store.clone(),
            profiles: store.clone(),
            sink: store,
            config: inbox,
        });
    }

    let project = target
        .project
        .clone()
        .or_else(|| config.firebase.project_id.clone())
        .with_context(|| t!("no_project").to_string())?;
    let auth = config
        .auth
        .as_ref()
        .with_context(|| t!("auth_required").to_string())?;

    let mut builder = FirestoreClient::builder()
        .project(project)
        .auth(&auth.token, &auth.uid);
    if let Some(key) = target.api_key.clone().or_else(|| config.firebase.api_key.clone()) {
        builder = builder.api_key(key);
    }
    let client = Arc::new(builder.build().context("Failed to build Firestore client")?);
    tracing::debug!("using Firestore project {}", client.project_id());

    Ok(Backend {
        user: UserId::new(&auth.uid),
        source: client.clone(),
        profiles: client.clone(),
        sink: client,
        config: inbox,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_in() -> Config {
        Config {
            auth: Some(AuthConfig {
                token: "tok".into(),
                uid: "u1".into(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_config_toml_layout() {
        let config: Config = toml::from_str(
            r#"
            [firebase]
            project_id = "paynothing-demo"

            [auth]
            token = "tok"
            uid = "u1"

            [inbox]
            poll_interval_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.firebase.project_id.as_deref(), Some("paynothing-demo"));
        assert_eq!(config.auth.map(|a| a.uid), Some("u1".to_string()));
        assert_eq!(
            config.inbox.to_inbox_config().poll_interval,
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.auth.is_none());
        assert_eq!(
            config.inbox.to_inbox_config().placeholder_username,
            InboxConfig::default().placeholder_username
        );
    }

    #[test]
    fn test_fixture_user_override() {
        let target = Target {
            fixture: Some("inbox.json".into()),
            user: Some("u7".into()),
            ..Default::default()
        };
        let backend = select_backend(&target, &signed_in()).unwrap();
        assert_eq!(backend.user.as_str(), "u7");

        let target = Target {
            fixture: Some("inbox.json".into()),
            ..Default::default()
        };
        let backend = select_backend(&target, &signed_in()).unwrap();
        assert_eq!(backend.user.as_str(), "u1");
    }

    #[test]
    fn test_fixture_requires_a_user() {
        let target = Target {
            fixture: Some("inbox.json".into()),
            ..Default::default()
        };
        assert!(select_backend(&target, &Config::default()).is_err());
    }

    #[test]
    fn test_firestore_requires_project_and_auth() {
        assert!(select_backend(&Target::default(), &signed_in()).is_err());

        let target = Target {
            project: Some("paynothing-demo".into()),
            ..Default::default()
        };
        assert!(select_backend(&target, &Config::default()).is_err());

        let backend = select_backend(&target, &signed_in()).unwrap();
        assert_eq!(backend.user.as_str(), "u1");
    }
}
