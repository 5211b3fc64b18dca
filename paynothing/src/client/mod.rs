//! Firestore REST client and configuration.

mod auth;
mod http;

pub use auth::AuthInfo;
pub use http::{HttpConfig, DEFAULT_BASE_URL};

use crate::api::{MessageApi, UserApi};
use crate::error::{Error, Result};
use crate::models::UserId;
use http::{build_client, HttpExecutor};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::sync::Arc;
use std::time::Duration;

/// Builder for creating FirestoreClient.
pub struct FirestoreClientBuilder {
    project_id: Option<String>,
    api_key: Option<String>,
    auth: Option<AuthInfo>,
    http_config: HttpConfig,
}

impl std::fmt::Debug for FirestoreClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreClientBuilder")
            .field("project_id", &self.project_id)
            .field("auth", &self.auth.as_ref().map(|a| &a.uid))
            .field("http_config", &self.http_config)
            .finish()
    }
}

impl Default for FirestoreClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FirestoreClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            project_id: None,
            api_key: None,
            auth: None,
            http_config: HttpConfig::default(),
        }
    }

    /// Set the Firebase project ID.
    pub fn project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Set the Web API key sent as `key=`.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set authentication.
    pub fn auth(mut self, token: impl Into<String>, uid: impl Into<String>) -> Self {
        self.auth = Some(AuthInfo::new(token, UserId::new(uid)));
        self
    }

    /// Set authentication from AuthInfo.
    pub fn with_auth(mut self, auth: AuthInfo) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set base URL, e.g. a local emulator.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.http_config.base_url = url.into();
        self
    }

    /// Set custom user agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.http_config.custom_user_agent = Some(ua.into());
        self
    }

    /// Set connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.http_config.connect_timeout = timeout;
        self
    }

    /// Set read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.http_config.read_timeout = timeout;
        self
    }

    /// Build FirestoreClient.
    pub fn build(self) -> Result<FirestoreClient> {
        let project_id = self
            .project_id
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| Error::InvalidArgument("Firebase project ID is required".into()))?;
        let http_client = build_client(&self.http_config)?;

        Ok(FirestoreClient {
            inner: Arc::new(FirestoreClientInner {
                http: http_client,
                config: self.http_config,
                project_id,
                api_key: self.api_key,
                auth: self.auth,
            }),
        })
    }
}

/// Characters escaped in a document ID path segment.
const SEGMENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Document IDs cannot contain `/` or consist of dots only.
fn check_document_id(id: &str) -> Result<()> {
    if id.trim().is_empty() || id == "." || id == ".." || id.contains('/') {
        return Err(Error::InvalidArgument(format!("Invalid document ID {:?}", id)));
    }
    Ok(())
}

/// Internal client state.
pub(crate) struct FirestoreClientInner {
    pub http: reqwest::Client,
    pub config: HttpConfig,
    pub project_id: String,
    pub api_key: Option<String>,
    pub auth: Option<AuthInfo>,
}

impl FirestoreClientInner {
    /// Get auth info or error.
    pub fn require_auth(&self) -> Result<&AuthInfo> {
        self.auth.as_ref().ok_or(Error::AuthRequired)
    }

    /// Path of a document or collection relative to the base URL.
    pub fn documents_path(&self, rest: &str) -> String {
        let root = format!("projects/{}/databases/(default)/documents", self.project_id);
        if rest.is_empty() {
            root
        } else if rest.starts_with(':') {
            format!("{}{}", root, rest)
        } else {
            format!("{}/{}", root, rest)
        }
    }

    /// URL path of one document, with the ID escaped.
    pub fn document_path(&self, collection: &str, id: &str) -> Result<String> {
        check_document_id(id)?;
        let segment = utf8_percent_encode(id, SEGMENT_SET);
        Ok(self.documents_path(&format!("{}/{}", collection, segment)))
    }

    /// Full resource name of one document, as used in request bodies.
    pub fn document_name(&self, collection: &str, id: &str) -> Result<String> {
        check_document_id(id)?;
        Ok(self.documents_path(&format!("{}/{}", collection, id)))
    }

    /// Create HTTP executor carrying the API key and ID token.
    pub fn executor(&self) -> HttpExecutor<'_> {
        HttpExecutor::new(
            &self.http,
            &self.config,
            self.api_key.as_deref(),
            self.auth.as_ref().map(|a| a.token.as_str()),
        )
    }
}

/// Client for the app's Firestore collections.
#[derive(Clone)]
pub struct FirestoreClient {
    pub(crate) inner: Arc<FirestoreClientInner>,
}

impl FirestoreClient {
    /// Create a new client builder.
    pub fn builder() -> FirestoreClientBuilder {
        FirestoreClientBuilder::new()
    }

    /// Get the user profile API.
    pub fn users(&self) -> UserApi {
        UserApi::new(self.inner.clone())
    }

    /// Get the message API.
    pub fn messages(&self) -> MessageApi {
        MessageApi::new(self.inner.clone())
    }

    /// Check if the client is authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.inner.auth.is_some()
    }

    /// Get the current authentication info.
    pub fn auth_info(&self) -> Option<&AuthInfo> {
        self.inner.auth.as_ref()
    }

    /// Get the current user ID if authenticated.
    pub fn current_uid(&self) -> Option<&UserId> {
        self.inner.auth.as_ref().map(|a| &a.uid)
    }

    /// The Firebase project this client talks to.
    pub fn project_id(&self) -> &str {
        &self.inner.project_id
    }
}

impl std::fmt::Debug for FirestoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreClient")
            .field("project_id", &self.inner.project_id)
            .field("authenticated", &self.is_authenticated())
            .field("base_url", &self.inner.config.base_url)
            .finish()
    }
}
