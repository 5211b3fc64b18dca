//! HTTP client configuration and request execution.

use crate::error::{Error, Result};
use log::debug;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Default Firestore REST base URL.
pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1/";

/// Default user agent.
pub const DEFAULT_USER_AGENT: &str = concat!("paynothing/", env!("CARGO_PKG_VERSION"));

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL for API requests.
    pub base_url: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Read timeout.
    pub read_timeout: Duration,
    /// Custom user agent.
    pub custom_user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(20),
            custom_user_agent: None,
        }
    }
}

impl HttpConfig {
    /// The user agent to send.
    pub fn user_agent(&self) -> &str {
        self.custom_user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    /// Resolve a relative API path to a full URL.
    pub fn resolve_url(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(Error::Url);
        }

        let mut base = self.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base)
            .and_then(|b| b.join(path))
            .map_err(Error::Url)
    }
}

/// Build a reqwest client with the given configuration.
pub fn build_client(config: &HttpConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .read_timeout(config.read_timeout)
        .gzip(true)
        .build()
        .map_err(Error::Network)
}

/// HTTP request executor.
pub struct HttpExecutor<'a> {
    client: &'a Client,
    config: &'a HttpConfig,
    api_key: Option<&'a str>,
    token: Option<&'a str>,
}

impl<'a> HttpExecutor<'a> {
    /// Create a new executor.
    pub fn new(
        client: &'a Client,
        config: &'a HttpConfig,
        api_key: Option<&'a str>,
        token: Option<&'a str>,
    ) -> Self {
        Self {
            client,
            config,
            api_key,
            token,
        }
    }

    /// Build a request with common headers and credentials.
    fn build_request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let mut url = self.config.resolve_url(path)?;
        if let Some(key) = self.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }

        let mut request = self
            .client
            .request(method, url)
            .header("User-Agent", self.config.user_agent());
        if let Some(token) = self.token {
            request = request.bearer_auth(token);
        }
        Ok(request)
    }

    /// GET a JSON document. `Ok(None)` on 404.
    pub async fn get_json(&self, path: &str) -> Result<Option<Value>> {
        let response = self
            .build_request(Method::GET, path)?
            .send()
            .await
            .map_err(Error::Network)?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("GET {} -> 404", path);
            return Ok(None);
        }
        self.handle_response(response).await.map(Some)
    }

    /// POST a JSON body.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let response = self
            .build_request(Method::POST, path)?
            .json(body)
            .send()
            .await
            .map_err(Error::Network)?;
        self.handle_response(response).await
    }

    /// Decode a JSON body or turn an error status into [`Error::Backend`].
    async fn handle_response(&self, response: Response) -> Result<Value> {
        let status = response.status();
        let text = response.text().await.map_err(Error::Network)?;

        if !status.is_success() {
            return Err(parse_error_body(status, &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(Error::Json)
    }
}

/// Map a Google API error body (`{"error": {"code", "message", "status"}}`).
fn parse_error_body(status: StatusCode, text: &str) -> Error {
    let message = serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_owned()
        });
    Error::backend(status.as_u16().to_string(), message)
}
