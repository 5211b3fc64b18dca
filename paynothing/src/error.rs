//! Error types.

use thiserror::Error;

/// The main error type for PayNothing operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network-related error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backing store returned an error response.
    #[error("Backend error [{code}]: {message}")]
    Backend { code: String, message: String },

    /// Failed to parse response data.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Operation requires a signed-in user but none is present.
    #[error("Authentication required")]
    AuthRequired,

    /// A required field was missing in a document.
    #[error("Missing field: {0}")]
    MissingField(String),

    /// Invalid argument passed to an API method.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Cache storage error.
    #[error("Cache error: {0}")]
    Cache(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local file access error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// The live subscription was closed by its source.
    #[error("Subscription closed")]
    SubscriptionClosed,
}

impl Error {
    /// Create a backend error.
    pub fn backend(code: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Backend {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Create a missing field error.
    pub fn missing(field: impl Into<String>) -> Self {
        Error::MissingField(field.into())
    }

    /// Check if this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Backend { code, .. } => code == "429" || code == "503",
            _ => false,
        }
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        match self {
            Error::AuthRequired => true,
            Error::Backend { code, .. } => code == "401" || code == "403",
            _ => false,
        }
    }
}

/// Result type alias for PayNothing operations.
pub type Result<T> = std::result::Result<T, Error>;
