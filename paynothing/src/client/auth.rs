//! Authentication state.

use crate::models::UserId;

/// Credentials of a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthInfo {
    /// ID token sent as a bearer credential.
    pub token: String,
    /// User ID.
    pub uid: UserId,
}

impl AuthInfo {
    /// Create new auth info.
    pub fn new(token: impl Into<String>, uid: impl Into<UserId>) -> Self {
        Self {
            token: token.into(),
            uid: uid.into(),
        }
    }

    /// Check if auth looks valid.
    pub fn is_valid(&self) -> bool {
        !self.token.trim().is_empty() && !self.uid.is_empty()
    }
}
