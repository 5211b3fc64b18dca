//! User profile models.

use serde::{Deserialize, Serialize};

use super::UserId;

/// Username shown when a profile cannot be resolved.
pub const UNKNOWN_USERNAME: &str = "Unknown User";

/// A record from the `users` collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User ID.
    #[serde(default)]
    pub id: UserId,
    /// Public display name.
    #[serde(default)]
    pub username: String,
    /// Sign-up email, when the profile exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserProfile {
    /// Create a profile with a username.
    pub fn new(id: impl Into<UserId>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: None,
        }
    }

    /// The username if it is set to something displayable.
    pub fn display_name(&self) -> Option<&str> {
        let name = self.username.trim();
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(UserProfile::new("u1", " sam ").display_name(), Some("sam"));
        assert_eq!(UserProfile::new("u1", "  ").display_name(), None);
    }
}
