//! Type-safe ID wrappers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the two participants of a conversation key.
pub const CONVERSATION_SEPARATOR: char = '_';

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new ID from a string.
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            /// Check if this ID is empty or blank.
            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }

            /// Get the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_owned())
            }
        }

        impl From<&String> for $name {
            fn from(s: &String) -> Self {
                $name(s.clone())
            }
        }

        impl From<&$name> for $name {
            fn from(id: &$name) -> Self {
                id.clone()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }
    };
}

define_id!(UserId, "A user identifier assigned by the auth service.");
define_id!(MessageId, "A message document identifier assigned by the backing store.");
define_id!(
    ConversationId,
    "Pairwise conversation key: both participant ids, sorted and joined with `_`."
);

impl ConversationId {
    /// Build the key for a conversation between two users.
    ///
    /// Both participants compute the same key regardless of argument order.
    pub fn between(a: &UserId, b: &UserId) -> Self {
        let (lo, hi) = if a.as_str() <= b.as_str() { (a, b) } else { (b, a) };
        ConversationId(format!("{}{}{}", lo, CONVERSATION_SEPARATOR, hi))
    }

    /// Split the key into its two participants.
    ///
    /// Returns `None` unless the key holds exactly two non-empty identifiers.
    pub fn participants(&self) -> Option<(UserId, UserId)> {
        let mut parts = self.0.split(CONVERSATION_SEPARATOR);
        let a = parts.next().filter(|s| !s.is_empty())?;
        let b = parts.next().filter(|s| !s.is_empty())?;
        if parts.next().is_some() {
            return None;
        }
        Some((UserId::from(a), UserId::from(b)))
    }

    /// The participant that is not `me`.
    ///
    /// `None` for malformed keys, self-conversations, and keys `me` is not part of.
    pub fn counterpart_of(&self, me: &UserId) -> Option<UserId> {
        let (a, b) = self.participants()?;
        match (a == *me, b == *me) {
            (true, false) => Some(b),
            (false, true) => Some(a),
            _ => None,
        }
    }
}
