//! User profile API.

use std::sync::Arc;

use log::debug;

use crate::{
    client::FirestoreClientInner,
    error::{Error, Result},
    models::{UserId, UserProfile},
    parser::decode_document,
};

/// Collection holding one profile document per user, keyed by user ID.
pub const USERS_COLLECTION: &str = "users";

/// API for user profile operations.
pub struct UserApi {
    client: Arc<FirestoreClientInner>,
}

impl UserApi {
    pub(crate) fn new(client: Arc<FirestoreClientInner>) -> Self {
        Self { client }
    }

    /// Get a user's profile. `Ok(None)` if the user has none.
    pub async fn get(&self, user_id: impl Into<UserId>) -> Result<Option<UserProfile>> {
        let user_id = user_id.into();
        if user_id.is_empty() {
            return Err(Error::InvalidArgument("User ID cannot be empty".into()));
        }

        let path = self.client.document_path(USERS_COLLECTION, user_id.as_str())?;
        let Some(document) = self.client.executor().get_json(&path).await? else {
            debug!("no profile document for {}", user_id);
            return Ok(None);
        };

        decode_document(&document).map(Some)
    }
}
