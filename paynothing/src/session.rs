//! Signed-in user context.
//!
//! A `Session` is created by the caller and passed to whatever needs the
//! current identity; its lifetime is the sign-in/sign-out cycle.

use log::debug;
use std::sync::Arc;
use tokio::sync::watch;

use crate::client::AuthInfo;
use crate::error::{Error, Result};
use crate::inbox::UsernameResolver;
use crate::models::UserId;

/// Current authentication state, observable by interested components.
#[derive(Debug)]
pub struct Session {
    state: watch::Sender<Option<AuthInfo>>,
    resolver: Option<Arc<UsernameResolver>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create a signed-out session.
    pub fn new() -> Self {
        Self {
            state: watch::channel(None).0,
            resolver: None,
        }
    }

    /// Create a session that is already signed in.
    pub fn signed_in(auth: AuthInfo) -> Result<Self> {
        let session = Self::new();
        session.sign_in(auth)?;
        Ok(session)
    }

    /// Clear `resolver`'s username cache whenever the user signs out.
    pub fn with_resolver(mut self, resolver: Arc<UsernameResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Sign in, replacing any previous user.
    pub fn sign_in(&self, auth: AuthInfo) -> Result<()> {
        if !auth.is_valid() {
            return Err(Error::InvalidArgument(
                "Token and user ID are required to sign in".into(),
            ));
        }
        debug!("signed in as {}", auth.uid);
        self.state.send_replace(Some(auth));
        Ok(())
    }

    /// Sign out, returning the credentials that were active.
    pub async fn sign_out(&self) -> Option<AuthInfo> {
        let previous = self.state.send_replace(None);
        if let Some(auth) = &previous {
            debug!("signed out {}", auth.uid);
            if let Some(resolver) = &self.resolver {
                resolver.clear().await;
            }
        }
        previous
    }

    /// The active credentials.
    pub fn current(&self) -> Option<AuthInfo> {
        self.state.borrow().clone()
    }

    /// The signed-in user's ID.
    pub fn current_uid(&self) -> Option<UserId> {
        self.state.borrow().as_ref().map(|a| a.uid.clone())
    }

    /// The signed-in user's ID, or [`Error::AuthRequired`].
    pub fn require_uid(&self) -> Result<UserId> {
        self.current_uid().ok_or(Error::AuthRequired)
    }

    /// Whether a user is signed in.
    pub fn is_signed_in(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// A receiver notified on every sign-in and sign-out.
    pub fn changes(&self) -> watch::Receiver<Option<AuthInfo>> {
        self.state.subscribe()
    }
}
