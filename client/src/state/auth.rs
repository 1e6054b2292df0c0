//! Auth-session state for the signed-in user.
//!
//! SYSTEM CONTEXT
//! ==============
//! `AppState` replaces the page-global "current user / token" pair. It is
//! created once at startup, filled by `init` after sign-in (or after a stored
//! token is validated), and emptied by `clear` on sign-out. The chat layer
//! copies `Credentials` into each session it opens.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use frames::UserId;

/// Bearer token issued by the backend. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for an `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// Identity and token of the signed-in user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: UserId,
    pub username: String,
    pub token: AuthToken,
}

/// Application-wide auth state shared by the navigation and chat layers.
///
/// Cloning yields another handle to the same state.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    credentials: Rc<RefCell<Option<Credentials>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the signed-in user.
    pub fn init(&self, credentials: Credentials) {
        tracing::info!(user_id = credentials.user_id, "signed in");
        *self.credentials.borrow_mut() = Some(credentials);
    }

    /// Forget the signed-in user.
    pub fn clear(&self) {
        if self.credentials.borrow_mut().take().is_some() {
            tracing::info!("signed out");
        }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.credentials.borrow().is_some()
    }
}
