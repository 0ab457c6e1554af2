use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::User;

/// User and token travel together, so a half-authenticated session cannot
/// be represented.
#[derive(Clone, PartialEq)]
struct Credentials {
    user: User,
    token: String,
}

/// In-memory session. Predicates are computed from the fields on every call.
#[derive(Clone, Default, PartialEq)]
pub struct SessionState {
    credentials: Option<Credentials>,
    loading: bool,
    // Set once a forced teardown has redirected; cleared by the next establish
    torn_down: bool,
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        self.credentials.as_ref().map(|c| &c.user)
    }

    pub fn token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.token.as_str())
    }

    /// True only while a login request is in flight
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_logged_in(&self) -> bool {
        self.user().is_some() && self.token().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.is_logged_in() && self.user().is_some_and(User::is_admin)
    }

    /// Nickname, else username, else empty.
    pub fn display_name(&self) -> &str {
        self.user().map(User::display_name).unwrap_or("")
    }

    pub(crate) fn establish(&mut self, user: User, token: String) {
        self.credentials = Some(Credentials { user, token });
        self.torn_down = false;
    }

    /// Swap in a fresh profile, but only for the session that asked for it.
    pub(crate) fn replace_user(&mut self, token: &str, user: User) -> bool {
        match self.credentials {
            Some(ref mut c) if c.token == token => {
                c.user = user;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.credentials = None;
    }

    /// Latch the forced-teardown flag. Returns false if it was already set.
    pub(crate) fn mark_torn_down(&mut self) -> bool {
        !std::mem::replace(&mut self.torn_down, true)
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("user", &self.user().map(|u| u.username.as_str()))
            .field("token", &self.token().map(|_| "<redacted>"))
            .field("loading", &self.loading)
            .finish()
    }
}

/// Shared cell holding the session. Clones point at the same state.
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<Mutex<SessionState>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Owned copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Mutate the state under the lock. The closure must not block.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}
