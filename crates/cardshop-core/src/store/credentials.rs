use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::CredentialBackend;
use crate::models::User;

/// Slot holding the bearer token
pub const TOKEN_KEY: &str = "token";

/// Slot holding the JSON-serialized user record
pub const USER_KEY: &str = "user";

/// A complete persisted record: both slots present and the user parseable.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCredentials {
    pub token: String,
    pub user: User,
}

/// Durable mirror of the session's token and user.
///
/// Cloning is cheap and every clone talks to the same backend. Backend
/// failures are logged rather than returned, and a record that cannot be
/// read back is cleared. Only `write` reports whether it took effect.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn CredentialBackend>,
    lock: Arc<Mutex<()>>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn CredentialBackend>) -> Self {
        Self {
            backend,
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get_slot(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to read credential slot");
                None
            }
        }
    }

    fn set_slot(&self, key: &str, value: &str) -> bool {
        match self.backend.set(key, value) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to write credential slot");
                false
            }
        }
    }

    fn remove_slots(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.backend.remove(key) {
                warn!(key = key, error = %e, "Failed to remove credential slot");
            }
        }
    }

    /// Load the persisted record.
    ///
    /// A malformed user record, or a record with only one of its two slots,
    /// is erased and reported as empty.
    pub fn read(&self) -> Option<StoredCredentials> {
        let _guard = self.guard();
        let token = self.get_slot(TOKEN_KEY);
        let user = self.get_slot(USER_KEY);

        match (token, user) {
            (None, None) => None,
            (Some(token), Some(raw)) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => Some(StoredCredentials { token, user }),
                Err(e) => {
                    warn!(error = %e, "Stored user record is corrupt, clearing credentials");
                    self.remove_slots();
                    None
                }
            },
            _ => {
                warn!("Stored credentials are incomplete, clearing");
                self.remove_slots();
                None
            }
        }
    }

    /// Persist a full record, replacing whatever was there.
    ///
    /// Returns false if the record could not be stored. Nothing is left
    /// behind in that case.
    #[must_use]
    pub fn write(&self, token: &str, user: &User) -> bool {
        let _guard = self.guard();
        let raw = match serde_json::to_string(user) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Failed to serialize user, clearing credentials");
                self.remove_slots();
                return false;
            }
        };

        if self.set_slot(TOKEN_KEY, token) && self.set_slot(USER_KEY, &raw) {
            debug!(user_id = user.id, "Credentials persisted");
            true
        } else {
            self.remove_slots();
            false
        }
    }

    /// Replace only the user slot. Skipped when no token is stored, so a
    /// late profile update can never resurrect a half record.
    pub fn write_user(&self, user: &User) {
        let _guard = self.guard();
        if self.get_slot(TOKEN_KEY).is_none() {
            debug!("No stored token, skipping user update");
            return;
        }
        match serde_json::to_string(user) {
            Ok(raw) => {
                self.set_slot(USER_KEY, &raw);
            }
            Err(e) => warn!(error = %e, "Failed to serialize user"),
        }
    }

    /// Raw token slot, without validating the user record.
    pub fn token(&self) -> Option<String> {
        let _guard = self.guard();
        self.get_slot(TOKEN_KEY)
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    /// Erase both slots. Safe to call repeatedly.
    pub fn clear(&self) {
        let _guard = self.guard();
        self.remove_slots();
    }

    /// Erase both slots only if the stored token is still `token`.
    ///
    /// Returns whether anything was cleared. Used by the 401 teardown so that
    /// several failures for the same credential tear it down once.
    pub fn clear_if_token(&self, token: &str) -> bool {
        let _guard = self.guard();
        if self.get_slot(TOKEN_KEY).as_deref() == Some(token) {
            self.remove_slots();
            true
        } else {
            false
        }
    }
}
