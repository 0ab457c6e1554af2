use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{SessionHandle, SessionState, Teardown};
use crate::api::{AuthApi, BearerAuth, Transport, TransportError, UnauthorizedTeardown};
use crate::models::{AuthResponse, LoginRequest, LoginResult, Registration, User};
use crate::router::Navigator;
use crate::store::CredentialStore;

// ============================================================================
// Messages
// ============================================================================

const LOGIN_FAILED: &str = "Login failed";
const LOGIN_NETWORK_FAILED: &str = "Login failed, please check your network connection";
const LOGIN_STORAGE_FAILED: &str = "Login failed, the session could not be saved";
const LOGIN_IN_PROGRESS: &str = "A login is already in progress";
const REGISTER_FAILED: &str = "Registration failed";

/// Resets the loading flag however `login` exits.
struct LoadingGuard<'a> {
    session: &'a SessionHandle,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.session.with(|s| s.set_loading(false));
    }
}

/// Owns the session and keeps it in step with the credential store.
///
/// Reads never touch the network. Every operation that changes who is
/// logged in updates memory and storage under the same lock.
pub struct SessionManager {
    api: AuthApi,
    store: CredentialStore,
    session: SessionHandle,
    teardown: Teardown,
}

impl SessionManager {
    pub fn new(api: AuthApi, store: CredentialStore, session: SessionHandle, teardown: Teardown) -> Self {
        Self {
            api,
            store,
            session,
            teardown,
        }
    }

    /// Build a manager with the standard transport pipeline: bearer token
    /// attached from `store`, 401 responses torn down through `navigator`.
    pub fn connect(
        base_url: &str,
        timeout: Duration,
        store: CredentialStore,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, TransportError> {
        let session = SessionHandle::new();
        let teardown = Teardown::new(store.clone(), session.clone(), navigator);
        let transport = Transport::builder(base_url)
            .timeout(timeout)
            .request_stage(BearerAuth::new(store.clone()))
            .response_stage(UnauthorizedTeardown::new(teardown.clone()))
            .build()?;

        Ok(Self::new(AuthApi::new(transport), store, session, teardown))
    }

    /// Transport with the session's pipeline, for calls outside `/auth`.
    pub fn transport(&self) -> &Transport {
        self.api.transport()
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    // ===== State =====

    pub fn snapshot(&self) -> SessionState {
        self.session.snapshot()
    }

    pub fn is_logged_in(&self) -> bool {
        self.snapshot().is_logged_in()
    }

    pub fn is_admin(&self) -> bool {
        self.snapshot().is_admin()
    }

    pub fn is_loading(&self) -> bool {
        self.snapshot().is_loading()
    }

    pub fn display_name(&self) -> String {
        self.snapshot().display_name().to_string()
    }

    pub fn user(&self) -> Option<User> {
        self.snapshot().user().cloned()
    }

    pub fn token(&self) -> Option<String> {
        self.snapshot().token().map(str::to_string)
    }

    /// Whether a token is persisted, regardless of the in-memory state.
    pub fn has_persisted_token(&self) -> bool {
        self.store.has_token()
    }

    // ===== Lifecycle =====

    /// Hydrate the session from storage. Returns whether a record was found.
    ///
    /// A corrupt record is cleared by the store and counts as no record.
    pub fn restore(&self) -> bool {
        match self.store.read() {
            Some(stored) => {
                debug!(user_id = stored.user.id, "Restoring session from storage");
                self.session.with(|s| s.establish(stored.user, stored.token));
                true
            }
            None => false,
        }
    }

    /// Forget the session in memory and in storage.
    pub fn clear(&self) {
        self.teardown.clear();
    }

    pub async fn login(&self, credentials: &LoginRequest) -> LoginResult {
        let started = self.session.with(|s| {
            if s.is_loading() {
                false
            } else {
                s.set_loading(true);
                true
            }
        });
        if !started {
            warn!(username = %credentials.username, "Ignoring duplicate login while one is in flight");
            return LoginResult::failed(LOGIN_IN_PROGRESS);
        }
        let _loading = LoadingGuard {
            session: &self.session,
        };

        match self.api.login(credentials).await {
            Ok(AuthResponse {
                success: true,
                message,
                token: Some(token),
                user: Some(user),
            }) if !token.is_empty() => {
                let user_id = user.id;
                let persisted = self.session.with(|s| {
                    if !self.store.write(&token, &user) {
                        // The store is empty now; memory must not outlive it
                        s.reset();
                        return false;
                    }
                    info!(user_id, role = %user.role, "Logged in");
                    s.establish(user, token);
                    true
                });
                if persisted {
                    LoginResult::ok(message.unwrap_or_default())
                } else {
                    warn!(user_id, "Could not persist the session, login abandoned");
                    LoginResult::failed(LOGIN_STORAGE_FAILED)
                }
            }
            Ok(response) => {
                if response.success {
                    warn!("Login reported success without both token and user");
                }
                LoginResult::failed(
                    response
                        .message
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| LOGIN_FAILED.to_string()),
                )
            }
            Err(e) => {
                warn!(error = %e, "Login request failed");
                LoginResult::failed(
                    e.server_message()
                        .unwrap_or_else(|| LOGIN_NETWORK_FAILED.to_string()),
                )
            }
        }
    }

    /// Notify the service, ignoring any failure, then clear the session.
    pub async fn logout(&self) {
        if self.has_persisted_token() {
            if let Err(e) = self.api.logout().await {
                debug!(error = %e, "Logout notification failed");
            }
        }
        self.clear();
        info!("Logged out");
    }

    /// Revalidate the held token with the service.
    ///
    /// On success only the user record is refreshed; the token is kept as-is.
    /// Any failure clears the session.
    pub async fn check_auth(&self) -> bool {
        let Some(token) = self.token() else {
            return false;
        };

        match self.api.validate().await {
            Ok(AuthResponse {
                success: true,
                user: Some(user),
                ..
            }) => {
                let applied = self.session.with(|s| {
                    if s.replace_user(&token, user.clone()) {
                        self.store.write_user(&user);
                        true
                    } else {
                        false
                    }
                });
                if !applied {
                    debug!("Session changed while revalidating");
                }
                applied
            }
            Ok(response) => {
                info!(message = ?response.message, "Session rejected by the service");
                self.clear();
                false
            }
            Err(e) => {
                warn!(error = %e, "Session revalidation failed");
                self.clear();
                false
            }
        }
    }

    /// Fetch the current profile. Failures leave the session alone.
    pub async fn refresh_profile(&self) -> bool {
        let Some(token) = self.token() else {
            return false;
        };

        match self.api.current_user().await {
            Ok(AuthResponse {
                success: true,
                user: Some(user),
                ..
            }) => self.session.with(|s| {
                if s.replace_user(&token, user.clone()) {
                    self.store.write_user(&user);
                    true
                } else {
                    false
                }
            }),
            Ok(_) => false,
            Err(e) => {
                debug!(error = %e, "Profile refresh failed");
                false
            }
        }
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, registration: &Registration) -> LoginResult {
        match self.api.register(registration).await {
            Ok(response) => {
                let message = response
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| {
                        if response.success { String::new() } else { REGISTER_FAILED.to_string() }
                    });
                LoginResult {
                    success: response.success,
                    message,
                }
            }
            Err(e) => {
                warn!(error = %e, "Registration request failed");
                LoginResult::failed(e.server_message().unwrap_or_else(|| REGISTER_FAILED.to_string()))
            }
        }
    }
}
