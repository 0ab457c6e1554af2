use std::sync::Arc;

use tracing::info;

use super::SessionHandle;
use crate::router::{Navigator, LOGIN_PATH};
use crate::store::CredentialStore;

/// Clears the session in memory and on disk, optionally sending the user to
/// the login page. Shared by the session manager and the 401 stage.
#[derive(Clone)]
pub struct Teardown {
    store: CredentialStore,
    session: SessionHandle,
    navigator: Arc<dyn Navigator>,
}

impl Teardown {
    pub fn new(store: CredentialStore, session: SessionHandle, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            store,
            session,
            navigator,
        }
    }

    /// Drop the session without navigating.
    pub fn clear(&self) {
        self.session.with(|s| {
            s.reset();
            self.store.clear();
        });
    }

    /// Tear down the session a rejected request belonged to and redirect to
    /// login.
    ///
    /// With a `token`, only a store or session still holding that token is
    /// cleared, and nothing happens when neither does. Without one, the
    /// session is cleared unless a token has been stored since, and the
    /// redirect fires once until the next session is established.
    /// Returns whether a redirect was issued.
    pub fn force(&self, token: Option<&str>) -> bool {
        let redirect = match token {
            Some(token) => {
                let cleared_store = self.store.clear_if_token(token);
                self.session.with(|s| {
                    let cleared_memory = s.token() == Some(token);
                    if cleared_memory {
                        s.reset();
                    }
                    if cleared_store || cleared_memory {
                        s.mark_torn_down();
                        true
                    } else {
                        false
                    }
                })
            }
            None => self.session.with(|s| {
                // A login landed after the request went out
                if self.store.has_token() {
                    return false;
                }
                s.reset();
                s.mark_torn_down()
            }),
        };

        if !redirect {
            return false;
        }

        info!("Session invalidated by the service, redirecting to login");
        self.navigator.redirect(LOGIN_PATH);
        true
    }
}
