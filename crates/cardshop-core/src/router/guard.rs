use std::sync::Arc;

use tracing::debug;

use super::{Navigator, RouteMeta, HOME_PATH, LOGIN_PATH};
use crate::auth::SessionManager;

/// Verdict for a single transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(String),
}

impl Decision {
    fn redirect(path: &str) -> Self {
        Decision::Redirect(path.to_string())
    }
}

/// Runs before every route transition and decides whether it may proceed.
pub struct NavigationGuard {
    session: Arc<SessionManager>,
    navigator: Arc<dyn Navigator>,
}

impl NavigationGuard {
    pub fn new(session: Arc<SessionManager>, navigator: Arc<dyn Navigator>) -> Self {
        Self { session, navigator }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub async fn before_each(&self, to: &RouteMeta) -> Decision {
        // A fresh process has storage but no in-memory session yet
        if !self.session.is_logged_in() && self.session.has_persisted_token() {
            self.session.restore();
        }

        self.navigator.set_title(to.display_title());

        let logged_in = self.session.is_logged_in();

        if to.guest_only && logged_in {
            debug!(route = %to.path, "Guest-only route, already logged in");
            return Decision::redirect(HOME_PATH);
        }

        if to.requires_auth {
            if !logged_in {
                debug!(route = %to.path, "Login required");
                return Decision::redirect(LOGIN_PATH);
            }
            if !self.session.check_auth().await {
                debug!(route = %to.path, "Session failed revalidation");
                return Decision::redirect(LOGIN_PATH);
            }
        }

        if to.requires_admin && !self.session.is_admin() {
            debug!(route = %to.path, "Admin role required");
            return Decision::redirect(HOME_PATH);
        }

        Decision::Allow
    }
}
