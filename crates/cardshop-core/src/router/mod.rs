//! Route table, navigation guard and the router that drives them.
//!
//! Navigation is serialized: a transition's guard, including any session
//! revalidation, finishes before the next transition starts.

pub mod guard;
pub mod navigator;
pub mod routes;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

pub use guard::{Decision, NavigationGuard};
pub use navigator::{Navigator, RecordingNavigator};
pub use routes::{RouteMeta, RouteTable, DEFAULT_TITLE, HOME_PATH, LOGIN_PATH};

use crate::auth::SessionManager;

/// Upper bound on guard redirects followed for one navigation
const MAX_REDIRECTS: usize = 5;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouteError {
    #[error("No route matches {0}")]
    NotFound(String),

    #[error("Too many redirects navigating to {0}")]
    RedirectLoop(String),
}

/// Where a navigation ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub path: String,
    pub title: String,
    /// Paths the guard redirected through, in order
    pub redirects: Vec<String>,
}

pub struct Router {
    routes: RouteTable,
    guard: NavigationGuard,
    current: Mutex<Option<String>>,
}

impl Router {
    pub fn new(routes: RouteTable, session: Arc<SessionManager>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            routes,
            guard: NavigationGuard::new(session, navigator),
            current: Mutex::new(None),
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        self.guard.session()
    }

    /// Path of the last completed navigation.
    pub async fn current(&self) -> Option<String> {
        self.current.lock().await.clone()
    }

    pub async fn navigate(&self, path: &str) -> Result<Navigation, RouteError> {
        let mut current = self.current.lock().await;

        let mut target = path.to_string();
        let mut redirects = Vec::new();

        loop {
            let route = self
                .routes
                .resolve(&target)
                .ok_or_else(|| RouteError::NotFound(target.clone()))?;

            match self.guard.before_each(route).await {
                Decision::Allow => {
                    info!(path = %route.path, redirects = redirects.len(), "Navigated");
                    *current = Some(route.path.clone());
                    return Ok(Navigation {
                        path: route.path.clone(),
                        title: route.display_title().to_string(),
                        redirects,
                    });
                }
                Decision::Redirect(next) => {
                    if redirects.len() >= MAX_REDIRECTS {
                        return Err(RouteError::RedirectLoop(path.to_string()));
                    }
                    redirects.push(next.clone());
                    target = next;
                }
            }
        }
    }
}
