//! Shared fixtures: an in-process mock of the card shop service and a
//! session/router harness wired against it.

// Each test binary uses a different subset of these helpers
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use cardshop_core::router::RecordingNavigator;
use cardshop_core::store::{CredentialStore, MemoryBackend, TOKEN_KEY, USER_KEY};
use cardshop_core::{RouteTable, Router, SessionManager};

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Clone)]
struct Scripted {
    status: StatusCode,
    body: Value,
    delay: Option<Duration>,
}

#[derive(Default)]
struct MockState {
    routes: Mutex<HashMap<(String, String), Scripted>>,
    requests: Mutex<Vec<Recorded>>,
}

/// Answers scripted JSON per `(method, path)`; anything else is a 404.
pub struct MockService {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockService {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = axum::Router::new()
            .fallback(handle)
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}/api", address),
            state,
        }
    }

    pub fn respond(&self, method: &str, path: &str, status: StatusCode, body: Value) {
        self.script(method, path, status, body, None);
    }

    pub fn respond_after(&self, method: &str, path: &str, status: StatusCode, body: Value, delay: Duration) {
        self.script(method, path, status, body, Some(delay));
    }

    fn script(&self, method: &str, path: &str, status: StatusCode, body: Value, delay: Option<Duration>) {
        self.state.routes.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            Scripted { status, body, delay },
        );
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn hits(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn last(&self, method: &str, path: &str) -> Option<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .last()
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().trim_start_matches("/api").to_string();
    state.requests.lock().unwrap().push(Recorded {
        method: method.to_string(),
        path: path.clone(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).ok(),
    });

    let scripted = state
        .routes
        .lock()
        .unwrap()
        .get(&(method.to_string(), path))
        .cloned();

    match scripted {
        Some(scripted) => {
            if let Some(delay) = scripted.delay {
                tokio::time::sleep(delay).await;
            }
            (scripted.status, Json(scripted.body)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "message": "no such endpoint"})),
        )
            .into_response(),
    }
}

pub fn user_json(id: i64, username: &str, role: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "role": role,
        "createdAt": "2024-01-15T10:30:00"
    })
}

/// Storage slots as an earlier run would have left them.
pub fn persisted(token: &str, user: &Value) -> MemoryBackend {
    MemoryBackend::with_slots([(TOKEN_KEY, token.to_string()), (USER_KEY, user.to_string())])
}

pub struct Harness {
    pub mock: MockService,
    pub backend: Arc<MemoryBackend>,
    pub store: CredentialStore,
    pub navigator: Arc<RecordingNavigator>,
    pub session: Arc<SessionManager>,
    pub router: Router,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_backend(MemoryBackend::new()).await
    }

    pub async fn with_backend(backend: MemoryBackend) -> Self {
        let mock = MockService::start().await;
        let backend = Arc::new(backend);
        let store = CredentialStore::new(backend.clone());
        let navigator = Arc::new(RecordingNavigator::new());
        let session = Arc::new(
            SessionManager::connect(
                &mock.base_url,
                Duration::from_secs(5),
                store.clone(),
                navigator.clone(),
            )
            .expect("Failed to build session manager"),
        );
        let router = Router::new(RouteTable::default(), session.clone(), navigator.clone());

        Self {
            mock,
            backend,
            store,
            navigator,
            session,
            router,
        }
    }
}
