mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use cardshop_core::router::RecordingNavigator;
use cardshop_core::store::{CredentialBackend, CredentialStore, MemoryBackend};
use cardshop_core::{LoginRequest, Registration, Role, SessionManager};
use common::{persisted, user_json, Harness, MockService};

/// Storage that can be read and cleared but never written.
struct ReadOnlyBackend(MemoryBackend);

impl CredentialBackend for ReadOnlyBackend {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.0.get(key)
    }

    fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
        anyhow::bail!("Read-only file system")
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.0.remove(key)
    }
}

#[tokio::test]
async fn login_success_establishes_and_persists_session() {
    let h = Harness::new().await;
    h.mock.respond(
        "POST",
        "/auth/login",
        StatusCode::OK,
        json!({
            "success": true,
            "message": "ok",
            "token": "t1",
            "user": {"id": 1, "username": "alice", "role": "USER"}
        }),
    );

    let result = h.session.login(&LoginRequest::new("alice", "secret")).await;

    assert!(result.success);
    assert_eq!(result.message, "ok");
    assert!(h.session.is_logged_in());
    assert!(!h.session.is_admin());
    assert!(!h.session.is_loading());
    assert_eq!(h.session.display_name(), "alice");

    let stored = h.store.read().expect("credentials should be persisted");
    assert_eq!(stored.token, "t1");
    assert_eq!(stored.user.username, "alice");
    assert_eq!(stored.user.role, Role::User);

    let sent = h.mock.last("POST", "/auth/login").unwrap();
    assert_eq!(sent.body, Some(json!({"username": "alice", "password": "secret"})));
    assert_eq!(sent.authorization, None);
}

#[tokio::test]
async fn login_success_without_token_is_a_failure() {
    let h = Harness::new().await;
    h.mock.respond(
        "POST",
        "/auth/login",
        StatusCode::OK,
        json!({"success": true, "message": "ok", "user": user_json(1, "alice", "USER")}),
    );

    let result = h.session.login(&LoginRequest::new("alice", "secret")).await;

    assert!(!result.success);
    assert!(!h.session.is_logged_in());
    assert!(h.session.user().is_none());
    assert!(h.session.token().is_none());
    assert!(h.backend.is_empty());
}

#[tokio::test]
async fn login_success_without_user_is_a_failure() {
    let h = Harness::new().await;
    h.mock.respond(
        "POST",
        "/auth/login",
        StatusCode::OK,
        json!({"success": true, "token": "t1"}),
    );

    let result = h.session.login(&LoginRequest::new("alice", "secret")).await;

    assert!(!result.success);
    assert_eq!(result.message, "Login failed");
    assert!(!h.session.is_logged_in());
    assert!(h.backend.is_empty());
}

#[tokio::test]
async fn login_rejected_uses_server_message() {
    let h = Harness::new().await;
    h.mock.respond(
        "POST",
        "/auth/login",
        StatusCode::OK,
        json!({"success": false, "message": "Wrong username or password"}),
    );

    let result = h.session.login(&LoginRequest::new("alice", "nope")).await;

    assert!(!result.success);
    assert_eq!(result.message, "Wrong username or password");
    assert!(!h.session.is_logged_in());
}

#[tokio::test]
async fn login_http_error_uses_body_message() {
    let h = Harness::new().await;
    h.mock.respond(
        "POST",
        "/auth/login",
        StatusCode::BAD_REQUEST,
        json!({"success": false, "message": "Account disabled"}),
    );

    let result = h.session.login(&LoginRequest::new("alice", "secret")).await;

    assert!(!result.success);
    assert_eq!(result.message, "Account disabled");
    assert!(!h.session.is_loading());
}

#[tokio::test]
async fn failed_login_keeps_existing_session() {
    let h = Harness::with_backend(persisted("t1", &user_json(1, "alice", "USER"))).await;
    h.session.restore();
    h.mock.respond(
        "POST",
        "/auth/login",
        StatusCode::OK,
        json!({"success": false, "message": "nope"}),
    );

    let result = h.session.login(&LoginRequest::new("bob", "x")).await;

    assert!(!result.success);
    assert_eq!(h.session.token().as_deref(), Some("t1"));
    assert_eq!(h.store.token().as_deref(), Some("t1"));
}

#[tokio::test]
async fn login_fails_when_session_cannot_be_saved() {
    let mock = MockService::start().await;
    mock.respond(
        "POST",
        "/auth/login",
        StatusCode::OK,
        json!({"success": true, "token": "t1", "user": user_json(1, "alice", "USER")}),
    );
    mock.respond("GET", "/orders", StatusCode::OK, json!([]));
    let store = CredentialStore::new(Arc::new(ReadOnlyBackend(MemoryBackend::new())));
    let session = SessionManager::connect(
        &mock.base_url,
        Duration::from_secs(5),
        store.clone(),
        Arc::new(RecordingNavigator::new()),
    )
    .expect("Failed to build session manager");

    let result = session.login(&LoginRequest::new("alice", "secret")).await;

    assert!(!result.success);
    assert!(!result.message.is_empty());
    assert!(!session.is_logged_in());
    assert!(!session.is_loading());
    assert!(!store.has_token());

    // Memory and storage agree, so nothing goes out claiming to be alice
    let _: serde_json::Value = session.transport().get_json("/orders").await.unwrap();
    assert_eq!(mock.last("GET", "/orders").unwrap().authorization, None);
}

#[tokio::test]
async fn duplicate_login_is_rejected_while_in_flight() {
    let h = Harness::new().await;
    h.mock.respond_after(
        "POST",
        "/auth/login",
        StatusCode::OK,
        json!({"success": true, "message": "ok", "token": "t1", "user": user_json(1, "alice", "USER")}),
        Duration::from_millis(200),
    );

    let request = LoginRequest::new("alice", "secret");
    let (first, second) = tokio::join!(h.session.login(&request), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.session.is_loading());
        h.session.login(&request).await
    });

    assert!(first.success);
    assert!(!second.success);
    assert_eq!(second.message, "A login is already in progress");
    assert_eq!(h.mock.hits("POST", "/auth/login"), 1);
    assert!(!h.session.is_loading());
    assert!(h.session.is_logged_in());
}

#[tokio::test]
async fn check_auth_refreshes_user_but_never_the_token() {
    let h = Harness::with_backend(persisted("t1", &user_json(1, "alice", "USER"))).await;
    h.session.restore();
    h.mock.respond(
        "POST",
        "/auth/validate",
        StatusCode::OK,
        json!({"success": true, "token": "rotated", "user": user_json(1, "alice", "ADMIN")}),
    );

    assert!(h.session.check_auth().await);

    assert!(h.session.is_admin());
    assert_eq!(h.session.token().as_deref(), Some("t1"));
    let stored = h.store.read().unwrap();
    assert_eq!(stored.token, "t1");
    assert_eq!(stored.user.role, Role::Admin);

    let sent = h.mock.last("POST", "/auth/validate").unwrap();
    assert_eq!(sent.authorization.as_deref(), Some("Bearer t1"));
}

#[tokio::test]
async fn check_auth_explicit_failure_clears_session() {
    let h = Harness::with_backend(persisted("t1", &user_json(1, "alice", "USER"))).await;
    h.session.restore();
    h.mock.respond("POST", "/auth/validate", StatusCode::OK, json!({"success": false}));

    assert!(!h.session.check_auth().await);

    assert!(!h.session.is_logged_in());
    assert!(h.backend.is_empty());
    // Explicit rejection is not a 401, so nothing navigates
    assert!(h.navigator.redirects().is_empty());
}

#[tokio::test]
async fn check_auth_success_without_user_clears_session() {
    let h = Harness::with_backend(persisted("t1", &user_json(1, "alice", "USER"))).await;
    h.session.restore();
    h.mock.respond("POST", "/auth/validate", StatusCode::OK, json!({"success": true}));

    assert!(!h.session.check_auth().await);
    assert!(!h.session.is_logged_in());
    assert!(h.backend.is_empty());
}

#[tokio::test]
async fn check_auth_transport_failure_clears_session() {
    let h = Harness::with_backend(persisted("t1", &user_json(1, "alice", "USER"))).await;
    h.session.restore();
    h.mock.respond(
        "POST",
        "/auth/validate",
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"message": "boom"}),
    );

    assert!(!h.session.check_auth().await);
    assert!(!h.session.is_logged_in());
    assert!(h.backend.is_empty());
}

#[tokio::test]
async fn check_auth_unauthorized_tears_down_and_redirects() {
    let h = Harness::with_backend(persisted("t1", &user_json(1, "alice", "USER"))).await;
    h.session.restore();
    h.mock.respond(
        "POST",
        "/auth/validate",
        StatusCode::UNAUTHORIZED,
        json!({"message": "expired"}),
    );

    assert!(!h.session.check_auth().await);
    assert!(!h.session.is_logged_in());
    assert!(h.backend.is_empty());
    assert_eq!(h.navigator.redirects(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn refresh_profile_updates_user() {
    let h = Harness::with_backend(persisted("t1", &user_json(1, "alice", "USER"))).await;
    h.session.restore();
    h.mock.respond(
        "GET",
        "/auth/me",
        StatusCode::OK,
        json!({"success": true, "user": {"id": 1, "username": "alice", "nickname": "Ally", "role": "USER"}}),
    );

    assert!(h.session.refresh_profile().await);
    assert_eq!(h.session.display_name(), "Ally");
    assert_eq!(h.store.read().unwrap().user.nickname.as_deref(), Some("Ally"));
    assert_eq!(h.store.token().as_deref(), Some("t1"));
}

#[tokio::test]
async fn refresh_profile_failure_leaves_session_alone() {
    let h = Harness::with_backend(persisted("t1", &user_json(1, "alice", "USER"))).await;
    h.session.restore();
    let before = h.session.snapshot();

    h.mock.respond("GET", "/auth/me", StatusCode::OK, json!({"success": false}));
    assert!(!h.session.refresh_profile().await);
    assert_eq!(h.session.snapshot(), before);

    h.mock.respond("GET", "/auth/me", StatusCode::BAD_GATEWAY, json!({}));
    assert!(!h.session.refresh_profile().await);
    assert_eq!(h.session.snapshot(), before);
    assert!(h.store.read().is_some());
}

#[tokio::test]
async fn logout_notifies_service_then_clears() {
    let h = Harness::with_backend(persisted("t1", &user_json(1, "alice", "USER"))).await;
    h.session.restore();
    h.mock.respond("POST", "/auth/logout", StatusCode::OK, json!({"success": true}));

    h.session.logout().await;

    assert!(!h.session.is_logged_in());
    assert!(h.backend.is_empty());
    let sent = h.mock.last("POST", "/auth/logout").unwrap();
    assert_eq!(sent.authorization.as_deref(), Some("Bearer t1"));
}

#[tokio::test]
async fn logout_against_backend_without_endpoint() {
    let h = Harness::with_backend(persisted("t1", &user_json(1, "alice", "USER"))).await;
    h.session.restore();
    // No script for /auth/logout: the mock answers 404 like the shop backend

    h.session.logout().await;

    assert_eq!(h.mock.hits("POST", "/auth/logout"), 1);
    assert!(!h.session.is_logged_in());
    assert!(h.backend.is_empty());
    assert!(h.navigator.redirects().is_empty());
}

#[tokio::test]
async fn logout_without_stored_token_sends_nothing() {
    let h = Harness::new().await;

    h.session.logout().await;

    assert!(h.mock.requests().is_empty());
    assert!(h.navigator.redirects().is_empty());
}

#[tokio::test]
async fn register_reports_server_result_without_logging_in() {
    let h = Harness::new().await;
    h.mock.respond(
        "POST",
        "/auth/register",
        StatusCode::OK,
        json!({"success": true, "message": "Registered", "user": user_json(5, "bob", "USER")}),
    );

    let registration = Registration {
        username: "bob".to_string(),
        password: "hunter2".to_string(),
        email: Some("bob@example.com".to_string()),
        ..Default::default()
    };
    let result = h.session.register(&registration).await;

    assert!(result.success);
    assert_eq!(result.message, "Registered");
    assert!(!h.session.is_logged_in());
    assert!(h.backend.is_empty());

    let sent = h.mock.last("POST", "/auth/register").unwrap().body.unwrap();
    assert_eq!(sent["email"], "bob@example.com");
    assert!(sent.get("nickname").is_none());
}

#[tokio::test]
async fn register_failure_falls_back_to_generic_message() {
    let h = Harness::new().await;
    h.mock.respond("POST", "/auth/register", StatusCode::OK, json!({"success": false}));

    let result = h
        .session
        .register(&Registration {
            username: "bob".to_string(),
            password: "x".to_string(),
            ..Default::default()
        })
        .await;

    assert!(!result.success);
    assert_eq!(result.message, "Registration failed");
}
