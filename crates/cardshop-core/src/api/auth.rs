use tracing::debug;

use super::{Transport, TransportError};
use crate::models::{AuthResponse, LoginRequest, Registration};

/// Typed calls against the `/auth/*` endpoints.
#[derive(Clone)]
pub struct AuthApi {
    transport: Transport,
}

impl AuthApi {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, TransportError> {
        debug!(username = %request.username, "Logging in");
        self.transport.post_json("/auth/login", request).await
    }

    /// Ask the service whether the attached token is still good.
    pub async fn validate(&self) -> Result<AuthResponse, TransportError> {
        self.transport.post_empty("/auth/validate").await
    }

    pub async fn current_user(&self) -> Result<AuthResponse, TransportError> {
        self.transport.get_json("/auth/me").await
    }

    pub async fn register(&self, registration: &Registration) -> Result<AuthResponse, TransportError> {
        debug!(username = %registration.username, "Registering account");
        self.transport.post_json("/auth/register", registration).await
    }

    /// Tell the service the token is being dropped. The body is ignored, and
    /// a backend without the endpoint answers 404, which callers ignore too.
    pub async fn logout(&self) -> Result<(), TransportError> {
        self.transport
            .send(self.transport.request(reqwest::Method::POST, "/auth/logout"))
            .await
            .map(|_| ())
    }
}
