use reqwest::{header, Request, Response};
use tracing::{debug, warn};

use super::{RequestContext, RequestStage, ResponseStage, TransportError};
use crate::auth::Teardown;
use crate::store::CredentialStore;

/// Attaches the persisted bearer token to every outgoing request.
///
/// Reads the store rather than the in-memory session so it behaves the same
/// before the session has been restored.
pub struct BearerAuth {
    store: CredentialStore,
}

impl BearerAuth {
    pub fn new(store: CredentialStore) -> Self {
        Self { store }
    }
}

impl RequestStage for BearerAuth {
    fn name(&self) -> &'static str {
        "bearer-auth"
    }

    fn on_request(&self, mut request: Request) -> Result<Request, TransportError> {
        if let Some(token) = self.store.token() {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| {
                    TransportError::InvalidRequest("stored token is not a valid header".into())
                })?;
            value.set_sensitive(true);
            request.headers_mut().insert(header::AUTHORIZATION, value);
        }
        Ok(request)
    }
}

/// Forces a logout when the service answers 401, whether or not the request
/// carried a credential.
///
/// The teardown has fully run by the time the caller sees the 401, and a
/// burst of failures redirects to login once.
pub struct UnauthorizedTeardown {
    teardown: Teardown,
}

impl UnauthorizedTeardown {
    pub fn new(teardown: Teardown) -> Self {
        Self { teardown }
    }
}

impl ResponseStage for UnauthorizedTeardown {
    fn name(&self) -> &'static str {
        "unauthorized-teardown"
    }

    fn on_response(
        &self,
        ctx: &RequestContext,
        outcome: Result<Response, TransportError>,
    ) -> Result<Response, TransportError> {
        if let Err(ref e) = outcome {
            if e.is_unauthorized() {
                if self.teardown.force(ctx.bearer.as_deref()) {
                    warn!(url = %ctx.url, "Request rejected as unauthorized, session torn down");
                } else {
                    debug!(url = %ctx.url, "Session already torn down");
                }
            }
        }
        outcome
    }
}
