//! HTTP transport for the card shop service.
//!
//! This module provides the `Transport`, a reqwest client wrapped in an
//! explicit middleware pipeline, and `AuthApi`, the typed calls against the
//! `/auth/*` endpoints.
//!
//! Two stages are installed by default: `BearerAuth` attaches the stored
//! token to outgoing requests, and `UnauthorizedTeardown` tears the session
//! down when the service answers 401.

pub mod auth;
pub mod error;
pub mod stages;
pub mod transport;

pub use auth::AuthApi;
pub use error::TransportError;
pub use stages::{BearerAuth, UnauthorizedTeardown};
pub use transport::{RequestContext, RequestStage, ResponseStage, Transport, TransportBuilder};
