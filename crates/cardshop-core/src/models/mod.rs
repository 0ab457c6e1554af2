//! Data models shared between the transport, the session manager and the
//! credential store.
//!
//! - `User`, `Role`: the authenticated account as returned by the service
//! - `LoginRequest`, `Registration`: request bodies for the auth endpoints
//! - `AuthResponse`, `LoginResult`: response envelopes

pub mod auth;
pub mod user;

pub use auth::{AuthResponse, LoginRequest, LoginResult, Registration};
pub use user::{Role, User};
