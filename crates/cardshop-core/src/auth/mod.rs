//! Session management.
//!
//! This module provides:
//! - `SessionManager`: login, logout, restore and revalidation of the session
//! - `SessionState` / `SessionHandle`: the in-memory session and its shared cell
//! - `Teardown`: the clear-and-redirect procedure shared with the transport
//!
//! The session is mirrored into the `CredentialStore` so it survives restarts.

pub mod session;
pub mod state;
pub mod teardown;

pub use session::SessionManager;
pub use state::{SessionHandle, SessionState};
pub use teardown::Teardown;
