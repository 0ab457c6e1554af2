//! Core library for cardshop.
//!
//! This crate keeps a login session consistent across the credential store,
//! the in-memory session, outbound HTTP requests and route transitions.
//!
//! - `store`: persisted token + user record
//! - `api`: HTTP transport with bearer and 401-teardown stages
//! - `auth`: the `SessionManager`
//! - `router`: route table, navigation guard and router
//! - `config`: configuration file and environment overrides

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod router;
pub mod store;

pub use api::{Transport, TransportError};
pub use auth::{SessionManager, SessionState};
pub use config::Config;
pub use models::{LoginRequest, LoginResult, Registration, Role, User};
pub use router::{Decision, NavigationGuard, Navigator, Router, RouteMeta, RouteTable};
pub use store::{CredentialBackend, CredentialStore};
