//! Persisted credential storage.
//!
//! This module provides:
//! - `CredentialStore`: the token + user record that survives restarts
//! - `CredentialBackend`: the key/value surface the store sits on, with
//!   file, OS keychain and in-memory implementations
//!
//! The default backend is `session.json` in the cache directory.

pub mod backend;
pub mod credentials;
pub mod keychain;

pub use backend::{CredentialBackend, FileBackend, MemoryBackend};
pub use credentials::{CredentialStore, StoredCredentials, TOKEN_KEY, USER_KEY};
pub use keychain::KeyringBackend;
