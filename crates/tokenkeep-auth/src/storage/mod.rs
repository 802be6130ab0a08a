//! Storage traits for OAuth 2.0 data.
//!
//! This module defines storage interfaces for:
//!
//! - OAuth client registrations
//! - Authorization codes
//! - Access and refresh tokens
//!
//! [`OAuthStorage`] bundles the three into the single capability surface the
//! authorization-server engine is handed.
//!
//! # Implementations
//!
//! Storage implementations are provided in separate crates:
//!
//! - `tokenkeep-auth-redis` - Redis storage backend

pub mod access;
pub mod authorization;
pub mod client;

pub use access::AccessStorage;
pub use authorization::AuthorizationStorage;
pub use client::ClientStorage;

/// Complete storage surface for the authorization-server engine.
pub trait OAuthStorage: ClientStorage + AuthorizationStorage + AccessStorage {
    /// Returns a storage handle for use by a single request.
    ///
    /// Backends whose connection lifecycle is owned by a shared pool can hand
    /// out a handle to the same pool.
    fn clone_storage(&self) -> Box<dyn OAuthStorage>;

    /// Releases resources held by a handle obtained from
    /// [`OAuthStorage::clone_storage`].
    fn close(&self) {}
}
