//! # tokenkeep-auth
//!
//! Storage contract for an OAuth 2.0 authorization server.
//!
//! This crate provides:
//! - Domain types for client registrations, authorization codes and access
//!   grants
//! - Storage traits the authorization-server engine is written against
//! - The error type storage backends report through
//!
//! The crate performs no I/O. Backends live in separate crates such as
//! `tokenkeep-auth-redis`.
//!
//! ## Modules
//!
//! - [`types`] - Client, authorization code and access grant records
//! - [`storage`] - Storage traits for auth-related data
//! - [`error`] - Error type and categories

pub mod error;
pub mod storage;
pub mod types;

pub use error::{AuthError, ErrorCategory};
pub use storage::{AccessStorage, AuthorizationStorage, ClientStorage, OAuthStorage};
pub use types::{AccessData, AuthorizationData, Client, ClientExtra};

/// Type alias for storage results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tokenkeep_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::storage::{AccessStorage, AuthorizationStorage, ClientStorage, OAuthStorage};
    pub use crate::types::{AccessData, AuthorizationData, Client, ClientExtra};
}
