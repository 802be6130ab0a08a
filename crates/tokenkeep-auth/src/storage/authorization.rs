//! Authorization code storage trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::AuthorizationData;

/// Storage operations for authorization codes.
///
/// Codes expire on their own after `expires_in` seconds; an expired code
/// loads as `None`.
#[async_trait]
pub trait AuthorizationStorage: Send + Sync {
    /// Saves an authorization code with its expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if `expires_in` is not positive, or if the record
    /// cannot be encoded or written.
    async fn save_authorization(&self, data: &AuthorizationData) -> AuthResult<()>;

    /// Loads an authorization code.
    ///
    /// The returned record's client is the currently stored registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails, the record cannot be
    /// decoded, or the referenced client no longer exists.
    async fn load_authorization(&self, code: &str) -> AuthResult<Option<AuthorizationData>>;

    /// Removes an authorization code. Succeeds if the code does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn remove_authorization(&self, code: &str) -> AuthResult<()>;
}
