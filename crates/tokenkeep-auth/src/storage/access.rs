//! Access and refresh token storage trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::AccessData;

/// Storage operations for access grants.
///
/// A grant is reachable through its access token and, when present, its
/// refresh token. Both lookups return the same grant, and removing the grant
/// through either token invalidates both.
///
/// Loads treat an unknown token as a miss (`Ok(None)`). Removals treat an
/// unknown token as an error: the grant must be resolved to find the paired
/// token that also has to be removed.
#[async_trait]
pub trait AccessStorage: Send + Sync {
    /// Saves a grant, indexing it by access token and refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if `expires_in` is not positive, or if the record
    /// cannot be encoded or written.
    async fn save_access(&self, data: &AccessData) -> AuthResult<()>;

    /// Loads a grant by access token.
    ///
    /// `expires_in` of the returned grant is its remaining lifetime.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails, the record cannot be
    /// decoded, or a referenced client no longer exists.
    async fn load_access(&self, token: &str) -> AuthResult<Option<AccessData>>;

    /// Removes a grant by access token.
    ///
    /// # Errors
    ///
    /// Returns an error if no grant is registered for `token` or the storage
    /// operation fails.
    async fn remove_access(&self, token: &str) -> AuthResult<()>;

    /// Loads a grant by refresh token.
    ///
    /// # Errors
    ///
    /// Same as [`AccessStorage::load_access`].
    async fn load_refresh(&self, token: &str) -> AuthResult<Option<AccessData>>;

    /// Removes a grant by refresh token.
    ///
    /// # Errors
    ///
    /// Same as [`AccessStorage::remove_access`].
    async fn remove_refresh(&self, token: &str) -> AuthResult<()>;
}
