//! Client storage trait.
//!
//! Defines the interface for OAuth client persistence operations.
//! Implementations are provided by storage backends (e.g., Redis).

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::Client;

/// Storage operations for OAuth 2.0 clients.
///
/// # Example
///
/// ```ignore
/// use tokenkeep_auth::storage::ClientStorage;
///
/// async fn example(storage: &impl ClientStorage) -> tokenkeep_auth::AuthResult<()> {
///     if let Some(client) = storage.get_client("my-app").await? {
///         println!("Found client: {}", client.id);
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait ClientStorage: Send + Sync {
    /// Stores a client under its identifier.
    ///
    /// Any existing client with the same identifier is replaced; callers are
    /// responsible for identifier uniqueness.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be encoded or written.
    async fn create_client(&self, client: &Client) -> AuthResult<()>;

    /// Gets a client by its identifier.
    ///
    /// Returns `None` if no client is stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails or the stored record
    /// cannot be decoded.
    async fn get_client(&self, id: &str) -> AuthResult<Option<Client>>;

    /// Replaces a stored client. Fields are not merged.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be encoded or written.
    async fn update_client(&self, client: &Client) -> AuthResult<()>;

    /// Deletes a client. Succeeds if the client does not exist.
    ///
    /// Records that refer to the client are left in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_client(&self, client: &Client) -> AuthResult<()>;
}
