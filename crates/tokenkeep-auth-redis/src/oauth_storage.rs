//! `tokenkeep-auth` storage trait implementations.
//!
//! [`RedisAuthStorage`] implements the whole [`OAuthStorage`] surface by
//! delegating to the specialized stores and translating [`StorageError`]
//! into [`AuthError`].

use async_trait::async_trait;

use tokenkeep_auth::storage::{AccessStorage, AuthorizationStorage, ClientStorage, OAuthStorage};
use tokenkeep_auth::types::{AccessData, AuthorizationData, Client};
use tokenkeep_auth::{AuthError, AuthResult};

use crate::{RedisAuthStorage, StorageError};

/// Convert storage error to auth error.
fn map_storage_error(err: StorageError) -> AuthError {
    match err {
        StorageError::TokenNotFound(_) => AuthError::invalid_grant(err.to_string()),
        StorageError::ClientNotFound(_) => AuthError::invalid_client(err.to_string()),
        StorageError::InvalidExpiry { .. } => AuthError::invalid_request(err.to_string()),
        StorageError::Config(_) | StorageError::CreatePool(_) => {
            AuthError::configuration(err.to_string())
        }
        StorageError::Redis { .. }
        | StorageError::Pool { .. }
        | StorageError::Serialization { .. } => AuthError::storage(err.to_string()),
    }
}

#[async_trait]
impl ClientStorage for RedisAuthStorage {
    async fn create_client(&self, client: &Client) -> AuthResult<()> {
        self.clients().put(client).await.map_err(map_storage_error)
    }

    async fn get_client(&self, id: &str) -> AuthResult<Option<Client>> {
        self.clients().get(id).await.map_err(map_storage_error)
    }

    async fn update_client(&self, client: &Client) -> AuthResult<()> {
        self.clients().put(client).await.map_err(map_storage_error)
    }

    async fn delete_client(&self, client: &Client) -> AuthResult<()> {
        self.clients()
            .delete(&client.id)
            .await
            .map_err(map_storage_error)
    }
}

#[async_trait]
impl AuthorizationStorage for RedisAuthStorage {
    async fn save_authorization(&self, data: &AuthorizationData) -> AuthResult<()> {
        self.authorizations()
            .save(data)
            .await
            .map_err(map_storage_error)
    }

    async fn load_authorization(&self, code: &str) -> AuthResult<Option<AuthorizationData>> {
        self.authorizations()
            .load(code)
            .await
            .map_err(map_storage_error)
    }

    async fn remove_authorization(&self, code: &str) -> AuthResult<()> {
        self.authorizations()
            .remove(code)
            .await
            .map_err(map_storage_error)
    }
}

#[async_trait]
impl AccessStorage for RedisAuthStorage {
    async fn save_access(&self, data: &AccessData) -> AuthResult<()> {
        self.access()
            .save(data)
            .await
            .map(|_| ())
            .map_err(map_storage_error)
    }

    async fn load_access(&self, token: &str) -> AuthResult<Option<AccessData>> {
        self.access()
            .load_by_access_token(token)
            .await
            .map_err(map_storage_error)
    }

    async fn remove_access(&self, token: &str) -> AuthResult<()> {
        self.access()
            .remove_by_access_token(token)
            .await
            .map_err(map_storage_error)
    }

    async fn load_refresh(&self, token: &str) -> AuthResult<Option<AccessData>> {
        self.access()
            .load_by_refresh_token(token)
            .await
            .map_err(map_storage_error)
    }

    async fn remove_refresh(&self, token: &str) -> AuthResult<()> {
        self.access()
            .remove_by_refresh_token(token)
            .await
            .map_err(map_storage_error)
    }
}

impl OAuthStorage for RedisAuthStorage {
    fn clone_storage(&self) -> Box<dyn OAuthStorage> {
        Box::new(self.clone())
    }
}
