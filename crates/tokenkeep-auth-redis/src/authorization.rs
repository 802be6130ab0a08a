//! Authorization code storage.
//!
//! Codes are stored under `{prefix}:auth:{code}` with a native expiry equal
//! to the code's lifetime, so an expired code simply loads as `None`.

use deadpool_redis::Pool;
use redis::AsyncCommands;
use tracing::{debug, instrument};

use tokenkeep_auth::types::AuthorizationData;

use crate::client::ClientStore;
use crate::keys::KeyBuilder;
use crate::record::{StoredAuthorization, decode, encode};
use crate::{ResultExt, StorageResult, expiry_secs};

/// Authorization code storage operations.
pub struct AuthorizationStore<'a> {
    pool: &'a Pool,
    keys: &'a KeyBuilder,
}

impl<'a> AuthorizationStore<'a> {
    /// Create a new authorization store with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a Pool, keys: &'a KeyBuilder) -> Self {
        Self { pool, keys }
    }

    /// Save an authorization code with `SETEX`.
    ///
    /// # Errors
    ///
    /// Returns an error if `expires_in` is not positive, or if encoding or
    /// the Redis write fails.
    #[instrument(skip(self, data), fields(client_id = %data.client.id))]
    pub async fn save(&self, data: &AuthorizationData) -> StorageResult<()> {
        let ttl_secs = expiry_secs("authorization", data.expires_in)?;
        let key = self.keys.auth(&data.code);
        let payload = encode(&StoredAuthorization::from(data), "failed to encode auth")?;

        let mut conn = self.pool.get().await.context("failed to set auth")?;
        conn.set_ex::<_, _, ()>(&key, payload, ttl_secs)
            .await
            .context("failed to set auth")?;

        debug!(ttl_secs, "authorization saved");
        Ok(())
    }

    /// Load an authorization code and resolve its client.
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis read fails, the record cannot be decoded,
    /// or the referenced client no longer exists.
    #[instrument(skip(self, code))]
    pub async fn load(&self, code: &str) -> StorageResult<Option<AuthorizationData>> {
        let key = self.keys.auth(code);

        let raw = {
            let mut conn = self.pool.get().await.context("unable to GET auth")?;
            conn.get::<_, Option<Vec<u8>>>(&key)
                .await
                .context("unable to GET auth")?
        };

        let Some(bytes) = raw else {
            debug!("authorization not found");
            return Ok(None);
        };
        let stored: StoredAuthorization = decode(&bytes, "failed to decode auth")?;

        let clients = ClientStore::new(self.pool, self.keys)
            .resolve([stored.client_id.clone()])
            .await?;
        stored.into_authorization(&clients).map(Some)
    }

    /// Remove an authorization code. Removing an absent code succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis delete fails.
    #[instrument(skip(self, code))]
    pub async fn remove(&self, code: &str) -> StorageResult<()> {
        let key = self.keys.auth(code);

        let mut conn = self.pool.get().await.context("failed to delete auth")?;
        conn.del::<_, ()>(&key)
            .await
            .context("failed to delete auth")?;

        Ok(())
    }
}
