//! OAuth client storage.
//!
//! Clients live under `{prefix}:client:{id}` with no expiry. Create and
//! update are the same full overwrite; delete is idempotent.

use deadpool_redis::Pool;
use redis::AsyncCommands;
use tracing::{debug, instrument};

use tokenkeep_auth::types::Client;

use crate::keys::KeyBuilder;
use crate::record::{ClientMap, decode, encode};
use crate::{ResultExt, StorageResult};

/// Client storage operations.
pub struct ClientStore<'a> {
    pool: &'a Pool,
    keys: &'a KeyBuilder,
}

impl<'a> ClientStore<'a> {
    /// Create a new client store with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a Pool, keys: &'a KeyBuilder) -> Self {
        Self { pool, keys }
    }

    /// Write a client, replacing any client with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the Redis write fails.
    #[instrument(skip(self, client), fields(client_id = %client.id))]
    pub async fn put(&self, client: &Client) -> StorageResult<()> {
        let key = self.keys.client(&client.id);
        let payload = encode(client, "failed to encode client")?;

        let mut conn = self.pool.get().await.context("failed to save client")?;
        conn.set::<_, _, ()>(&key, payload)
            .await
            .context("failed to save client")?;

        debug!(key = %key, "client saved");
        Ok(())
    }

    /// Find a client by id.
    ///
    /// Returns `None` if no client is stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis read fails or the record cannot be decoded.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> StorageResult<Option<Client>> {
        let key = self.keys.client(id);

        let mut conn = self.pool.get().await.context("unable to GET client")?;
        let raw = conn
            .get::<_, Option<Vec<u8>>>(&key)
            .await
            .context("unable to GET client")?;

        match raw {
            Some(bytes) => decode(&bytes, "failed to decode client").map(Some),
            None => {
                debug!(key = %key, "client not found");
                Ok(None)
            }
        }
    }

    /// Delete a client. Deleting an absent client succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis delete fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> StorageResult<()> {
        let key = self.keys.client(id);

        let mut conn = self.pool.get().await.context("failed to delete client")?;
        conn.del::<_, ()>(&key)
            .await
            .context("failed to delete client")?;

        debug!(key = %key, "client deleted");
        Ok(())
    }

    /// Fetch every client in `ids` that exists.
    ///
    /// Ids with no stored client are left out of the map.
    ///
    /// # Errors
    ///
    /// Returns an error if any read fails.
    pub async fn resolve<I>(&self, ids: I) -> StorageResult<ClientMap>
    where
        I: IntoIterator<Item = String>,
    {
        let mut clients = ClientMap::new();
        for id in ids {
            if let Some(client) = self.get(&id).await? {
                clients.insert(id, client);
            }
        }
        Ok(clients)
    }
}
