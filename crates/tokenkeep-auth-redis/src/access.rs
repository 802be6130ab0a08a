//! Access grant storage.
//!
//! A grant is written as three keys sharing one expiry:
//!
//! - `{prefix}:access:{grant_id}` holds the record
//! - `{prefix}:access_token:{access_token}` holds `grant_id`
//! - `{prefix}:refresh_token:{refresh_token}` holds `grant_id` (omitted when
//!   the grant has no refresh token)
//!
//! Lookups go token -> grant id -> record. A missing pointer or a missing
//! record both load as `None`.
//!
//! In [`WriteMode::Atomic`] the writes of a save, and the deletes of a
//! removal, are sent as one MULTI/EXEC. The pointer lookup and record read
//! that precede a removal are not part of that transaction, so a concurrent
//! save or remove of the same grant can interleave with them.

use deadpool_redis::{Connection, Pool};
use redis::AsyncCommands;
use tracing::{Span, debug, field, instrument};
use uuid::Uuid;

use tokenkeep_auth::types::AccessData;

use crate::client::ClientStore;
use crate::config::WriteMode;
use crate::keys::{KeyBuilder, TokenKind};
use crate::record::{StoredAccess, decode, encode};
use crate::{ResultExt, StorageError, StorageResult, expiry_secs};

/// Access grant storage operations.
pub struct AccessStore<'a> {
    pool: &'a Pool,
    keys: &'a KeyBuilder,
    write_mode: WriteMode,
}

impl<'a> AccessStore<'a> {
    /// Create a new access store with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a Pool, keys: &'a KeyBuilder, write_mode: WriteMode) -> Self {
        Self {
            pool,
            keys,
            write_mode,
        }
    }

    /// Save a grant under a fresh grant id and register its tokens.
    ///
    /// Returns the generated grant id.
    ///
    /// # Errors
    ///
    /// Returns an error if `expires_in` is not positive, or if encoding or a
    /// Redis write fails. In [`WriteMode::Sequential`] writes that succeeded
    /// before the failure are left in place.
    #[instrument(
        skip(self, data),
        fields(client_id = %data.client.id, grant_id = field::Empty)
    )]
    pub async fn save(&self, data: &AccessData) -> StorageResult<String> {
        let ttl_secs = expiry_secs("access", data.expires_in)?;
        let payload = encode(&StoredAccess::from(data), "failed to encode access")?;

        let grant_id = Uuid::new_v4().to_string();
        Span::current().record("grant_id", grant_id.as_str());

        let access_key = self.keys.access(&grant_id);
        let access_token_key = self.keys.token(TokenKind::Access, &data.access_token);
        let refresh_token_key = data
            .has_refresh_token()
            .then(|| self.keys.token(TokenKind::Refresh, &data.refresh_token));

        let mut conn = self.pool.get().await.context("failed to save access")?;
        match self.write_mode {
            WriteMode::Atomic => {
                let mut pipe = redis::pipe();
                pipe.atomic()
                    .set_ex(&access_key, payload, ttl_secs)
                    .ignore()
                    .set_ex(&access_token_key, &grant_id, ttl_secs)
                    .ignore();
                if let Some(key) = &refresh_token_key {
                    pipe.set_ex(key, &grant_id, ttl_secs).ignore();
                }
                pipe.query_async::<()>(&mut conn)
                    .await
                    .context("failed to save access")?;
            }
            WriteMode::Sequential => {
                conn.set_ex::<_, _, ()>(&access_key, payload, ttl_secs)
                    .await
                    .context("failed to save access")?;
                conn.set_ex::<_, _, ()>(&access_token_key, &grant_id, ttl_secs)
                    .await
                    .context("failed to register access token")?;
                if let Some(key) = &refresh_token_key {
                    conn.set_ex::<_, _, ()>(key, &grant_id, ttl_secs)
                        .await
                        .context("failed to register refresh token")?;
                }
            }
        }

        debug!(
            ttl_secs,
            refresh = refresh_token_key.is_some(),
            "access saved"
        );
        Ok(grant_id)
    }

    /// Load a grant by access token.
    ///
    /// # Errors
    ///
    /// See [`AccessStore::load_by_token`].
    pub async fn load_by_access_token(&self, token: &str) -> StorageResult<Option<AccessData>> {
        self.load_by_token(TokenKind::Access, token).await
    }

    /// Load a grant by refresh token.
    ///
    /// # Errors
    ///
    /// See [`AccessStore::load_by_token`].
    pub async fn load_by_refresh_token(&self, token: &str) -> StorageResult<Option<AccessData>> {
        self.load_by_token(TokenKind::Refresh, token).await
    }

    /// Remove a grant by access token.
    ///
    /// # Errors
    ///
    /// See [`AccessStore::remove_by_token`].
    pub async fn remove_by_access_token(&self, token: &str) -> StorageResult<()> {
        self.remove_by_token(TokenKind::Access, token).await
    }

    /// Remove a grant by refresh token.
    ///
    /// # Errors
    ///
    /// See [`AccessStore::remove_by_token`].
    pub async fn remove_by_refresh_token(&self, token: &str) -> StorageResult<()> {
        self.remove_by_token(TokenKind::Refresh, token).await
    }

    /// Resolve `token` to its grant and load it.
    ///
    /// `expires_in` of the returned grant is the record key's remaining TTL.
    /// Clients referenced by the grant, its authorization and its previous
    /// grants are fetched live.
    ///
    /// # Errors
    ///
    /// Returns an error if a Redis read fails, the record cannot be decoded,
    /// or a referenced client no longer exists.
    #[instrument(skip(self, token))]
    pub async fn load_by_token(
        &self,
        kind: TokenKind,
        token: &str,
    ) -> StorageResult<Option<AccessData>> {
        let stored = {
            let mut conn = self.pool.get().await.context("unable to GET access")?;

            let Some(grant_id) = self.resolve_pointer(&mut conn, kind, token).await? else {
                debug!("token not registered");
                return Ok(None);
            };

            let access_key = self.keys.access(&grant_id);
            let (raw, ttl) = redis::pipe()
                .atomic()
                .get(&access_key)
                .ttl(&access_key)
                .query_async::<(Option<Vec<u8>>, i64)>(&mut conn)
                .await
                .context("unable to get access record")?;

            let Some(bytes) = raw else {
                debug!(%grant_id, "access record expired");
                return Ok(None);
            };

            let mut stored: StoredAccess = decode(&bytes, "failed to decode access")?;
            if let Some(remaining) = remaining_secs(ttl) {
                stored.expires_in = remaining;
            }
            stored
        };

        let clients = ClientStore::new(self.pool, self.keys)
            .resolve(stored.client_ids())
            .await?;
        stored.into_access(&clients).map(Some)
    }

    /// Resolve `token` to its grant and delete the record and both pointers.
    ///
    /// If the pointer exists but the record has already expired, only the
    /// pointer is deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::TokenNotFound`] if `token` is not registered.
    /// Returns an error if a Redis command fails or the record cannot be
    /// decoded.
    #[instrument(skip(self, token))]
    pub async fn remove_by_token(&self, kind: TokenKind, token: &str) -> StorageResult<()> {
        let mut conn = self.pool.get().await.context("failed to get access")?;

        let grant_id = self
            .resolve_pointer(&mut conn, kind, token)
            .await?
            .ok_or(StorageError::TokenNotFound(kind))?;

        let access_key = self.keys.access(&grant_id);
        let raw = conn
            .get::<_, Option<Vec<u8>>>(&access_key)
            .await
            .context("unable to load access for removal")?;

        let Some(bytes) = raw else {
            conn.del::<_, ()>(self.keys.token(kind, token))
                .await
                .context("failed to deregister token")?;
            debug!(%grant_id, "removed token of expired access record");
            return Ok(());
        };
        let stored: StoredAccess = decode(&bytes, "unable to load access for removal")?;

        let access_token_key = self.keys.token(TokenKind::Access, &stored.access_token);
        let refresh_token_key = (!stored.refresh_token.is_empty())
            .then(|| self.keys.token(TokenKind::Refresh, &stored.refresh_token));

        match self.write_mode {
            WriteMode::Atomic => {
                let mut pipe = redis::pipe();
                pipe.atomic()
                    .del(&access_key)
                    .ignore()
                    .del(&access_token_key)
                    .ignore();
                if let Some(key) = &refresh_token_key {
                    pipe.del(key).ignore();
                }
                pipe.query_async::<()>(&mut conn)
                    .await
                    .context("failed to delete access")?;
            }
            WriteMode::Sequential => {
                conn.del::<_, ()>(&access_key)
                    .await
                    .context("failed to delete access")?;
                conn.del::<_, ()>(&access_token_key)
                    .await
                    .context("failed to deregister access token")?;
                if let Some(key) = &refresh_token_key {
                    conn.del::<_, ()>(key)
                        .await
                        .context("failed to deregister refresh token")?;
                }
            }
        }

        debug!(%grant_id, "access removed");
        Ok(())
    }

    async fn resolve_pointer(
        &self,
        conn: &mut Connection,
        kind: TokenKind,
        token: &str,
    ) -> StorageResult<Option<String>> {
        conn.get::<_, Option<String>>(self.keys.token(kind, token))
            .await
            .context("unable to get access ID")
    }
}

/// Remaining lifetime reported by `TTL`, or `None` for a key without expiry.
fn remaining_secs(ttl: i64) -> Option<i32> {
    (ttl >= 0).then(|| i32::try_from(ttl).unwrap_or(i32::MAX))
}
