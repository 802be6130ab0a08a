//! Redis storage backend for Tokenkeep Auth
//!
//! Provides persistent storage for:
//!
//! - OAuth clients (no expiry)
//! - Authorization codes (native key expiry)
//! - Access grants, reachable by access token and by refresh token
//!
//! All keys live under a caller-chosen prefix, see [`keys`] for the layout.
//! Every operation checks one connection out of a shared `deadpool_redis`
//! pool and returns it when the operation completes.
//!
//! # Example
//!
//! ```ignore
//! use tokenkeep_auth::storage::{AccessStorage, ClientStorage};
//! use tokenkeep_auth_redis::{RedisAuthStorage, RedisStorageConfig};
//!
//! let storage = RedisAuthStorage::connect(&RedisStorageConfig::default()).await?;
//!
//! storage.create_client(&client).await?;
//! let grant = storage.load_access("access-token").await?;
//! ```

pub mod access;
pub mod authorization;
pub mod client;
pub mod config;
pub mod keys;
pub mod oauth_storage;
pub mod record;

use std::fmt;

use deadpool_redis::Pool;
use tracing::info;

pub use access::AccessStore;
pub use authorization::AuthorizationStore;
pub use client::ClientStore;
pub use config::{ConfigError, RedisStorageConfig, WriteMode};
pub use keys::{KeyBuilder, Namespace, TokenKind};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during auth storage operations.
///
/// Store and decode failures carry the logical step that failed, e.g.
/// `failed to save access: <cause>`.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A Redis command failed.
    #[error("{context}: {source}")]
    Redis {
        context: &'static str,
        #[source]
        source: redis::RedisError,
    },

    /// No connection could be checked out of the pool.
    #[error("{context}: {source}")]
    Pool {
        context: &'static str,
        #[source]
        source: deadpool_redis::PoolError,
    },

    /// The connection pool could not be built.
    #[error("Failed to create Redis pool: {0}")]
    CreatePool(#[from] deadpool_redis::CreatePoolError),

    /// Serialization/deserialization failed.
    #[error("{context}: {source}")]
    Serialization {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A record was saved with a non-positive lifetime.
    #[error("Invalid expiry for {entity}: {expires_in} seconds (must be > 0)")]
    InvalidExpiry {
        entity: &'static str,
        expires_in: i32,
    },

    /// A token handed to a removal does not resolve to a grant.
    #[error("No grant registered for {0}")]
    TokenNotFound(TokenKind),

    /// A stored record refers to a client that no longer exists.
    #[error("Client not found: {0}")]
    ClientNotFound(String),

    /// Invalid storage configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StorageError {
    // -------------------------------------------------------------------------
    // Predicate Methods
    // -------------------------------------------------------------------------

    /// Returns `true` if a token or client reference did not resolve.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TokenNotFound(_) | Self::ClientNotFound(_))
    }

    /// Returns `true` if this is a Redis command or connection error.
    #[must_use]
    pub fn is_redis_error(&self) -> bool {
        matches!(self, Self::Redis { .. } | Self::Pool { .. })
    }

    /// Returns `true` if this is a serialization error.
    #[must_use]
    pub fn is_serialization_error(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }

    /// Returns `true` if this is a client error (4xx equivalent).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::TokenNotFound(_) | Self::ClientNotFound(_) | Self::InvalidExpiry { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx equivalent).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Attaches the failing step to a Redis, pool or serialization error.
pub(crate) trait ResultExt<T> {
    fn context(self, context: &'static str) -> StorageResult<T>;
}

impl<T> ResultExt<T> for Result<T, redis::RedisError> {
    fn context(self, context: &'static str) -> StorageResult<T> {
        self.map_err(|source| StorageError::Redis { context, source })
    }
}

impl<T> ResultExt<T> for Result<T, deadpool_redis::PoolError> {
    fn context(self, context: &'static str) -> StorageResult<T> {
        self.map_err(|source| StorageError::Pool { context, source })
    }
}

impl<T> ResultExt<T> for Result<T, serde_json::Error> {
    fn context(self, context: &'static str) -> StorageResult<T> {
        self.map_err(|source| StorageError::Serialization { context, source })
    }
}

/// Converts a record lifetime into a Redis expiry.
pub(crate) fn expiry_secs(entity: &'static str, expires_in: i32) -> StorageResult<u64> {
    u64::try_from(expires_in)
        .ok()
        .filter(|secs| *secs > 0)
        .ok_or(StorageError::InvalidExpiry { entity, expires_in })
}

// =============================================================================
// Redis Auth Storage
// =============================================================================

/// Redis storage backend for authentication data.
///
/// Holds the shared connection pool and the key layout, and hands out the
/// specialized stores for each entity. Cloning is cheap and shares the pool.
#[derive(Clone)]
pub struct RedisAuthStorage {
    pool: Pool,
    keys: KeyBuilder,
    write_mode: WriteMode,
}

impl fmt::Debug for RedisAuthStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisAuthStorage")
            .field("prefix", &self.keys.prefix())
            .field("write_mode", &self.write_mode)
            .field("pool", &self.pool.status())
            .finish()
    }
}

impl RedisAuthStorage {
    /// Create new storage with an existing connection pool.
    #[must_use]
    pub fn new(pool: Pool, key_prefix: impl AsRef<str>) -> Self {
        Self {
            pool,
            keys: KeyBuilder::new(key_prefix),
            write_mode: WriteMode::default(),
        }
    }

    /// Sets how multi-key grant writes are sent.
    #[must_use]
    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    /// Create new storage from configuration and verify the server is
    /// reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the pool cannot be
    /// built, or no connection can be opened.
    pub async fn connect(config: &RedisStorageConfig) -> StorageResult<Self> {
        let pool = config.create_pool()?;

        info!(url = %config.url, prefix = %config.key_prefix, "Connecting to Redis");
        drop(pool.get().await.context("unable to connect to Redis")?);

        Ok(Self::new(pool, &config.key_prefix).with_write_mode(config.write_mode))
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Get the key layout.
    #[must_use]
    pub fn keys(&self) -> &KeyBuilder {
        &self.keys
    }

    #[must_use]
    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    // -------------------------------------------------------------------------
    // Storage Accessors
    // -------------------------------------------------------------------------

    /// Get client storage operations.
    #[must_use]
    pub fn clients(&self) -> ClientStore<'_> {
        ClientStore::new(&self.pool, &self.keys)
    }

    /// Get authorization code storage operations.
    #[must_use]
    pub fn authorizations(&self) -> AuthorizationStore<'_> {
        AuthorizationStore::new(&self.pool, &self.keys)
    }

    /// Get access grant storage operations.
    #[must_use]
    pub fn access(&self) -> AccessStore<'_> {
        AccessStore::new(&self.pool, &self.keys, self.write_mode)
    }
}

// =============================================================================
// Tests
// =============================================================================
