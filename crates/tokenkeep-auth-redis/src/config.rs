//! Redis storage configuration.

use std::time::Duration;

use deadpool_redis::{Pool, Runtime};
use serde::{Deserialize, Serialize};

use crate::StorageResult;

/// How the multi-key writes of an access grant are sent to Redis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// One MULTI/EXEC transaction per save or remove.
    #[default]
    Atomic,
    /// Independent commands in order. A failure leaves earlier writes in
    /// place.
    Sequential,
}

/// Redis storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedisStorageConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_url")]
    pub url: String,

    /// Prefix of every key written by the storage
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Connection pool size
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Connection checkout/create timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Write mode for access grants
    #[serde(default)]
    pub write_mode: WriteMode,
}

fn default_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "tokenkeep".to_string()
}

fn default_pool_size() -> usize {
    10
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for RedisStorageConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            key_prefix: default_key_prefix(),
            pool_size: default_pool_size(),
            timeout_ms: default_timeout_ms(),
            write_mode: WriteMode::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// The configuration sources could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(String),
}

impl RedisStorageConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The URL or key prefix is empty
    /// - The key prefix contains `:` (the key segment separator)
    /// - The pool size or timeout is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::InvalidValue("url cannot be empty".to_string()));
        }
        if self.key_prefix.is_empty() {
            return Err(ConfigError::InvalidValue(
                "key_prefix cannot be empty".to_string(),
            ));
        }
        if self.key_prefix.contains(':') {
            return Err(ConfigError::InvalidValue(format!(
                "key_prefix '{}' must not contain ':'",
                self.key_prefix
            )));
        }
        if self.pool_size == 0 {
            return Err(ConfigError::InvalidValue(
                "pool_size must be > 0".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds a connection pool from this configuration.
    ///
    /// No connection is opened until the pool is first used.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the pool cannot be
    /// created (e.g. a malformed URL).
    pub fn create_pool(&self) -> StorageResult<Pool> {
        self.validate()?;

        let timeout = Some(Duration::from_millis(self.timeout_ms));
        let mut pool_config = deadpool_redis::PoolConfig::new(self.pool_size);
        pool_config.timeouts.wait = timeout;
        pool_config.timeouts.create = timeout;
        pool_config.timeouts.recycle = timeout;

        let mut redis_config = deadpool_redis::Config::from_url(&self.url);
        redis_config.pool = Some(pool_config);

        Ok(redis_config.create_pool(Some(Runtime::Tokio1))?)
    }
}

pub mod loader {
    use super::{ConfigError, RedisStorageConfig};
    use config::{Config, Environment, File};
    use std::path::Path;

    /// Loads the configuration from an optional TOML file with environment
    /// overrides, e.g. `TOKENKEEP__KEY_PREFIX=oauth`.
    ///
    /// A path that does not exist is skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the merged
    /// configuration is invalid.
    pub fn load_config(path: Option<&Path>) -> Result<RedisStorageConfig, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path
            && path.exists()
        {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix("TOKENKEEP")
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__"),
        );

        let merged: RedisStorageConfig = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        merged.validate()?;
        Ok(merged)
    }
}
