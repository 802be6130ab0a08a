//! OAuth 2.0 Client domain type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Application data attached to a client registration.
///
/// Keys are free-form; values are arbitrary JSON so the map round-trips
/// through storage without losing shape.
pub type ClientExtra = BTreeMap<String, serde_json::Value>;

/// OAuth 2.0 client registration.
///
/// The `id` is supplied by the caller and is the only key under which the
/// client is stored. Other records refer to a client by this identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Unique client identifier used in OAuth flows.
    pub id: String,

    /// Client secret.
    pub secret: String,

    /// Registered redirect URI.
    pub redirect_uri: String,

    /// Extra application data.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: ClientExtra,
}

impl Client {
    /// Creates a client with no extra data.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
            redirect_uri: redirect_uri.into(),
            extra: ClientExtra::new(),
        }
    }

    /// Adds one entry of extra application data.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Looks up one entry of extra application data.
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key)
    }
}
