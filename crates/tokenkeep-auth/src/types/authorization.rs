//! Authorization code domain type.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use super::Client;

/// One issued authorization code.
///
/// Storage backends persist the client by identifier and resolve it again on
/// every load, so `client` always reflects the currently stored registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationData {
    /// Client the code was issued to.
    pub client: Client,

    /// The authorization code.
    pub code: String,

    /// Lifetime of the code in seconds.
    pub expires_in: i32,

    /// When the code was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Requested scope.
    pub scope: String,

    /// Redirect URI of the authorization request.
    pub redirect_uri: String,

    /// Opaque state from the authorization request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// PKCE code challenge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// PKCE code challenge method (`plain` or `S256`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<String>,

    /// Data the engine associates with the authorization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<serde_json::Value>,
}

impl AuthorizationData {
    /// Creates authorization data issued now, with empty scope and no state.
    #[must_use]
    pub fn new(client: Client, code: impl Into<String>, expires_in: i32) -> Self {
        let redirect_uri = client.redirect_uri.clone();
        Self {
            client,
            code: code.into(),
            expires_in,
            created_at: OffsetDateTime::now_utc(),
            scope: String::new(),
            redirect_uri,
            state: None,
            code_challenge: None,
            code_challenge_method: None,
            user_data: None,
        }
    }

    /// Returns the instant at which the code expires.
    #[must_use]
    pub fn expire_at(&self) -> OffsetDateTime {
        self.created_at + Duration::seconds(i64::from(self.expires_in))
    }

    /// Returns `true` if the code has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }

    /// Returns `true` if the code is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expire_at() < now
    }
}
