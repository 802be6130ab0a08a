//! Access grant domain type.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use super::{AuthorizationData, Client};

/// One granted access/refresh token pair.
///
/// Both `access_token` and the (optional, possibly empty) `refresh_token` are
/// lookup keys for the same grant. When loaded from storage, `expires_in`
/// holds the remaining lifetime rather than the value given at save time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessData {
    /// Client the grant was issued to.
    pub client: Client,

    /// Authorization code the grant was exchanged for, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<AuthorizationData>,

    /// Grant this one replaced through a refresh, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<Box<AccessData>>,

    /// The access token.
    pub access_token: String,

    /// The refresh token. Empty for access-token-only grants.
    #[serde(default)]
    pub refresh_token: String,

    /// Lifetime of the grant in seconds.
    pub expires_in: i32,

    /// When the grant was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Granted scope.
    pub scope: String,

    /// Redirect URI of the originating request.
    pub redirect_uri: String,

    /// Data the engine associates with the grant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<serde_json::Value>,
}

impl AccessData {
    /// Creates a grant issued now without refresh token or linked records.
    #[must_use]
    pub fn new(client: Client, access_token: impl Into<String>, expires_in: i32) -> Self {
        let redirect_uri = client.redirect_uri.clone();
        Self {
            client,
            authorization: None,
            previous: None,
            access_token: access_token.into(),
            refresh_token: String::new(),
            expires_in,
            created_at: OffsetDateTime::now_utc(),
            scope: String::new(),
            redirect_uri,
            user_data: None,
        }
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = refresh_token.into();
        self
    }

    /// Links the authorization code this grant was exchanged for.
    #[must_use]
    pub fn with_authorization(mut self, authorization: AuthorizationData) -> Self {
        self.authorization = Some(authorization);
        self
    }

    /// Links the grant this one replaces.
    #[must_use]
    pub fn with_previous(mut self, previous: AccessData) -> Self {
        self.previous = Some(Box::new(previous));
        self
    }

    /// Returns `true` if the grant carries a refresh token.
    #[must_use]
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// Returns the instant at which the grant expires.
    #[must_use]
    pub fn expire_at(&self) -> OffsetDateTime {
        self.created_at + Duration::seconds(i64::from(self.expires_in))
    }

    /// Returns `true` if the grant has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }

    /// Returns `true` if the grant is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expire_at() < now
    }
}
