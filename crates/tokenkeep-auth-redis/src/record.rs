//! Persisted record shapes and their JSON encoding.
//!
//! Records refer to clients by identifier only. Converting a stored record
//! back into a domain type needs the referenced clients, which the caller
//! fetches live through the client store (see [`StoredAccess::client_ids`]).

use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use tokenkeep_auth::types::{AccessData, AuthorizationData, Client};

use crate::{ResultExt, StorageError, StorageResult};

/// Clients resolved for one load, keyed by client id.
pub type ClientMap = BTreeMap<String, Client>;

pub(crate) fn encode<T: Serialize>(value: &T, context: &'static str) -> StorageResult<Vec<u8>> {
    serde_json::to_vec(value).context(context)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8], context: &'static str) -> StorageResult<T> {
    serde_json::from_slice(bytes).context(context)
}

fn resolve(clients: &ClientMap, client_id: &str) -> StorageResult<Client> {
    clients
        .get(client_id)
        .cloned()
        .ok_or_else(|| StorageError::ClientNotFound(client_id.to_string()))
}

// =============================================================================
// Authorization
// =============================================================================

/// Authorization code as persisted under `{prefix}:auth:{code}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAuthorization {
    pub client_id: String,
    pub code: String,
    pub expires_in: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub scope: String,
    pub redirect_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<serde_json::Value>,
}

impl From<&AuthorizationData> for StoredAuthorization {
    fn from(data: &AuthorizationData) -> Self {
        Self {
            client_id: data.client.id.clone(),
            code: data.code.clone(),
            expires_in: data.expires_in,
            created_at: data.created_at,
            scope: data.scope.clone(),
            redirect_uri: data.redirect_uri.clone(),
            state: data.state.clone(),
            code_challenge: data.code_challenge.clone(),
            code_challenge_method: data.code_challenge_method.clone(),
            user_data: data.user_data.clone(),
        }
    }
}

impl StoredAuthorization {
    /// Rebuilds the domain record with its client taken from `clients`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ClientNotFound`] if the client is missing.
    pub fn into_authorization(self, clients: &ClientMap) -> StorageResult<AuthorizationData> {
        Ok(AuthorizationData {
            client: resolve(clients, &self.client_id)?,
            code: self.code,
            expires_in: self.expires_in,
            created_at: self.created_at,
            scope: self.scope,
            redirect_uri: self.redirect_uri,
            state: self.state,
            code_challenge: self.code_challenge,
            code_challenge_method: self.code_challenge_method,
            user_data: self.user_data,
        })
    }
}

// =============================================================================
// Access
// =============================================================================

/// Access grant as persisted under `{prefix}:access:{grant_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAccess {
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<StoredAuthorization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<Box<StoredAccess>>,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    pub expires_in: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub scope: String,
    pub redirect_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<serde_json::Value>,
}

impl From<&AccessData> for StoredAccess {
    fn from(data: &AccessData) -> Self {
        Self {
            client_id: data.client.id.clone(),
            authorization: data.authorization.as_ref().map(StoredAuthorization::from),
            previous: data
                .previous
                .as_deref()
                .map(|previous| Box::new(StoredAccess::from(previous))),
            access_token: data.access_token.clone(),
            refresh_token: data.refresh_token.clone(),
            expires_in: data.expires_in,
            created_at: data.created_at,
            scope: data.scope.clone(),
            redirect_uri: data.redirect_uri.clone(),
            user_data: data.user_data.clone(),
        }
    }
}

impl StoredAccess {
    /// Every client id referenced by this grant, its authorization and the
    /// chain of previous grants.
    #[must_use]
    pub fn client_ids(&self) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        let mut current = Some(self);
        while let Some(access) = current {
            ids.insert(access.client_id.clone());
            if let Some(authorization) = &access.authorization {
                ids.insert(authorization.client_id.clone());
            }
            current = access.previous.as_deref();
        }
        ids
    }

    /// Rebuilds the domain record with clients taken from `clients`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ClientNotFound`] if any referenced client is
    /// missing.
    pub fn into_access(self, clients: &ClientMap) -> StorageResult<AccessData> {
        Ok(AccessData {
            client: resolve(clients, &self.client_id)?,
            authorization: self
                .authorization
                .map(|authorization| authorization.into_authorization(clients))
                .transpose()?,
            previous: self
                .previous
                .map(|previous| previous.into_access(clients).map(Box::new))
                .transpose()?,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_in: self.expires_in,
            created_at: self.created_at,
            scope: self.scope,
            redirect_uri: self.redirect_uri,
            user_data: self.user_data,
        })
    }
}
