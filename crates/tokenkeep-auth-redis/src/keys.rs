//! Redis key layout.
//!
//! Every key has the form `{prefix}:{namespace}:{identifier}`:
//!
//! | Namespace       | Identifier         | Value                  | Expiry        |
//! |-----------------|--------------------|------------------------|---------------|
//! | `client`        | client id          | client record          | none          |
//! | `auth`          | authorization code | authorization record   | `expires_in`  |
//! | `access`        | grant id           | access record          | `expires_in`  |
//! | `access_token`  | access token       | grant id               | `expires_in`  |
//! | `refresh_token` | refresh token      | grant id               | `expires_in`  |

use std::fmt;
use std::sync::Arc;

/// Key namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Client,
    Auth,
    Access,
    AccessToken,
    RefreshToken,
}

impl Namespace {
    /// Returns the namespace segment used in keys.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Auth => "auth",
            Self::Access => "access",
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two token kinds that index an access grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Namespace holding the pointer keys for this token kind.
    #[must_use]
    pub fn namespace(&self) -> Namespace {
        match self {
            Self::Access => Namespace::AccessToken,
            Self::Refresh => Namespace::RefreshToken,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access => f.write_str("access token"),
            Self::Refresh => f.write_str("refresh token"),
        }
    }
}

/// Builds namespaced keys under a fixed prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    prefix: Arc<str>,
}

impl KeyBuilder {
    #[must_use]
    pub fn new(prefix: impl AsRef<str>) -> Self {
        Self {
            prefix: Arc::from(prefix.as_ref()),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Builds `{prefix}:{namespace}:{id}`.
    #[must_use]
    pub fn key(&self, namespace: Namespace, id: &str) -> String {
        format!("{}:{}:{}", self.prefix, namespace, id)
    }

    #[must_use]
    pub fn client(&self, id: &str) -> String {
        self.key(Namespace::Client, id)
    }

    #[must_use]
    pub fn auth(&self, code: &str) -> String {
        self.key(Namespace::Auth, code)
    }

    #[must_use]
    pub fn access(&self, grant_id: &str) -> String {
        self.key(Namespace::Access, grant_id)
    }

    #[must_use]
    pub fn token(&self, kind: TokenKind, token: &str) -> String {
        self.key(kind.namespace(), token)
    }
}
