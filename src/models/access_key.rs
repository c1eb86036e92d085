//! Access keys: bucket-scoped credentials with a role.

use crate::auth::role::Role;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use std::fmt;

/// A stored access key. Only the one-way hash of the secret is kept.
#[derive(Serialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct AccessKey {
    #[serde(skip)]
    pub id: i64,

    /// The bucket this key is scoped to.
    #[serde(skip)]
    pub bucket_id: i64,

    /// Public key identifier, unique across the system.
    pub key_id: String,

    /// Base64 SHA-256 of the secret.
    #[serde(skip)]
    pub secret_hash: String,

    pub role: Role,

    pub created_at: DateTime<Utc>,
}

/// Plaintext secret handed out exactly once, when a key is issued.
///
/// `Debug` is redacted so the value cannot leak through logs.
#[derive(Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// A freshly issued key together with its plaintext secret.
#[derive(Serialize, Clone, Debug)]
pub struct IssuedKey {
    pub key_id: String,
    pub secret: Secret,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl IssuedKey {
    pub fn new(key: &AccessKey, secret: Secret) -> Self {
        Self {
            key_id: key.key_id.clone(),
            secret,
            role: key.role,
            created_at: key.created_at,
        }
    }
}
