//! Represents a logical bucket, the container that scopes keys and objects.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A storage bucket.
///
/// Buckets own access keys and objects. A bucket can only be deleted once it
/// owns neither; the foreign keys in the schema enforce that.
#[derive(Serialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct Bucket {
    /// Store-assigned identifier. Used to derive on-disk paths, never exposed.
    #[serde(skip)]
    pub id: i64,

    /// Unique, externally visible bucket name.
    pub name: String,

    /// When this bucket was created.
    pub created_at: DateTime<Utc>,
}
