//! Represents an object (blob) stored in a bucket.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Metadata row for a single object.
///
/// The bytes live in a separate file whose location is derived from
/// `bucket_id` and `id`. While an upload is in flight `file_path` holds an
/// empty placeholder; it is finalized once the content has been written.
#[derive(Serialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct Object {
    /// Store-assigned identifier; also the on-disk filename.
    #[serde(skip)]
    pub id: i64,

    /// Foreign key linking to the parent bucket.
    #[serde(skip)]
    pub bucket_id: i64,

    /// Object key (path-like identifier within the bucket).
    pub object_key: String,

    /// Physical location of the content.
    #[serde(skip)]
    pub file_path: String,

    /// Size in bytes.
    pub size: i64,

    /// Content type (MIME type).
    pub content_type: String,

    /// Hex MD5 of the content.
    pub checksum: String,

    /// Timestamp when the object was created.
    pub created_at: DateTime<Utc>,
}

impl Object {
    /// True while the row still carries the placeholder written before the
    /// content reached disk.
    pub fn has_placeholder_path(&self) -> bool {
        self.file_path.is_empty()
    }
}
