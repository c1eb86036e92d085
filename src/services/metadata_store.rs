//! Row persistence for buckets and objects.
//!
//! Each call is one SQL round trip. Uniqueness and foreign-key constraints in
//! the schema are the only concurrency control; callers classify violations
//! with [`is_unique_violation`] and [`is_foreign_key_violation`].

use chrono::{DateTime, Utc};
use sqlx::{Executor, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;

use crate::models::{bucket::Bucket, object::Object};

/// Object row to insert. The file path starts out as an empty placeholder.
#[derive(Debug, Clone)]
pub struct NewObject<'a> {
    pub bucket_id: i64,
    pub object_key: &'a str,
    pub size: i64,
    pub content_type: &'a str,
    pub checksum: &'a str,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct MetadataStore {
    db: Arc<SqlitePool>,
}

impl MetadataStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub async fn bucket_by_name(&self, name: &str) -> Result<Option<Bucket>, sqlx::Error> {
        sqlx::query_as::<_, Bucket>("SELECT id, name, created_at FROM buckets WHERE name = ?")
            .bind(name)
            .fetch_optional(&*self.db)
            .await
    }

    pub async fn list_buckets(&self) -> Result<Vec<Bucket>, sqlx::Error> {
        sqlx::query_as::<_, Bucket>("SELECT id, name, created_at FROM buckets ORDER BY name")
            .fetch_all(&*self.db)
            .await
    }

    pub async fn insert_bucket<'e, E>(
        &self,
        executor: E,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Bucket, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Bucket>(
            "INSERT INTO buckets (name, created_at) VALUES (?, ?)
             RETURNING id, name, created_at",
        )
        .bind(name)
        .bind(created_at)
        .fetch_one(executor)
        .await
    }

    /// Fails with a foreign-key violation while keys or objects remain.
    pub async fn delete_bucket(&self, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM buckets WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn insert_object(&self, object: &NewObject<'_>) -> Result<Object, sqlx::Error> {
        sqlx::query_as::<_, Object>(
            "INSERT INTO objects (
                bucket_id, object_key, file_path, size, content_type, checksum, created_at
             ) VALUES (?, ?, '', ?, ?, ?, ?)
             RETURNING id, bucket_id, object_key, file_path, size, content_type,
                       checksum, created_at",
        )
        .bind(object.bucket_id)
        .bind(object.object_key)
        .bind(object.size)
        .bind(object.content_type)
        .bind(object.checksum)
        .bind(object.created_at)
        .fetch_one(&*self.db)
        .await
    }

    pub async fn set_object_path(&self, id: i64, file_path: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE objects SET file_path = ? WHERE id = ?")
            .bind(file_path)
            .bind(id)
            .execute(&*self.db)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_object(&self, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM objects WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn object_by_key(
        &self,
        bucket_id: i64,
        object_key: &str,
    ) -> Result<Option<Object>, sqlx::Error> {
        sqlx::query_as::<_, Object>(
            "SELECT id, bucket_id, object_key, file_path, size, content_type, checksum, created_at
             FROM objects
             WHERE bucket_id = ? AND object_key = ?",
        )
        .bind(bucket_id)
        .bind(object_key)
        .fetch_optional(&*self.db)
        .await
    }

    pub async fn list_objects(&self, bucket_id: i64) -> Result<Vec<Object>, sqlx::Error> {
        sqlx::query_as::<_, Object>(
            "SELECT id, bucket_id, object_key, file_path, size, content_type, checksum, created_at
             FROM objects
             WHERE bucket_id = ?
             ORDER BY id",
        )
        .bind(bucket_id)
        .fetch_all(&*self.db)
        .await
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Return true if SQLx error indicates a foreign key constraint violation.
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}
