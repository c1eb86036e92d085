//! Persistence for access keys.
//!
//! Pure data access: lookups, inserts and deletes against `access_keys`.
//! Policy (hashing, role checks, scoping) lives in `auth`.

use chrono::{DateTime, Utc};
use sqlx::{Executor, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;

use crate::{auth::role::Role, models::access_key::AccessKey};

/// Row to insert; the secret is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccessKey {
    pub bucket_id: i64,
    pub key_id: String,
    pub secret_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct CredentialStore {
    db: Arc<SqlitePool>,
}

impl CredentialStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub async fn find_by_key_id(&self, key_id: &str) -> Result<Option<AccessKey>, sqlx::Error> {
        sqlx::query_as::<_, AccessKey>(
            "SELECT id, bucket_id, key_id, secret_hash, role, created_at
             FROM access_keys WHERE key_id = ?",
        )
        .bind(key_id)
        .fetch_optional(&*self.db)
        .await
    }

    pub async fn list_by_bucket(&self, bucket_id: i64) -> Result<Vec<AccessKey>, sqlx::Error> {
        sqlx::query_as::<_, AccessKey>(
            "SELECT id, bucket_id, key_id, secret_hash, role, created_at
             FROM access_keys WHERE bucket_id = ? ORDER BY id",
        )
        .bind(bucket_id)
        .fetch_all(&*self.db)
        .await
    }

    /// Insert a key. Accepts the pool or an open transaction.
    pub async fn create<'e, E>(&self, executor: E, key: &NewAccessKey) -> Result<AccessKey, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, AccessKey>(
            "INSERT INTO access_keys (bucket_id, key_id, secret_hash, role, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id, bucket_id, key_id, secret_hash, role, created_at",
        )
        .bind(key.bucket_id)
        .bind(&key.key_id)
        .bind(&key.secret_hash)
        .bind(key.role)
        .bind(key.created_at)
        .fetch_one(executor)
        .await
    }

    /// Delete the key holding `role` in `bucket_id`. Returns rows removed.
    pub async fn delete_by_role<'e, E>(
        &self,
        executor: E,
        bucket_id: i64,
        role: Role,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM access_keys WHERE bucket_id = ? AND role = ?")
            .bind(bucket_id)
            .bind(role)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Shorthand for [`Self::delete_by_role`] outside a transaction.
    pub async fn delete_role(&self, bucket_id: i64, role: Role) -> Result<u64, sqlx::Error> {
        self.delete_by_role(&*self.db, bucket_id, role).await
    }
}
