//! Bucket administration: creation with its three keys, deletion, key rotation.

use chrono::Utc;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use std::{io::ErrorKind, sync::Arc};
use tokio::fs;
use tracing::{debug, info};

use crate::{
    auth::{gate::Identity, role::Role, secret},
    errors::{GatewayError, GatewayResult},
    models::{
        access_key::{AccessKey, IssuedKey},
        bucket::Bucket,
    },
    services::{
        credential_store::{CredentialStore, NewAccessKey},
        metadata_store::{MetadataStore, is_foreign_key_violation, is_unique_violation},
        path_resolver::PathResolver,
    },
};

/// A new bucket plus the plaintext secrets of its keys. Shown once.
#[derive(Serialize, Clone, Debug)]
pub struct CreatedBucket {
    #[serde(flatten)]
    pub bucket: Bucket,
    pub access_keys: Vec<IssuedKey>,
}

#[derive(Clone)]
pub struct BucketService {
    db: Arc<SqlitePool>,
    metadata: MetadataStore,
    credentials: CredentialStore,
    resolver: PathResolver,
}

impl BucketService {
    pub fn new(
        db: Arc<SqlitePool>,
        metadata: MetadataStore,
        credentials: CredentialStore,
        resolver: PathResolver,
    ) -> Self {
        Self {
            db,
            metadata,
            credentials,
            resolver,
        }
    }

    /// Create a bucket and one key per role in a single transaction.
    pub async fn create(&self, name: &str) -> GatewayResult<CreatedBucket> {
        ensure_bucket_name_safe(name)?;

        let mut tx = self.db.begin().await?;
        let bucket = match self.metadata.insert_bucket(&mut *tx, name, Utc::now()).await {
            Ok(bucket) => bucket,
            Err(err) if is_unique_violation(&err) => {
                return Err(GatewayError::conflict(format!("bucket `{}` already exists", name)));
            }
            Err(err) => return Err(err.into()),
        };

        let mut access_keys = Vec::with_capacity(Role::ALL.len());
        for role in Role::ALL {
            access_keys.push(self.issue_key(&mut tx, bucket.id, role).await?);
        }
        tx.commit().await?;

        info!(bucket = %bucket.name, bucket_id = bucket.id, "bucket created");
        Ok(CreatedBucket {
            bucket,
            access_keys,
        })
    }

    pub async fn get(&self, name: &str) -> GatewayResult<Bucket> {
        self.metadata
            .bucket_by_name(name)
            .await?
            .ok_or_else(|| GatewayError::not_found(format!("bucket `{}`", name)))
    }

    /// Buckets `identity` may see: its own, or all of them for the superuser.
    pub async fn list_visible(&self, identity: &Identity) -> GatewayResult<Vec<Bucket>> {
        let buckets = self.metadata.list_buckets().await?;
        Ok(buckets
            .into_iter()
            .filter(|bucket| identity.can_access(bucket.id))
            .collect())
    }

    /// Delete an empty bucket. Keys and objects must be gone first.
    pub async fn delete(&self, name: &str) -> GatewayResult<()> {
        let bucket = self.get(name).await?;

        match self.metadata.delete_bucket(bucket.id).await {
            Ok(0) => return Err(GatewayError::not_found(format!("bucket `{}`", name))),
            Ok(_) => {}
            Err(err) if is_foreign_key_violation(&err) => {
                return Err(GatewayError::conflict(format!("bucket `{}` not empty", name)));
            }
            Err(err) => return Err(err.into()),
        }

        let bucket_dir = self.resolver.bucket_dir(bucket.id);
        if let Err(err) = fs::remove_dir_all(&bucket_dir).await {
            if err.kind() != ErrorKind::NotFound {
                debug!(
                    "failed to remove bucket directory {} after delete: {}",
                    bucket_dir.display(),
                    err
                );
            }
        }

        info!(bucket = name, bucket_id = bucket.id, "bucket deleted");
        Ok(())
    }

    pub async fn list_keys(&self, name: &str) -> GatewayResult<Vec<AccessKey>> {
        let bucket = self.get(name).await?;
        Ok(self.credentials.list_by_bucket(bucket.id).await?)
    }

    /// Replace the key for `role` with a fresh one. The old secret stops working.
    pub async fn recreate_key(&self, name: &str, role: Role) -> GatewayResult<IssuedKey> {
        let bucket = self.get(name).await?;

        let mut tx = self.db.begin().await?;
        self.credentials
            .delete_by_role(&mut *tx, bucket.id, role)
            .await?;
        let issued = match self.issue_key(&mut tx, bucket.id, role).await {
            Ok(issued) => issued,
            Err(GatewayError::StorageFailure(fault)) if fault.is_unique_violation() => {
                return Err(GatewayError::conflict(format!(
                    "{} key for bucket `{}` was recreated concurrently",
                    role, name
                )));
            }
            Err(err) => return Err(err),
        };
        tx.commit().await?;

        info!(bucket = name, role = %role, key_id = %issued.key_id, "access key recreated");
        Ok(issued)
    }

    pub async fn delete_key(&self, name: &str, role: Role) -> GatewayResult<()> {
        let bucket = self.get(name).await?;
        if self.credentials.delete_role(bucket.id, role).await? == 0 {
            return Err(GatewayError::not_found(format!(
                "{} key for bucket `{}`",
                role, name
            )));
        }
        info!(bucket = name, role = %role, "access key deleted");
        Ok(())
    }

    async fn issue_key(
        &self,
        conn: &mut SqliteConnection,
        bucket_id: i64,
        role: Role,
    ) -> GatewayResult<IssuedKey> {
        let (key_id, plaintext) = secret::generate_credentials()?;
        let row = NewAccessKey {
            bucket_id,
            key_id,
            secret_hash: secret::hash_secret(plaintext.expose()),
            role,
            created_at: Utc::now(),
        };
        let stored = self.credentials.create(&mut *conn, &row).await?;
        Ok(IssuedKey::new(&stored, plaintext))
    }
}

/// Top-level paths served by the router itself; a bucket by these names
/// could never be addressed.
const RESERVED_BUCKET_NAMES: [&str; 2] = ["healthz", "readyz"];

/// Validate a bucket name. Callers trim it first.
///
/// The name becomes a single path segment, so it must be non-empty and free
/// of `/` and control characters.
pub fn ensure_bucket_name_safe(name: &str) -> GatewayResult<()> {
    let invalid = |reason: &str| -> GatewayResult<()> {
        Err(GatewayError::invalid_input(format!(
            "bucket name `{}` {}",
            name.escape_debug(),
            reason
        )))
    };

    if name.is_empty() {
        return invalid("must not be empty");
    }
    if name.contains('/') {
        return invalid("must not contain '/'");
    }
    if name.chars().any(char::is_control) {
        return invalid("must not contain control characters");
    }
    if RESERVED_BUCKET_NAMES.contains(&name) {
        return invalid("is reserved");
    }

    Ok(())
}
