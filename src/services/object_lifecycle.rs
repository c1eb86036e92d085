//! Object lifecycle: metadata and content kept in agreement.
//!
//! Upload writes metadata first (the store assigns the id the file path is
//! derived from), then content, then finalizes the stored path. Every step
//! registers its undo with a [`Compensations`] saga so a failure part way
//! leaves neither a row without a file nor a file without a row.

use bytes::Bytes;
use chrono::Utc;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, info, warn};

use crate::{
    errors::{GatewayError, GatewayResult},
    models::{bucket::Bucket, object::Object},
    services::{
        metadata_store::{MetadataStore, NewObject, is_foreign_key_violation, is_unique_violation},
        path_resolver::PathResolver,
        saga::Compensations,
    },
};

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// An object ready to stream out.
pub struct OpenedObject {
    pub object: Object,
    pub file: File,
    /// Length of the open file, which is what the response will carry.
    pub len: u64,
}

/// Everything needed to create one object. Owned so the upload can run on its own task.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub bucket: String,
    pub object_key: String,
    pub content: Bytes,
    pub content_type: String,
}

#[derive(Clone)]
pub struct ObjectLifecycleManager {
    metadata: MetadataStore,
    resolver: PathResolver,
}

impl ObjectLifecycleManager {
    pub fn new(metadata: MetadataStore, resolver: PathResolver) -> Self {
        Self { metadata, resolver }
    }

    /// Create an object. A second upload of the same (bucket, key) is a conflict.
    pub async fn upload(&self, request: UploadRequest) -> GatewayResult<Object> {
        ensure_key_safe(&request.object_key)?;
        let bucket = self.resolve_bucket(&request.bucket).await?;

        let checksum = format!("{:x}", md5::compute(&request.content));
        let row = NewObject {
            bucket_id: bucket.id,
            object_key: &request.object_key,
            size: request.content.len() as i64,
            content_type: &request.content_type,
            checksum: &checksum,
            created_at: Utc::now(),
        };

        let mut object = match self.metadata.insert_object(&row).await {
            Ok(object) => object,
            Err(err) if is_unique_violation(&err) => {
                return Err(GatewayError::conflict(format!(
                    "object `{}` already exists in bucket `{}`",
                    request.object_key, bucket.name
                )));
            }
            // bucket deleted between lookup and insert
            Err(err) if is_foreign_key_violation(&err) => {
                return Err(GatewayError::not_found(format!("bucket `{}`", bucket.name)));
            }
            Err(err) => return Err(err.into()),
        };

        let mut saga = Compensations::new();
        let metadata = self.metadata.clone();
        let object_id = object.id;
        saga.push("delete metadata row", async move {
            metadata
                .delete_object(object_id)
                .await
                .map(|_| ())
                .map_err(GatewayError::from)
        });

        let file_path = self.resolver.object_path(bucket.id, object.id);
        if let Err(err) = fs::create_dir_all(self.resolver.objects_dir(bucket.id)).await {
            return saga.abort(err.into()).await;
        }

        saga.push("remove object file", remove_file_if_exists(file_path.clone()));
        if let Err(err) = write_content(&file_path, &request.content).await {
            return saga.abort(err.into()).await;
        }

        let stored = file_path.to_string_lossy().into_owned();
        match self.metadata.set_object_path(object.id, &stored).await {
            Ok(0) => return saga.abort(sqlx::Error::RowNotFound.into()).await,
            Ok(_) => {}
            Err(err) => return saga.abort(err.into()).await,
        }
        saga.commit();

        object.file_path = stored;
        info!(
            bucket = %bucket.name,
            object_id = object.id,
            size = object.size,
            "object stored"
        );
        Ok(object)
    }

    /// Metadata only; never touches the filesystem.
    pub async fn metadata(&self, bucket: &str, key: &str) -> GatewayResult<Object> {
        ensure_key_safe(key)?;
        let bucket = self.resolve_bucket(bucket).await?;
        self.resolve_object(&bucket, key).await
    }

    /// Metadata plus the full content.
    pub async fn read(&self, bucket: &str, key: &str) -> GatewayResult<(Object, Bytes)> {
        let (object, path) = self.locate(bucket, key).await?;
        let content = fs::read(&path).await?;
        Ok((object, Bytes::from(content)))
    }

    /// Metadata plus an open handle for streaming the content out.
    pub async fn open(&self, bucket: &str, key: &str) -> GatewayResult<OpenedObject> {
        let (object, path) = self.locate(bucket, key).await?;
        let file = File::open(&path).await?;
        let len = file.metadata().await?.len();
        if i64::try_from(len).ok() != Some(object.size) {
            warn!(
                object_id = object.id,
                recorded = object.size,
                on_disk = len,
                "content length differs from metadata"
            );
        }
        Ok(OpenedObject { object, file, len })
    }

    pub async fn list(&self, bucket: &str) -> GatewayResult<Vec<Object>> {
        let bucket = self.resolve_bucket(bucket).await?;
        Ok(self.metadata.list_objects(bucket.id).await?)
    }

    /// Remove the content, then the row. A file already gone is fine.
    pub async fn delete(&self, bucket: &str, key: &str) -> GatewayResult<Object> {
        ensure_key_safe(key)?;
        let bucket = self.resolve_bucket(bucket).await?;
        let object = self.resolve_object(&bucket, key).await?;

        // A placeholder row means the upload never finalized; its bytes, if
        // any, sit at the derived path.
        let path = if object.has_placeholder_path() {
            self.resolver.object_path(bucket.id, object.id)
        } else {
            self.checked_path(&bucket, &object)?
        };

        remove_file_if_exists(path).await?;

        if self.metadata.delete_object(object.id).await? == 0 {
            return Err(GatewayError::not_found(format!(
                "object `{}` in bucket `{}`",
                key, bucket.name
            )));
        }
        debug!(bucket = %bucket.name, object_id = object.id, "object deleted");
        Ok(object)
    }

    async fn locate(&self, bucket: &str, key: &str) -> GatewayResult<(Object, PathBuf)> {
        ensure_key_safe(key)?;
        let bucket = self.resolve_bucket(bucket).await?;
        let object = self.resolve_object(&bucket, key).await?;
        let path = self.checked_path(&bucket, &object)?;
        Ok((object, path))
    }

    fn checked_path(&self, bucket: &Bucket, object: &Object) -> GatewayResult<PathBuf> {
        self.resolver
            .validate(&object.file_path, bucket.id)
            .ok_or(GatewayError::IntegrityViolation {
                object_id: object.id,
            })
    }

    async fn resolve_bucket(&self, name: &str) -> GatewayResult<Bucket> {
        self.metadata
            .bucket_by_name(name)
            .await?
            .ok_or_else(|| GatewayError::not_found(format!("bucket `{}`", name)))
    }

    async fn resolve_object(&self, bucket: &Bucket, key: &str) -> GatewayResult<Object> {
        self.metadata
            .object_by_key(bucket.id, key)
            .await?
            .ok_or_else(|| {
                GatewayError::not_found(format!("object `{}` in bucket `{}`", key, bucket.name))
            })
    }
}

/// Object keys must be non-empty and free of NUL bytes.
pub fn ensure_key_safe(key: &str) -> GatewayResult<()> {
    if key.is_empty() {
        return Err(GatewayError::invalid_input("object key must not be empty"));
    }
    if key.contains('\0') {
        return Err(GatewayError::invalid_input("object key must not contain NUL"));
    }
    Ok(())
}

/// Write and fsync the whole payload.
async fn write_content(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(content).await?;
    file.flush().await?;
    file.sync_all().await
}

async fn remove_file_if_exists(path: PathBuf) -> GatewayResult<()> {
    match fs::remove_file(&path).await {
        Ok(()) => {
            debug!("removed physical file {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("file {} already missing", path.display());
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
