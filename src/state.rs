//! Shared application state handed to every handler.

use sqlx::SqlitePool;
use std::{path::PathBuf, sync::Arc};

use crate::{
    auth::gate::AuthGate,
    services::{
        bucket_service::BucketService, credential_store::CredentialStore,
        metadata_store::MetadataStore, object_lifecycle::ObjectLifecycleManager,
        path_resolver::PathResolver,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqlitePool>,
    #[cfg(test)]
    pub metadata: MetadataStore,
    pub resolver: PathResolver,
    pub gate: AuthGate,
    pub buckets: BucketService,
    pub objects: ObjectLifecycleManager,
}

impl AppState {
    /// Wire the services over one pool. `data_root` should already be absolute.
    pub fn new(db: Arc<SqlitePool>, data_root: PathBuf, admin_password: Option<&str>) -> Self {
        let metadata = MetadataStore::new(db.clone());
        let credentials = CredentialStore::new(db.clone());
        let resolver = PathResolver::new(data_root);

        Self {
            gate: AuthGate::new(credentials.clone(), metadata.clone(), admin_password),
            buckets: BucketService::new(
                db.clone(),
                metadata.clone(),
                credentials,
                resolver.clone(),
            ),
            objects: ObjectLifecycleManager::new(metadata.clone(), resolver.clone()),
            db,
            #[cfg(test)]
            metadata,
            resolver,
        }
    }
}
