//! Shared fixtures for unit and router tests.

use axum::http::HeaderValue;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{path::PathBuf, sync::Arc};
use tempfile::TempDir;

use crate::{
    auth::role::Role,
    db,
    models::access_key::IssuedKey,
    services::bucket_service::CreatedBucket,
    state::AppState,
};

pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

/// A throwaway database and data root under one temp directory.
pub struct TestEnv {
    pub dir: TempDir,
    pub db: Arc<sqlx::SqlitePool>,
    pub state: AppState,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_admin(Some(ADMIN_PASSWORD)).await
    }

    pub async fn with_admin(admin_password: Option<&str>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let options = SqliteConnectOptions::new()
            .filename(dir.path().join("meta.db"))
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .unwrap();
        db::run_migrations(&pool).await.unwrap();

        let db = Arc::new(pool);
        let data_root = dir.path().join("data");
        std::fs::create_dir_all(&data_root).unwrap();
        let state = AppState::new(db.clone(), data_root, admin_password);
        Self { dir, db, state }
    }

    pub async fn bucket(&self, name: &str) -> CreatedBucket {
        self.state.buckets.create(name).await.unwrap()
    }

    pub fn data_root(&self) -> PathBuf {
        self.state.resolver.data_root().to_path_buf()
    }
}

pub fn key_for(created: &CreatedBucket, role: Role) -> &IssuedKey {
    created
        .access_keys
        .iter()
        .find(|key| key.role == role)
        .unwrap()
}

pub fn bearer(key: &IssuedKey) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}:{}", key.key_id, key.secret.expose())).unwrap()
}

pub fn admin_bearer() -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer admin:{}", ADMIN_PASSWORD)).unwrap()
}
