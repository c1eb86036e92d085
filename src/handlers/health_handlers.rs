//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the metadata store and the data root

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::{collections::BTreeMap, path::Path};
use tokio::fs;
use uuid::Uuid;

use crate::{
    auth::{Authorized, Open},
    state::AppState,
};

const PROBE_BYTES: &[u8] = b"readyz";

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    checks: BTreeMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

impl CheckStatus {
    fn from_result(result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self { ok: true, error: None },
            Err(error) => Self {
                ok: false,
                error: Some(error),
            },
        }
    }
}

/// `GET /healthz`
///
/// Liveness only; never performs I/O.
pub async fn healthz(_open: Authorized<Open>) -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// `GET /readyz`
///
/// 200 when SQLite answers `SELECT 1` and a temp file under the data root can
/// be written, read back and removed; 503 otherwise.
pub async fn readyz(_open: Authorized<Open>, State(state): State<AppState>) -> impl IntoResponse {
    let sqlite = CheckStatus::from_result(check_sqlite(&state).await);
    let disk = CheckStatus::from_result(check_disk(state.resolver.data_root()).await);

    let ready = sqlite.ok && disk.ok;
    let body = ReadyResponse {
        status: if ready { "ok" } else { "error" },
        checks: BTreeMap::from([("sqlite", sqlite), ("disk", disk)]),
    };
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

async fn check_sqlite(state: &AppState) -> Result<(), String> {
    match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&*state.db)
        .await
    {
        Ok(1) => Ok(()),
        Ok(v) => Err(format!("unexpected result: {}", v)),
        Err(e) => Err(format!("error: {}", e)),
    }
}

async fn check_disk(data_root: &Path) -> Result<(), String> {
    let tmp_path = data_root.join(format!(".readyz-{}", Uuid::new_v4()));
    fs::write(&tmp_path, PROBE_BYTES)
        .await
        .map_err(|e| format!("could not write tmp file: {}", e))?;

    let read = fs::read(&tmp_path).await;
    let removed = fs::remove_file(&tmp_path).await;
    match read {
        Ok(bytes) if bytes == PROBE_BYTES => {}
        Ok(_) => return Err("file content mismatch".into()),
        Err(e) => return Err(format!("could not read tmp file: {}", e)),
    }
    removed.map_err(|e| format!("could not remove tmp file: {}", e))
}
