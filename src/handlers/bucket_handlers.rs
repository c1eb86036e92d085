//! HTTP handlers for bucket and access-key administration.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    auth::{Authorized, FullAccess, ReadOnly, Role},
    errors::{AppError, GatewayError},
    handlers::{ObjectView, json_body},
    state::AppState,
};

/// Request body for `POST /`.
#[derive(Debug, Deserialize)]
pub struct CreateBucketReq {
    pub name: String,
}

/// Request body for `POST /{bucket}/access-keys/recreate`.
#[derive(Debug, Deserialize)]
pub struct RecreateKeyReq {
    pub role: Role,
}

/// `GET /`: buckets visible to the caller.
pub async fn list_buckets(
    auth: Authorized<FullAccess>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let identity = auth.identity().ok_or(GatewayError::CredentialMissing)?;
    let buckets = state.buckets.list_visible(identity).await?;
    Ok(Json(buckets))
}

/// `POST /`: create a bucket. Superuser only.
pub async fn create_bucket(
    auth: Authorized<FullAccess>,
    State(state): State<AppState>,
    payload: Result<Json<CreateBucketReq>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    if !auth.identity().is_some_and(|identity| identity.is_superuser()) {
        return Err(GatewayError::InsufficientRole.into());
    }
    let req = json_body(payload)?;
    let created = state.buckets.create(req.name.trim()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /{bucket}`
pub async fn get_bucket(
    _auth: Authorized<ReadOnly>,
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.buckets.get(&bucket).await?))
}

/// `DELETE /{bucket}`: only once it has no keys and no objects.
pub async fn delete_bucket(
    _auth: Authorized<FullAccess>,
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.buckets.delete(&bucket).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /{bucket}/objects`
pub async fn list_objects(
    _auth: Authorized<ReadOnly>,
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let objects = state.objects.list(&bucket).await?;
    let views: Vec<ObjectView> = objects
        .into_iter()
        .map(|object| ObjectView::new(&bucket, object))
        .collect();
    Ok(Json(views))
}

/// `GET /{bucket}/access-keys`: ids and roles, never secrets.
pub async fn list_access_keys(
    _auth: Authorized<FullAccess>,
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.buckets.list_keys(&bucket).await?))
}

/// `POST /{bucket}/access-keys/recreate`
pub async fn recreate_access_key(
    _auth: Authorized<FullAccess>,
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    payload: Result<Json<RecreateKeyReq>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = json_body(payload)?;
    let issued = state.buckets.recreate_key(&bucket, req.role).await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// `DELETE /{bucket}/access-keys/{role}`
pub async fn delete_access_key(
    _auth: Authorized<FullAccess>,
    State(state): State<AppState>,
    Path((bucket, role)): Path<(String, Role)>,
) -> Result<impl IntoResponse, AppError> {
    state.buckets.delete_key(&bucket, role).await?;
    Ok(StatusCode::NO_CONTENT)
}
