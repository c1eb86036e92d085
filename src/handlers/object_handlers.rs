//! HTTP handlers for object operations.
//! Content is streamed out of `/content/*` to avoid buffering large files;
//! storage concerns are delegated to `ObjectLifecycleManager`.

use axum::{
    Json,
    body::Body,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

use crate::{
    auth::{Authorized, ReadOnly, ReadWrite},
    errors::{AppError, GatewayError},
    handlers::{ObjectView, json_body},
    models::object::Object,
    services::object_lifecycle::{DEFAULT_CONTENT_TYPE, UploadRequest},
    state::AppState,
};

/// Request body for `POST /{bucket}/upload`.
#[derive(Debug, Deserialize)]
pub struct UploadObjectReq {
    pub object_key: String,
    pub content: String,
    pub content_type: Option<String>,
    /// When set, `content` is standard base64 rather than UTF-8 text.
    #[serde(default)]
    pub base64_encoded: bool,
}

#[derive(Serialize)]
struct ObjectWithContent {
    object: ObjectView,
    /// Standard base64.
    content: String,
}

/// `POST /{bucket}/upload`
///
/// The upload runs on its own task so an aborted request cannot interrupt
/// compensation half way.
pub async fn upload_object(
    _auth: Authorized<ReadWrite>,
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    payload: Result<Json<UploadObjectReq>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = json_body(payload)?;

    let content = if req.base64_encoded {
        general_purpose::STANDARD
            .decode(req.content.as_bytes())
            .map(Bytes::from)
            .map_err(|err| GatewayError::invalid_input(format!("content is not base64: {}", err)))?
    } else {
        Bytes::from(req.content)
    };
    let content_type = req
        .content_type
        .map(|ct| ct.trim().to_string())
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.into());

    let request = UploadRequest {
        bucket: bucket.clone(),
        object_key: req.object_key.trim().to_string(),
        content,
        content_type,
    };
    let objects = state.objects.clone();
    let object = tokio::spawn(async move { objects.upload(request).await })
        .await
        .map_err(GatewayError::from)??;

    Ok((StatusCode::CREATED, Json(ObjectView::new(&bucket, object))))
}

/// `GET /{bucket}/all/{*key}`: metadata plus base64 content.
pub async fn get_object(
    _auth: Authorized<ReadOnly>,
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let (object, content) = state.objects.read(&bucket, key.trim()).await?;
    Ok(Json(ObjectWithContent {
        object: ObjectView::new(&bucket, object),
        content: general_purpose::STANDARD.encode(&content),
    }))
}

/// `GET /{bucket}/metadata/{*key}`: metadata only; the content file is not touched.
pub async fn get_object_metadata(
    _auth: Authorized<ReadOnly>,
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let object = state.objects.metadata(&bucket, key.trim()).await?;
    Ok(Json(ObjectView::new(&bucket, object)))
}

/// `GET /{bucket}/content/{*key}`: raw content as a streaming response.
pub async fn get_object_content(
    _auth: Authorized<ReadOnly>,
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let opened = state.objects.open(&bucket, key.trim()).await?;
    let body = Body::from_stream(ReaderStream::new(opened.file));

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &opened.object, opened.len);
    Ok(response)
}

/// `DELETE /{bucket}/objects/{*key}`
pub async fn delete_object(
    _auth: Authorized<ReadWrite>,
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    state.objects.delete(&bucket, key.trim()).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn set_object_headers(headers: &mut HeaderMap, object: &Object, len: u64) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&object.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
    );

    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));

    let quoted = format!("\"{}\"", object.checksum);
    if let Ok(value) = HeaderValue::from_str(&quoted) {
        headers.insert(header::ETAG, value);
    }

    if let Ok(value) = HeaderValue::from_str(&object.created_at.to_rfc2822()) {
        headers.insert(header::LAST_MODIFIED, value);
    }
}
