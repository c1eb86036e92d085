//! HTTP handlers. Each one authenticates through an [`Authorized`] extractor
//! and delegates to a service.
//!
//! [`Authorized`]: crate::auth::Authorized

use axum::{Json, extract::rejection::JsonRejection, http::StatusCode};
use serde::Serialize;

use crate::{errors::AppError, models::object::Object};

pub mod bucket_handlers;
pub mod health_handlers;
pub mod object_handlers;

/// Object metadata as returned to callers, tagged with its bucket name.
#[derive(Serialize)]
pub struct ObjectView {
    pub bucket: String,
    #[serde(flatten)]
    pub object: Object,
}

impl ObjectView {
    pub fn new(bucket: &str, object: Object) -> Self {
        Self {
            bucket: bucket.to_string(),
            object,
        }
    }
}

/// Unwrap a JSON body, reporting any rejection as 400.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::new(StatusCode::BAD_REQUEST, rejection.body_text()))
}
