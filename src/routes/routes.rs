//! Defines routes for all bucket, access-key and object operations.
//!
//! ## Structure
//! - **Open endpoints**
//!   - `GET    /healthz`, `GET /readyz`
//!
//! - **Bucket-level endpoints**
//!   - `GET    /`: list visible buckets (all)
//!   - `POST   /`: create bucket (superuser)
//!   - `GET    /{bucket}`: get bucket (read-only)
//!   - `DELETE /{bucket}`: delete empty bucket (all)
//!   - `GET    /{bucket}/objects`: list objects (read-only)
//!   - `GET    /{bucket}/access-keys`: list keys (all)
//!   - `POST   /{bucket}/access-keys/recreate`: rotate a role's key (all)
//!   - `DELETE /{bucket}/access-keys/{role}`: delete a role's key (all)
//!
//! - **Object-level endpoints**
//!   - `POST   /{bucket}/upload`: upload object (read-write)
//!   - `GET    /{bucket}/all/{*key}`: metadata + base64 content (read-only)
//!   - `GET    /{bucket}/metadata/{*key}`: metadata (read-only)
//!   - `GET    /{bucket}/content/{*key}`: raw content (read-only)
//!   - `DELETE /{bucket}/objects/{*key}`: delete object (read-write)
//!
//! The required level is declared by each handler's `Authorized<_>` argument.
//! The wildcard `*key` allows nested keys like `photos/2025/img.jpg`. Every
//! wildcard sits behind its own static segment, so no object key can reach
//! another route.
//!
//! ## Layers (outermost first)
//! request id, request id propagation, trace, gzip compression, panic
//! recovery, body limit.

use crate::{
    errors::strip_diagnostics,
    handlers::{
        bucket_handlers::{
            create_bucket, delete_access_key, delete_bucket, get_bucket, list_access_keys,
            list_buckets, list_objects, recreate_access_key,
        },
        health_handlers::{healthz, readyz},
        object_handlers::{
            delete_object, get_object, get_object_content, get_object_metadata, upload_object,
        },
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::map_response,
    routing::{delete, get, post},
};
use tower_http::{
    CompressionLevel,
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

/// Gzip level for compressed responses.
const COMPRESSION_QUALITY: i32 = 5;

/// Build the router for every gateway route, still awaiting its state.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Bucket-level routes
        .route("/", get(list_buckets).post(create_bucket))
        .route("/{bucket}", get(get_bucket).delete(delete_bucket))
        .route("/{bucket}/objects", get(list_objects))
        .route("/{bucket}/access-keys", get(list_access_keys))
        .route("/{bucket}/access-keys/recreate", post(recreate_access_key))
        .route("/{bucket}/access-keys/{role}", delete(delete_access_key))
        // Object-level routes
        .route("/{bucket}/upload", post(upload_object))
        .route("/{bucket}/all/{*key}", get(get_object))
        .route("/{bucket}/metadata/{*key}", get(get_object_metadata))
        .route("/{bucket}/content/{*key}", get(get_object_content))
        .route("/{bucket}/objects/{*key}", delete(delete_object))
}

/// The complete service: routes, state and the shared layers.
pub fn app(state: AppState, diagnostics: bool, max_body_bytes: usize) -> Router {
    with_layers(routes().with_state(state), diagnostics, max_body_bytes)
}

fn with_layers(router: Router, diagnostics: bool, max_body_bytes: usize) -> Router {
    let mut router = router.layer(DefaultBodyLimit::max(max_body_bytes));
    if !diagnostics {
        router = router.layer(map_response(strip_diagnostics));
    }
    router
        .layer(CatchPanicLayer::new())
        .layer(CompressionLayer::new().quality(CompressionLevel::Precise(COMPRESSION_QUALITY)))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
