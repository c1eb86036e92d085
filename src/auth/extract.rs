//! Axum extractor running the gate before a handler body executes.
//!
//! A handler declares the level it needs in its signature:
//!
//! ```ignore
//! async fn delete_object(auth: Authorized<ReadWrite>, ...) -> ...
//! ```
//!
//! The bucket named by the route's `{bucket}` segment, if any, is checked
//! against the key's scope. `Authorized<Open>` admits every request without
//! reading the header and carries no identity.

use axum::{
    extract::{FromRequestParts, Path},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::{collections::HashMap, marker::PhantomData};

use crate::{
    auth::{gate::Identity, role::AuthLevel},
    errors::AppError,
    state::AppState,
};

/// Name of the path segment holding the target bucket.
const BUCKET_PARAM: &str = "bucket";

/// Compile-time permission requirement for [`Authorized`].
pub trait Requirement: Send + Sync + 'static {
    const LEVEL: AuthLevel;
}

pub struct Open;
pub struct ReadOnly;
pub struct ReadWrite;
pub struct FullAccess;

impl Requirement for Open {
    const LEVEL: AuthLevel = AuthLevel::None;
}

impl Requirement for ReadOnly {
    const LEVEL: AuthLevel = AuthLevel::ReadOnly;
}

impl Requirement for ReadWrite {
    const LEVEL: AuthLevel = AuthLevel::ReadWrite;
}

impl Requirement for FullAccess {
    const LEVEL: AuthLevel = AuthLevel::All;
}

/// Proof that the request passed the gate at level `R`.
pub struct Authorized<R> {
    identity: Option<Identity>,
    _requirement: PhantomData<fn() -> R>,
}

impl<R> Authorized<R> {
    /// The authenticated caller; `None` only on open routes.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }
}

impl<R: Requirement> FromRequestParts<AppState> for Authorized<R> {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bucket = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .ok()
            .and_then(|Path(mut params)| params.remove(BUCKET_PARAM));

        let identity = state
            .gate
            .admit(R::LEVEL, parts.headers.get(AUTHORIZATION), bucket.as_deref())
            .await?;

        Ok(Self {
            identity,
            _requirement: PhantomData,
        })
    }
}
