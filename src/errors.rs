use axum::{
    Json,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::{fmt, io};
use thiserror::Error;
use tracing::{debug, error};

/// Non-standard response header carrying operator-facing detail about a failure.
pub const DIAGNOSTIC_HEADER: HeaderName = HeaderName::from_static("x-gateway-diagnostic");

/// Low-level I/O failure underneath a gateway operation.
#[derive(Debug, Error)]
pub enum StorageFault {
    #[error("metadata store: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("filesystem: {0}")]
    Io(#[from] io::Error),
    #[error("background task: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StorageFault {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Sqlx(err) if crate::services::metadata_store::is_unique_violation(err))
    }
}

/// Every failure the auth gate and the storage services can report.
///
/// Internal causes are folded into one of these kinds before they reach the
/// HTTP boundary. The three credential kinds render identically to callers.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("missing authorization header")]
    CredentialMissing,
    #[error("malformed credentials: {0}")]
    CredentialMalformed(&'static str),
    #[error("invalid credentials: {0}")]
    CredentialInvalid(&'static str),
    #[error("insufficient permissions")]
    InsufficientRole,
    #[error("access denied to this bucket")]
    BucketScopeMismatch,
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("invalid stored path for object {object_id}")]
    IntegrityViolation { object_id: i64 },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    StorageFailure(#[from] StorageFault),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        GatewayError::StorageFailure(StorageFault::Sqlx(err))
    }
}

impl From<io::Error> for GatewayError {
    fn from(err: io::Error) -> Self {
        GatewayError::StorageFailure(StorageFault::Io(err))
    }
}

impl From<tokio::task::JoinError> for GatewayError {
    fn from(err: tokio::task::JoinError) -> Self {
        GatewayError::StorageFailure(StorageFault::Task(err))
    }
}

impl GatewayError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::CredentialMissing | Self::CredentialMalformed(_) | Self::CredentialInvalid(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::InsufficientRole | Self::BucketScopeMismatch => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::IntegrityViolation { .. } | Self::StorageFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show any caller.
    fn public_message(&self) -> String {
        match self {
            Self::CredentialMissing | Self::CredentialMalformed(_) | Self::CredentialInvalid(_) => {
                "invalid credentials".into()
            }
            Self::IntegrityViolation { .. } => "invalid stored path".into(),
            Self::StorageFailure(_) => "internal error".into(),
            other => other.to_string(),
        }
    }
}

/// The HTTP-facing error: status, public message and an optional diagnostic.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub diagnostic: Option<String>,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            diagnostic: None,
        }
    }

    pub fn with_diagnostic(mut self, detail: impl Into<String>) -> Self {
        self.diagnostic = Some(detail.into());
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        let mut response = (self.status, body).into_response();
        if let Some(detail) = self.diagnostic {
            if let Ok(value) = HeaderValue::from_str(&detail) {
                response.headers_mut().insert(DIAGNOSTIC_HEADER, value);
            }
        }
        response
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match &err {
            GatewayError::IntegrityViolation { object_id } => {
                error!(object_id, "stored path escaped its bucket directory");
            }
            GatewayError::StorageFailure(fault) => error!("storage failure: {}", fault),
            other => debug!("request rejected: {}", other),
        }
        AppError::new(err.status(), err.public_message()).with_diagnostic(err.to_string())
    }
}

/// Drops the diagnostic header when operators turned it off.
pub async fn strip_diagnostics(mut response: Response) -> Response {
    response.headers_mut().remove(DIAGNOSTIC_HEADER);
    response
}
