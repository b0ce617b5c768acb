//! Error types for version negotiation and dispatch

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::shim::Direction;
use crate::version::ApiVersion;

/// Result type for versioning operations
pub type Result<T> = std::result::Result<T, VersioningError>;

/// Failures raised by the versioning layer itself
///
/// Every variant is terminal for the request and carries the offending value
/// (and, where relevant, the supported set) so the caller can self-correct.
#[derive(Error, Debug)]
pub enum VersioningError {
    #[error("Invalid version format: {0}. Expected format: major.minor")]
    InvalidVersion(String),

    #[error("Missing required header: {0}")]
    MissingHeader(String),

    #[error(
        "API version {requested} not supported for this endpoint. Supported versions: {}",
        ApiVersion::join_readable(.supported)
    )]
    UnsupportedVersion {
        requested: ApiVersion,
        path: String,
        supported: Vec<ApiVersion>,
    },

    #[error("No versions registered for endpoint {path}")]
    NoVersions { path: String },

    #[error("No {direction} shim registered for {path} from {from} to {to}")]
    MissingChainLink {
        path: String,
        direction: Direction,
        from: ApiVersion,
        to: ApiVersion,
    },

    #[error("Request body is not valid JSON: {0}")]
    InvalidBody(String),

    #[error("{direction} shim for {path} from {from} to {to} failed: {reason}")]
    ShimFailed {
        path: String,
        direction: Direction,
        from: ApiVersion,
        to: ApiVersion,
        reason: String,
    },
}

impl VersioningError {
    /// Returns the HTTP status code for this error.
    ///
    /// A request payload that does not fit its declared version is the
    /// caller's problem (422); a response payload that does not fit is ours.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidVersion(_) | Self::MissingHeader(_) | Self::InvalidBody(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::UnsupportedVersion { .. } => StatusCode::NOT_ACCEPTABLE,
            Self::NoVersions { .. } => StatusCode::NOT_FOUND,
            Self::ShimFailed {
                direction: Direction::Request,
                ..
            } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::MissingChainLink { .. } | Self::ShimFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for VersioningError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "versioning failure");
        }
        (status, self.to_string()).into_response()
    }
}

/// Errors raised by business handlers
///
/// The versioning layer passes these through without translation.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Self::NotFound(detail) | Self::BadRequest(detail) => detail.clone(),
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "handler failed");
                "Internal server error".to_string()
            }
        };
        (status, axum::Json(serde_json::json!({ "detail": body }))).into_response()
    }
}

/// Anything a versioned route can fail with
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Versioning(#[from] VersioningError),

    #[error(transparent)]
    Handler(#[from] ApiError),
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        match self {
            Self::Versioning(err) => err.into_response(),
            Self::Handler(err) => err.into_response(),
        }
    }
}
