// crates/arre-server/src/error.rs
// ============================================================================
// Module: API Error
// Description: Maps arre-core/arre-engine/arre-normalize failures onto HTTP
//              status codes, §7.
// Purpose: Give every handler one error type that renders a consistent JSON
//          body regardless of which collaborator failed.
// Dependencies: arre-core, arre-engine, arre-normalize, axum, serde_json
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use arre_core::FlagError;
use arre_core::StoreError;
use arre_engine::DispatchError;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Error
// ============================================================================

/// Uniform error type returned by every `arre-server` handler.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No recognized credential was presented.
    #[error("authentication required")]
    Unauthenticated,
    /// The caller authenticated but lacks the admin capability.
    #[error("admin capability required")]
    PermissionDenied,
    /// The request body could not be parsed as a known alert format.
    #[error("unparseable alert payload: {0}")]
    Unparseable(String),
    /// A collaborator call failed in a way that may succeed on retry.
    #[error("upstream collaborator unavailable: {0}")]
    Transient(String),
    /// The request's deadline expired before processing completed.
    #[error("request deadline exceeded")]
    Timeout,
    /// An invalid value was supplied for a flag or filter.
    #[error("invalid value: {0}")]
    InvalidValue(String),
    /// Persistence failed.
    #[error("store error: {0}")]
    Store(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::Unparseable(_) | Self::InvalidValue(_) => StatusCode::BAD_REQUEST,
            Self::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "status": "error", "message": self.to_string() }));
        (status, body).into_response()
    }
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Unparseable(source) => Self::Unparseable(source.to_string()),
            DispatchError::Transient(message) => Self::Transient(message),
            DispatchError::Timeout => Self::Timeout,
            DispatchError::Persist(source) => Self::Store(source.to_string()),
        }
    }
}

impl From<FlagError> for ApiError {
    fn from(err: FlagError) -> Self {
        match err {
            FlagError::PermissionDenied => Self::PermissionDenied,
            FlagError::InvalidValue(value) => Self::InvalidValue(value),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}
