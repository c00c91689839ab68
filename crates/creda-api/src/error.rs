//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from creda-registry and creda-results to HTTP
//! status codes and JSON error bodies. Internal error details are never
//! exposed in responses.
//!
//! Verification outcomes (`INVALID`, `NOT_FOUND`, `UNCONFIRMED`) are NOT
//! errors — the verify route returns them as 200 responses. This type
//! covers malformed requests, authorization failures, conflicts, ledger
//! trouble on the write path, and genuine infrastructure failure.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use creda_core::ValidationError;
use creda_registry::{LifecycleError, StoreError};
use creda_results::ResultError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// The error payload.
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. `NOT_FOUND`, `VALIDATION_ERROR`).
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`].
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (422). Normalized with
    /// `Validation`: the client sent syntactically valid HTTP but
    /// semantically invalid content.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Authentication failure — missing or invalid token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authorization failure — insufficient capability (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500). Message is logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),

    /// The ledger gateway failed on a write-path operation (502).
    #[error("ledger error: {0}")]
    Ledger(String),

    /// Service dependency not ready (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    /// HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::Ledger(_) => (StatusCode::BAD_GATEWAY, "LEDGER_ERROR"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        // Log server-side errors for operator visibility.
        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Ledger(_) => tracing::error!(error = %self, "ledger gateway error"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "service unavailable"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Forbidden { .. } => Self::Forbidden(err.to_string()),
            LifecycleError::NotFound(_) => Self::NotFound(err.to_string()),
            LifecycleError::Validation(_) => Self::Validation(err.to_string()),
            LifecycleError::Conflict(_) => Self::Conflict(err.to_string()),
            LifecycleError::Canonicalization(_) => Self::Internal(err.to_string()),
            LifecycleError::Store(store) => Self::from(store),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateCertificateNumber(_) | StoreError::DuplicateVerificationCode(_) => {
                Self::Conflict(err.to_string())
            }
            StoreError::NotFound(_) => Self::NotFound(err.to_string()),
            StoreError::AttemptLogFull { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl From<ResultError> for AppError {
    fn from(err: ResultError) -> Self {
        match err {
            ResultError::Validation(_) => Self::Validation(err.to_string()),
            ResultError::Forbidden { .. } => Self::Forbidden(err.to_string()),
            ResultError::NotFound(_) | ResultError::UnknownCourse(_) => {
                Self::NotFound(err.to_string())
            }
            ResultError::Conflict(_) => Self::Conflict(err.to_string()),
        }
    }
}
