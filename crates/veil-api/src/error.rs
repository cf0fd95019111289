//! # API Error Types
//!
//! [`AppError`] implements `IntoResponse` and maps the engine's
//! [`MarketError`] taxonomy onto HTTP status codes. Bodies are always
//! `{ "error": { "code", "message", "details"? } }`. Internal messages are
//! logged and never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use veil_core::{ErrorKind, MarketError};

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable code, e.g. `NOT_FOUND`.
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

#[derive(Error, Debug)]
pub enum AppError {
    /// 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// 422.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unparseable body or query (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Wrong actor or role (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Read of an escrow by a non-party (403).
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Operation not legal in the current status (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Escrow already under dispute (409).
    #[error("already disputed: {0}")]
    AlreadyDisputed(String),

    /// Settlement gateway failed or timed out (502). Safe to retry.
    #[error("settlement failed: {0}")]
    Settlement(String),

    /// 500. Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::AccessDenied(_) => (StatusCode::FORBIDDEN, "ACCESS_DENIED"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
            Self::AlreadyDisputed(_) => (StatusCode::CONFLICT, "ALREADY_DISPUTED"),
            Self::Settlement(_) => (StatusCode::BAD_GATEWAY, "SETTLEMENT_FAILURE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };
        let details = match &self {
            Self::Settlement(_) => Some(serde_json::json!({ "retryable": true })),
            _ => None,
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<MarketError> for AppError {
    fn from(err: MarketError) -> Self {
        if let MarketError::Validation(message) = err {
            return Self::Validation(message);
        }
        let message = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::Forbidden => Self::Forbidden(message),
            ErrorKind::AccessDenied => Self::AccessDenied(message),
            ErrorKind::InvalidState => Self::Conflict(message),
            ErrorKind::AlreadyDisputed => Self::AlreadyDisputed(message),
            ErrorKind::SettlementFailure => Self::Settlement(message),
            ErrorKind::TransactionAborted | ErrorKind::Internal => Self::Internal(message),
        }
    }
}
