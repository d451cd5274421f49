//! API Error Handling
//!
//! Structured error responses with proper HTTP status codes, stable
//! error codes for the presentation layer, and request tracking.

use crate::errors::WagerError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level API error response with request tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

/// Error body with structured information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable error code (INSUFFICIENT_FUNDS, INVALID_STAKE, ...)
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

/// API error with request tracking
#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub code: String,
    pub message: String,
    pub request_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    NotFound,
    BadRequest,
    Conflict,
    ServiceUnavailable,
    InternalError,
}

impl ApiErrorKind {
    fn status(self) -> StatusCode {
        match self {
            ApiErrorKind::NotFound => StatusCode::NOT_FOUND,
            ApiErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorKind::Conflict => StatusCode::CONFLICT,
            ApiErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn default_code(self) -> &'static str {
        match self {
            ApiErrorKind::NotFound => "NOT_FOUND",
            ApiErrorKind::BadRequest => "BAD_REQUEST",
            ApiErrorKind::Conflict => "CONFLICT",
            ApiErrorKind::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ApiErrorKind::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl ApiError {
    fn new(kind: ApiErrorKind, request_id: String, message: String) -> Self {
        Self {
            kind,
            code: kind.default_code().to_string(),
            message,
            request_id,
        }
    }

    fn with_code(mut self, code: &str) -> Self {
        self.code = code.to_string();
        self
    }

    pub fn not_found(request_id: String, message: String) -> Self {
        Self::new(ApiErrorKind::NotFound, request_id, message)
    }

    pub fn bad_request(request_id: String, message: String) -> Self {
        Self::new(ApiErrorKind::BadRequest, request_id, message)
    }

    pub fn internal_error(request_id: String, message: String) -> Self {
        Self::new(ApiErrorKind::InternalError, request_id, message)
    }

    /// Map a core wagering error onto status and stable code.
    pub fn from_wager(request_id: String, err: WagerError) -> Self {
        let message = err.to_string();
        let (kind, code) = match &err {
            WagerError::InvalidStake => (ApiErrorKind::BadRequest, "INVALID_STAKE"),
            WagerError::InvalidChoice => (ApiErrorKind::BadRequest, "INVALID_CHOICE"),
            WagerError::InvalidAmount => (ApiErrorKind::BadRequest, "INVALID_AMOUNT"),
            WagerError::UnsupportedGameType(_) => {
                (ApiErrorKind::BadRequest, "UNSUPPORTED_GAME_TYPE")
            }
            WagerError::InsufficientFunds { .. } => (ApiErrorKind::Conflict, "INSUFFICIENT_FUNDS"),
            WagerError::UnknownAccount { .. } => (ApiErrorKind::NotFound, "UNKNOWN_ACCOUNT"),
            WagerError::DuplicateAccount { .. } => (ApiErrorKind::Conflict, "DUPLICATE_ACCOUNT"),
            WagerError::Contended => (ApiErrorKind::ServiceUnavailable, "CONTENDED"),
        };
        Self::new(kind, request_id, message).with_code(code)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.request_id, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            request_id: self.request_id.clone(),
            error: ErrorBody {
                code: self.code,
                message: self.message,
            },
        });

        (self.kind.status(), body).into_response()
    }
}
