//! Error handling module for the Secret Santa backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
#[allow(dead_code)]
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const DUPLICATE_IDENTIFIER: &str = "DUPLICATE_IDENTIFIER";
    pub const INSUFFICIENT_MEMBERS: &str = "INSUFFICIENT_MEMBERS";
    pub const ASSIGNMENT_INFEASIBLE: &str = "ASSIGNMENT_INFEASIBLE";
    pub const NO_AVAILABLE_CANDIDATES: &str = "NO_AVAILABLE_CANDIDATES";
    pub const STALE_DRAW: &str = "STALE_DRAW";
    pub const MISSING_REQUIRED_COLUMNS: &str = "MISSING_REQUIRED_COLUMNS";
    pub const MALFORMED_PERSISTED_STATE: &str = "MALFORMED_PERSISTED_STATE";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Authentication required
    Unauthorized(String),
    /// Resource not found
    NotFound(String),
    /// Validation error
    Validation(String),
    /// A member code collides case-insensitively with an existing one
    DuplicateIdentifier(String),
    /// Fewer than two members on the roster; no exchange possible
    InsufficientMembers(String),
    /// No derangement found within the retry ceiling
    AssignmentInfeasible(String),
    /// Every eligible giftee is already taken
    NoAvailableCandidates(String),
    /// The drawer or the chosen member vanished between pool and commit
    StaleDraw(String),
    /// Import header lacks the identifier or name column
    MissingRequiredColumns(String),
    /// Persisted snapshot could not be decoded; recovered by starting empty
    MalformedPersistedState(String),
    /// Database error
    Database(String),
    /// Bad request
    BadRequest(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateIdentifier(_) => StatusCode::CONFLICT,
            AppError::InsufficientMembers(_) => StatusCode::BAD_REQUEST,
            AppError::AssignmentInfeasible(_) => StatusCode::CONFLICT,
            AppError::NoAvailableCandidates(_) => StatusCode::CONFLICT,
            AppError::StaleDraw(_) => StatusCode::CONFLICT,
            AppError::MissingRequiredColumns(_) => StatusCode::BAD_REQUEST,
            AppError::MalformedPersistedState(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::DuplicateIdentifier(_) => codes::DUPLICATE_IDENTIFIER,
            AppError::InsufficientMembers(_) => codes::INSUFFICIENT_MEMBERS,
            AppError::AssignmentInfeasible(_) => codes::ASSIGNMENT_INFEASIBLE,
            AppError::NoAvailableCandidates(_) => codes::NO_AVAILABLE_CANDIDATES,
            AppError::StaleDraw(_) => codes::STALE_DRAW,
            AppError::MissingRequiredColumns(_) => codes::MISSING_REQUIRED_COLUMNS,
            AppError::MalformedPersistedState(_) => codes::MALFORMED_PERSISTED_STATE,
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::DuplicateIdentifier(msg)
            | AppError::InsufficientMembers(msg)
            | AppError::AssignmentInfeasible(msg)
            | AppError::NoAvailableCandidates(msg)
            | AppError::StaleDraw(msg)
            | AppError::MissingRequiredColumns(msg)
            | AppError::MalformedPersistedState(msg)
            | AppError::Database(msg)
            | AppError::BadRequest(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::BadRequest(format!("JSON error: {}", err))
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
    pub revision_id: i64,
}

impl ErrorResponse {
    pub fn new(error: &AppError, revision_id: i64) -> Self {
        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
            },
            revision_id,
        }
    }
}

/// Wrapper type for errors that carry revision_id context.
pub struct AppErrorWithRevision {
    pub error: AppError,
    pub revision_id: i64,
}

impl IntoResponse for AppErrorWithRevision {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        let body = ErrorResponse::new(&self.error, self.revision_id);
        (status, Json(body)).into_response()
    }
}
