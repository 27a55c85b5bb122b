//! Error handling module for the drug catalog backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const IMPORT_FAILED: &str = "IMPORT_FAILED";
    pub const STORE_ERROR: &str = "STORE_ERROR";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
}

/// Failure causes of the data-management operations.
///
/// Each variant names the step that failed so the admin panel can tell a failed
/// backup (nothing deleted) from a failed delete (orphan backup left behind).
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Failed to read catalog: {0}")]
    Export(StoreError),

    #[error("Failed to write backup {backup_id}: {source}")]
    Backup {
        backup_id: String,
        source: StoreError,
    },

    #[error("Failed to delete data: {0}")]
    Delete(StoreError),

    #[error("Invalid backup id '{0}'")]
    InvalidBackupId(String),

    #[error("Backup {0} not found")]
    BackupNotFound(String),

    #[error("Failed to fetch backup {backup_id}: {source}")]
    BackupRead {
        backup_id: String,
        source: StoreError,
    },

    #[error("Failed to restore data: {0}")]
    Restore(StoreError),
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
    /// Import rejected, with the per-row errors that were collected
    ImportFailed {
        message: String,
        errors: Option<Vec<String>>,
    },
    /// Document store error
    Store(String),
    /// Document store did not answer in time
    Timeout(String),
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
            AppError::ImportFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Store(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::ImportFailed { .. } => codes::IMPORT_FAILED,
            AppError::Store(_) => codes::STORE_ERROR,
            AppError::Timeout(_) => codes::TIMEOUT,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::ImportFailed { message, .. } => message.clone(),
            AppError::Store(msg) => msg.clone(),
            AppError::Timeout(msg) => msg.clone(),
            AppError::BadRequest(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Store error: {:?}", err);
        match err {
            StoreError::Timeout => AppError::Timeout(err.to_string()),
            other => AppError::Store(other.to_string()),
        }
    }
}

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::InvalidBackupId(_) => AppError::Validation(err.to_string()),
            DataError::BackupNotFound(_) => AppError::NotFound(err.to_string()),
            other => AppError::Store(other.to_string()),
        }
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        let details = match error {
            AppError::ImportFailed {
                errors: Some(errors),
                ..
            } => Some(serde_json::json!({ "errors": errors })),
            _ => None,
        };

        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
                details,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}
