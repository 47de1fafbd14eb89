//! HTTP error mapping
//!
//! Client errors carry the engine's message. Server errors are logged in full
//! and answered with a fixed message, so paths and store details stay out of
//! responses.

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tidalcore_core::BackupError;
use tracing::error;

use crate::upload::UploadRejection;

/// Machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidName,
    NotFound,
    InvalidFormat,
    RetentionExceeded,
    InvalidUpload,
    PayloadTooLarge,
    ReadFailure,
    WriteFailure,
    EngineError,
    ClearFailed,
    InsertFailed,
    StorageError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidName => "invalid_name",
            Self::NotFound => "not_found",
            Self::InvalidFormat => "invalid_format",
            Self::RetentionExceeded => "retention_exceeded",
            Self::InvalidUpload => "invalid_upload",
            Self::PayloadTooLarge => "payload_too_large",
            Self::ReadFailure => "read_failure",
            Self::WriteFailure => "write_failure",
            Self::EngineError => "engine_error",
            Self::ClearFailed => "clear_failed",
            Self::InsertFailed => "insert_failed",
            Self::StorageError => "storage_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error body: `{ "success": false, "error": { "code": ..., "message": ... } }`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

/// Anything a handler can fail with
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error(transparent)]
    Upload(#[from] UploadRejection),

    #[error("malformed multipart request: {0}")]
    Multipart(#[from] MultipartError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status, error code and client-facing message
    pub fn parts(&self) -> (StatusCode, ErrorCode, String) {
        match self {
            ApiError::Backup(e) => backup_parts(e),
            ApiError::Upload(UploadRejection::TooLarge { .. }) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorCode::PayloadTooLarge,
                self.to_string(),
            ),
            ApiError::Upload(_) => (
                StatusCode::BAD_REQUEST,
                ErrorCode::InvalidUpload,
                self.to_string(),
            ),
            ApiError::Multipart(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorCode::PayloadTooLarge,
                "upload exceeds the request size limit".to_string(),
            ),
            ApiError::Multipart(e) => (
                StatusCode::BAD_REQUEST,
                ErrorCode::InvalidUpload,
                e.body_text(),
            ),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
                "internal server error".to_string(),
            ),
        }
    }
}

fn backup_parts(e: &BackupError) -> (StatusCode, ErrorCode, String) {
    let server = |code, message: &str| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            code,
            message.to_string(),
        )
    };

    match e {
        BackupError::InvalidName { .. } => {
            (StatusCode::NOT_FOUND, ErrorCode::InvalidName, e.to_string())
        }
        BackupError::NotFound { .. } => {
            (StatusCode::NOT_FOUND, ErrorCode::NotFound, e.to_string())
        }
        BackupError::InvalidFormat { .. } => {
            (StatusCode::BAD_REQUEST, ErrorCode::InvalidFormat, e.to_string())
        }
        BackupError::RetentionExceeded { .. } => {
            (StatusCode::CONFLICT, ErrorCode::RetentionExceeded, e.to_string())
        }
        BackupError::ReadFailure { table, .. } => server(
            ErrorCode::ReadFailure,
            &format!("failed to read table `{}`", table),
        ),
        BackupError::WriteFailure { .. } => {
            server(ErrorCode::WriteFailure, "failed to write backup file")
        }
        BackupError::EngineError { .. } => server(
            ErrorCode::EngineError,
            "failed to suspend foreign key checks, nothing was changed",
        ),
        BackupError::ClearFailed { table, .. } => server(
            ErrorCode::ClearFailed,
            &format!(
                "failed to clear table `{}`, the database is partially restored",
                table
            ),
        ),
        BackupError::InsertFailed { position, .. } => server(
            ErrorCode::InsertFailed,
            &format!(
                "statement #{} failed, the database is partially restored",
                position
            ),
        ),
        BackupError::Storage { .. } => server(ErrorCode::StorageError, "backup storage error"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            error!(code = %code, error = %self, "Request failed");
        }

        let body = ErrorResponse {
            success: false,
            error: ErrorBody { code, message },
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
