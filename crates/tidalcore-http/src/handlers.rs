//! Backup endpoint handlers

use std::fs;

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Serialize;
use tidalcore_backup::{BackupInfo, RestoreReport};
use tidalcore_core::{BackupError, Store};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::upload::{UploadRejection, check_file_name, validate_upload};

/// Success body: `{ "success": true, "data": ..., "message": ... }`
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// POST /api/backups
pub async fn create_backup<S: Store + Send + 'static>(
    State(state): State<AppState<S>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<BackupInfo>>)> {
    let info = state.run(|service| service.create_backup()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(info).with_message("Backup created")),
    ))
}

/// GET /api/backups
pub async fn list_backups<S: Store + Send + 'static>(
    State(state): State<AppState<S>>,
) -> ApiResult<Json<ApiResponse<Vec<BackupInfo>>>> {
    let backups = state.run(|service| service.list_backups()).await?;
    Ok(Json(ApiResponse::data(backups)))
}

/// GET /api/backups/{filename}/download
pub async fn download_backup<S: Store + Send + 'static>(
    State(state): State<AppState<S>>,
    Path(filename): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let name = filename.clone();
    let bytes = state
        .run(move |service| {
            let path = service.backup_path(&name)?;
            fs::read(&path).map_err(|source| BackupError::Storage { path, source })
        })
        .await?;

    debug!(filename = %filename, bytes = bytes.len(), "Serving backup download");
    // The name has passed validation, so it is safe inside the header.
    let disposition = format!("attachment; filename=\"{}\"", filename);
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// POST /api/backups/{filename}/restore
pub async fn restore_backup<S: Store + Send + 'static>(
    State(state): State<AppState<S>>,
    Path(filename): Path<String>,
) -> ApiResult<Json<ApiResponse<RestoreReport>>> {
    let report = state
        .run(move |service| service.restore_backup(&filename))
        .await?;
    Ok(Json(
        ApiResponse::data(report).with_message("Database restored"),
    ))
}

/// POST /api/backups/upload, multipart field `file`
pub async fn upload_backup<S: Store + Send + 'static>(
    State(state): State<AppState<S>>,
    mut multipart: Multipart,
) -> ApiResult<Json<ApiResponse<RestoreReport>>> {
    let settings = state.upload_settings().clone();

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        // Refuse before buffering the body.
        check_file_name(&file_name, &settings)?;
        let content = field.bytes().await?;
        upload = Some((file_name, content.to_vec()));
        break;
    }

    let (file_name, content) = upload.ok_or(ApiError::Upload(UploadRejection::MissingFile))?;
    let dump = validate_upload(&file_name, content, &settings)?;

    info!(file_name = %file_name, bytes = dump.len(), "Restoring from uploaded backup");
    let report = state
        .run(move |service| service.restore_from_upload(&dump))
        .await?;
    Ok(Json(
        ApiResponse::data(report).with_message("Database restored from upload"),
    ))
}

/// DELETE /api/backups/{filename}
pub async fn delete_backup<S: Store + Send + 'static>(
    State(state): State<AppState<S>>,
    Path(filename): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state
        .run(move |service| service.delete_backup(&filename))
        .await?;
    Ok(Json(ApiResponse::message("Backup deleted")))
}
