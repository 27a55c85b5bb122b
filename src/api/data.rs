//! Data-management API endpoints.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    Json,
};

use super::{success, ApiResult};
use crate::auth::admin_email;
use crate::errors::AppError;
use crate::models::{
    DeleteAllResponse, ImportFileQuery, ImportResult, ImportUrlRequest, LogEntry, RestoreRequest,
    RestoreResponse,
};
use crate::AppState;

/// An import that wrote nothing becomes an error response carrying its row errors.
fn import_response(result: ImportResult) -> ApiResult<ImportResult> {
    if result.success {
        success(result)
    } else {
        Err(AppError::ImportFailed {
            message: result.message,
            errors: result.errors,
        })
    }
}

/// POST /api/admin/data/import/file - Import an uploaded JSON file.
pub async fn import_file(
    State(state): State<AppState>,
    Query(query): Query<ImportFileQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<ImportResult> {
    let admin = admin_email(&headers)?;
    let result = state
        .manager
        .import_from_file(&query.file_name, &body, &admin)
        .await;
    import_response(result)
}

/// POST /api/admin/data/import/url - Import the JSON served at a URL.
pub async fn import_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ImportUrlRequest>,
) -> ApiResult<ImportResult> {
    let admin = admin_email(&headers)?;
    if request.url.trim().is_empty() {
        return Err(AppError::Validation("URL is required".to_string()));
    }

    let result = state.manager.import_from_url(request.url.trim(), &admin).await;
    import_response(result)
}

/// GET /api/admin/data/export - Current catalog snapshot as pretty JSON text.
pub async fn export_data(State(state): State<AppState>) -> ApiResult<String> {
    let exported = state.manager.export_data().await?;
    success(exported)
}

/// DELETE /api/admin/data - Back up the catalog, then delete it.
pub async fn delete_all_data(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<DeleteAllResponse> {
    let admin = admin_email(&headers)?;
    let backup_id = state.manager.delete_all_data(&admin).await?;
    success(DeleteAllResponse { backup_id })
}

/// POST /api/admin/data/restore - Overwrite the catalog with a backup.
pub async fn restore_data(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RestoreRequest>,
) -> ApiResult<RestoreResponse> {
    let admin = admin_email(&headers)?;
    state
        .manager
        .restore_data(&request.backup_id, &admin)
        .await?;
    success(RestoreResponse {
        restored_from: request.backup_id,
    })
}

/// GET /api/admin/data/backups - Backup ids, newest first.
pub async fn list_backups(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    success(state.manager.list_backups().await)
}

/// GET /api/admin/logs - Most recent audit records, newest first.
pub async fn get_logs(State(state): State<AppState>) -> ApiResult<Vec<LogEntry>> {
    success(state.manager.get_logs().await)
}
