//! Site content page endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::PageName;
use crate::store::paths;
use crate::AppState;

fn page_name(name: &str) -> Result<PageName, AppError> {
    PageName::from_str(name).ok_or_else(|| AppError::NotFound(format!("Unknown page '{}'", name)))
}

/// GET /api/admin/pages/:name - Read a content page; `null` when never written.
pub async fn get_page(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Option<Value>> {
    let page = page_name(&name)?;
    let content = state.store.get(&paths::page(page.as_str())).await?;
    success(content)
}

/// PUT /api/admin/pages/:name - Overwrite a content page with the request body.
pub async fn put_page(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(content): Json<Value>,
) -> ApiResult<Value> {
    let page = page_name(&name)?;
    state.store.put(&paths::page(page.as_str()), &content).await?;
    tracing::info!("Updated {} page", page.as_str());
    success(content)
}
