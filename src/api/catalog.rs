//! Catalog API endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;

use super::{success, ApiResult};
use crate::catalog::{self, BrowseQuery, CatalogPage};
use crate::models::{DrugDraft, StoredEntry};
use crate::AppState;

/// GET /api/catalog - Browse the public catalog.
pub async fn browse_catalog(
    State(state): State<AppState>,
    Query(query): Query<BrowseQuery>,
) -> ApiResult<CatalogPage> {
    let snapshot =
        catalog::load_catalog(state.store.as_ref(), state.config.catalog_timeout).await?;
    success(catalog::browse(&snapshot, &query))
}

/// POST /api/admin/drugs - Add a catalog entry at the next free slot.
pub async fn add_drug(
    State(state): State<AppState>,
    Json(draft): Json<DrugDraft>,
) -> ApiResult<StoredEntry> {
    let stored = state.editor.add_entry(&draft).await?;
    success(stored)
}

/// PUT /api/admin/drugs/:slot - Overwrite the entry at a slot.
pub async fn update_drug(
    State(state): State<AppState>,
    Path(slot): Path<String>,
    Json(draft): Json<DrugDraft>,
) -> ApiResult<StoredEntry> {
    let stored = state.editor.update_entry(&slot, &draft).await?;
    success(stored)
}

/// DELETE /api/admin/drugs/:slot - Remove the entry at a slot.
pub async fn delete_drug(State(state): State<AppState>, Path(slot): Path<String>) -> ApiResult<()> {
    state.editor.delete_entry(&slot).await?;
    success(())
}
