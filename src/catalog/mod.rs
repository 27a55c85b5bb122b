//! Public catalog browsing and single-entry admin edits.

pub mod browse;
mod editor;

pub use browse::{browse, parse_snapshot, BrowseQuery, CatalogPage, CatalogSnapshot};
pub use editor::{CatalogEditor, EditorError};

use std::time::Duration;

use serde_json::Value;

use crate::store::{paths, DocumentStore, StoreError};

/// Load and normalize the catalog snapshot, giving up after `timeout`.
///
/// When the snapshot has no embedded last-modified marker it is read from its own
/// path; a failure there only drops the date.
pub async fn load_catalog(
    store: &dyn DocumentStore,
    timeout: Duration,
) -> Result<CatalogSnapshot, StoreError> {
    let raw = tokio::time::timeout(timeout, store.get(paths::CATALOG))
        .await
        .map_err(|_| StoreError::Timeout)??;

    let mut snapshot = parse_snapshot(raw.as_ref());
    if snapshot.last_updated.is_none() {
        match store.get(paths::LAST_MODIFIED).await {
            Ok(Some(Value::String(date))) => snapshot.last_updated = Some(date),
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed to read last-modified marker: {}", e),
        }
    }

    tracing::debug!("Loaded {} catalog entries", snapshot.entries.len());
    Ok(snapshot)
}
