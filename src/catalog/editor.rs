//! Admin edits to single catalog entries.
//!
//! The store offers no per-entry transaction, so each edit reads the whole catalog
//! snapshot, changes one slot and writes the snapshot back. Edits racing with an
//! import or another edit can lose updates.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::clock::Clock;
use crate::errors::AppError;
use crate::manager::coerce_number;
use crate::models::{DrugDraft, StoredEntry};
use crate::store::{paths, DocumentStore, StoreError};

/// Highest slot an edit may address. Array snapshots are padded with `null` up to
/// the slot, so this also bounds the padding.
pub const MAX_SLOT: usize = 100_000;

/// Errors from single-entry edits.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid catalog slot '{0}'")]
    InvalidSlot(String),

    #[error("Catalog entry {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<EditorError> for AppError {
    fn from(err: EditorError) -> Self {
        match err {
            EditorError::Validation(msg) => AppError::Validation(msg),
            EditorError::InvalidSlot(_) => AppError::BadRequest(err.to_string()),
            EditorError::NotFound(_) => AppError::NotFound(err.to_string()),
            EditorError::Store(e) => e.into(),
        }
    }
}

/// Adds, updates and deletes individual catalog entries.
pub struct CatalogEditor {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl CatalogEditor {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Add an entry at the next free slot.
    pub async fn add_entry(&self, draft: &DrugDraft) -> Result<StoredEntry, EditorError> {
        let fields = DraftFields::validate(draft)?;
        let mut catalog = self.load().await?;
        let slot = next_slot(&catalog);
        if slot > MAX_SLOT {
            return Err(EditorError::InvalidSlot(slot.to_string()));
        }
        self.write_entry(&mut catalog, slot, fields).await
    }

    /// Overwrite the entry at `slot`, creating it if the slot is empty.
    pub async fn update_entry(
        &self,
        slot: &str,
        draft: &DrugDraft,
    ) -> Result<StoredEntry, EditorError> {
        let slot = parse_slot(slot)?;
        let fields = DraftFields::validate(draft)?;
        let mut catalog = self.load().await?;
        self.write_entry(&mut catalog, slot, fields).await
    }

    /// Remove the entry at `slot`.
    pub async fn delete_entry(&self, slot: &str) -> Result<(), EditorError> {
        let index = parse_slot(slot)?;
        let mut catalog = self.load().await?;
        if !clear_slot(&mut catalog, index) {
            return Err(EditorError::NotFound(slot.to_string()));
        }
        self.store.put(paths::CATALOG, &catalog).await?;
        tracing::info!("Deleted catalog entry {}", index);
        Ok(())
    }

    async fn load(&self) -> Result<Value, EditorError> {
        Ok(self
            .store
            .get(paths::CATALOG)
            .await?
            .unwrap_or_else(|| Value::Array(Vec::new())))
    }

    async fn write_entry(
        &self,
        catalog: &mut Value,
        slot: usize,
        fields: DraftFields,
    ) -> Result<StoredEntry, EditorError> {
        let today = self.clock.today();
        let entry = fields.into_entry(slot, &today);

        set_slot(catalog, slot, entry.clone());
        self.store.put(paths::CATALOG, catalog).await?;

        if let Err(e) = self
            .store
            .put(paths::LAST_MODIFIED, &Value::String(today))
            .await
        {
            tracing::warn!("Failed to update last-modified marker: {}", e);
        }

        tracing::info!("Saved catalog entry {}", slot);
        Ok(StoredEntry {
            slot: slot.to_string(),
            entry,
        })
    }
}

/// Validated draft fields.
#[derive(Debug)]
struct DraftFields {
    name: String,
    new_price: f64,
    old_price: f64,
    no: Option<String>,
    active_ingredient: Option<String>,
    average_discount_percent: Option<f64>,
}

impl DraftFields {
    fn validate(draft: &DrugDraft) -> Result<Self, EditorError> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(EditorError::Validation("Name is required".to_string()));
        }

        let new_price = required_price(&draft.new_price, "newPrice")?;
        let old_price = required_price(&draft.old_price, "oldPrice")?;

        let average_discount_percent = match &draft.average_discount_percent {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) if text.trim().is_empty() => None,
            Some(value) => {
                let discount = coerce_number(value);
                if !discount.is_finite() {
                    return Err(EditorError::Validation(
                        "averageDiscountPercent must be a number".to_string(),
                    ));
                }
                Some(discount)
            }
        };

        Ok(Self {
            name: name.to_string(),
            new_price,
            old_price,
            no: non_blank(draft.no.as_deref()),
            active_ingredient: non_blank(draft.active_ingredient.as_deref()),
            average_discount_percent,
        })
    }

    fn into_entry(self, slot: usize, today: &str) -> Value {
        let mut entry = json!({
            "name": self.name,
            "newPrice": self.new_price,
            "oldPrice": self.old_price,
            "no": self.no.unwrap_or_else(|| slot.to_string()),
            "updateDate": today,
        });
        if let Some(ingredient) = self.active_ingredient {
            entry["activeIngredient"] = Value::String(ingredient);
        }
        if let Some(discount) = self.average_discount_percent {
            entry["averageDiscountPercent"] = json!(discount);
        }
        entry
    }
}

fn required_price(value: &Value, field: &str) -> Result<f64, EditorError> {
    let missing = match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    };
    if missing {
        return Err(EditorError::Validation(format!("{} is required", field)));
    }

    let price = coerce_number(value);
    if price.is_finite() {
        Ok(price)
    } else {
        Err(EditorError::Validation(format!("{} must be a number", field)))
    }
}

fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn parse_slot(slot: &str) -> Result<usize, EditorError> {
    slot.parse::<usize>()
        .ok()
        .filter(|index| *index <= MAX_SLOT)
        .ok_or_else(|| EditorError::InvalidSlot(slot.to_string()))
}

/// One past the highest occupied numeric slot; `1` for an empty catalog.
fn next_slot(catalog: &Value) -> usize {
    let highest = match catalog {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.is_null())
            .map(|(index, _)| index)
            .max(),
        Value::Object(map) => map
            .iter()
            .filter(|(_, item)| !item.is_null())
            .filter_map(|(key, _)| key.parse::<usize>().ok())
            .max(),
        _ => None,
    };
    highest.unwrap_or(0).saturating_add(1)
}

fn set_slot(catalog: &mut Value, slot: usize, entry: Value) {
    match catalog {
        Value::Array(items) => {
            if slot >= items.len() {
                items.resize(slot + 1, Value::Null);
            }
            items[slot] = entry;
        }
        Value::Object(map) => {
            map.insert(slot.to_string(), entry);
        }
        other => {
            let mut map = Map::new();
            map.insert(slot.to_string(), entry);
            *other = Value::Object(map);
        }
    }
}

/// Clear a slot; `false` when it was already empty.
fn clear_slot(catalog: &mut Value, slot: usize) -> bool {
    match catalog {
        Value::Array(items) => match items.get_mut(slot) {
            Some(item) if !item.is_null() => {
                *item = Value::Null;
                while items.last().is_some_and(Value::is_null) {
                    items.pop();
                }
                true
            }
            _ => false,
        },
        Value::Object(map) => map
            .remove(&slot.to_string())
            .is_some_and(|item| !item.is_null()),
        _ => false,
    }
}
