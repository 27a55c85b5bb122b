//! Catalog entry model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A catalog entry as written by an import.
///
/// `price_change` and `price_change_percent` are computed once at import time and
/// stored alongside the entry. A non-finite percent serializes as `null`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Drug {
    pub id: String,
    pub name: String,
    pub new_price: f64,
    pub old_price: f64,
    pub no: String,
    pub update_date: String,
    pub price_change: f64,
    pub price_change_percent: f64,
    pub original_order: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_ingredient: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_discount_percent: Option<f64>,
}

/// Request body for adding or updating a single catalog entry.
///
/// Prices may arrive as numbers or numeric strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub new_price: Value,
    #[serde(default)]
    pub old_price: Value,
    #[serde(default)]
    pub no: Option<String>,
    #[serde(default)]
    pub active_ingredient: Option<String>,
    #[serde(default)]
    pub average_discount_percent: Option<Value>,
}

/// A single entry as stored at its catalog slot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEntry {
    pub slot: String,
    pub entry: Value,
}
