//! Public catalog browsing: snapshot normalization, filtering, sorting and paging.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::Drug;

/// Entries per catalog page.
pub const PAGE_SIZE: usize = 16;

/// Upper bound of the default price range; narrower ranges enable the price filter.
const PRICE_RANGE_MAX: f64 = 10_000.0;

/// Marker key the store keeps next to the numbered catalog slots.
const UPDATE_DATE_KEY: &str = "updateDate";

/// Normalized catalog ready for browsing.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub entries: Vec<Drug>,
    pub last_updated: Option<String>,
}

/// Normalize a raw catalog document.
///
/// The document is either an array of entries or an object keyed by numeric slot
/// (plus the `updateDate` marker). Slots are visited in ascending numeric order and
/// entries that fail normalization are skipped.
pub fn parse_snapshot(raw: Option<&Value>) -> CatalogSnapshot {
    let mut snapshot = CatalogSnapshot::default();

    let slots: Vec<(String, &Value)> = match raw {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item))
            .collect(),
        Some(Value::Object(map)) => {
            snapshot.last_updated = map
                .get(UPDATE_DATE_KEY)
                .and_then(Value::as_str)
                .map(str::to_string);
            numeric_slots(map)
        }
        _ => Vec::new(),
    };

    for (slot, raw_entry) in slots {
        let index = snapshot.entries.len();
        if let Some(drug) = normalize_entry(raw_entry, &slot, index) {
            snapshot.entries.push(drug);
        }
    }

    snapshot
}

fn numeric_slots(map: &Map<String, Value>) -> Vec<(String, &Value)> {
    let mut slots: Vec<(f64, String, &Value)> = map
        .iter()
        .filter_map(|(key, value)| {
            let position = key.parse::<f64>().ok().filter(|n| n.is_finite())?;
            Some((position, key.clone(), value))
        })
        .collect();
    slots.sort_by(|a, b| a.0.total_cmp(&b.0));
    slots
        .into_iter()
        .map(|(_, key, value)| (key, value))
        .collect()
}

/// Placeholder names that never show up in the public catalog.
fn is_placeholder_name(lower: &str) -> bool {
    matches!(lower, "aaa" | "test" | "تجربة")
        || lower.contains("illegal import")
        || lower.chars().count() < 2
}

/// Turn one stored entry into a display entry, or `None` if it should be hidden.
fn normalize_entry(raw: &Value, slot: &str, index: usize) -> Option<Drug> {
    let entry = raw.as_object()?;
    let name = entry.get("name")?.as_str()?.trim();
    if name.is_empty() || is_placeholder_name(&name.to_lowercase()) {
        return None;
    }

    let new_price = lenient_price(entry.get("newPrice"));
    let old_price = lenient_price(entry.get("oldPrice"));
    if new_price.is_nan() || old_price.is_nan() || !(new_price > 0.0 || old_price > 0.0) {
        return None;
    }

    // A missing price falls back to the other one
    let new_price = if new_price > 0.0 { new_price } else { old_price };
    let old_price = if old_price > 0.0 { old_price } else { new_price };

    let price_change = new_price - old_price;
    let price_change_percent = if old_price > 0.0 {
        round_to_cents(price_change / old_price * 100.0)
    } else {
        0.0
    };

    let no = match entry.get("no") {
        Some(Value::String(no)) if !no.is_empty() => no.clone(),
        Some(Value::Number(no)) => no.to_string(),
        _ => slot.to_string(),
    };

    Some(Drug {
        id: slot.to_string(),
        name: name.to_string(),
        new_price,
        old_price,
        no,
        update_date: entry
            .get("updateDate")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        price_change,
        price_change_percent,
        original_order: index,
        active_ingredient: entry
            .get("activeIngredient")
            .and_then(Value::as_str)
            .filter(|ingredient| !ingredient.is_empty())
            .map(str::to_string),
        average_discount_percent: entry
            .get("averageDiscountPercent")
            .filter(|discount| crate::manager::is_truthy(discount))
            .map(|discount| parse_float_prefix(&display_text(discount).replacen(',', ".", 1)))
            .filter(|discount| !discount.is_nan()),
    })
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Price parse for stored entries: missing is zero, `,` works as decimal separator
/// and trailing garbage after the number is ignored.
fn lenient_price(value: Option<&Value>) -> f64 {
    match value.filter(|value| crate::manager::is_truthy(value)) {
        None => 0.0,
        Some(value) => parse_float_prefix(&display_text(value).replacen(',', ".", 1)),
    }
}

fn display_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Parse the longest leading decimal literal; `NaN` when there is none.
fn parse_float_prefix(text: &str) -> f64 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    if text[end..].starts_with("Infinity") {
        return if bytes[0] == b'-' {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - digits_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let fraction_start = end + 1;
        let mut fraction_end = fraction_start;
        while fraction_end < bytes.len() && bytes[fraction_end].is_ascii_digit() {
            fraction_end += 1;
        }
        mantissa_digits += fraction_end - fraction_start;
        if mantissa_digits > 0 {
            end = fraction_end;
        }
    }
    if mantissa_digits == 0 {
        return f64::NAN;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exponent_end = end + 1;
        if exponent_end < bytes.len() && matches!(bytes[exponent_end], b'+' | b'-') {
            exponent_end += 1;
        }
        let exponent_digits_start = exponent_end;
        while exponent_end < bytes.len() && bytes[exponent_end].is_ascii_digit() {
            exponent_end += 1;
        }
        if exponent_end > exponent_digits_start {
            end = exponent_end;
        }
    }

    text[..end].parse::<f64>().unwrap_or(f64::NAN)
}

/// Price movement filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceChangeFilter {
    #[default]
    All,
    Increased,
    Decreased,
    Unchanged,
}

/// Sort keys; `Original` keeps catalog order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Original,
    Name,
    Price,
    Change,
    Discount,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Catalog query parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseQuery {
    /// Case-insensitive match against name or product number.
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub change: PriceChangeFilter,
    #[serde(default)]
    pub has_discount: bool,
    #[serde(default)]
    pub min_discount: Option<f64>,
    #[serde(default)]
    pub max_discount: Option<f64>,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub order: SortOrder,
    /// 1-based page number (default: 1).
    #[serde(default = "default_page")]
    pub page: usize,
}

fn default_page() -> usize {
    1
}

impl Default for BrowseQuery {
    fn default() -> Self {
        Self {
            q: None,
            min_price: None,
            max_price: None,
            change: PriceChangeFilter::All,
            has_discount: false,
            min_discount: None,
            max_discount: None,
            sort: SortKey::Original,
            order: SortOrder::Asc,
            page: 1,
        }
    }
}

/// One page of browse results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPage {
    pub items: Vec<Drug>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// Filter, sort and paginate a normalized catalog.
pub fn browse(snapshot: &CatalogSnapshot, query: &BrowseQuery) -> CatalogPage {
    let needle = query
        .q
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    let min_price = query.min_price.unwrap_or(0.0);
    let max_price = query.max_price.unwrap_or(PRICE_RANGE_MAX);
    let price_filtered = min_price > 0.0 || max_price < PRICE_RANGE_MAX;

    let min_discount = query.min_discount.unwrap_or(0.0);
    let max_discount = query.max_discount.unwrap_or(100.0);

    let mut matches: Vec<&Drug> = snapshot
        .entries
        .iter()
        .filter(|drug| match &needle {
            Some(needle) => {
                drug.name.to_lowercase().contains(needle.as_str())
                    || drug.no.to_lowercase().contains(needle.as_str())
            }
            None => true,
        })
        .filter(|drug| {
            !price_filtered || (drug.new_price >= min_price && drug.new_price <= max_price)
        })
        .filter(|drug| match query.change {
            PriceChangeFilter::All => true,
            PriceChangeFilter::Increased => drug.price_change > 0.0,
            PriceChangeFilter::Decreased => drug.price_change < 0.0,
            PriceChangeFilter::Unchanged => drug.price_change == 0.0,
        })
        .filter(|drug| {
            if !query.has_discount {
                return true;
            }
            match drug.average_discount_percent {
                Some(discount) if discount > 0.0 => {
                    discount >= min_discount && discount <= max_discount
                }
                _ => false,
            }
        })
        .collect();

    if query.sort != SortKey::Original {
        matches.sort_by(|a, b| {
            let ordering = compare_by(query.sort, a, b);
            match query.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
    }

    let total = matches.len();
    let total_pages = total.div_ceil(PAGE_SIZE);
    let page = query.page.max(1);
    let items = matches
        .into_iter()
        .skip((page - 1).saturating_mul(PAGE_SIZE))
        .take(PAGE_SIZE)
        .cloned()
        .collect();

    CatalogPage {
        items,
        total,
        page,
        total_pages,
        page_size: PAGE_SIZE,
        last_updated: snapshot.last_updated.clone(),
    }
}

fn compare_by(key: SortKey, a: &Drug, b: &Drug) -> Ordering {
    match key {
        SortKey::Original => a.original_order.cmp(&b.original_order),
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::Price => a.new_price.total_cmp(&b.new_price),
        SortKey::Change => a.price_change_percent.total_cmp(&b.price_change_percent),
        SortKey::Discount => a
            .average_discount_percent
            .unwrap_or(0.0)
            .total_cmp(&b.average_discount_percent.unwrap_or(0.0)),
    }
}
