//! Row validation and transformation for catalog imports.
//!
//! Rows are loosely typed JSON values. Checks follow loose-typing rules: a field
//! that is `null`, `false`, `0` or `""` counts as missing, and numeric fields may
//! arrive as numbers or numeric strings.

use serde_json::Value;

use crate::models::Drug;

/// Rows that survived validation plus one message per rejected row.
#[derive(Debug, Default)]
pub struct ValidatedRows {
    pub drugs: Vec<Drug>,
    pub errors: Vec<String>,
}

/// Validate every row in order and transform the survivors into catalog entries.
///
/// `now_millis` seeds the generated ids and `today` is the default `updateDate`.
pub fn validate_rows(rows: &[Value], now_millis: i64, today: &str) -> ValidatedRows {
    let mut validated = ValidatedRows::default();

    for (index, row) in rows.iter().enumerate() {
        match validate_row(row, index, now_millis, today) {
            Ok(drug) => validated.drugs.push(drug),
            Err(field) => validated
                .errors
                .push(format!("Row {}: Missing or invalid {}", index + 1, field)),
        }
    }

    validated
}

/// Validate one row; on failure returns the name of the first offending field.
fn validate_row(
    row: &Value,
    index: usize,
    now_millis: i64,
    today: &str,
) -> Result<Drug, &'static str> {
    let name = required_text(row.get("name")).ok_or("name")?;
    let new_price = required_number(row.get("newPrice")).ok_or("newPrice")?;
    let old_price = required_number(row.get("oldPrice")).ok_or("oldPrice")?;
    let no = required_text(row.get("no")).ok_or("no")?;

    let update_date = row
        .get("updateDate")
        .and_then(Value::as_str)
        .filter(|date| !date.is_empty())
        .unwrap_or(today)
        .to_string();

    let active_ingredient = row
        .get("activeIngredient")
        .and_then(Value::as_str)
        .filter(|ingredient| !ingredient.is_empty())
        .map(str::to_string);

    let average_discount_percent = row
        .get("averageDiscountPercent")
        .filter(|value| is_truthy(value))
        .map(coerce_number)
        .filter(|discount| discount.is_finite());

    let price_change = new_price - old_price;

    Ok(Drug {
        id: format!("drug_{}_{}", now_millis, index),
        name,
        new_price,
        old_price,
        no,
        update_date,
        price_change,
        // old_price of zero is let through and yields a non-finite percent
        price_change_percent: price_change / old_price * 100.0,
        original_order: index,
        active_ingredient,
        average_discount_percent,
    })
}

/// A present, non-blank string, trimmed.
fn required_text(value: Option<&Value>) -> Option<String> {
    let text = value?.as_str()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// A present (truthy) value that coerces to a finite number.
fn required_number(value: Option<&Value>) -> Option<f64> {
    let value = value.filter(|value| is_truthy(value))?;
    let number = coerce_number(value);
    number.is_finite().then_some(number)
}

/// Loose truthiness of a JSON value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Numeric coercion of a JSON value. `NaN` when the value is not numeric.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(flag) => f64::from(u8::from(*flag)),
        Value::Number(number) => number.as_f64().unwrap_or(f64::NAN),
        Value::String(text) => parse_numeric_text(text),
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Whole-string numeric parse: blank is zero, radix prefixes and signed
/// `Infinity` are accepted, anything else must be a plain decimal literal.
fn parse_numeric_text(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = text.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix)
                .map(|n| n as f64)
                .unwrap_or(f64::NAN);
        }
    }

    match text {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    if !text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return f64::NAN;
    }

    text.parse::<f64>().unwrap_or(f64::NAN)
}
