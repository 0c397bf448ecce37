//! Maps the category summary rows sent by the data service onto one canonical
//! shape.
//!
//! The summary endpoints have changed their response shape over time without a
//! stable contract: the total may be called `total`, `value`, `amount` or
//! `sum` and may be sent as a number or a string, and the label may be sent
//! under a category specific field, `category`, `id` or `name`. Rather than
//! probing for fields wherever a row is used, every row goes through
//! [normalize_row] once and the rest of the crate only sees [AggregateRow].
//!
//! Normalization never fails. Missing or malformed totals become zero and
//! missing labels become [UNCATEGORIZED_LABEL].

use serde_json::{Map, Value};

/// The label used for rows that do not carry a usable category name.
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";

/// Field names that may hold the summed amount, highest priority first.
const AMOUNT_ALIASES: &[&str] = &["total", "value", "amount", "sum"];

/// Field names that may hold the category label, highest priority first.
const LABEL_ALIASES: &[&str] = &[
    "secondarycategory",
    "primarycategory",
    "category",
    "id",
    "name",
];

/// Field names that may hold the number of expenses in the category.
const COUNT_ALIASES: &[&str] = &["count", "total_count"];

/// A category total in canonical form.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    /// The category label, or [UNCATEGORIZED_LABEL].
    pub category: String,
    /// The summed amount, finite and not negative.
    pub amount: f64,
    /// The number of expenses summed, zero if the service did not say.
    pub count: u64,
}

/// Normalize every row of a summary response.
///
/// `null` rows are dropped, every other row is kept.
pub fn normalize_rows(rows: &[Value]) -> Vec<AggregateRow> {
    rows.iter().filter_map(normalize_row).collect()
}

/// Normalize one summary row, returning `None` only for a `null` row.
///
/// For each of the amount, label and count, the aliases are tried in priority
/// order and the first one holding a usable value wins.
pub fn normalize_row(row: &Value) -> Option<AggregateRow> {
    let fields = match row {
        Value::Null => return None,
        Value::Object(fields) => fields,
        other => {
            tracing::debug!("Summary row is not an object, treating it as empty: {other}");
            return Some(AggregateRow {
                category: UNCATEGORIZED_LABEL.to_owned(),
                amount: 0.0,
                count: 0,
            });
        }
    };

    let amount = first_match(fields, AMOUNT_ALIASES, parse_amount).unwrap_or(0.0);
    let category = first_match(fields, LABEL_ALIASES, parse_label)
        .unwrap_or_else(|| UNCATEGORIZED_LABEL.to_owned());
    let count = first_match(fields, COUNT_ALIASES, parse_count).unwrap_or(0);

    Some(AggregateRow {
        category,
        amount,
        count,
    })
}

fn first_match<T>(
    fields: &Map<String, Value>,
    aliases: &[&str],
    parse: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    aliases
        .iter()
        .filter_map(|alias| fields.get(*alias))
        .find_map(parse)
}

/// A usable amount is a finite, non-negative number, sent either as a JSON
/// number or as numeric text.
fn parse_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    (amount.is_finite() && amount >= 0.0).then_some(amount)
}

fn parse_label(value: &Value) -> Option<String> {
    let label = match value {
        Value::String(text) => text.trim().to_owned(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };

    (!label.is_empty()).then_some(label)
}

fn parse_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|n| n.is_finite() && *n >= 0.0).map(|n| n as u64)),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }
}
