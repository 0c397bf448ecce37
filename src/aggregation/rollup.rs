//! Category rollups with each category's share of the total.

use std::cmp::Ordering;

use serde_json::Value;

use super::normalize::{AggregateRow, normalize_rows};

/// One category in a rollup.
#[derive(Debug, Clone, PartialEq)]
pub struct RollupRow {
    /// The category label.
    pub category: String,
    /// The summed amount for the category.
    pub amount: f64,
    /// The number of expenses in the category.
    pub count: u64,
    /// `100 * amount / total`, or zero when the total is zero.
    pub percent: f64,
}

impl RollupRow {
    /// The share of the total to one decimal place, e.g. "42.5%".
    pub fn percent_label(&self) -> String {
        format!("{:.1}%", self.percent)
    }
}

/// Category totals ordered from largest to smallest.
///
/// Percentages are relative to this rollup's own total, so a secondary rollup
/// for one primary category adds up to 100% on its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryRollup {
    /// Rows in descending order of amount.
    pub rows: Vec<RollupRow>,
    /// The sum of every row's amount.
    pub total: f64,
}

impl CategoryRollup {
    /// Build a rollup from a raw summary response, normalizing each row.
    pub fn from_response(rows: &[Value]) -> Self {
        Self::from_rows(normalize_rows(rows))
    }

    /// Build a rollup from already normalized rows.
    ///
    /// Rows with equal amounts keep the order the service sent them in.
    pub fn from_rows(mut rows: Vec<AggregateRow>) -> Self {
        let total: f64 = rows.iter().map(|row| row.amount).sum();

        rows.sort_by(|a, b| b.amount.partial_cmp(&a.amount).unwrap_or(Ordering::Equal));

        let rows = rows
            .into_iter()
            .map(|row| RollupRow {
                percent: percent_of(row.amount, total),
                category: row.category,
                amount: row.amount,
                count: row.count,
            })
            .collect();

        Self { rows, total }
    }

    /// Whether the rollup has no categories.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The row for `category`, if present.
    pub fn find(&self, category: &str) -> Option<&RollupRow> {
        self.rows.iter().find(|row| row.category == category)
    }
}

fn percent_of(value: f64, total: f64) -> f64 {
    if total == 0.0 {
        0.0
    } else {
        100.0 * value / total
    }
}
