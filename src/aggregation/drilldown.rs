//! The secondary category breakdown for one primary category, with its own
//! narrowed expense listing.
//!
//! This state is separate from the main list's [crate::query::QueryState]:
//! selecting a secondary category here narrows only the listing shown next
//! to the breakdown and never touches the main list's filters.

use crate::{
    aggregation::{normalize::UNCATEGORIZED_LABEL, rollup::CategoryRollup},
    pipeline::total_amount,
    query::CategoryFilter,
    record::Record,
    section::Section,
};

/// The breakdown of one primary category into its secondary categories.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryDrilldown {
    primary_category: String,
    selected_secondary: Option<String>,
    /// The secondary category rollup fetched for the primary category.
    pub rollup: Section<CategoryRollup>,
    /// The expenses in the primary category, narrowed to the selected
    /// secondary category if there is one.
    pub listing: Section<Vec<Record>>,
}

impl SecondaryDrilldown {
    /// Open the breakdown for `primary_category` with nothing loaded yet.
    pub fn open(primary_category: &str) -> Self {
        Self {
            primary_category: primary_category.to_owned(),
            selected_secondary: None,
            rollup: Section::default(),
            listing: Section::default(),
        }
    }

    /// The primary category being broken down.
    pub fn primary_category(&self) -> &str {
        &self.primary_category
    }

    /// The secondary category narrowing the listing, if any.
    pub fn selected_secondary(&self) -> Option<&str> {
        self.selected_secondary.as_deref()
    }

    /// Select a secondary category row, or clear the selection if `category`
    /// is already selected. Either way the listing must be fetched again.
    pub fn toggle_secondary(&mut self, category: &str) {
        if self.selected_secondary.as_deref() == Some(category) {
            self.selected_secondary = None;
        } else {
            self.selected_secondary = Some(category.to_owned());
        }
    }

    /// Clear the secondary selection.
    ///
    /// Returns whether the listing needs to be fetched again.
    pub fn clear_secondary(&mut self) -> bool {
        self.selected_secondary.take().is_some()
    }

    /// The categories to ask the data service for when fetching the listing.
    ///
    /// The [UNCATEGORIZED_LABEL] row has no real secondary category to query
    /// by, so it fetches the whole primary category and relies on
    /// [SecondaryDrilldown::apply_listing] to narrow the result.
    pub fn listing_filter(&self) -> CategoryFilter {
        let secondary = match self.selected_secondary.as_deref() {
            Some(UNCATEGORIZED_LABEL) | None => "",
            Some(category) => category,
        };

        CategoryFilter::new(&self.primary_category, secondary)
    }

    /// Store a fetched listing, narrowing it when the uncategorized row is
    /// selected.
    pub fn apply_listing(&mut self, mut records: Vec<Record>) {
        if self.selected_secondary.as_deref() == Some(UNCATEGORIZED_LABEL) {
            records.retain(|record| record.secondary_category.trim().is_empty());
        }

        self.listing.succeed(records);
    }

    /// The sum of the amounts in the listing.
    pub fn listing_total(&self) -> f64 {
        let records: Vec<&Record> = self.listing.data().iter().collect();
        total_amount(&records)
    }
}
