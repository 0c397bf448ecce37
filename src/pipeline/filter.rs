//! Narrows the raw records by free-text search and category.

use std::collections::BTreeSet;

use crate::{query::CategoryFilter, record::Record};

/// Keep the records that match both `search_text` and `categories`.
///
/// The relative order of `records` is preserved. Search is a case-insensitive
/// substring match against the description and both categories, and an empty
/// or whitespace-only search matches everything. Category filters are exact
/// matches, with an empty filter matching any category.
pub fn filter_records<'a>(
    records: &'a [Record],
    search_text: &str,
    categories: &CategoryFilter,
) -> Vec<&'a Record> {
    let needle = search_text.trim().to_lowercase();

    records
        .iter()
        .filter(|record| matches_search(record, &needle) && matches_categories(record, categories))
        .collect()
}

/// `needle` must already be trimmed and lowercase.
fn matches_search(record: &Record, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }

    [
        &record.description,
        &record.primary_category,
        &record.secondary_category,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}

fn matches_categories(record: &Record, categories: &CategoryFilter) -> bool {
    let primary_matches =
        categories.primary.is_empty() || record.primary_category == categories.primary;
    let secondary_matches =
        categories.secondary.is_empty() || record.secondary_category == categories.secondary;

    primary_matches && secondary_matches
}

/// The distinct category labels present in a set of records, for building
/// category pickers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryOptions {
    /// Non-empty primary categories in alphabetical order.
    pub primary: Vec<String>,
    /// Non-empty secondary categories in alphabetical order.
    pub secondary: Vec<String>,
}

/// Collect the distinct, non-empty categories in `records`.
pub fn category_options(records: &[Record]) -> CategoryOptions {
    let mut primary = BTreeSet::new();
    let mut secondary = BTreeSet::new();

    for record in records {
        if !record.primary_category.is_empty() {
            primary.insert(record.primary_category.as_str());
        }

        if !record.secondary_category.is_empty() {
            secondary.insert(record.secondary_category.as_str());
        }
    }

    CategoryOptions {
        primary: primary.into_iter().map(str::to_owned).collect(),
        secondary: secondary.into_iter().map(str::to_owned).collect(),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::{
        pipeline::filter::{category_options, filter_records},
        query::CategoryFilter,
        record::Record,
    };

    fn records() -> Vec<Record> {
        let when = datetime!(2024-01-01 12:00 UTC);

        vec![
            Record::new("1", "Weekly groceries", 80.0, when).with_categories("Essentials", "Food"),
            Record::new("2", "Cinema", 25.0, when).with_categories("Leisure", "Movies"),
            Record::new("3", "Takeaway pizza", 30.0, when).with_categories("Leisure", "Food"),
            Record::new("4", "Bus pass", 45.0, when).with_categories("Essentials", "Transport"),
        ]
    }

    fn ids(records: &[&Record]) -> Vec<String> {
        records.iter().map(|record| record.id.to_string()).collect()
    }

    #[test]
    fn empty_search_matches_everything() {
        let records = records();

        let got = filter_records(&records, "   ", &CategoryFilter::default());

        assert_eq!(ids(&got), ["1", "2", "3", "4"]);
    }

    #[test]
    fn search_ignores_case_and_checks_categories() {
        let records = records();

        let got = filter_records(&records, "FOOD", &CategoryFilter::default());

        assert_eq!(ids(&got), ["1", "3"]);
    }

    #[test]
    fn search_matches_description_substring() {
        let records = records();

        let got = filter_records(&records, " pizz ", &CategoryFilter::default());

        assert_eq!(ids(&got), ["3"]);
    }

    #[test]
    fn category_filter_requires_exact_match() {
        let records = records();

        let got = filter_records(&records, "", &CategoryFilter::new("Leisure", ""));
        assert_eq!(ids(&got), ["2", "3"]);

        let got = filter_records(&records, "", &CategoryFilter::new("Leis", ""));
        assert!(got.is_empty());
    }

    #[test]
    fn search_and_category_are_combined() {
        let records = records();

        let got = filter_records(&records, "food", &CategoryFilter::new("Leisure", "Food"));

        assert_eq!(ids(&got), ["3"]);
    }

    #[test]
    fn category_options_are_sorted_and_distinct() {
        let mut records = records();
        records.push(Record::new("5", "Unsorted", 1.0, datetime!(2024-01-01 0:00 UTC)));

        let got = category_options(&records);

        assert_eq!(got.primary, ["Essentials", "Leisure"]);
        assert_eq!(got.secondary, ["Food", "Movies", "Transport"]);
    }
}
