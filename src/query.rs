//! The user-controlled state that drives the view pipeline.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// The field records are ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortField {
    /// When the expense happened.
    Date,
    /// The amount spent.
    Amount,
    /// The description, ignoring case.
    Name,
}

/// The direction to sort in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Sort in order of increasing value.
    Ascending,
    /// Sort in order of decreasing value.
    Descending,
}

/// A sort field and direction, e.g. "date-desc".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    /// The field to compare.
    pub field: SortField,
    /// The direction to sort in.
    pub order: SortOrder,
}

impl SortKey {
    /// Newest first, the order records are shown in after loading.
    pub const NEWEST_FIRST: SortKey = SortKey {
        field: SortField::Date,
        order: SortOrder::Descending,
    };

    /// Create a sort key.
    pub const fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    /// The six sort keys offered to the user, in menu order.
    pub fn all() -> [SortKey; 6] {
        [
            SortKey::new(SortField::Date, SortOrder::Descending),
            SortKey::new(SortField::Date, SortOrder::Ascending),
            SortKey::new(SortField::Amount, SortOrder::Descending),
            SortKey::new(SortField::Amount, SortOrder::Ascending),
            SortKey::new(SortField::Name, SortOrder::Ascending),
            SortKey::new(SortField::Name, SortOrder::Descending),
        ]
    }

    /// The text shown for this key in the sort menu.
    pub fn label(self) -> &'static str {
        match (self.field, self.order) {
            (SortField::Date, SortOrder::Descending) => "Date (Newest First)",
            (SortField::Date, SortOrder::Ascending) => "Date (Oldest First)",
            (SortField::Amount, SortOrder::Descending) => "Amount (High to Low)",
            (SortField::Amount, SortOrder::Ascending) => "Amount (Low to High)",
            (SortField::Name, SortOrder::Ascending) => "Name (A-Z)",
            (SortField::Name, SortOrder::Descending) => "Name (Z-A)",
        }
    }
}

impl Default for SortKey {
    fn default() -> Self {
        Self::NEWEST_FIRST
    }
}

impl Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let field = match self.field {
            SortField::Date => "date",
            SortField::Amount => "amount",
            SortField::Name => "name",
        };
        let order = match self.order {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        };

        write!(f, "{field}-{order}")
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        SortKey::all()
            .into_iter()
            .find(|key| key.to_string() == text.trim())
            .ok_or_else(|| {
                format!(
                    "unknown sort option \"{text}\", expected one of: {}",
                    SortKey::all()
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

/// Exact-match category filters. An empty string matches any category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFilter {
    /// The primary category to match, or empty for any.
    pub primary: String,
    /// The secondary category to match, or empty for any.
    pub secondary: String,
}

impl CategoryFilter {
    /// Create a category filter.
    pub fn new(primary: &str, secondary: &str) -> Self {
        Self {
            primary: primary.to_owned(),
            secondary: secondary.to_owned(),
        }
    }

    /// Whether neither category level is filtered.
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.secondary.is_empty()
    }
}

/// Search, filter, sort and paging options for the expense list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    /// Free text matched against descriptions and categories.
    pub search_text: String,
    /// Category equality filters.
    pub category_filter: CategoryFilter,
    /// The order to show records in.
    pub sort_key: SortKey,
    /// The 1-indexed page to show.
    pub page: usize,
    /// The maximum number of records per page, always positive.
    page_size: usize,
}

impl QueryState {
    /// The default query with the given page size: no search, no category
    /// filter, newest first, first page.
    ///
    /// # Errors
    /// Returns [Error::InvalidPageSize] if `page_size` is zero.
    pub fn new(page_size: usize) -> Result<Self, Error> {
        if page_size == 0 {
            return Err(Error::InvalidPageSize(page_size));
        }

        Ok(Self {
            search_text: String::new(),
            category_filter: CategoryFilter::default(),
            sort_key: SortKey::NEWEST_FIRST,
            page: 1,
            page_size,
        })
    }

    /// The maximum number of records per page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Change the page size.
    ///
    /// # Errors
    /// Returns [Error::InvalidPageSize] if `page_size` is zero.
    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), Error> {
        if page_size == 0 {
            return Err(Error::InvalidPageSize(page_size));
        }

        self.page_size = page_size;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Error,
        query::{QueryState, SortField, SortKey, SortOrder},
    };

    #[test]
    fn formats_as_menu_value() {
        let key = SortKey::new(SortField::Name, SortOrder::Descending);

        assert_eq!(key.to_string(), "name-desc");
        assert_eq!(key.label(), "Name (Z-A)");
    }

    #[test]
    fn parses_amount_ascending() {
        let key: SortKey = "amount-asc".parse().unwrap();

        assert_eq!(key, SortKey::new(SortField::Amount, SortOrder::Ascending));
    }

    #[test]
    fn rejects_unknown_sort_option() {
        let got = "size-desc".parse::<SortKey>();

        assert!(got.is_err());
    }

    #[test]
    fn default_query_is_newest_first_on_page_one() {
        let query = QueryState::new(10).unwrap();

        assert_eq!(query.sort_key, SortKey::NEWEST_FIRST);
        assert_eq!(query.page, 1);
        assert!(query.search_text.is_empty());
        assert!(query.category_filter.is_empty());
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert_eq!(QueryState::new(0), Err(Error::InvalidPageSize(0)));

        let mut query = QueryState::new(10).unwrap();
        assert_eq!(query.set_page_size(0), Err(Error::InvalidPageSize(0)));
        assert_eq!(query.page_size(), 10);
    }
}
