//! The interface to the service that stores expenses and sums them by
//! category.

use async_trait::async_trait;
use serde_json::Value;
use time::Date;

use crate::{
    Error,
    date_range::DateRange,
    query::CategoryFilter,
    record::{NewRecord, Record, RecordId, RecordUpdate},
};

/// The parameters for fetching raw records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    /// The days to fetch, all time up to today when `None`.
    pub range: Option<DateRange>,
    /// Narrow to a primary category, ignored when empty.
    pub primary_category: Option<String>,
    /// Narrow to a secondary category, ignored when empty.
    pub secondary_category: Option<String>,
}

impl RecordQuery {
    /// Fetch the records in `range`.
    pub fn in_range(range: DateRange) -> Self {
        Self {
            range: Some(range),
            ..Default::default()
        }
    }

    /// Narrow the query to the non-empty categories in `filter`.
    pub fn categories(mut self, filter: &CategoryFilter) -> Self {
        self.primary_category = non_empty(&filter.primary);
        self.secondary_category = non_empty(&filter.secondary);
        self
    }

    /// The range to fetch, defaulting to 1970-01-01 through `today`.
    pub fn range_or_all_time(&self, today: Date) -> DateRange {
        self.range.unwrap_or_else(|| DateRange::all_time(today))
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

/// The data service behind the expense view.
///
/// Rollup responses are returned as raw JSON rows because their shape has
/// drifted over time. Callers pass them through
/// [crate::aggregation::normalize::normalize_rows] before use.
///
/// Every method fails with [Error::TransientNetworkFailure] when the service
/// could not be reached, [Error::RequestRejected] when it refused the request,
/// or [Error::Unauthorized] when the session is no longer valid.
#[async_trait]
pub trait RecordService: Send + Sync {
    /// Fetch the raw records matching `query`.
    async fn fetch_records(&self, query: &RecordQuery) -> Result<Vec<Record>, Error>;

    /// Fetch the per primary category totals for `range`.
    async fn fetch_primary_rollup(&self, range: DateRange) -> Result<Vec<Value>, Error>;

    /// Fetch the per secondary category totals within `primary_category` for
    /// `range`.
    async fn fetch_secondary_rollup(
        &self,
        primary_category: &str,
        range: DateRange,
    ) -> Result<Vec<Value>, Error>;

    /// Store a new record.
    async fn create_record(&self, new_record: NewRecord) -> Result<Record, Error>;

    /// Overwrite the fields of the record `id`.
    async fn update_record(&self, id: &RecordId, update: RecordUpdate) -> Result<Record, Error>;

    /// Delete the record `id`.
    async fn delete_record(&self, id: &RecordId) -> Result<(), Error>;

    /// Ask the service to file the records still under
    /// [crate::record::PENDING_CATEGORY].
    ///
    /// Returns the number of records that were filed. Services that cannot
    /// categorise records do nothing and return 0.
    async fn categorize_pending(&self) -> Result<usize, Error> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{
        date_range::DateRange, query::CategoryFilter, service::RecordQuery,
    };

    #[test]
    fn missing_range_defaults_to_all_time() {
        let today = date!(2025 - 02 - 14);

        let got = RecordQuery::default().range_or_all_time(today);

        assert_eq!(got, DateRange::all_time(today));
    }

    #[test]
    fn blank_categories_are_not_sent() {
        let range = DateRange::all_time(date!(2025 - 02 - 14));

        let got = RecordQuery::in_range(range).categories(&CategoryFilter::new("Leisure", " "));

        assert_eq!(got.primary_category.as_deref(), Some("Leisure"));
        assert_eq!(got.secondary_category, None);
    }
}
