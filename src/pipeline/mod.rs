//! The filter, sort and pagination stages that turn raw records into the page
//! the user sees.
//!
//! Each stage is a pure function over borrowed records, so running the whole
//! pipeline twice on the same input always gives the same output.

pub mod filter;
pub mod pagination;
pub mod sort;

use crate::{query::QueryState, record::Record};

use self::{
    filter::filter_records,
    pagination::{PageInfo, paginate},
    sort::sort_records,
};

/// The result of running every stage of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput<'a> {
    /// The filtered and sorted records, before pagination.
    pub ordered: Vec<&'a Record>,
    /// The records on the requested page.
    pub page: Vec<&'a Record>,
    /// Page counts and bounds.
    pub page_info: PageInfo,
    /// The sum of the amounts in `ordered`, independent of the page.
    pub total_amount: f64,
}

/// Filter, then sort, then paginate `records` according to `query`.
pub fn run_pipeline<'a>(records: &'a [Record], query: &QueryState) -> PipelineOutput<'a> {
    let filtered = filter_records(records, &query.search_text, &query.category_filter);
    let ordered = sort_records(&filtered, query.sort_key);
    let total_amount = total_amount(&ordered);
    let (page, page_info) = paginate(&ordered, query.page, query.page_size());
    let page = page.to_vec();

    PipelineOutput {
        ordered,
        page,
        page_info,
        total_amount,
    }
}

/// The sum of `amount` over `records`.
pub fn total_amount(records: &[&Record]) -> f64 {
    records.iter().map(|record| record.amount).sum()
}

#[cfg(test)]
mod tests {
    use time::{Duration, macros::datetime};

    use crate::{
        pipeline::run_pipeline,
        query::{CategoryFilter, QueryState},
        record::Record,
    };

    fn records() -> Vec<Record> {
        let start = datetime!(2024-01-01 9:00 UTC);

        (1..=10)
            .map(|i| {
                let category = if i % 2 == 0 { "Even" } else { "Odd" };
                Record::new(i, &format!("expense {i}"), i as f64, start + Duration::days(i))
                    .with_categories(category, "")
            })
            .collect()
    }

    #[test]
    fn total_is_independent_of_page() {
        let records = records();
        let mut query = QueryState::new(3).unwrap();
        query.category_filter = CategoryFilter::new("Even", "");

        let totals: Vec<f64> = (1..=3)
            .map(|page| {
                query.page = page;
                run_pipeline(&records, &query).total_amount
            })
            .collect();

        assert_eq!(totals, [30.0, 30.0, 30.0]);
    }

    #[test]
    fn pages_hold_at_most_page_size_records() {
        let records = records();
        let mut query = QueryState::new(4).unwrap();

        for page in 1..=4 {
            query.page = page;
            let output = run_pipeline(&records, &query);

            assert!(output.page.len() <= 4);
            assert_eq!(output.page_info.total_pages, 3);
        }
    }

    #[test]
    fn default_query_shows_newest_first() {
        let records = records();
        let query = QueryState::new(3).unwrap();

        let output = run_pipeline(&records, &query);

        let ids: Vec<String> = output.page.iter().map(|r| r.id.to_string()).collect();
        assert_eq!(ids, ["10", "9", "8"]);
        assert_eq!(output.ordered.len(), 10);
    }
}
