//! Keeps the displayed page, the running total and the selection in step with
//! the raw records and the user's query.
//!
//! Changing the raw records, the search text, the category filter or the sort
//! key re-runs every pipeline stage, returns to the first page and clears the
//! selection. Changing only the page or the page size re-slices the cached
//! ordered collection and leaves the selection alone.

use crate::{
    Error,
    pipeline::{
        filter::{CategoryOptions, category_options},
        pagination::{
            PageInfo, PaginationConfig, PaginationIndicator, create_pagination_indicators,
            paginate,
        },
        run_pipeline,
    },
    query::{CategoryFilter, QueryState, SortKey},
    record::{Record, RecordId},
    selection::SelectionTracker,
};

/// The view state for the main expense list.
#[derive(Debug, Clone)]
pub struct ViewCoordinator {
    config: PaginationConfig,
    records: Vec<Record>,
    query: QueryState,
    selection: SelectionTracker,
    ordered: Vec<Record>,
    total_amount: f64,
}

impl ViewCoordinator {
    /// Create an empty view using the default page size from `config`.
    ///
    /// # Errors
    /// Returns [Error::InvalidPageSize] if the default page size is zero.
    pub fn new(config: PaginationConfig) -> Result<Self, Error> {
        let query = QueryState::new(config.default_page_size)?;

        Ok(Self {
            config,
            records: Vec::new(),
            query,
            selection: SelectionTracker::default(),
            ordered: Vec::new(),
            total_amount: 0.0,
        })
    }

    /// Swap in freshly fetched records.
    pub fn replace_records(&mut self, records: Vec<Record>) {
        self.records = records;
        self.rerun();
    }

    /// Change the free text search.
    pub fn set_search_text(&mut self, search_text: &str) {
        self.query.search_text = search_text.to_owned();
        self.rerun();
    }

    /// Change both category filters at once.
    pub fn set_category_filter(&mut self, category_filter: CategoryFilter) {
        self.query.category_filter = category_filter;
        self.rerun();
    }

    /// Remove both category filters.
    pub fn clear_category_filter(&mut self) {
        self.set_category_filter(CategoryFilter::default());
    }

    /// Change the sort order.
    pub fn set_sort_key(&mut self, sort_key: SortKey) {
        self.query.sort_key = sort_key;
        self.rerun();
    }

    /// Go to a page of the ordered collection.
    ///
    /// Pages past the end show nothing rather than failing.
    pub fn set_page(&mut self, page: usize) {
        self.query.page = page;
        self.update_visible();
    }

    /// Change the page size and go back to the first page.
    ///
    /// # Errors
    /// Returns [Error::InvalidPageSize] if `page_size` is not one of the
    /// configured options.
    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), Error> {
        if !self.config.page_size_options.contains(&page_size) {
            return Err(Error::InvalidPageSize(page_size));
        }

        self.query.set_page_size(page_size)?;
        self.query.page = 1;
        self.update_visible();

        Ok(())
    }

    /// Return to the default query, e.g. after picking a new date range.
    ///
    /// # Errors
    /// Returns [Error::InvalidPageSize] if the default page size is zero.
    pub fn reset_query(&mut self) -> Result<(), Error> {
        self.query = QueryState::new(self.config.default_page_size)?;
        self.rerun();

        Ok(())
    }

    /// The current query.
    pub fn query(&self) -> &QueryState {
        &self.query
    }

    /// The pagination settings the view was created with.
    pub fn pagination_config(&self) -> &PaginationConfig {
        &self.config
    }

    /// The records as last fetched, unfiltered.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// The filtered and sorted records across every page.
    ///
    /// Exports and printed reports use this collection so that they match the
    /// total shown to the user.
    pub fn ordered_records(&self) -> &[Record] {
        &self.ordered
    }

    /// The records on the current page.
    pub fn displayed_page(&self) -> &[Record] {
        self.current_page().0
    }

    /// Where the current page sits within the ordered collection.
    pub fn page_info(&self) -> PageInfo {
        self.current_page().1
    }

    /// The pager links for the current page.
    pub fn indicators(&self) -> Vec<PaginationIndicator> {
        let info = self.page_info();
        create_pagination_indicators(info.page, info.total_pages, self.config.max_pages)
    }

    /// The sum of the amounts across every page of the ordered collection.
    pub fn total_amount(&self) -> f64 {
        self.total_amount
    }

    /// The category labels present in the raw records.
    pub fn category_options(&self) -> CategoryOptions {
        category_options(&self.records)
    }

    /// The ids marked for a bulk action.
    pub fn selection(&self) -> &SelectionTracker {
        &self.selection
    }

    /// Add or remove one record from the selection.
    ///
    /// Returns false, leaving the selection unchanged, if no loaded record has
    /// the id.
    pub fn toggle_selection(&mut self, id: &RecordId, included: bool) -> bool {
        if !self.records.iter().any(|record| &record.id == id) {
            return false;
        }

        self.selection.toggle(id, included);
        true
    }

    /// Select every record on the current page.
    pub fn select_all_visible(&mut self) {
        let visible = self.selection.visible().to_vec();
        self.selection.select_all_visible(&visible);
    }

    /// Clear the whole selection, including ids on other pages.
    pub fn deselect_all(&mut self) {
        self.selection.clear();
    }

    fn rerun(&mut self) {
        self.query.page = 1;
        self.selection.clear();

        let output = run_pipeline(&self.records, &self.query);
        self.total_amount = output.total_amount;
        self.ordered = output.ordered.into_iter().cloned().collect();

        tracing::debug!(
            "view pipeline re-ran: {} of {} records match, sorted by {}",
            self.ordered.len(),
            self.records.len(),
            self.query.sort_key
        );

        self.update_visible();
    }

    fn current_page(&self) -> (&[Record], PageInfo) {
        paginate(&self.ordered, self.query.page, self.query.page_size())
    }

    fn update_visible(&mut self) {
        let visible = self
            .displayed_page()
            .iter()
            .map(|record| record.id.clone())
            .collect();
        self.selection.set_visible(visible);
    }
}
