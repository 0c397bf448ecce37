//! Drives the expense view against a [RecordService].
//!
//! The tracker owns the view state for the active date range: the main list
//! (through a [ViewCoordinator]), the primary category rollup and an optional
//! secondary category drill-down. Each of these loads and fails on its own.
//!
//! Every fetch carries a [RequestToken]. A response is only applied if no
//! newer request of the same kind was issued while it was in flight, so a slow
//! response for an old date range can never overwrite a newer one.

use std::sync::Arc;

use serde_json::Value;
use time::Date;
use tokio::{
    sync::broadcast::{self, error::TryRecvError},
    task::JoinSet,
};

use crate::{
    Error,
    aggregation::{drilldown::SecondaryDrilldown, rollup::CategoryRollup},
    config::ViewConfig,
    coordinator::ViewCoordinator,
    date_range::{DateRange, RangePreset, compute_range},
    export::{ReportHeading, render_report, write_csv},
    record::{NewRecord, Record, RecordId, RecordUpdate},
    request::{RequestSequence, RequestToken},
    section::Section,
    service::{RecordQuery, RecordService},
    session::{SessionEvent, SessionEvents},
};

/// A raw record fetch that has been issued but not yet applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordsRequest {
    /// Identifies the request when its response arrives.
    pub token: RequestToken,
    /// What to ask the data service for.
    pub query: RecordQuery,
}

/// A primary rollup fetch that has been issued but not yet applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollupRequest {
    /// Identifies the request when its response arrives.
    pub token: RequestToken,
    /// The range to sum over.
    pub range: DateRange,
}

/// The expense view for one session.
pub struct ExpenseTracker<S> {
    service: Arc<S>,
    config: ViewConfig,
    today: Date,
    range: DateRange,
    preset: Option<RangePreset>,
    view: ViewCoordinator,
    records_status: Section<()>,
    summary: Section<CategoryRollup>,
    drilldown: Option<SecondaryDrilldown>,
    records_requests: RequestSequence,
    summary_requests: RequestSequence,
    drilldown_requests: RequestSequence,
    session: Option<broadcast::Receiver<SessionEvent>>,
}

impl<S> ExpenseTracker<S>
where
    S: RecordService + 'static,
{
    /// Create a tracker showing the default preset range around `today`.
    ///
    /// Nothing is fetched until [ExpenseTracker::refresh] or
    /// [ExpenseTracker::select_date_range] is called.
    ///
    /// # Errors
    /// Returns an error if `config` is invalid, see [ViewConfig::validate].
    pub fn new(service: Arc<S>, config: ViewConfig, today: Date) -> Result<Self, Error> {
        config.validate()?;

        let preset = RangePreset::default_preset();
        let view = ViewCoordinator::new(config.pagination.clone())?;

        Ok(Self {
            service,
            config,
            today,
            range: compute_range(preset, today),
            preset: Some(preset),
            view,
            records_status: Section::default(),
            summary: Section::default(),
            drilldown: None,
            records_requests: RequestSequence::default(),
            summary_requests: RequestSequence::default(),
            drilldown_requests: RequestSequence::default(),
            session: None,
        })
    }

    /// Reset the tracker whenever `events` reports that the session ended.
    pub fn with_session(mut self, events: &SessionEvents) -> Self {
        self.session = Some(events.subscribe());
        self
    }

    // ========================================================================
    // STATE
    // ========================================================================

    /// The main expense list.
    pub fn view(&self) -> &ViewCoordinator {
        &self.view
    }

    /// The main expense list, for changing the search, filters, sort order,
    /// page or selection.
    pub fn view_mut(&mut self) -> &mut ViewCoordinator {
        &mut self.view
    }

    /// The loading and error state of the main expense list.
    pub fn records_status(&self) -> &Section<()> {
        &self.records_status
    }

    /// The primary category rollup for the active range.
    pub fn summary(&self) -> &Section<CategoryRollup> {
        &self.summary
    }

    /// The open secondary category drill-down, if any.
    pub fn drilldown(&self) -> Option<&SecondaryDrilldown> {
        self.drilldown.as_ref()
    }

    /// The active date range.
    pub fn range(&self) -> DateRange {
        self.range
    }

    /// The preset the active range was picked from, `None` for a custom range.
    pub fn preset(&self) -> Option<RangePreset> {
        self.preset
    }

    /// The settings the tracker was created with.
    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    // ========================================================================
    // DATE RANGE
    // ========================================================================

    /// Switch to a preset range.
    pub async fn select_preset(&mut self, preset: RangePreset) {
        let range = compute_range(preset, self.today);
        self.change_range(range, Some(preset)).await;
    }

    /// Switch to a custom range.
    ///
    /// # Errors
    /// Returns [Error::InvalidDateRange] if `start` is after `end`, leaving the
    /// active range unchanged.
    pub async fn select_date_range(&mut self, start: Date, end: Date) -> Result<(), Error> {
        let range = DateRange::new(start, end)?;
        self.change_range(range, None).await;
        Ok(())
    }

    async fn change_range(&mut self, range: DateRange, preset: Option<RangePreset>) {
        tracing::debug!("Switching date range to {}", range.label());

        self.range = range;
        self.preset = preset;
        self.drilldown = None;
        self.drilldown_requests.invalidate();

        if let Err(error) = self.view.reset_query() {
            tracing::error!("Could not reset the query: {error}");
        }

        self.load_records_and_summary().await;
    }

    // ========================================================================
    // FETCHING
    // ========================================================================

    /// Fetch the records, the primary rollup and any open drill-down again.
    pub async fn refresh(&mut self) {
        self.load_records_and_summary().await;
        self.reload_drilldown().await;
    }

    async fn load_records_and_summary(&mut self) {
        let records_request = self.begin_records_request();
        let rollup_request = self.begin_rollup_request();
        let service = Arc::clone(&self.service);

        let (records, rollup) = tokio::join!(
            service.fetch_records(&records_request.query),
            service.fetch_primary_rollup(rollup_request.range),
        );

        self.apply_records_response(records_request.token, records);
        self.apply_rollup_response(rollup_request.token, rollup);
    }

    /// Issue a raw record fetch for the active range, superseding any fetch
    /// still in flight.
    pub fn begin_records_request(&mut self) -> RecordsRequest {
        self.records_status.start_loading();

        RecordsRequest {
            token: self.records_requests.issue(),
            query: RecordQuery::in_range(self.range),
        }
    }

    /// Apply the response to a raw record fetch.
    ///
    /// Returns false, and changes nothing, if a newer fetch has been issued
    /// since `token` or the session was reset.
    pub fn apply_records_response(
        &mut self,
        token: RequestToken,
        response: Result<Vec<Record>, Error>,
    ) -> bool {
        if self.poll_session() || !self.records_requests.is_current(token) {
            tracing::debug!("Discarding stale record response {token:?}");
            return false;
        }

        match response {
            Ok(records) => {
                self.view.replace_records(records);
                self.records_status.succeed(());
            }
            Err(Error::Unauthorized) => {
                self.reset_session();
            }
            Err(error) => {
                tracing::warn!("Could not fetch expenses: {error}");
                self.view.replace_records(Vec::new());
                self.records_status.fail(&error);
            }
        }

        true
    }

    /// Issue a primary rollup fetch for the active range, superseding any
    /// fetch still in flight.
    pub fn begin_rollup_request(&mut self) -> RollupRequest {
        self.summary.start_loading();

        RollupRequest {
            token: self.summary_requests.issue(),
            range: self.range,
        }
    }

    /// Apply the response to a primary rollup fetch.
    ///
    /// Returns false, and changes nothing, if a newer fetch has been issued
    /// since `token` or the session was reset.
    pub fn apply_rollup_response(
        &mut self,
        token: RequestToken,
        response: Result<Vec<Value>, Error>,
    ) -> bool {
        if self.poll_session() || !self.summary_requests.is_current(token) {
            tracing::debug!("Discarding stale rollup response {token:?}");
            return false;
        }

        match response {
            Ok(rows) => self.summary.succeed(CategoryRollup::from_response(&rows)),
            Err(Error::Unauthorized) => self.reset_session(),
            Err(error) => {
                tracing::warn!("Could not fetch the category summary: {error}");
                self.summary.fail(&error);
            }
        }

        true
    }

    // ========================================================================
    // DRILL-DOWN
    // ========================================================================

    /// Break `primary_category` down into its secondary categories, replacing
    /// any open drill-down.
    pub async fn open_drilldown(&mut self, primary_category: &str) {
        self.drilldown = Some(SecondaryDrilldown::open(primary_category));
        self.reload_drilldown().await;
    }

    /// Close the drill-down.
    pub fn close_drilldown(&mut self) {
        self.drilldown = None;
        self.drilldown_requests.invalidate();
    }

    /// Narrow the drill-down listing to `secondary_category`, or widen it
    /// again if that category is already selected.
    pub async fn toggle_drilldown_secondary(&mut self, secondary_category: &str) {
        if let Some(drilldown) = self.drilldown.as_mut() {
            drilldown.toggle_secondary(secondary_category);
            self.reload_drilldown_listing().await;
        }
    }

    /// Remove the narrowing from the drill-down listing.
    pub async fn clear_drilldown_secondary(&mut self) {
        let changed = self
            .drilldown
            .as_mut()
            .is_some_and(|drilldown| drilldown.clear_secondary());

        if changed {
            self.reload_drilldown_listing().await;
        }
    }

    async fn reload_drilldown(&mut self) {
        let Some(drilldown) = self.drilldown.as_mut() else {
            return;
        };

        drilldown.rollup.start_loading();
        drilldown.listing.start_loading();
        let primary_category = drilldown.primary_category().to_owned();
        let query = RecordQuery::in_range(self.range).categories(&drilldown.listing_filter());
        let token = self.drilldown_requests.issue();
        let range = self.range;
        let service = Arc::clone(&self.service);

        let (rollup, listing) = tokio::join!(
            service.fetch_secondary_rollup(&primary_category, range),
            service.fetch_records(&query),
        );

        if self.poll_session() || !self.drilldown_requests.is_current(token) {
            tracing::debug!("Discarding stale drill-down response {token:?}");
            return;
        }

        if matches!(rollup, Err(Error::Unauthorized)) || matches!(listing, Err(Error::Unauthorized))
        {
            self.reset_session();
            return;
        }

        if let Some(drilldown) = self.drilldown.as_mut() {
            match rollup {
                Ok(rows) => drilldown
                    .rollup
                    .succeed(CategoryRollup::from_response(&rows)),
                Err(error) => {
                    tracing::warn!("Could not fetch the breakdown of {primary_category}: {error}");
                    drilldown.rollup.fail(&error);
                }
            }

            apply_listing(drilldown, listing);
        }
    }

    async fn reload_drilldown_listing(&mut self) {
        let Some(drilldown) = self.drilldown.as_mut() else {
            return;
        };

        drilldown.listing.start_loading();
        let query = RecordQuery::in_range(self.range).categories(&drilldown.listing_filter());
        let token = self.drilldown_requests.issue();
        let service = Arc::clone(&self.service);

        let listing = service.fetch_records(&query).await;

        if self.poll_session() || !self.drilldown_requests.is_current(token) {
            tracing::debug!("Discarding stale drill-down listing {token:?}");
            return;
        }

        if matches!(listing, Err(Error::Unauthorized)) {
            self.reset_session();
            return;
        }

        if let Some(drilldown) = self.drilldown.as_mut() {
            apply_listing(drilldown, listing);
        }
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Create an expense and refresh the view.
    ///
    /// # Errors
    /// Returns a validation error before contacting the data service, or the
    /// service's error. The view is left unchanged on error.
    pub async fn create_record(&mut self, new_record: NewRecord) -> Result<Record, Error> {
        new_record.validate()?;

        let result = self.service.create_record(new_record).await;
        let record = self.mutation(result)?;
        tracing::info!("Created expense {}", record.id);

        self.refresh().await;
        Ok(record)
    }

    /// Update an expense and refresh the view.
    ///
    /// # Errors
    /// Returns a validation error before contacting the data service, or the
    /// service's error. The view is left unchanged on error.
    pub async fn update_record(
        &mut self,
        id: &RecordId,
        update: RecordUpdate,
    ) -> Result<Record, Error> {
        update.validate()?;

        let result = self.service.update_record(id, update).await;
        let record = self.mutation(result)?;
        tracing::info!("Updated expense {id}");

        self.refresh().await;
        Ok(record)
    }

    /// Delete an expense and refresh the view.
    ///
    /// # Errors
    /// Returns the service's error, leaving the view unchanged.
    pub async fn delete_record(&mut self, id: &RecordId) -> Result<(), Error> {
        let result = self.service.delete_record(id).await;
        self.mutation(result)?;
        tracing::info!("Deleted expense {id}");

        self.refresh().await;
        Ok(())
    }

    /// Ask the data service to file the expenses still waiting for a
    /// category, refreshing the view if any were filed.
    ///
    /// Returns the number of filed expenses.
    ///
    /// # Errors
    /// Returns the service's error, leaving the view unchanged.
    pub async fn categorize_pending(&mut self) -> Result<usize, Error> {
        let result = self.service.categorize_pending().await;
        let filed = self.mutation(result)?;
        tracing::info!("Filed {filed} pending expenses");

        if filed > 0 {
            self.refresh().await;
        }

        Ok(filed)
    }

    /// Delete every selected expense.
    ///
    /// Every deletion is attempted before the outcome is reported. If at least
    /// one succeeded the view is refreshed and the selection cleared.
    ///
    /// Returns the number of deleted expenses.
    ///
    /// # Errors
    /// Returns a single [Error::BulkActionFailed] if any deletion failed.
    pub async fn bulk_delete(&mut self) -> Result<usize, Error> {
        let mut tasks = JoinSet::new();

        for id in self.view.selection().selected_ids() {
            let service = Arc::clone(&self.service);
            tasks.spawn(async move {
                let result = service.delete_record(&id).await;
                (id, result)
            });
        }

        self.finish_bulk_action("deleted", tasks).await
    }

    /// File every selected expense under `primary_category` and
    /// `secondary_category`.
    ///
    /// Follows the same rules as [ExpenseTracker::bulk_delete].
    ///
    /// Returns the number of updated expenses.
    ///
    /// # Errors
    /// Returns a single [Error::BulkActionFailed] if any update failed.
    pub async fn bulk_recategorize(
        &mut self,
        primary_category: &str,
        secondary_category: &str,
    ) -> Result<usize, Error> {
        let mut tasks = JoinSet::new();

        let updates = recategorize_updates(
            self.view.records(),
            self.view.selection().selected_ids(),
            primary_category,
            secondary_category,
        );

        for (id, update) in updates {
            let service = Arc::clone(&self.service);

            tasks.spawn(async move {
                let result = match update {
                    Some(update) => service.update_record(&id, update).await.map(|_| ()),
                    None => Err(Error::UpdateMissingRecord),
                };
                (id, result)
            });
        }

        self.finish_bulk_action("recategorized", tasks).await
    }

    async fn finish_bulk_action(
        &mut self,
        action: &'static str,
        mut tasks: JoinSet<(RecordId, Result<(), Error>)>,
    ) -> Result<usize, Error> {
        let attempted = tasks.len();
        let mut succeeded = 0;
        let mut details = Vec::new();
        let mut unauthorized = false;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => succeeded += 1,
                Ok((id, Err(error))) => {
                    unauthorized |= error == Error::Unauthorized;
                    details.push(format!("expense {id}: {}", error.user_message()));
                }
                Err(error) => details.push(format!("task failed: {error}")),
            }
        }

        if unauthorized {
            self.reset_session();
            return Err(Error::SessionInvalidated);
        }

        tracing::info!("{succeeded} of {attempted} expenses {action}");

        if succeeded > 0 {
            self.view.deselect_all();
            self.refresh().await;
        }

        if details.is_empty() {
            Ok(succeeded)
        } else {
            Err(Error::BulkActionFailed {
                action,
                failed: details.len(),
                attempted,
                details,
            })
        }
    }

    fn mutation<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        match result {
            Err(Error::Unauthorized) => {
                self.reset_session();
                Err(Error::SessionInvalidated)
            }
            Err(error) => {
                tracing::warn!("Mutation failed: {error}");
                Err(error)
            }
            ok => ok,
        }
    }

    // ========================================================================
    // DOCUMENTS
    // ========================================================================

    /// The filtered and sorted expenses across every page as CSV.
    ///
    /// # Errors
    /// Returns [Error::NothingToExport] if no expenses match.
    pub fn export_csv(&self) -> Result<String, Error> {
        write_csv(self.view.ordered_records())
    }

    /// The filtered and sorted expenses across every page as a printable HTML
    /// report.
    ///
    /// # Errors
    /// Returns [Error::NothingToExport] if no expenses match.
    pub fn print_report(&self) -> Result<String, Error> {
        let heading = ReportHeading {
            range: match self.preset {
                Some(RangePreset::AllTime) => None,
                _ => Some(self.range),
            },
            total_amount: self.view.total_amount(),
            currency_symbol: &self.config.currency_symbol,
        };

        render_report(self.view.ordered_records(), &heading)
    }

    // ========================================================================
    // SESSION
    // ========================================================================

    /// Check for a session event, resetting the tracker if the session ended.
    ///
    /// Returns whether the tracker was reset.
    pub fn poll_session(&mut self) -> bool {
        let invalidated = self.drain_session_events();

        if invalidated {
            self.reset_session();
        }

        invalidated
    }

    /// Consume every pending session event, returning whether any of them
    /// ended the session.
    fn drain_session_events(&mut self) -> bool {
        let Some(receiver) = self.session.as_mut() else {
            return false;
        };

        let mut invalidated = false;

        loop {
            match receiver.try_recv() {
                Ok(SessionEvent::Invalidated) | Err(TryRecvError::Lagged(_)) => {
                    invalidated = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        invalidated
    }

    /// Drop every piece of session bound state and supersede all requests in
    /// flight.
    pub fn reset_session(&mut self) {
        tracing::warn!("Session ended, clearing the expense view.");

        // The event behind this reset has been handled.
        self.drain_session_events();

        self.records_requests.invalidate();
        self.summary_requests.invalidate();
        self.drilldown_requests.invalidate();

        self.view.replace_records(Vec::new());
        if let Err(error) = self.view.reset_query() {
            tracing::error!("Could not reset the query: {error}");
        }

        self.records_status.reset();
        self.summary.reset();
        self.drilldown = None;
    }
}

/// Pair each of `ids` with the update that files it under the given
/// categories, or `None` if `records` does not hold that id.
fn recategorize_updates(
    records: &[Record],
    ids: Vec<RecordId>,
    primary_category: &str,
    secondary_category: &str,
) -> Vec<(RecordId, Option<RecordUpdate>)> {
    ids.into_iter()
        .map(|id| {
            let update = records.iter().find(|record| record.id == id).map(|record| {
                RecordUpdate::from_record(record)
                    .categories(Some(primary_category), Some(secondary_category))
            });
            (id, update)
        })
        .collect()
}

fn apply_listing(drilldown: &mut SecondaryDrilldown, listing: Result<Vec<Record>, Error>) {
    match listing {
        Ok(records) => drilldown.apply_listing(records),
        Err(error) => {
            tracing::warn!(
                "Could not fetch the expenses in {}: {error}",
                drilldown.primary_category()
            );
            drilldown.listing.fail(&error);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::{
            Arc, Mutex,
            atomic::{AtomicBool, AtomicUsize, Ordering},
        },
    };

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use time::{
        OffsetDateTime, PrimitiveDateTime, Time,
        macros::{date, datetime},
    };

    use crate::{
        Error,
        config::ViewConfig,
        date_range::{DateRange, RangePreset},
        record::{NewRecord, PENDING_CATEGORY, Record, RecordId, RecordUpdate},
        service::{RecordQuery, RecordService},
        session::{SessionEvents, SessionGuardedService},
        tracker::{ExpenseTracker, recategorize_updates},
    };

    const TODAY: time::Date = date!(2024 - 06 - 12);

    #[derive(Default)]
    struct FakeService {
        records: Mutex<Vec<Record>>,
        failing_ids: HashSet<String>,
        fail_records: bool,
        unauthorized: AtomicBool,
        next_id: AtomicUsize,
    }

    impl FakeService {
        fn with_records(records: Vec<Record>) -> Self {
            Self {
                records: Mutex::new(records),
                next_id: AtomicUsize::new(100),
                ..Default::default()
            }
        }

        fn check(&self) -> Result<(), Error> {
            if self.unauthorized.load(Ordering::SeqCst) {
                Err(Error::Unauthorized)
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl RecordService for FakeService {
        async fn fetch_records(&self, query: &RecordQuery) -> Result<Vec<Record>, Error> {
            self.check()?;

            if self.fail_records {
                return Err(Error::TransientNetworkFailure("connection reset".to_owned()));
            }

            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .filter(|record| {
                    query
                        .primary_category
                        .as_ref()
                        .is_none_or(|primary| &record.primary_category == primary)
                })
                .filter(|record| {
                    query
                        .secondary_category
                        .as_ref()
                        .is_none_or(|secondary| &record.secondary_category == secondary)
                })
                .cloned()
                .collect())
        }

        async fn fetch_primary_rollup(&self, _: DateRange) -> Result<Vec<Value>, Error> {
            self.check()?;

            Ok(vec![
                json!({"id": "Essentials", "value": 30}),
                json!({"id": "Leisure", "value": 70}),
            ])
        }

        async fn fetch_secondary_rollup(
            &self,
            primary_category: &str,
            _: DateRange,
        ) -> Result<Vec<Value>, Error> {
            self.check()?;

            Ok(vec![
                json!({"secondarycategory": "Movies", "total": "20.00", "count": 1}),
                json!({"secondarycategory": format!("{primary_category} misc"), "total": "50.00", "count": 2}),
            ])
        }

        async fn create_record(&self, new_record: NewRecord) -> Result<Record, Error> {
            self.check()?;

            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let occurred_at =
                PrimitiveDateTime::new(new_record.date, Time::MIDNIGHT).assume_utc();
            let record = Record::new(
                RecordId::new(&id.to_string()),
                &new_record.description,
                new_record.amount,
                occurred_at,
            );
            self.records.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn update_record(
            &self,
            id: &RecordId,
            update: RecordUpdate,
        ) -> Result<Record, Error> {
            self.check()?;

            if self.failing_ids.contains(id.as_str()) {
                return Err(Error::RequestRejected("Failed to update expense".to_owned()));
            }

            let mut records = self.records.lock().unwrap();
            let record = records
                .iter_mut()
                .find(|record| &record.id == id)
                .ok_or(Error::UpdateMissingRecord)?;
            record.description = update.description;
            if let Some(primary) = update.primary_category {
                record.primary_category = primary;
            }
            if let Some(secondary) = update.secondary_category {
                record.secondary_category = secondary;
            }
            Ok(record.clone())
        }

        async fn delete_record(&self, id: &RecordId) -> Result<(), Error> {
            self.check()?;

            if self.failing_ids.contains(id.as_str()) {
                return Err(Error::RequestRejected("Failed to delete expense".to_owned()));
            }

            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|record| &record.id != id);

            if records.len() == before {
                Err(Error::DeleteMissingRecord)
            } else {
                Ok(())
            }
        }

        async fn categorize_pending(&self) -> Result<usize, Error> {
            self.check()?;

            let mut records = self.records.lock().unwrap();
            let mut filed = 0;

            for record in records
                .iter_mut()
                .filter(|record| record.primary_category == PENDING_CATEGORY)
            {
                record.primary_category = "Essentials".to_owned();
                filed += 1;
            }

            Ok(filed)
        }
    }

    fn sample_records() -> Vec<Record> {
        vec![
            Record::new("1", "Groceries", 30.0, datetime!(2024-06-10 9:00 UTC))
                .with_categories("Essentials", "Food"),
            Record::new("2", "Cinema", 20.0, datetime!(2024-06-11 19:00 UTC))
                .with_categories("Leisure", "Movies"),
            Record::new("3", "Board game", 50.0, datetime!(2024-06-12 15:00 UTC))
                .with_categories("Leisure", ""),
        ]
    }

    fn tracker_for(service: FakeService) -> ExpenseTracker<FakeService> {
        ExpenseTracker::new(Arc::new(service), ViewConfig::default(), TODAY).unwrap()
    }

    fn record_at(id: &str, when: OffsetDateTime) -> Record {
        Record::new(id, "expense", 1.0, when)
    }

    #[tokio::test]
    async fn refresh_loads_records_and_summary() {
        let mut tracker = tracker_for(FakeService::with_records(sample_records()));

        tracker.refresh().await;

        assert_eq!(tracker.view().records().len(), 3);
        assert_eq!(tracker.view().total_amount(), 100.0);
        assert_eq!(tracker.summary().data().rows[0].category, "Leisure");
        assert!(!tracker.records_status().is_loading());
    }

    #[tokio::test]
    async fn default_range_is_current_week() {
        let tracker = tracker_for(FakeService::default());

        assert_eq!(tracker.preset(), Some(RangePreset::Week));
        assert_eq!(
            tracker.range(),
            DateRange::new(date!(2024 - 06 - 09), date!(2024 - 06 - 15)).unwrap()
        );
    }

    #[test]
    fn stale_records_response_is_discarded() {
        let mut tracker = tracker_for(FakeService::default());
        let older = tracker.begin_records_request();
        let newer = tracker.begin_records_request();

        let applied_newer = tracker.apply_records_response(
            newer.token,
            Ok(vec![record_at("new", datetime!(2024-06-11 9:00 UTC))]),
        );
        let applied_older = tracker.apply_records_response(
            older.token,
            Ok(vec![record_at("old", datetime!(2024-06-10 9:00 UTC))]),
        );

        assert!(applied_newer);
        assert!(!applied_older);
        assert_eq!(tracker.view().records()[0].id, RecordId::new("new"));
    }

    #[test]
    fn stale_rollup_response_is_discarded() {
        let mut tracker = tracker_for(FakeService::default());
        let older = tracker.begin_rollup_request();
        let newer = tracker.begin_rollup_request();

        tracker.apply_rollup_response(newer.token, Ok(vec![json!({"id": "New", "value": 1})]));
        let applied = tracker.apply_rollup_response(older.token, Ok(vec![]));

        assert!(!applied);
        assert_eq!(tracker.summary().data().rows[0].category, "New");
    }

    #[tokio::test]
    async fn failed_record_fetch_does_not_block_summary() {
        let mut tracker = tracker_for(FakeService {
            fail_records: true,
            ..FakeService::with_records(sample_records())
        });

        tracker.refresh().await;

        assert_eq!(
            tracker.records_status().error(),
            Some("Network error: Could not connect to the server.")
        );
        assert!(tracker.view().records().is_empty());
        assert_eq!(tracker.summary().data().rows.len(), 2);
        assert_eq!(tracker.summary().error(), None);
    }

    #[tokio::test]
    async fn new_range_resets_query() {
        let mut tracker = tracker_for(FakeService::with_records(sample_records()));
        tracker.refresh().await;
        tracker.view_mut().set_search_text("cinema");

        tracker
            .select_date_range(date!(2024 - 06 - 01), date!(2024 - 06 - 30))
            .await
            .unwrap();

        assert!(tracker.view().query().search_text.is_empty());
        assert_eq!(tracker.view().ordered_records().len(), 3);
        assert_eq!(tracker.preset(), None);
    }

    #[tokio::test]
    async fn rejects_inverted_range() {
        let mut tracker = tracker_for(FakeService::default());
        let before = tracker.range();

        let got = tracker
            .select_date_range(date!(2024 - 06 - 30), date!(2024 - 06 - 01))
            .await;

        assert_eq!(
            got,
            Err(Error::InvalidDateRange(
                date!(2024 - 06 - 30),
                date!(2024 - 06 - 01)
            ))
        );
        assert_eq!(tracker.range(), before);
    }

    #[tokio::test]
    async fn bulk_delete_with_one_failure_reports_once_and_keeps_success() {
        let mut tracker = tracker_for(FakeService {
            failing_ids: HashSet::from(["2".to_owned()]),
            ..FakeService::with_records(sample_records())
        });
        tracker.refresh().await;
        tracker.view_mut().toggle_selection(&RecordId::new("1"), true);
        tracker.view_mut().toggle_selection(&RecordId::new("2"), true);

        let got = tracker.bulk_delete().await;

        match got {
            Err(Error::BulkActionFailed {
                action,
                failed,
                attempted,
                details,
            }) => {
                assert_eq!(action, "deleted");
                assert_eq!(failed, 1);
                assert_eq!(attempted, 2);
                assert_eq!(details, ["expense 2: Failed to delete expense"]);
            }
            other => panic!("Expected a bulk action failure, got {other:?}"),
        }

        let remaining: Vec<&str> = tracker
            .view()
            .records()
            .iter()
            .map(|record| record.id.as_str())
            .collect();
        assert_eq!(remaining, ["2", "3"]);
        assert!(tracker.view().selection().is_empty());
    }

    #[tokio::test]
    async fn bulk_recategorize_updates_every_selected_record() {
        let mut tracker = tracker_for(FakeService::with_records(sample_records()));
        tracker.refresh().await;
        tracker.view_mut().select_all_visible();

        let got = tracker.bulk_recategorize("Essentials", "Household").await;

        assert_eq!(got, Ok(3));
        assert!(
            tracker
                .view()
                .records()
                .iter()
                .all(|record| record.secondary_category == "Household")
        );
    }

    #[tokio::test]
    async fn invalid_new_record_is_not_sent() {
        let mut tracker = tracker_for(FakeService::with_records(sample_records()));
        tracker.refresh().await;

        let got = tracker
            .create_record(NewRecord::build("  ", 10.0, TODAY))
            .await;

        assert_eq!(got, Err(Error::EmptyDescription));
        assert_eq!(tracker.view().records().len(), 3);
    }

    #[tokio::test]
    async fn create_refreshes_records() {
        let mut tracker = tracker_for(FakeService::with_records(sample_records()));
        tracker.refresh().await;

        let created = tracker
            .create_record(NewRecord::build("Coffee", 4.5, TODAY))
            .await
            .unwrap();

        assert!(tracker.view().records().contains(&created));
        assert_eq!(tracker.view().total_amount(), 104.5);
    }

    #[tokio::test]
    async fn failed_delete_leaves_view_unchanged() {
        let mut tracker = tracker_for(FakeService {
            failing_ids: HashSet::from(["3".to_owned()]),
            ..FakeService::with_records(sample_records())
        });
        tracker.refresh().await;
        tracker.view_mut().toggle_selection(&RecordId::new("1"), true);

        let got = tracker.delete_record(&RecordId::new("3")).await;

        assert_eq!(
            got,
            Err(Error::RequestRejected("Failed to delete expense".to_owned()))
        );
        assert_eq!(tracker.view().records().len(), 3);
        assert_eq!(tracker.view().selection().len(), 1);
    }

    #[tokio::test]
    async fn drilldown_loads_rollup_and_listing() {
        let mut tracker = tracker_for(FakeService::with_records(sample_records()));

        tracker.open_drilldown("Leisure").await;

        let drilldown = tracker.drilldown().unwrap();
        assert_eq!(drilldown.rollup.data().rows[0].category, "Leisure misc");
        assert_eq!(drilldown.listing.data().len(), 2);
    }

    #[tokio::test]
    async fn drilldown_selection_narrows_only_its_listing() {
        let mut tracker = tracker_for(FakeService::with_records(sample_records()));
        tracker.refresh().await;
        tracker.open_drilldown("Leisure").await;

        tracker.toggle_drilldown_secondary("Movies").await;

        let drilldown = tracker.drilldown().unwrap();
        assert_eq!(drilldown.listing.data().len(), 1);
        assert_eq!(drilldown.listing_total(), 20.0);
        assert!(tracker.view().query().category_filter.is_empty());
        assert_eq!(tracker.view().ordered_records().len(), 3);

        tracker.clear_drilldown_secondary().await;

        assert_eq!(tracker.drilldown().unwrap().listing.data().len(), 2);
    }

    #[tokio::test]
    async fn session_invalidation_clears_view() {
        let events = SessionEvents::new();
        let mut tracker = tracker_for(FakeService::with_records(sample_records())).with_session(&events);
        tracker.refresh().await;
        let pending = tracker.begin_records_request();

        events.invalidate();
        let applied = tracker.apply_records_response(pending.token, Ok(sample_records()));

        assert!(!applied);
        assert!(tracker.view().records().is_empty());
        assert!(tracker.summary().data().is_empty());
    }

    #[tokio::test]
    async fn unauthorized_fetch_through_guard_resets_tracker() {
        let events = SessionEvents::new();
        let service = SessionGuardedService::new(
            FakeService {
                unauthorized: AtomicBool::new(true),
                ..FakeService::with_records(sample_records())
            },
            events.clone(),
        );
        let mut tracker = ExpenseTracker::new(Arc::new(service), ViewConfig::default(), TODAY)
            .unwrap()
            .with_session(&events);

        tracker.refresh().await;

        assert!(tracker.view().records().is_empty());
        assert_eq!(tracker.records_status().error(), None);
        assert!(!tracker.poll_session());
    }

    #[tokio::test]
    async fn export_covers_every_page() {
        let mut tracker = tracker_for(FakeService::with_records(sample_records()));
        tracker.refresh().await;
        tracker.view_mut().set_page_size(10).unwrap();

        let csv = tracker.export_csv().unwrap();

        assert_eq!(csv.lines().count(), 4);
    }

    #[tokio::test]
    async fn export_of_empty_view_fails() {
        let mut tracker = tracker_for(FakeService::default());
        tracker.refresh().await;

        assert_eq!(tracker.export_csv(), Err(Error::NothingToExport));
        assert_eq!(tracker.print_report(), Err(Error::NothingToExport));
    }

    type GuardedTracker = ExpenseTracker<SessionGuardedService<FakeService>>;

    async fn guarded_tracker(
        events: &SessionEvents,
    ) -> (Arc<SessionGuardedService<FakeService>>, GuardedTracker) {
        let service = Arc::new(SessionGuardedService::new(
            FakeService::with_records(sample_records()),
            events.clone(),
        ));
        let mut tracker = ExpenseTracker::new(Arc::clone(&service), ViewConfig::default(), TODAY)
            .unwrap()
            .with_session(events);
        tracker.refresh().await;

        (service, tracker)
    }

    #[tokio::test]
    async fn unauthorized_delete_resets_once_and_next_refresh_loads() {
        let events = SessionEvents::new();
        let (service, mut tracker) = guarded_tracker(&events).await;
        service.inner().unauthorized.store(true, Ordering::SeqCst);

        let got = tracker.delete_record(&RecordId::new("1")).await;

        assert_eq!(got, Err(Error::SessionInvalidated));
        assert!(tracker.view().records().is_empty());
        assert!(!tracker.poll_session());

        service.inner().unauthorized.store(false, Ordering::SeqCst);
        let request = tracker.begin_records_request();
        let applied = tracker.apply_records_response(request.token, Ok(sample_records()));

        assert!(applied);
        assert_eq!(tracker.view().records().len(), 3);

        tracker.refresh().await;

        assert_eq!(tracker.view().records().len(), 3);
        assert!(!tracker.summary().data().is_empty());
    }

    #[tokio::test]
    async fn unauthorized_bulk_delete_resets_and_tracker_recovers() {
        let events = SessionEvents::new();
        let (service, mut tracker) = guarded_tracker(&events).await;
        tracker.view_mut().select_all_visible();
        service.inner().unauthorized.store(true, Ordering::SeqCst);

        let got = tracker.bulk_delete().await;

        assert_eq!(got, Err(Error::SessionInvalidated));
        assert!(tracker.view().records().is_empty());
        assert!(tracker.view().selection().is_empty());

        service.inner().unauthorized.store(false, Ordering::SeqCst);
        tracker.refresh().await;

        assert_eq!(tracker.view().records().len(), 3);
        assert_eq!(service.inner().records.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn lagging_behind_session_events_still_resets() {
        let events = SessionEvents::new();
        let mut tracker =
            tracker_for(FakeService::with_records(sample_records())).with_session(&events);
        tracker.refresh().await;

        for _ in 0..20 {
            events.invalidate();
        }

        assert!(tracker.poll_session());
        assert!(tracker.view().records().is_empty());
        assert!(!tracker.poll_session());

        tracker.refresh().await;

        assert_eq!(tracker.view().records().len(), 3);
    }

    #[tokio::test]
    async fn categorize_pending_refreshes_view() {
        let mut records = sample_records();
        records.push(
            Record::new("4", "Taxi", 12.0, datetime!(2024-06-12 8:00 UTC))
                .with_categories(PENDING_CATEGORY, ""),
        );
        let mut tracker = tracker_for(FakeService::with_records(records));
        tracker.refresh().await;

        let got = tracker.categorize_pending().await;

        assert_eq!(got, Ok(1));
        let taxi = tracker
            .view()
            .records()
            .iter()
            .find(|record| record.id == RecordId::new("4"))
            .unwrap();
        assert_eq!(taxi.primary_category, "Essentials");
    }

    #[test]
    fn recategorize_reports_ids_without_a_loaded_record() {
        let records = sample_records();
        let ids = vec![RecordId::new("2"), RecordId::new("missing")];

        let got = recategorize_updates(&records, ids, "Leisure", "Games");

        assert_eq!(got.len(), 2);
        let update = got[0].1.as_ref().unwrap();
        assert_eq!(update.primary_category.as_deref(), Some("Leisure"));
        assert_eq!(update.secondary_category.as_deref(), Some("Games"));
        assert_eq!(update.description, "Cinema");
        assert_eq!(got[1], (RecordId::new("missing"), None));
    }
}
