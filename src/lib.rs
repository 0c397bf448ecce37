//! Expense tracker is a view engine for browsing, summarising and editing
//! expense records held by a data service.
//!
//! The raw records for a date range go through a filter, sort and pagination
//! pipeline ([pipeline]) kept in step with the user's query by a
//! [ViewCoordinator]. Category totals computed by the data service are
//! normalized and ranked by the [aggregation] module. [ExpenseTracker] ties
//! these together against any [RecordService], and [SqliteRecordStore] is a
//! local service backed by SQLite.

#![warn(missing_docs)]

pub mod aggregation;
pub mod config;
pub mod coordinator;
pub mod currency;
pub mod date_range;
pub mod db;
mod error;
pub mod export;
pub mod logging;
pub mod pipeline;
pub mod query;
pub mod record;
pub mod request;
pub mod section;
pub mod selection;
pub mod service;
pub mod session;
pub mod store;
pub mod tracker;

pub use config::ViewConfig;
pub use coordinator::ViewCoordinator;
pub use db::initialize as initialize_db;
pub use error::Error;
pub use record::{NewRecord, Record, RecordId, RecordUpdate};
pub use service::{RecordQuery, RecordService};
pub use store::SqliteRecordStore;
pub use tracker::ExpenseTracker;
