//! Defines the crate level error type.

use time::Date;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request never reached the data service, e.g. the connection was
    /// refused or timed out.
    #[error("network error: {0}")]
    TransientNetworkFailure(String),

    /// The data service responded with a failure status.
    ///
    /// The string is the human-readable message from the service and is safe
    /// to show to the user.
    #[error("{0}")]
    RequestRejected(String),

    /// The data service rejected the session's credentials.
    ///
    /// Any request failing this way also triggers a session invalidation, see
    /// [crate::session::SessionEvents].
    #[error("unauthorized: please sign in again")]
    Unauthorized,

    /// The session was invalidated while a request was in flight, so its
    /// result was discarded.
    #[error("the session is no longer valid")]
    SessionInvalidated,

    /// A page size of zero, or one that is not among the configured options.
    #[error("{0} is not a valid page size")]
    InvalidPageSize(usize),

    /// The start of a date range was after its end.
    #[error("the date range {0} to {1} ends before it starts")]
    InvalidDateRange(Date, Date),

    /// An expense was submitted without a description.
    #[error("expense description cannot be empty")]
    EmptyDescription,

    /// An expense amount was negative or not a finite number.
    #[error("{0} is not a valid expense amount")]
    InvalidAmount(f64),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to update a record that does not exist
    #[error("tried to update an expense that does not exist")]
    UpdateMissingRecord,

    /// Tried to delete a record that does not exist
    #[error("tried to delete an expense that does not exist")]
    DeleteMissingRecord,

    /// At least one item of a bulk action failed.
    ///
    /// Every item is attempted before this error is produced, so `failed`
    /// counts the failures out of `attempted` and `details` holds one message
    /// per failed item.
    #[error("{failed} of {attempted} expenses could not be {action}")]
    BulkActionFailed {
        /// Past tense verb describing the action, e.g. "deleted".
        action: &'static str,
        /// The number of items that failed.
        failed: usize,
        /// The number of items that were attempted.
        attempted: usize,
        /// The error message for each failed item.
        details: Vec<String>,
    },

    /// An export or print was requested for an empty collection.
    #[error("no expenses to export")]
    NothingToExport,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The CSV writer failed.
    #[error("could not write CSV: {0}")]
    CsvError(String),

    /// A document could not be written to disk.
    #[error("could not write file {0}")]
    IoError(String),

    /// The configured timezone is not a canonical timezone name.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error.to_string())
            }
        }
    }
}

impl From<csv::Error> for Error {
    fn from(value: csv::Error) -> Self {
        Error::CsvError(value.to_string())
    }
}

impl Error {
    /// The message to show the user in a blocking notice.
    ///
    /// Internal errors are replaced with a generic message so that SQL details
    /// never reach the user, they are logged instead.
    pub fn user_message(&self) -> String {
        match self {
            Error::TransientNetworkFailure(_) => {
                "Network error: Could not connect to the server.".to_owned()
            }
            Error::RequestRejected(message) => message.clone(),
            Error::BulkActionFailed {
                action,
                failed,
                attempted,
                details,
            } => {
                let mut message =
                    format!("{failed} of {attempted} expenses could not be {action}.");
                if let Some(first) = details.first() {
                    message.push_str(&format!(" First error: {first}"));
                }
                message
            }
            Error::SqlError(_) | Error::DatabaseLockError | Error::CsvError(_) => {
                tracing::error!("An unexpected error occurred: {}", self);
                "Something went wrong, check the logs for more details.".to_owned()
            }
            error => error.to_string(),
        }
    }
}
