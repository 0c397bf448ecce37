//! A SQLite backed [RecordService].
//!
//! The rollup queries answer in the same row shapes the hosted data service
//! has used over time: `{id, value}` rows for the primary rollup and
//! `{secondarycategory, total, count}` rows with text totals for the secondary
//! rollup. Callers normalize them like any other response.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{Connection, Row, params_from_iter, types::Value as SqlValue};
use serde_json::{Value, json};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

use crate::{
    Error,
    date_range::{DateRange, today_in},
    record::{NewRecord, PENDING_CATEGORY, Record, RecordId, RecordUpdate},
    service::{RecordQuery, RecordService},
};

/// Stores expenses in a SQLite database.
///
/// The expense table must exist, see [crate::db::initialize].
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    connection: Arc<Mutex<Connection>>,
    local_timezone: String,
}

impl SqliteRecordStore {
    /// Create a new store for the SQLite `connection`.
    ///
    /// `local_timezone` decides which day is "today" when a fetch does not
    /// specify a date range.
    pub fn new(connection: Arc<Mutex<Connection>>, local_timezone: &str) -> Self {
        Self {
            connection,
            local_timezone: local_timezone.to_owned(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|error| {
            tracing::error!("Could not acquire the database lock: {error}");
            Error::DatabaseLockError
        })
    }

    fn today(&self) -> Date {
        today_in(&self.local_timezone).unwrap_or_else(|error| {
            tracing::warn!("{error}, falling back to UTC");
            OffsetDateTime::now_utc().date()
        })
    }
}

#[async_trait]
impl RecordService for SqliteRecordStore {
    async fn fetch_records(&self, query: &RecordQuery) -> Result<Vec<Record>, Error> {
        let range = query.range_or_all_time(self.today());
        let connection = self.lock()?;
        get_records(
            range,
            query.primary_category.as_deref(),
            query.secondary_category.as_deref(),
            &connection,
        )
    }

    async fn fetch_primary_rollup(&self, range: DateRange) -> Result<Vec<Value>, Error> {
        let connection = self.lock()?;
        get_primary_rollup(range, &connection)
    }

    async fn fetch_secondary_rollup(
        &self,
        primary_category: &str,
        range: DateRange,
    ) -> Result<Vec<Value>, Error> {
        let connection = self.lock()?;
        get_secondary_rollup(primary_category, range, &connection)
    }

    async fn create_record(&self, new_record: NewRecord) -> Result<Record, Error> {
        new_record.validate()?;
        let connection = self.lock()?;
        create_record(new_record, &connection)
    }

    async fn update_record(&self, id: &RecordId, update: RecordUpdate) -> Result<Record, Error> {
        update.validate()?;
        let connection = self.lock()?;
        update_record(id, update, &connection)
    }

    async fn delete_record(&self, id: &RecordId) -> Result<(), Error> {
        let connection = self.lock()?;
        delete_record(id, &connection)
    }

    async fn categorize_pending(&self) -> Result<usize, Error> {
        let connection = self.lock()?;
        categorize_pending(&connection)
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Insert a new expense.
///
/// Expenses without a category are filed under [PENDING_CATEGORY].
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn create_record(new_record: NewRecord, connection: &Connection) -> Result<Record, Error> {
    let primary_category = new_record
        .category
        .unwrap_or_else(|| PENDING_CATEGORY.to_owned());

    let record = connection
        .prepare(
            "INSERT INTO expense (description, amount, occurred_at, primary_category)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id, description, amount, occurred_at, primary_category, secondary_category",
        )?
        .query_row(
            (
                new_record.description.trim(),
                new_record.amount,
                day_start(new_record.date),
                primary_category,
            ),
            map_record_row,
        )?;

    Ok(record)
}

/// Overwrite an expense. Categories set to `None` are left as they are.
///
/// # Errors
/// Returns an [Error::UpdateMissingRecord] if `id` does not refer to an
/// expense, or an [Error::SqlError] if there is some other SQL error.
pub fn update_record(
    id: &RecordId,
    update: RecordUpdate,
    connection: &Connection,
) -> Result<Record, Error> {
    let Some(id) = database_id(id) else {
        return Err(Error::UpdateMissingRecord);
    };

    connection
        .prepare(
            "UPDATE expense
             SET description = ?1,
                 amount = ?2,
                 occurred_at = ?3,
                 primary_category = COALESCE(?4, primary_category),
                 secondary_category = COALESCE(?5, secondary_category)
             WHERE id = ?6
             RETURNING id, description, amount, occurred_at, primary_category, secondary_category",
        )?
        .query_row(
            (
                update.description.trim(),
                update.amount,
                day_start(update.date),
                update.primary_category,
                update.secondary_category,
                id,
            ),
            map_record_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingRecord,
            error => error.into(),
        })
}

/// Delete an expense.
///
/// # Errors
/// Returns an [Error::DeleteMissingRecord] if `id` does not refer to an
/// expense, or an [Error::SqlError] if there is some other SQL error.
pub fn delete_record(id: &RecordId, connection: &Connection) -> Result<(), Error> {
    let Some(id) = database_id(id) else {
        return Err(Error::DeleteMissingRecord);
    };

    let rows_affected = connection.execute("DELETE FROM expense WHERE id = ?1", (id,))?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingRecord);
    }

    Ok(())
}

/// File the expenses under [PENDING_CATEGORY] using the categories of the most
/// recent categorised expense with the same description, ignoring case.
///
/// Pending expenses with no such match stay pending.
///
/// Returns the number of expenses that were filed.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn categorize_pending(connection: &Connection) -> Result<usize, Error> {
    // SQLite takes the bare columns from the row holding max(occurred_at).
    let rows_affected = connection.execute(
        "UPDATE expense
        SET primary_category = latest.primary_category,
            secondary_category = latest.secondary_category
        FROM (
            SELECT lower(description) AS match_key, primary_category, secondary_category,
                max(occurred_at)
            FROM expense
            WHERE primary_category NOT IN (?1, '')
            GROUP BY lower(description)
        ) AS latest
        WHERE expense.primary_category = ?1
            AND lower(expense.description) = latest.match_key",
        (PENDING_CATEGORY,),
    )?;

    tracing::debug!("Filed {rows_affected} pending expenses");

    Ok(rows_affected)
}

/// Get the expenses in `range`, optionally narrowed to a primary and secondary
/// category, newest first.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_records(
    range: DateRange,
    primary_category: Option<&str>,
    secondary_category: Option<&str>,
    connection: &Connection,
) -> Result<Vec<Record>, Error> {
    let mut where_clause_parts = vec!["occurred_at >= ?1 AND occurred_at < ?2".to_owned()];
    let mut query_parameters = vec![
        SqlValue::Integer(range.start_instant().unix_timestamp()),
        SqlValue::Integer(range.end_instant_exclusive().unix_timestamp()),
    ];

    for (column, category) in [
        ("primary_category", primary_category),
        ("secondary_category", secondary_category),
    ] {
        if let Some(category) = category {
            where_clause_parts.push(format!("{column} = ?{}", query_parameters.len() + 1));
            query_parameters.push(SqlValue::Text(category.to_owned()));
        }
    }

    let query_string = format!(
        "SELECT id, description, amount, occurred_at, primary_category, secondary_category
         FROM expense
         WHERE {}
         ORDER BY occurred_at DESC, id ASC",
        where_clause_parts.join(" AND ")
    );

    connection
        .prepare(&query_string)?
        .query_map(params_from_iter(query_parameters.iter()), map_record_row)?
        .map(|maybe_record| maybe_record.map_err(Error::from))
        .collect()
}

/// Sum the expenses in `range` by primary category, as `{id, value}` rows.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_primary_rollup(range: DateRange, connection: &Connection) -> Result<Vec<Value>, Error> {
    connection
        .prepare(
            "SELECT primary_category, SUM(amount)
             FROM expense
             WHERE occurred_at >= ?1 AND occurred_at < ?2
             GROUP BY primary_category",
        )?
        .query_map(range_params(range), |row| {
            let category: String = row.get(0)?;
            let total: f64 = row.get(1)?;
            Ok(json!({"id": category, "value": total}))
        })?
        .map(|maybe_row| maybe_row.map_err(Error::from))
        .collect()
}

/// Sum the expenses in `range` and `primary_category` by secondary category,
/// as `{secondarycategory, total, count}` rows with the total as text.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_secondary_rollup(
    primary_category: &str,
    range: DateRange,
    connection: &Connection,
) -> Result<Vec<Value>, Error> {
    let (start, end) = range_params(range);

    connection
        .prepare(
            "SELECT secondary_category, SUM(amount), COUNT(id)
             FROM expense
             WHERE occurred_at >= ?1 AND occurred_at < ?2 AND primary_category = ?3
             GROUP BY secondary_category",
        )?
        .query_map((start, end, primary_category), |row| {
            let category: String = row.get(0)?;
            let total: f64 = row.get(1)?;
            let count: i64 = row.get(2)?;
            Ok(json!({
                "secondarycategory": category,
                "total": format!("{total:.2}"),
                "count": count,
            }))
        })?
        .map(|maybe_row| maybe_row.map_err(Error::from))
        .collect()
}

/// Map a database row to a [Record].
pub fn map_record_row(row: &Row) -> Result<Record, rusqlite::Error> {
    let id: i64 = row.get(0)?;
    let description: String = row.get(1)?;
    let amount = row.get(2)?;
    let occurred_at: i64 = row.get(3)?;
    let primary_category: String = row.get(4)?;
    let secondary_category: String = row.get(5)?;

    let occurred_at = OffsetDateTime::from_unix_timestamp(occurred_at).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Integer, Box::new(error))
    })?;

    Ok(Record::new(id, &description, amount, occurred_at)
        .with_categories(&primary_category, &secondary_category))
}

fn range_params(range: DateRange) -> (i64, i64) {
    (
        range.start_instant().unix_timestamp(),
        range.end_instant_exclusive().unix_timestamp(),
    )
}

fn day_start(date: Date) -> i64 {
    PrimitiveDateTime::new(date, Time::MIDNIGHT)
        .assume_utc()
        .unix_timestamp()
}

fn database_id(id: &RecordId) -> Option<i64> {
    id.as_str().parse().ok()
}
