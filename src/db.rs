//! Creates the SQLite schema for the reference expense store.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::Error;

/// Create the expense table in the database.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS expense (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                description TEXT NOT NULL,
                amount REAL NOT NULL,
                occurred_at INTEGER NOT NULL,
                primary_category TEXT NOT NULL DEFAULT '',
                secondary_category TEXT NOT NULL DEFAULT ''
                )",
        (),
    )?;

    // Used by the range and category rollup queries.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_expense_occurred_at_category
         ON expense(occurred_at, primary_category);",
        (),
    )?;

    Ok(())
}

/// Create all of the database tables.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_expense_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::db::initialize;

    #[test]
    fn initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize(&conn).unwrap();
        initialize(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM expense", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
