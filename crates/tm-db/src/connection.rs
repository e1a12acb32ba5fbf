//! Target database connection wrapper.
//!
//! [`TargetDb`] owns a DuckDB [`Connection`] and provides scoped
//! transactions. Work that must be atomic with a ledger update receives a
//! [`Tx`] handle, which only exists inside [`TargetDb::transaction`].

use crate::error::{DbError, DbResult};
use duckdb::Connection;
use std::ops::Deref;
use std::path::Path;

/// Handle to the database the migrations are applied to.
///
/// Single-threaded: each concurrent runner owns its own `TargetDb`, cloned
/// from a shared database with [`TargetDb::try_clone`].
pub struct TargetDb {
    conn: Connection,
}

/// Borrowed connection that is inside an open transaction.
pub struct Tx<'a> {
    conn: &'a Connection,
}

impl Deref for Tx<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn
    }
}

impl TargetDb {
    /// Open (or create) a DuckDB database file.
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self { conn })
    }

    /// Create a fresh in-memory database.
    pub fn open_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Open from a path string (handles the `:memory:` special case).
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::open_memory()
        } else {
            Self::open(Path::new(path))
        }
    }

    /// Wrap a connection supplied by the caller.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open another connection to the same database.
    pub fn try_clone(&self) -> DbResult<Self> {
        let conn = self
            .conn
            .try_clone()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Borrow the underlying DuckDB connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute `body` within a `BEGIN` / `COMMIT` transaction, rolling back on
    /// error.
    pub fn transaction<F, T, E>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(&Tx<'_>) -> Result<T, E>,
        E: From<DbError>,
    {
        self.conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;

        let result = body(&Tx { conn: &self.conn });

        match &result {
            Ok(_) => {
                if let Err(commit_err) = self.conn.execute_batch("COMMIT") {
                    let _ = self.conn.execute_batch("ROLLBACK");
                    return Err(DbError::CommitRejected(commit_err.to_string()).into());
                }
            }
            Err(_) => {
                if let Err(rollback_err) = self.conn.execute_batch("ROLLBACK") {
                    log::warn!("ROLLBACK failed: {rollback_err}");
                }
            }
        }
        result
    }

    /// Check whether a table or view exists.
    pub fn relation_exists(&self, name: &str) -> DbResult<bool> {
        relation_exists(&self.conn, name)
    }
}

/// Check whether a (possibly schema-qualified) table or view exists.
pub(crate) fn relation_exists(conn: &Connection, name: &str) -> DbResult<bool> {
    let (schema, table) = match tm_core::sql_utils::split_schema(name) {
        (Some(schema), table) => (schema, table),
        (None, table) => ("main", table),
    };
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
        duckdb::params![schema, table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
