//! Error types for tm-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Table not found (D003)
    #[error("[D003] Table or view not found: {0}")]
    TableNotFound(String),

    /// Transaction management error (D004)
    #[error("[D004] Transaction failed: {0}")]
    TransactionError(String),

    /// Another run holds the migration lock (D005)
    #[error("[D005] Migration lock is held by {holder} since {since}")]
    LockContention { holder: String, since: String },

    /// Internal error (D006)
    #[error("[D006] Internal database error: {0}")]
    Internal(String),

    /// COMMIT failed after the transaction body succeeded (D007)
    #[error("[D007] Commit rejected: {0}")]
    CommitRejected(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// True when DuckDB rejected a write because a concurrent transaction
    /// touched the same row or catalog entry.
    pub fn is_conflict(&self) -> bool {
        match self {
            DbError::ExecutionError(msg)
            | DbError::TransactionError(msg)
            | DbError::CommitRejected(msg) => msg.contains("Conflict") || msg.contains("conflict"),
            _ => false,
        }
    }

    /// Name of the table DuckDB blamed for a commit-time catalog conflict
    /// ("Attempting to modify table X but another transaction has altered
    /// this table").
    pub fn altered_table(&self) -> Option<&str> {
        match self {
            DbError::CommitRejected(msg) => {
                let (_, rest) = msg.split_once("modify table ")?;
                let (table, _) = rest.split_once(" but ")?;
                Some(table.trim_matches('"'))
            }
            _ => None,
        }
    }

    /// True when an insert hit an existing primary or unique key.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            DbError::ExecutionError(msg) | DbError::TransactionError(msg) => {
                msg.contains("Duplicate key") || msg.contains("duplicate key")
            }
            _ => false,
        }
    }
}

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error does not expose structured variants, so classify by
        // message with narrow patterns.
        let msg = err.to_string();
        if msg.contains("Table with name")
            || msg.contains("Table or view with name")
            || (msg.contains("Catalog Error") && msg.contains("Table") && msg.contains("not found"))
        {
            DbError::TableNotFound(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}

/// Failure of one operation inside a transformation.
#[derive(Error, Debug)]
pub enum ExecError {
    /// Operation at `index` failed (D010)
    #[error("[D010] Operation {index} ({kind}) failed: {source}")]
    Operation {
        index: usize,
        kind: &'static str,
        statement: String,
        #[source]
        source: DbError,
    },

    /// Every operation ran but DuckDB refused the commit. `index` is the
    /// operation the conflict is attributed to (D011)
    #[error("[D011] Commit rejected after operation {index} ({kind}); split repeated changes to one table across migrations: {source}")]
    Commit {
        index: usize,
        kind: &'static str,
        #[source]
        source: DbError,
    },

    /// The surrounding transaction could not be opened or committed
    #[error(transparent)]
    Db(#[from] DbError),
}

impl ExecError {
    /// Position of the failing operation within its transformation, if the
    /// failure came from an operation.
    pub fn index(&self) -> Option<usize> {
        match self {
            ExecError::Operation { index, .. } | ExecError::Commit { index, .. } => Some(*index),
            ExecError::Db(_) => None,
        }
    }
}

/// Result type alias for ExecError
pub type ExecResult<T> = Result<T, ExecError>;
