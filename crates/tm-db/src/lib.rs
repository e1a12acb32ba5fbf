//! tm-db - DuckDB layer for Tidemark
//!
//! Owns everything that touches the target database: scoped transactions,
//! rendering operations to SQL, table rebuilds for column changes, the
//! transformation executor, the
//! applied-version ledger and the migration lock.

pub mod connection;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod lock;
pub mod rebuild;
pub mod render;

pub use connection::{TargetDb, Tx};
pub use error::{DbError, DbResult, ExecError, ExecResult};
pub use executor::{apply, attribute_commit_failure, execute, execute_transformation};
pub use ledger::{Ledger, LedgerEntry};
pub use lock::{new_owner_id, LockGuard, LockInfo, MigrationLock};
pub use rebuild::{ColumnChange, TableShape};
