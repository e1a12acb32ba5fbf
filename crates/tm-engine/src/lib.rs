//! tm-engine - Migration runner for Tidemark
//!
//! Diffs the registry against the applied-version ledger, validates the
//! result, and applies or reverts migrations one transaction at a time while
//! holding the migration lock.

pub mod cancel;
pub mod error;
pub mod plan;
pub mod report;
pub mod runner;
pub mod target;

pub use cancel::CancelToken;
pub use error::{MigrateError, MigrateResult};
pub use plan::Plan;
pub use report::{Discrepancy, MigrationRecord, Outcome, RunReport, Status};
pub use runner::{Migrator, MigratorSettings, RunState};
pub use target::Target;
