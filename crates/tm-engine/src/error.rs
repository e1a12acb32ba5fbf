//! Error types for tm-engine

use thiserror::Error;
use tm_core::{CoreError, MigrationVersion};
use tm_db::{DbError, ExecError};

/// Migration run errors
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Applied migration was edited after it ran (R001)
    #[error(
        "[R001] Checksum mismatch for applied migration {version}: ledger has {recorded}, definition has {current}"
    )]
    ChecksumMismatch {
        version: MigrationVersion,
        recorded: String,
        current: String,
    },

    /// Ledger references a version the registry does not know (R002)
    #[error("[R002] Applied migration {version} has no definition")]
    UnknownAppliedVersion { version: MigrationVersion },

    /// Ledger is not a contiguous prefix of registry order (R003)
    #[error("[R003] Migration {missing} is not applied but later migration {applied} is")]
    LedgerGap {
        missing: MigrationVersion,
        applied: MigrationVersion,
    },

    /// A migration failed mid-run (R004)
    #[error(
        "[R004] Migration {version} failed after {} completed migration(s): {source}",
        .completed.len()
    )]
    PartialFailure {
        version: MigrationVersion,
        completed: Vec<MigrationVersion>,
        #[source]
        source: ExecError,
    },

    /// Another run holds the migration lock (R005)
    #[error("[R005] Another migration run holds the lock ({holder}, since {since})")]
    LockContention { holder: String, since: String },

    /// Requested target version is not known (R006)
    #[error("[R006] Target version {target} not found in {location}")]
    TargetNotFound {
        target: MigrationVersion,
        location: &'static str,
    },

    /// Upgrade target is older than the current version (R007)
    #[error("[R007] Cannot upgrade to {target}: database is already at {current}")]
    TargetBehind {
        target: String,
        current: MigrationVersion,
    },

    /// Downgrade would revert a migration without a down transformation (R008)
    #[error("[R008] Migration {version} is irreversible")]
    Irreversible { version: MigrationVersion },

    /// Run stopped on request before the next migration started (R009)
    #[error("[R009] Run cancelled after {} completed migration(s)", .completed.len())]
    Cancelled { completed: Vec<MigrationVersion> },

    /// Registry or configuration error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Database error outside a migration's transformation
    #[error(transparent)]
    Db(DbError),
}

/// Result type alias for MigrateError
pub type MigrateResult<T> = Result<T, MigrateError>;

impl From<DbError> for MigrateError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::LockContention { holder, since } => {
                MigrateError::LockContention { holder, since }
            }
            other => MigrateError::Db(other),
        }
    }
}

impl MigrateError {
    /// Versions that committed before the run stopped.
    pub fn completed(&self) -> &[MigrationVersion] {
        match self {
            MigrateError::PartialFailure { completed, .. }
            | MigrateError::Cancelled { completed } => completed,
            _ => &[],
        }
    }

    /// True for errors raised while validating the plan, before anything ran.
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            MigrateError::ChecksumMismatch { .. }
                | MigrateError::UnknownAppliedVersion { .. }
                | MigrateError::LedgerGap { .. }
        )
    }
}
