//! Run results and read-only views of migration state.

use std::fmt;
use std::time::Duration;
use tm_core::{Direction, MigrationVersion};

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// At least one migration was applied or reverted
    Completed,
    /// Already at the target
    NoPendingMigrations,
}

/// One migration applied or reverted during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    pub version: MigrationVersion,
    pub name: String,
    pub duration: Duration,
}

/// Result of a successful upgrade or downgrade.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub direction: Direction,
    pub from: Option<MigrationVersion>,
    pub to: Option<MigrationVersion>,
    pub migrations: Vec<MigrationRecord>,
    pub outcome: Outcome,
}

impl RunReport {
    pub fn versions(&self) -> Vec<&MigrationVersion> {
        self.migrations.iter().map(|m| &m.version).collect()
    }

    pub fn is_noop(&self) -> bool {
        self.outcome == Outcome::NoPendingMigrations
    }
}

/// Current position of the database relative to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub current: Option<MigrationVersion>,
    pub applied_count: usize,
    pub pending_count: usize,
    pub pending: Vec<MigrationVersion>,
}

/// A disagreement between the ledger and the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discrepancy {
    ChecksumMismatch {
        version: MigrationVersion,
        recorded: String,
        current: String,
    },
    UnknownAppliedVersion {
        version: MigrationVersion,
    },
    Gap {
        missing: MigrationVersion,
        applied: MigrationVersion,
    },
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::ChecksumMismatch {
                version,
                recorded,
                current,
            } => write!(
                f,
                "{version}: checksum changed since it was applied (ledger {recorded}, definition {current})"
            ),
            Discrepancy::UnknownAppliedVersion { version } => {
                write!(f, "{version}: applied but no migration file defines it")
            }
            Discrepancy::Gap { missing, applied } => {
                write!(f, "{missing}: not applied although later {applied} is")
            }
        }
    }
}
