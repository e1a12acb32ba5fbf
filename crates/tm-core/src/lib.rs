//! tm-core - Core library for Tidemark
//!
//! This crate provides the database-independent half of the migration
//! engine: version identifiers, reversible operations, migration
//! definitions with checksums, the ordered registry, and project
//! configuration.

pub mod checksum;
pub mod config;
pub mod error;
pub mod migration;
pub mod operation;
pub mod registry;
pub mod sql_utils;
pub mod version;

pub use checksum::compute_checksum;
pub use config::{Config, DatabaseConfig, LedgerConfig, TargetConfig};
pub use error::{CoreError, CoreResult};
pub use migration::{Direction, MigrationDefinition};
pub use operation::{
    Assignments, ColumnDef, IndexDef, Operation, SqlValue, TableDef, Transformation,
};
pub use registry::Registry;
pub use version::MigrationVersion;
