//! Applied-version ledger stored inside the target database.
//!
//! One row per applied migration. Rows are written and removed only through
//! [`Tx`], so a ledger change always commits or rolls back together with the
//! transformation it records.

use crate::connection::{relation_exists, Tx};
use crate::error::{DbError, DbResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::Connection;
use tm_core::sql_utils::{quote_ident, quote_qualified, split_schema};
use tm_core::{MigrationDefinition, MigrationVersion};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// One applied migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub version: MigrationVersion,
    pub name: String,
    pub applied_at: DateTime<Utc>,
    pub checksum: String,
}

impl LedgerEntry {
    /// Entry recording `definition` as applied now.
    pub fn for_definition(definition: &MigrationDefinition) -> Self {
        Self {
            version: definition.version().clone(),
            name: definition.name().to_string(),
            applied_at: Utc::now(),
            checksum: definition.checksum().to_string(),
        }
    }
}

/// Accessor for the ledger table.
#[derive(Debug, Clone)]
pub struct Ledger {
    table: String,
}

impl Ledger {
    /// Ledger stored in `table` (optionally schema-qualified).
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Whether the ledger table has been created yet.
    pub fn exists(&self, conn: &Connection) -> DbResult<bool> {
        relation_exists(conn, &self.table)
    }

    /// Create the ledger schema and table if they do not exist.
    pub fn bootstrap(&self, tx: &Tx<'_>) -> DbResult<()> {
        if let (Some(schema), _) = split_schema(&self.table) {
            tx.execute_batch(&format!(
                "CREATE SCHEMA IF NOT EXISTS {}",
                quote_qualified(schema)
            ))?;
        }
        tx.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                 version    VARCHAR PRIMARY KEY,
                 name       VARCHAR NOT NULL,
                 applied_at TIMESTAMP NOT NULL,
                 checksum   VARCHAR NOT NULL
             )",
            quote_qualified(&self.table)
        ))?;
        Ok(())
    }

    /// All applied entries in ascending version order. Empty when the ledger
    /// has not been bootstrapped.
    pub fn applied_set(&self, conn: &Connection) -> DbResult<Vec<LedgerEntry>> {
        if !self.exists(conn)? {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT version, name, CAST(applied_at AS VARCHAR), checksum FROM {}",
            quote_qualified(&self.table)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut entries = rows
            .into_iter()
            .map(|(version, name, applied_at, checksum)| {
                Ok(LedgerEntry {
                    version: MigrationVersion::parse(&version).map_err(|e| {
                        DbError::Internal(format!("corrupt ledger row in {}: {e}", self.table))
                    })?,
                    name,
                    applied_at: parse_timestamp(&applied_at)?,
                    checksum,
                })
            })
            .collect::<DbResult<Vec<_>>>()?;
        // SQL collation would put "10" before "9"
        entries.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(entries)
    }

    /// Latest applied version, or `None` when nothing is applied.
    pub fn current_version(&self, conn: &Connection) -> DbResult<Option<MigrationVersion>> {
        Ok(self.applied_set(conn)?.pop().map(|entry| entry.version))
    }

    /// Record a migration as applied.
    pub fn record_applied(&self, tx: &Tx<'_>, entry: &LedgerEntry) -> DbResult<()> {
        let sql = format!(
            "INSERT INTO {} (version, name, applied_at, checksum) VALUES (?, ?, CAST(? AS TIMESTAMP), ?)",
            quote_qualified(&self.table)
        );
        tx.execute(
            &sql,
            duckdb::params![
                entry.version.as_str(),
                entry.name,
                format_timestamp(&entry.applied_at),
                entry.checksum
            ],
        )?;
        Ok(())
    }

    /// Remove a migration's entry after its down transformation ran.
    pub fn record_reverted(&self, tx: &Tx<'_>, version: &MigrationVersion) -> DbResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            quote_qualified(&self.table),
            quote_ident("version")
        );
        let removed = tx.execute(&sql, duckdb::params![version.as_str()])?;
        if removed != 1 {
            return Err(DbError::Internal(format!(
                "expected to remove one ledger row for {version}, removed {removed}"
            )));
        }
        Ok(())
    }
}

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

pub(crate) fn parse_timestamp(s: &str) -> DbResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| DbError::Internal(format!("invalid applied_at '{s}': {e}")))
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
