//! Advisory migration lock.
//!
//! The lock is a single row (`id = 1`) in a dedicated table. `owner IS NULL`
//! means free. Acquisition is one conditional `UPDATE`, so at most one
//! connection can move the row from free to owned. Write conflicts reported by
//! DuckDB while racing for the row count as "held by someone else".

use crate::connection::relation_exists;
use crate::error::{DbError, DbResult};
use crate::ledger::{format_timestamp, parse_timestamp};
use chrono::{DateTime, Utc};
use duckdb::{Connection, OptionalExt};
use std::time::{Duration, Instant};
use tm_core::sql_utils::{quote_qualified, split_schema};
use uuid::Uuid;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Number of times table creation is retried when racing another process.
const ENSURE_ATTEMPTS: usize = 5;

/// Identity written into the lock row by this process.
pub fn new_owner_id() -> String {
    format!("{}:{}", std::process::id(), Uuid::new_v4())
}

/// Current holder of the lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockInfo {
    pub owner: String,
    pub acquired_at: Option<DateTime<Utc>>,
}

/// Accessor for the lock table.
#[derive(Debug, Clone)]
pub struct MigrationLock {
    table: String,
    poll_interval: Duration,
}

impl MigrationLock {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// How long to sleep between acquisition attempts.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the lock table and its single row if missing.
    pub fn ensure_table(&self, conn: &Connection) -> DbResult<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.create_table(conn) {
                Ok(()) => return Ok(()),
                // another connection may be seeding the same row
                Err(e) if (e.is_conflict() || e.is_duplicate_key()) && attempt < ENSURE_ATTEMPTS => {
                    log::debug!("Lock table creation raced another connection, retrying: {e}");
                    std::thread::sleep(self.poll_interval);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn create_table(&self, conn: &Connection) -> DbResult<()> {
        if !relation_exists(conn, &self.table)? {
            if let (Some(schema), _) = split_schema(&self.table) {
                conn.execute_batch(&format!(
                    "CREATE SCHEMA IF NOT EXISTS {}",
                    quote_qualified(schema)
                ))?;
            }
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {} (
                     id          INTEGER PRIMARY KEY,
                     owner       VARCHAR,
                     acquired_at TIMESTAMP
                 )",
                quote_qualified(&self.table)
            ))?;
        }
        conn.execute_batch(&format!(
            "INSERT OR IGNORE INTO {} (id, owner, acquired_at) VALUES (1, NULL, NULL)",
            quote_qualified(&self.table)
        ))?;
        Ok(())
    }

    /// Single acquisition attempt. Returns `false` when another owner holds
    /// the lock.
    pub fn try_acquire(&self, conn: &Connection, owner: &str) -> DbResult<bool> {
        let sql = format!(
            "UPDATE {} SET owner = ?, acquired_at = CAST(? AS TIMESTAMP) WHERE id = 1 AND owner IS NULL",
            quote_qualified(&self.table)
        );
        match conn.execute(&sql, duckdb::params![owner, format_timestamp(&Utc::now())]) {
            Ok(updated) => Ok(updated == 1),
            Err(e) => {
                let err = DbError::from(e);
                if err.is_conflict() {
                    log::debug!("Lock update conflicted with another connection: {err}");
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Acquire the lock, polling until `timeout` elapses.
    ///
    /// A zero timeout makes a single attempt. On timeout the error names the
    /// current holder.
    pub fn acquire<'c>(
        &self,
        conn: &'c Connection,
        owner: &str,
        timeout: Duration,
    ) -> DbResult<LockGuard<'c>> {
        self.ensure_table(conn)?;
        let started = Instant::now();
        loop {
            if self.try_acquire(conn, owner)? {
                log::debug!("Acquired migration lock {} as {}", self.table, owner);
                return Ok(LockGuard {
                    conn,
                    lock: self.clone(),
                    owner: owner.to_string(),
                    released: false,
                });
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                let (holder, since) = match self.holder(conn)? {
                    Some(info) => (
                        info.owner,
                        info.acquired_at
                            .map(|t| t.to_rfc3339())
                            .unwrap_or_else(|| "unknown".to_string()),
                    ),
                    // released between our attempt and this read
                    None => ("unknown".to_string(), "unknown".to_string()),
                };
                return Err(DbError::LockContention { holder, since });
            }
            log::debug!("Migration lock {} is busy, waiting", self.table);
            std::thread::sleep(self.poll_interval.min(timeout - elapsed));
        }
    }

    /// Who holds the lock, if anyone.
    pub fn holder(&self, conn: &Connection) -> DbResult<Option<LockInfo>> {
        if !relation_exists(conn, &self.table)? {
            return Ok(None);
        }
        let sql = format!(
            "SELECT owner, CAST(acquired_at AS VARCHAR) FROM {} WHERE id = 1 AND owner IS NOT NULL",
            quote_qualified(&self.table)
        );
        let row = conn
            .query_row(&sql, [], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })
            .optional()?;
        match row {
            Some((owner, acquired_at)) => Ok(Some(LockInfo {
                owner,
                acquired_at: acquired_at.as_deref().map(parse_timestamp).transpose()?,
            })),
            None => Ok(None),
        }
    }

    /// Release the lock if `owner` holds it. Returns whether it was held.
    pub fn release(&self, conn: &Connection, owner: &str) -> DbResult<bool> {
        let sql = format!(
            "UPDATE {} SET owner = NULL, acquired_at = NULL WHERE id = 1 AND owner = ?",
            quote_qualified(&self.table)
        );
        Ok(conn.execute(&sql, duckdb::params![owner])? == 1)
    }

    /// Clear the lock regardless of owner. Returns whether it was held.
    pub fn force_unlock(&self, conn: &Connection) -> DbResult<bool> {
        if !relation_exists(conn, &self.table)? {
            return Ok(false);
        }
        let sql = format!(
            "UPDATE {} SET owner = NULL, acquired_at = NULL WHERE id = 1 AND owner IS NOT NULL",
            quote_qualified(&self.table)
        );
        Ok(conn.execute(&sql, [])? == 1)
    }
}

/// Held migration lock. Released on drop.
pub struct LockGuard<'c> {
    conn: &'c Connection,
    lock: MigrationLock,
    owner: String,
    released: bool,
}

impl LockGuard<'_> {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Release explicitly, surfacing any error.
    pub fn release(mut self) -> DbResult<()> {
        self.released = true;
        self.release_inner()
    }

    fn release_inner(&self) -> DbResult<()> {
        if !self.lock.release(self.conn, &self.owner)? {
            log::warn!(
                "Migration lock {} was no longer held by {} at release",
                self.lock.table,
                self.owner
            );
        } else {
            log::debug!("Released migration lock {}", self.lock.table);
        }
        Ok(())
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.release_inner() {
            log::warn!("Failed to release migration lock {}: {e}", self.lock.table);
        }
    }
}

#[cfg(test)]
#[path = "lock_test.rs"]
mod tests;
