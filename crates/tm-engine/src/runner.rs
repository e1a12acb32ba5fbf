//! Migration runner.
//!
//! A [`Migrator`] drives one target database. Each run takes the migration
//! lock, bootstraps the ledger, plans against the applied set, then applies
//! or reverts the plan one transaction per migration. The first failure
//! halts the run; migrations committed before it stay committed.

use crate::cancel::CancelToken;
use crate::error::{MigrateError, MigrateResult};
use crate::plan::{self, Plan};
use crate::report::{Discrepancy, MigrationRecord, Outcome, RunReport, Status};
use crate::target::Target;
use std::cell::Cell;
use std::fmt;
use std::time::{Duration, Instant};
use tm_core::{Config, CoreResult, Direction, MigrationDefinition, Registry};
use tm_db::{apply, new_owner_id, ExecError, Ledger, LedgerEntry, MigrationLock, TargetDb};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    ComputingPlan,
    /// Migration at this plan index is inside its transaction
    Applying(usize),
    /// Last migration's transaction committed
    Committed,
    /// Last migration's transaction rolled back
    RolledBack,
    /// The run stopped with an error
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => f.write_str("idle"),
            RunState::ComputingPlan => f.write_str("computing plan"),
            RunState::Applying(i) => write!(f, "applying step {i}"),
            RunState::Committed => f.write_str("committed"),
            RunState::RolledBack => f.write_str("rolled back"),
            RunState::Failed => f.write_str("failed"),
        }
    }
}

/// Where the ledger and lock live and how long to wait for the lock.
#[derive(Debug, Clone)]
pub struct MigratorSettings {
    pub ledger_table: String,
    pub lock_table: String,
    pub lock_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for MigratorSettings {
    fn default() -> Self {
        Self::from_ledger_config(&tm_core::LedgerConfig::default(), Duration::from_secs(30))
    }
}

impl MigratorSettings {
    fn from_ledger_config(ledger: &tm_core::LedgerConfig, lock_timeout: Duration) -> Self {
        Self {
            ledger_table: ledger.ledger_table(),
            lock_table: ledger.lock_table(),
            lock_timeout,
            poll_interval: Duration::from_millis(100),
        }
    }

    /// Settings from project config, applying overrides of the named target.
    pub fn from_config(config: &Config, target: Option<&str>) -> CoreResult<Self> {
        Ok(Self::from_ledger_config(
            &config.ledger,
            config.get_lock_timeout(target)?,
        ))
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Runner bound to one registry and one target database.
pub struct Migrator {
    registry: Registry,
    db: TargetDb,
    ledger: Ledger,
    lock: MigrationLock,
    lock_timeout: Duration,
    owner: String,
    cancel: CancelToken,
    state: Cell<RunState>,
}

impl Migrator {
    pub fn new(registry: Registry, db: TargetDb, settings: MigratorSettings) -> Self {
        Self {
            registry,
            db,
            ledger: Ledger::new(settings.ledger_table),
            lock: MigrationLock::new(settings.lock_table).with_poll_interval(settings.poll_interval),
            lock_timeout: settings.lock_timeout,
            owner: new_owner_id(),
            cancel: CancelToken::new(),
            state: Cell::new(RunState::Idle),
        }
    }

    /// Use `token` to request cancellation from another thread.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn db(&self) -> &TargetDb {
        &self.db
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Identity this runner writes into the lock row.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn state(&self) -> RunState {
        self.state.get()
    }

    /// Apply pending migrations up to and including `target`.
    pub fn upgrade(&self, target: &Target) -> MigrateResult<RunReport> {
        self.run(Direction::Up, target)
    }

    /// Revert applied migrations newer than `target`.
    pub fn downgrade(&self, target: &Target) -> MigrateResult<RunReport> {
        self.run(Direction::Down, target)
    }

    /// Plan an upgrade without locking or writing anything.
    pub fn preview_upgrade(&self, target: &Target) -> MigrateResult<Plan<'_>> {
        let applied = self.ledger.applied_set(self.db.conn())?;
        plan::upgrade(&self.registry, &applied, target)
    }

    /// Plan a downgrade without locking or writing anything.
    pub fn preview_downgrade(&self, target: &Target) -> MigrateResult<Plan<'_>> {
        let applied = self.ledger.applied_set(self.db.conn())?;
        plan::downgrade(&self.registry, &applied, target)
    }

    /// Current version and what an upgrade to latest would apply. Never
    /// creates ledger storage.
    pub fn status(&self) -> MigrateResult<Status> {
        let applied = self.ledger.applied_set(self.db.conn())?;
        let pending: Vec<_> = self
            .registry
            .iter()
            .filter(|d| !applied.iter().any(|e| &e.version == d.version()))
            .map(|d| d.version().clone())
            .collect();
        Ok(Status {
            current: applied.last().map(|e| e.version.clone()),
            applied_count: applied.len(),
            pending_count: pending.len(),
            pending,
        })
    }

    /// Ledger entries in ascending version order.
    pub fn history(&self) -> MigrateResult<Vec<LedgerEntry>> {
        Ok(self.ledger.applied_set(self.db.conn())?)
    }

    /// Every disagreement between ledger and registry, without failing.
    pub fn verify(&self) -> MigrateResult<Vec<Discrepancy>> {
        let applied = self.ledger.applied_set(self.db.conn())?;
        Ok(plan::discrepancies(&self.registry, &applied))
    }

    /// Clear the migration lock whoever holds it.
    pub fn force_unlock(&self) -> MigrateResult<bool> {
        let held = self.lock.force_unlock(self.db.conn())?;
        if held {
            log::warn!("Forcibly released migration lock {}", self.lock.table());
        }
        Ok(held)
    }

    fn run(&self, direction: Direction, target: &Target) -> MigrateResult<RunReport> {
        self.transition(RunState::Idle);
        self.transition(RunState::ComputingPlan);
        let result = self.run_locked(direction, target);
        match &result {
            Ok(report) if report.is_noop() => self.transition(RunState::Idle),
            // stays Committed until the next run starts
            Ok(_) => {}
            Err(_) => self.transition(RunState::Failed),
        }
        result
    }

    fn run_locked(&self, direction: Direction, target: &Target) -> MigrateResult<RunReport> {
        let guard = self
            .lock
            .acquire(self.db.conn(), &self.owner, self.lock_timeout)?;
        self.db.transaction(|tx| self.ledger.bootstrap(tx))?;

        let applied = self.ledger.applied_set(self.db.conn())?;
        let plan = match direction {
            Direction::Up => plan::upgrade(&self.registry, &applied, target)?,
            Direction::Down => plan::downgrade(&self.registry, &applied, target)?,
        };

        let report = self.apply_plan(&plan)?;
        // the migrations are committed; a stuck lock row is for `tm unlock`
        if let Err(e) = guard.release() {
            log::warn!("Failed to release migration lock after a completed run: {e}");
        }
        Ok(report)
    }

    fn apply_plan(&self, plan: &Plan<'_>) -> MigrateResult<RunReport> {
        if plan.is_empty() {
            log::info!("No pending migrations");
            return Ok(RunReport {
                direction: plan.direction,
                from: plan.from.clone(),
                to: plan.to.clone(),
                migrations: Vec::new(),
                outcome: Outcome::NoPendingMigrations,
            });
        }

        let mut migrations: Vec<MigrationRecord> = Vec::with_capacity(plan.len());
        for (i, def) in plan.steps.iter().enumerate() {
            if self.cancel.is_cancelled() {
                log::warn!("Cancellation requested, stopping before {def}");
                return Err(MigrateError::Cancelled {
                    completed: migrations.into_iter().map(|m| m.version).collect(),
                });
            }

            self.transition(RunState::Applying(i));
            let started = Instant::now();
            match self.step(def, plan.direction) {
                Ok(()) => {
                    self.transition(RunState::Committed);
                    let duration = started.elapsed();
                    match plan.direction {
                        Direction::Up => log::info!(
                            "Applied migration {def} in {:.1}ms",
                            duration.as_secs_f64() * 1000.0
                        ),
                        Direction::Down => log::info!(
                            "Reverted migration {def} in {:.1}ms",
                            duration.as_secs_f64() * 1000.0
                        ),
                    }
                    migrations.push(MigrationRecord {
                        version: def.version().clone(),
                        name: def.name().to_string(),
                        duration,
                    });
                }
                Err(source) => {
                    self.transition(RunState::RolledBack);
                    log::error!("Migration {def} ({}) failed: {source}", plan.direction);
                    return Err(MigrateError::PartialFailure {
                        version: def.version().clone(),
                        completed: migrations.into_iter().map(|m| m.version).collect(),
                        source,
                    });
                }
            }
        }

        Ok(RunReport {
            direction: plan.direction,
            from: plan.from.clone(),
            to: plan.to.clone(),
            migrations,
            outcome: Outcome::Completed,
        })
    }

    /// One migration and its ledger change in a single transaction.
    fn step(&self, def: &MigrationDefinition, direction: Direction) -> Result<(), ExecError> {
        apply(&self.db, def, direction, |tx| match direction {
            Direction::Up => self
                .ledger
                .record_applied(tx, &LedgerEntry::for_definition(def)),
            Direction::Down => self.ledger.record_reverted(tx, def.version()),
        })
    }

    fn transition(&self, next: RunState) {
        let prev = self.state.replace(next);
        if prev != next {
            log::debug!("Runner state: {prev} -> {next}");
        }
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
