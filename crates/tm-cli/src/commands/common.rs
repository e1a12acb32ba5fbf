//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tm_core::{Config, Registry};
use tm_db::TargetDb;
use tm_engine::{MigrateError, MigrateResult, Migrator, MigratorSettings};

use crate::cli::GlobalArgs;

/// Exit code for a run that stopped after a failing migration.
pub(crate) const EXIT_PARTIAL_FAILURE: u8 = 2;
/// Exit code when another run holds the migration lock.
pub(crate) const EXIT_LOCK_CONTENTION: u8 = 3;
/// Exit code when an applied migration no longer matches its file.
pub(crate) const EXIT_CHECKSUM_MISMATCH: u8 = 4;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) u8);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ExitCode only carries control flow; its message has already been
        // printed by the command.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Loaded project: root directory, config and resolved target name.
pub(crate) struct Project {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
    pub(crate) target: Option<String>,
}

impl Project {
    /// Database path after target and CLI overrides, relative paths resolved
    /// against the project root.
    pub(crate) fn database_path(&self, global: &GlobalArgs) -> Result<String> {
        let path = match &global.database {
            Some(path) => path.clone(),
            None => {
                self.config
                    .get_database_config(self.target.as_deref())?
                    .path
            }
        };
        if path == ":memory:" || Path::new(&path).is_absolute() {
            return Ok(path);
        }
        Ok(self.root.join(path).display().to_string())
    }

    pub(crate) fn lock_timeout(&self, global: &GlobalArgs) -> Result<Duration> {
        match global.lock_timeout {
            Some(secs) => Ok(Duration::from_secs(secs)),
            None => Ok(self.config.get_lock_timeout(self.target.as_deref())?),
        }
    }

    pub(crate) fn migration_dirs(&self) -> Vec<PathBuf> {
        self.config.migration_paths_absolute(&self.root)
    }
}

/// Load tidemark.yml from `--config` or the project directory.
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    let root = PathBuf::from(&global.project_dir);
    let config = match &global.config {
        Some(path) => Config::load(Path::new(path)),
        None => Config::load_from_dir(&root),
    }
    .context("Failed to load project config")?;
    let target = Config::resolve_target(global.target.as_deref());
    if let Some(name) = &target {
        log::debug!("Using target '{name}'");
    }
    Ok(Project {
        root,
        config,
        target,
    })
}

/// Load the project, discover its migrations and open the target database.
pub(crate) fn open_migrator(global: &GlobalArgs) -> Result<Migrator> {
    let project = load_project(global)?;
    let registry =
        Registry::from_dirs(&project.migration_dirs()).context("Failed to load migrations")?;
    let db_path = project.database_path(global)?;
    let db = TargetDb::new(&db_path)
        .with_context(|| format!("Failed to open database {db_path}"))?;
    let settings = MigratorSettings::from_config(&project.config, project.target.as_deref())?
        .with_lock_timeout(project.lock_timeout(global)?);
    log::debug!(
        "Loaded {} migration(s), database {}",
        registry.len(),
        db_path
    );
    Ok(Migrator::new(registry, db, settings))
}

/// Run `f` on a blocking thread. Ctrl-C asks the run to stop before its
/// next migration; the migration in flight still commits or rolls back.
pub(crate) async fn run_cancellable<T, F>(migrator: Migrator, f: F) -> Result<MigrateResult<T>>
where
    T: Send + 'static,
    F: FnOnce(&Migrator) -> MigrateResult<T> + Send + 'static,
{
    let token = migrator.cancel_token();
    let mut task = tokio::task::spawn_blocking(move || f(&migrator));

    tokio::select! {
        joined = &mut task => joined.context("Migration task panicked"),
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted: finishing the current migration, then stopping");
            token.cancel();
            task.await.context("Migration task panicked")
        }
    }
}

/// Print a run failure and turn it into the matching exit code.
pub(crate) fn report_migrate_error(err: MigrateError) -> anyhow::Error {
    match &err {
        MigrateError::PartialFailure {
            version, source, ..
        } => {
            eprintln!("Migration {version} failed: {source}");
            if let Some(index) = source.index() {
                eprintln!("  failing operation: #{index}");
            }
            if let tm_db::ExecError::Operation { statement, .. } = source {
                eprintln!("  statement: {statement}");
            }
            print_completed(err.completed());
            eprintln!("  {version} was rolled back; fix it and re-run");
            ExitCode(EXIT_PARTIAL_FAILURE).into()
        }
        MigrateError::Cancelled { .. } => {
            eprintln!("{err}");
            print_completed(err.completed());
            ExitCode(1).into()
        }
        MigrateError::LockContention { .. } => {
            eprintln!("{err}");
            eprintln!("  if that run crashed, release the lock with `tm unlock`");
            ExitCode(EXIT_LOCK_CONTENTION).into()
        }
        MigrateError::ChecksumMismatch { .. } => {
            eprintln!("{err}");
            eprintln!("  applied migrations must not be edited; restore the file or add a new migration");
            ExitCode(EXIT_CHECKSUM_MISMATCH).into()
        }
        _ => err.into(),
    }
}

fn print_completed(completed: &[tm_core::MigrationVersion]) {
    if completed.is_empty() {
        eprintln!("  no migrations were committed in this run");
    } else {
        let list: Vec<&str> = completed.iter().map(|v| v.as_str()).collect();
        eprintln!("  committed before the failure: {}", list.join(", "));
    }
}

/// Format an optional version for display.
pub(crate) fn version_or_none(version: Option<&tm_core::MigrationVersion>) -> String {
    version
        .map(|v| v.to_string())
        .unwrap_or_else(|| "(none)".to_string())
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
