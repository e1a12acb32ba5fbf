//! Up command implementation

use anyhow::{Context, Result};
use tm_core::Direction;
use tm_engine::{Plan, RunReport, Target};

use crate::cli::{GlobalArgs, UpArgs};
use crate::commands::common::{
    open_migrator, report_migrate_error, run_cancellable, version_or_none,
};

/// Execute the up command
pub async fn execute(args: &UpArgs, global: &GlobalArgs) -> Result<()> {
    let target: Target = args
        .to
        .parse()
        .with_context(|| format!("Invalid target '{}'", args.to))?;
    let migrator = open_migrator(global)?;

    if args.dry_run {
        let plan = migrator
            .preview_upgrade(&target)
            .map_err(report_migrate_error)?;
        print_plan(&plan);
        return Ok(());
    }

    let report = run_cancellable(migrator, move |m| m.upgrade(&target))
        .await?
        .map_err(report_migrate_error)?;
    print_report(&report);
    Ok(())
}

/// Print what a run would do.
pub(crate) fn print_plan(plan: &Plan<'_>) {
    let verb = match plan.direction {
        Direction::Up => "apply",
        Direction::Down => "revert",
    };
    if plan.is_empty() {
        println!(
            "Nothing to {verb}; database is at {}",
            version_or_none(plan.from.as_ref())
        );
        return;
    }
    println!(
        "Dry run - would {verb} {} migration(s) ({} -> {}):",
        plan.len(),
        version_or_none(plan.from.as_ref()),
        version_or_none(plan.to.as_ref())
    );
    for def in &plan.steps {
        println!("  {def}");
    }
}

/// Print the outcome of a completed run.
pub(crate) fn print_report(report: &RunReport) {
    if report.is_noop() {
        println!(
            "No pending migrations; database is at {}",
            version_or_none(report.to.as_ref())
        );
        return;
    }
    let verb = match report.direction {
        Direction::Up => "Applied",
        Direction::Down => "Reverted",
    };
    for m in &report.migrations {
        println!(
            "  {verb} {} ({}) in {}ms",
            m.version,
            m.name,
            m.duration.as_millis()
        );
    }
    println!();
    println!(
        "{verb} {} migration(s): {} -> {}",
        report.migrations.len(),
        version_or_none(report.from.as_ref()),
        version_or_none(report.to.as_ref())
    );
}
