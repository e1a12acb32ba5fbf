//! Down command implementation

use anyhow::{bail, Context, Result};
use tm_engine::{MigrateResult, Migrator, Target};

use crate::cli::{DownArgs, GlobalArgs};
use crate::commands::common::{open_migrator, report_migrate_error, run_cancellable};
use crate::commands::up::{print_plan, print_report};

/// Execute the down command
pub async fn execute(args: &DownArgs, global: &GlobalArgs) -> Result<()> {
    let migrator = open_migrator(global)?;
    let target = match (&args.to, args.steps) {
        (Some(to), None) => to
            .parse::<Target>()
            .with_context(|| format!("Invalid target '{to}'"))?,
        (None, Some(steps)) => target_for_steps(&migrator, steps).map_err(report_migrate_error)?,
        _ => bail!("Specify exactly one of --to or --steps"),
    };

    if args.dry_run {
        let plan = migrator
            .preview_downgrade(&target)
            .map_err(report_migrate_error)?;
        print_plan(&plan);
        return Ok(());
    }

    let report = run_cancellable(migrator, move |m| m.downgrade(&target))
        .await?
        .map_err(report_migrate_error)?;
    print_report(&report);
    Ok(())
}

/// Target that reverts the newest `steps` applied migrations.
fn target_for_steps(migrator: &Migrator, steps: usize) -> MigrateResult<Target> {
    if steps == 0 {
        return Ok(Target::Latest);
    }
    let applied = migrator.history()?;
    let keep = steps
        .checked_add(1)
        .and_then(|n| applied.len().checked_sub(n));
    Ok(match keep {
        Some(keep) => Target::Version(applied[keep].version.clone()),
        None => Target::None,
    })
}

#[cfg(test)]
#[path = "down_test.rs"]
mod tests;
