//! Status command implementation

use anyhow::Result;
use serde::Serialize;

use crate::cli::{GlobalArgs, StatusArgs};
use crate::commands::common::{open_migrator, report_migrate_error, version_or_none};

#[derive(Serialize)]
struct StatusOutput {
    current: Option<String>,
    applied: usize,
    pending: Vec<PendingOutput>,
}

#[derive(Serialize)]
struct PendingOutput {
    version: String,
    name: String,
}

/// Execute the status command
pub async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let migrator = open_migrator(global)?;
    let status = migrator.status().map_err(report_migrate_error)?;

    let pending: Vec<PendingOutput> = status
        .pending
        .iter()
        .map(|version| PendingOutput {
            version: version.to_string(),
            name: migrator
                .registry()
                .get(version)
                .map(|d| d.name().to_string())
                .unwrap_or_default(),
        })
        .collect();

    if args.json {
        let output = StatusOutput {
            current: status.current.as_ref().map(|v| v.to_string()),
            applied: status.applied_count,
            pending,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Current version: {}", version_or_none(status.current.as_ref()));
    println!("Applied:         {}", status.applied_count);
    println!("Pending:         {}", status.pending_count);
    for p in &pending {
        println!("  {} ({})", p.version, p.name);
    }
    Ok(())
}
