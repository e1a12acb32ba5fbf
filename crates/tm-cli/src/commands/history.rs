//! History command implementation

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{GlobalArgs, HistoryArgs};
use crate::commands::common::{open_migrator, report_migrate_error};

#[derive(Serialize)]
struct HistoryRow {
    version: String,
    name: String,
    applied_at: DateTime<Utc>,
    checksum: String,
}

/// Execute the history command
pub async fn execute(args: &HistoryArgs, global: &GlobalArgs) -> Result<()> {
    let migrator = open_migrator(global)?;
    let rows: Vec<HistoryRow> = migrator
        .history()
        .map_err(report_migrate_error)?
        .into_iter()
        .map(|e| HistoryRow {
            version: e.version.into_inner(),
            name: e.name,
            applied_at: e.applied_at,
            checksum: e.checksum,
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No migrations applied");
        return Ok(());
    }

    let version_width = rows.iter().map(|r| r.version.len()).max().unwrap_or(7).max(7);
    println!(
        "{:<version_width$}  {:<19}  {:<12}  NAME",
        "VERSION", "APPLIED AT (UTC)", "CHECKSUM"
    );
    for row in &rows {
        println!(
            "{:<version_width$}  {:<19}  {:<12}  {}",
            row.version,
            row.applied_at.format("%Y-%m-%d %H:%M:%S"),
            row.checksum.chars().take(12).collect::<String>(),
            row.name
        );
    }
    Ok(())
}
