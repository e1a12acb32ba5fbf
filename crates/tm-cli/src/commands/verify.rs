//! Verify command implementation

use anyhow::Result;
use tm_engine::Discrepancy;

use crate::cli::GlobalArgs;
use crate::commands::common::{
    open_migrator, report_migrate_error, ExitCode, EXIT_CHECKSUM_MISMATCH,
};

/// Execute the verify command
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let migrator = open_migrator(global)?;
    let found = migrator.verify().map_err(report_migrate_error)?;

    if found.is_empty() {
        let status = migrator.status().map_err(report_migrate_error)?;
        println!(
            "OK: {} applied migration(s) match their definitions",
            status.applied_count
        );
        return Ok(());
    }

    eprintln!("Found {} problem(s):", found.len());
    for d in &found {
        eprintln!("  {d}");
    }

    let tampered = found
        .iter()
        .any(|d| matches!(d, Discrepancy::ChecksumMismatch { .. }));
    Err(ExitCode(if tampered { EXIT_CHECKSUM_MISMATCH } else { 1 }).into())
}
