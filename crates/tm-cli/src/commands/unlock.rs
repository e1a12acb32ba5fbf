//! Unlock command implementation

use anyhow::Result;

use crate::cli::GlobalArgs;
use crate::commands::common::{open_migrator, report_migrate_error};

/// Execute the unlock command
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let migrator = open_migrator(global)?;
    if migrator.force_unlock().map_err(report_migrate_error)? {
        println!("Released the migration lock");
    } else {
        println!("Migration lock was not held");
    }
    Ok(())
}
