//! New command implementation

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::fs;
use tm_core::{MigrationVersion, Registry};

use crate::cli::{GlobalArgs, NewArgs};
use crate::commands::common::load_project;

const TEMPLATE: &str = r#"# Operations run top to bottom inside one transaction.
# Omit `down` to derive it from `up`; `down: []` marks the migration irreversible.
#
# up:
#   - op: create_table
#     name: accounts
#     columns:
#       - { name: id, type: INTEGER, nullable: false }
#       - { name: username, type: VARCHAR }
#     primary_key: [id]
#   - op: add_column
#     table: accounts
#     column: { name: locked, type: BOOLEAN, nullable: false, default: false }
up: []
"#;

/// Execute the new command
pub async fn execute(args: &NewArgs, global: &GlobalArgs) -> Result<()> {
    if args.name.is_empty()
        || !args
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        bail!(
            "Invalid migration name '{}': use letters, digits, '_' and '-'",
            args.name
        );
    }

    let version = match &args.version {
        Some(v) => MigrationVersion::parse(v.as_str())?,
        None => MigrationVersion::new(Utc::now().format("%Y%m%d%H%M%S").to_string()),
    };

    let project = load_project(global)?;
    let dirs = project.migration_dirs();
    let Some(dir) = dirs.first() else {
        bail!("No migration_paths configured");
    };

    let registry = Registry::from_dirs(&dirs).context("Failed to load migrations")?;
    if let Some(existing) = registry.get(&version) {
        bail!("Migration version {version} already exists: {existing}");
    }
    if let Some(latest) = registry.latest() {
        if &version < latest {
            log::warn!("New version {version} sorts before the latest existing version {latest}");
        }
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(format!("{version}_{}.yml", args.name));
    fs::write(&path, TEMPLATE).with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Created {}", path.display());
    Ok(())
}
