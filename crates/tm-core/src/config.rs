//! Configuration types and parsing for tidemark.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted when no `--target` flag is given.
pub const TARGET_ENV_VAR: &str = "TIDEMARK_TARGET";

/// Main project configuration from tidemark.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Directories containing YAML migration files
    #[serde(default = "default_migration_paths")]
    pub migration_paths: Vec<String>,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Where the ledger and lock live inside the target database
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Seconds to wait for the migration lock; 0 fails fast
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,

    /// Named target configurations (e.g., dev, staging, prod)
    #[serde(default)]
    pub targets: HashMap<String, TargetConfig>,
}

/// Target-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Database configuration override
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Lock timeout override
    #[serde(default)]
    pub lock_timeout_secs: Option<u64>,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// DuckDB file path, or `:memory:`
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Ledger and lock table placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Optional schema holding both tables
    #[serde(default)]
    pub schema: Option<String>,

    /// Applied-version ledger table
    #[serde(default = "default_ledger_table")]
    pub table: String,

    /// Single-row lock table
    #[serde(default = "default_lock_table")]
    pub lock_table: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            schema: None,
            table: default_ledger_table(),
            lock_table: default_lock_table(),
        }
    }
}

impl LedgerConfig {
    /// Schema-qualified ledger table name.
    pub fn ledger_table(&self) -> String {
        self.qualify(&self.table)
    }

    /// Schema-qualified lock table name.
    pub fn lock_table(&self) -> String {
        self.qualify(&self.lock_table)
    }

    fn qualify(&self, table: &str) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{table}"),
            None => table.to_string(),
        }
    }
}

const DEFAULT_DB_PATH: &str = ":memory:";

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_migration_paths() -> Vec<String> {
    vec!["migrations".to_string()]
}

fn default_ledger_table() -> String {
    "tidemark_migrations".to_string()
}

fn default_lock_table() -> String {
    "tidemark_lock".to_string()
}

fn default_lock_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for tidemark.yml or tidemark.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("tidemark.yml");
        let yaml_path = dir.join("tidemark.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.name.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }

        if self.migration_paths.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "At least one migration_paths entry must be specified".to_string(),
            });
        }

        if self.ledger.table.is_empty() || self.ledger.lock_table.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "ledger.table and ledger.lock_table cannot be empty".to_string(),
            });
        }

        if self.ledger.table == self.ledger.lock_table {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "ledger.table and ledger.lock_table must differ (both are '{}')",
                    self.ledger.table
                ),
            });
        }

        Ok(())
    }

    /// Get absolute migration paths relative to a project root
    pub fn migration_paths_absolute(&self, root: &Path) -> Vec<PathBuf> {
        self.migration_paths.iter().map(|p| root.join(p)).collect()
    }

    /// Get the list of available target names
    pub fn available_targets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.targets.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    fn get_target(&self, name: &str) -> CoreResult<&TargetConfig> {
        self.targets.get(name).ok_or_else(|| CoreError::ConfigInvalid {
            message: format!(
                "Target '{}' not found. Available targets: {}",
                name,
                self.available_targets().join(", ")
            ),
        })
    }

    /// Get database configuration, optionally applying target overrides
    pub fn get_database_config(&self, target: Option<&str>) -> CoreResult<DatabaseConfig> {
        match target {
            Some(name) => Ok(self
                .get_target(name)?
                .database
                .clone()
                .unwrap_or_else(|| self.database.clone())),
            None => Ok(self.database.clone()),
        }
    }

    /// Get the lock timeout, optionally applying target overrides
    pub fn get_lock_timeout(&self, target: Option<&str>) -> CoreResult<Duration> {
        let secs = match target {
            Some(name) => self
                .get_target(name)?
                .lock_timeout_secs
                .unwrap_or(self.lock_timeout_secs),
            None => self.lock_timeout_secs,
        };
        Ok(Duration::from_secs(secs))
    }

    /// Resolve target from CLI flag or TIDEMARK_TARGET environment variable
    ///
    /// Priority: CLI flag > TIDEMARK_TARGET env var > None
    pub fn resolve_target(cli_target: Option<&str>) -> Option<String> {
        cli_target
            .map(String::from)
            .or_else(|| std::env::var(TARGET_ENV_VAR).ok())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
