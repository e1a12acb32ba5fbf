//! CLI argument definitions using clap derive API

use clap::{ArgGroup, Args, Parser, Subcommand};

/// Tidemark - versioned, reversible schema migrations for DuckDB
#[derive(Parser, Debug)]
#[command(name = "tm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Named target from tidemark.yml (falls back to TIDEMARK_TARGET)
    #[arg(short, long, global = true)]
    pub target: Option<String>,

    /// Override the database path
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// Seconds to wait for the migration lock (0 fails fast)
    #[arg(long, global = true)]
    pub lock_timeout: Option<u64>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending migrations
    Up(UpArgs),

    /// Revert applied migrations
    Down(DownArgs),

    /// Show the current version and pending migrations
    Status(StatusArgs),

    /// List applied migrations from the ledger
    History(HistoryArgs),

    /// Check applied migrations against their files
    Verify,

    /// Force-release the migration lock after a crashed run
    Unlock,

    /// Create a new migration file
    New(NewArgs),
}

/// Arguments for the up command
#[derive(Args, Debug)]
pub struct UpArgs {
    /// Version to migrate up to, or "latest"
    #[arg(long, default_value = "latest")]
    pub to: String,

    /// Print the plan without applying it
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the down command
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("down_target").required(true).args(["to", "steps"])))]
pub struct DownArgs {
    /// Version to migrate down to, or "none" to revert everything
    #[arg(long)]
    pub to: Option<String>,

    /// Number of migrations to revert
    #[arg(long)]
    pub steps: Option<usize>,

    /// Print the plan without reverting anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the history command
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the new command
#[derive(Args, Debug)]
pub struct NewArgs {
    /// Migration name (letters, digits, '_' and '-')
    pub name: String,

    /// Explicit version (default: current UTC time as YYYYMMDDHHMMSS)
    #[arg(long)]
    pub version: Option<String>,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
