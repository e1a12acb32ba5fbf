//! Run targets.

use std::fmt;
use std::str::FromStr;
use tm_core::{CoreError, MigrationVersion};

/// Version a run should end at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Highest version in the registry
    Latest,
    /// Before the first migration
    None,
    Version(MigrationVersion),
}

impl FromStr for Target {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest" => Ok(Target::Latest),
            "none" => Ok(Target::None),
            other => MigrationVersion::parse(other).map(Target::Version),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Latest => f.write_str("latest"),
            Target::None => f.write_str("none"),
            Target::Version(v) => write!(f, "{v}"),
        }
    }
}

impl From<MigrationVersion> for Target {
    fn from(version: MigrationVersion) -> Self {
        Target::Version(version)
    }
}
