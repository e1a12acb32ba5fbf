//! Migration definitions: one version, two transformations.

use crate::checksum::compute_checksum;
use crate::error::{CoreError, CoreResult};
use crate::operation::Transformation;
use crate::version::MigrationVersion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Which transformation of a migration to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable, versioned, reversible schema/data change.
///
/// The checksum is computed once at construction from the canonical JSON
/// serialization of `{version, name, up, down}`, so any edit to an
/// already-applied definition is detectable.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationDefinition {
    version: MigrationVersion,
    name: String,
    up: Transformation,
    down: Transformation,
    checksum: String,
    origin: Option<PathBuf>,
}

#[derive(Serialize)]
struct CanonicalForm<'a> {
    version: &'a MigrationVersion,
    name: &'a str,
    up: &'a Transformation,
    down: &'a Transformation,
}

impl MigrationDefinition {
    /// Build a definition with an explicit down transformation.
    ///
    /// An empty `down` paired with a non-empty `up` marks the migration as
    /// irreversible.
    pub fn new(
        version: MigrationVersion,
        name: impl Into<String>,
        up: Transformation,
        down: Transformation,
    ) -> CoreResult<Self> {
        let name = name.into();
        validate_transformation(&version, Direction::Up, &up)?;
        validate_transformation(&version, Direction::Down, &down)?;
        let canonical = serde_json::to_string(&CanonicalForm {
            version: &version,
            name: &name,
            up: &up,
            down: &down,
        })?;
        Ok(Self {
            checksum: compute_checksum(&canonical),
            version,
            name,
            up,
            down,
            origin: None,
        })
    }

    /// Build a definition whose down transformation is derived from `up`
    /// through the inverse-operation table.
    pub fn reversible(
        version: MigrationVersion,
        name: impl Into<String>,
        up: Transformation,
    ) -> CoreResult<Self> {
        let down = up.invert()?;
        Self::new(version, name, up, down)
    }

    /// Load a definition from a YAML migration file named
    /// `<version>_<name>.yml`.
    pub fn from_yaml_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| CoreError::MigrationFile {
                path: path.display().to_string(),
                reason: "file name is not valid UTF-8".to_string(),
            })?;
        Self::from_yaml_str(stem, &content)
            .map(|def| def.with_origin(path.to_path_buf()))
            .map_err(|e| CoreError::MigrationFile {
                path: path.display().to_string(),
                reason: match e {
                    CoreError::MigrationFile { reason, .. } => reason,
                    other => other.to_string(),
                },
            })
    }

    /// Parse a YAML migration body, taking version and name from `stem`.
    pub fn from_yaml_str(stem: &str, content: &str) -> CoreResult<Self> {
        let (version, name) = split_file_stem(stem)?;
        let file: MigrationFile = serde_yaml::from_str(content)?;
        let name = file.name.unwrap_or(name);
        match file.down {
            Some(down) => Self::new(version, name, file.up, down),
            None => Self::reversible(version, name, file.up),
        }
    }

    fn with_origin(mut self, origin: PathBuf) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn version(&self) -> &MigrationVersion {
        &self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn up(&self) -> &Transformation {
        &self.up
    }

    pub fn down(&self) -> &Transformation {
        &self.down
    }

    /// The transformation to run for `direction`.
    pub fn transformation(&self, direction: Direction) -> &Transformation {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }

    /// Hex-encoded SHA-256 of the canonical definition.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// File the definition was loaded from, if any.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    /// False when the migration changes something but declares no way back.
    pub fn is_reversible(&self) -> bool {
        self.up.is_empty() || !self.down.is_empty()
    }

    /// Human-readable identifier, e.g. `20240101_create_accounts`.
    pub fn label(&self) -> String {
        format!("{}_{}", self.version, self.name)
    }
}

impl fmt::Display for MigrationDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.version, self.name)
    }
}

/// On-disk YAML layout of a migration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MigrationFile {
    #[serde(default)]
    name: Option<String>,
    up: Transformation,
    /// Omitted: derive from `up`. Empty list: irreversible.
    #[serde(default)]
    down: Option<Transformation>,
}

/// Split `<version>_<name>` at the first underscore.
pub fn split_file_stem(stem: &str) -> CoreResult<(MigrationVersion, String)> {
    let (version, name) = stem.split_once('_').ok_or_else(|| CoreError::MigrationFile {
        path: stem.to_string(),
        reason: "expected a file name of the form <version>_<name>".to_string(),
    })?;
    if name.is_empty() {
        return Err(CoreError::MigrationFile {
            path: stem.to_string(),
            reason: "migration name must not be empty".to_string(),
        });
    }
    Ok((MigrationVersion::parse(version)?, name.to_string()))
}

fn validate_transformation(
    version: &MigrationVersion,
    direction: Direction,
    transformation: &Transformation,
) -> CoreResult<()> {
    for (index, op) in transformation.iter().enumerate() {
        op.validate().map_err(|reason| CoreError::InvalidOperation {
            version: version.to_string(),
            direction: direction.as_str(),
            index,
            reason,
        })?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
