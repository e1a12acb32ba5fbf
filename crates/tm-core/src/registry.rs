//! Migration registry: every known definition, ordered by version.

use crate::error::{CoreError, CoreResult};
use crate::migration::MigrationDefinition;
use crate::version::MigrationVersion;
use std::path::{Path, PathBuf};

/// Ordered, duplicate-free set of migration definitions.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    definitions: Vec<MigrationDefinition>,
}

impl Registry {
    /// Build a registry from statically authored definitions.
    ///
    /// Definitions are sorted ascending by version; two definitions with the
    /// same version fail with [`CoreError::DuplicateVersion`].
    pub fn new(mut definitions: Vec<MigrationDefinition>) -> CoreResult<Self> {
        definitions.sort_by(|a, b| a.version().cmp(b.version()));
        if let Some(pair) = definitions
            .windows(2)
            .find(|pair| pair[0].version() == pair[1].version())
        {
            return Err(CoreError::DuplicateVersion {
                version: pair[0].version().to_string(),
                first: describe(&pair[0]),
                second: describe(&pair[1]),
            });
        }
        log::debug!("Registry holds {} migrations", definitions.len());
        Ok(Self { definitions })
    }

    /// Discover YAML migration files (`*.yml`, `*.yaml`) in one directory.
    pub fn from_dir(dir: &Path) -> CoreResult<Self> {
        Self::from_dirs(&[dir.to_path_buf()])
    }

    /// Discover YAML migration files across several directories.
    ///
    /// A missing directory contributes nothing; sub-directories are ignored.
    pub fn from_dirs(dirs: &[PathBuf]) -> CoreResult<Self> {
        let mut definitions = Vec::new();
        for dir in dirs {
            if !dir.is_dir() {
                log::debug!("Migration directory not found: {}", dir.display());
                continue;
            }
            for path in migration_files(dir)? {
                definitions.push(MigrationDefinition::from_yaml_file(&path)?);
            }
        }
        Self::new(definitions)
    }

    /// All definitions in ascending version order.
    pub fn discover(&self) -> &[MigrationDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn get(&self, version: &MigrationVersion) -> Option<&MigrationDefinition> {
        self.position(version).map(|i| &self.definitions[i])
    }

    /// Index of `version` in registry order.
    pub fn position(&self, version: &MigrationVersion) -> Option<usize> {
        self.definitions
            .binary_search_by(|def| def.version().cmp(version))
            .ok()
    }

    pub fn contains(&self, version: &MigrationVersion) -> bool {
        self.position(version).is_some()
    }

    /// Highest registered version.
    pub fn latest(&self) -> Option<&MigrationVersion> {
        self.definitions.last().map(|def| def.version())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MigrationDefinition> {
        self.definitions.iter()
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a MigrationDefinition;
    type IntoIter = std::slice::Iter<'a, MigrationDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.definitions.iter()
    }
}

fn describe(def: &MigrationDefinition) -> String {
    match def.origin() {
        Some(path) => path.display().to_string(),
        None => def.name().to_string(),
    }
}

/// YAML files directly inside `dir`, sorted by file name.
fn migration_files(dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yml" || e == "yaml");
        if path.is_file() && is_yaml {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
