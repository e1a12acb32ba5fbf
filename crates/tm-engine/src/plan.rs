//! Run planning.
//!
//! A plan is computed fresh for every run from the registry and the applied
//! set. Everything here is pure: validation failures surface before the
//! runner touches the database.

use crate::error::{MigrateError, MigrateResult};
use crate::report::Discrepancy;
use crate::target::Target;
use tm_core::{Direction, MigrationDefinition, MigrationVersion, Registry};
use tm_db::LedgerEntry;

/// Ordered migrations one run will apply or revert.
#[derive(Debug, Clone)]
pub struct Plan<'r> {
    pub direction: Direction,
    /// Current version before the run
    pub from: Option<MigrationVersion>,
    /// Current version once every step succeeds
    pub to: Option<MigrationVersion>,
    /// Ascending for upgrades, descending for downgrades
    pub steps: Vec<&'r MigrationDefinition>,
}

impl Plan<'_> {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn versions(&self) -> Vec<MigrationVersion> {
        self.steps.iter().map(|d| d.version().clone()).collect()
    }
}

/// Every way the applied set disagrees with the registry.
pub fn discrepancies(registry: &Registry, applied: &[LedgerEntry]) -> Vec<Discrepancy> {
    let mut found = Vec::new();
    for entry in applied {
        match registry.get(&entry.version) {
            None => found.push(Discrepancy::UnknownAppliedVersion {
                version: entry.version.clone(),
            }),
            Some(def) if def.checksum() != entry.checksum => {
                found.push(Discrepancy::ChecksumMismatch {
                    version: entry.version.clone(),
                    recorded: entry.checksum.clone(),
                    current: def.checksum().to_string(),
                })
            }
            Some(_) => {}
        }
    }

    if let Some(last) = applied.last() {
        for def in registry.iter().take_while(|d| d.version() < &last.version) {
            if !applied.iter().any(|e| &e.version == def.version()) {
                found.push(Discrepancy::Gap {
                    missing: def.version().clone(),
                    applied: last.version.clone(),
                });
            }
        }
    }
    found
}

/// Fail on the first discrepancy, checking ledger rows in version order.
pub fn validate(registry: &Registry, applied: &[LedgerEntry]) -> MigrateResult<()> {
    for (i, entry) in applied.iter().enumerate() {
        let def = registry
            .get(&entry.version)
            .ok_or_else(|| MigrateError::UnknownAppliedVersion {
                version: entry.version.clone(),
            })?;

        // applied set is sorted, so the i-th entry must be the i-th definition
        match registry.discover().get(i) {
            Some(expected) if expected.version() != def.version() => {
                return Err(MigrateError::LedgerGap {
                    missing: expected.version().clone(),
                    applied: entry.version.clone(),
                });
            }
            Some(_) => {}
            None => {
                return Err(MigrateError::UnknownAppliedVersion {
                    version: entry.version.clone(),
                })
            }
        }

        if def.checksum() != entry.checksum {
            return Err(MigrateError::ChecksumMismatch {
                version: entry.version.clone(),
                recorded: entry.checksum.clone(),
                current: def.checksum().to_string(),
            });
        }
    }
    Ok(())
}

/// Plan an upgrade from the applied set to `target`.
pub fn upgrade<'r>(
    registry: &'r Registry,
    applied: &[LedgerEntry],
    target: &Target,
) -> MigrateResult<Plan<'r>> {
    validate(registry, applied)?;
    let from = applied.last().map(|e| e.version.clone());
    let start = applied.len();

    let end = match target {
        Target::Latest => registry.len(),
        Target::None => match &from {
            Some(current) => {
                return Err(MigrateError::TargetBehind {
                    target: target.to_string(),
                    current: current.clone(),
                })
            }
            None => 0,
        },
        Target::Version(version) => {
            let pos = registry
                .position(version)
                .ok_or_else(|| MigrateError::TargetNotFound {
                    target: version.clone(),
                    location: "registry",
                })?;
            if pos + 1 < start {
                if let Some(current) = &from {
                    return Err(MigrateError::TargetBehind {
                        target: version.to_string(),
                        current: current.clone(),
                    });
                }
            }
            pos + 1
        }
    };

    let steps: Vec<&MigrationDefinition> = registry.discover()[start..end.max(start)].iter().collect();
    let to = steps
        .last()
        .map(|d| d.version().clone())
        .or_else(|| from.clone());
    log::debug!(
        "Upgrade plan to {}: {} pending migration(s)",
        target,
        steps.len()
    );
    Ok(Plan {
        direction: Direction::Up,
        from,
        to,
        steps,
    })
}

/// Plan a downgrade from the applied set to `target`.
pub fn downgrade<'r>(
    registry: &'r Registry,
    applied: &[LedgerEntry],
    target: &Target,
) -> MigrateResult<Plan<'r>> {
    validate(registry, applied)?;
    let from = applied.last().map(|e| e.version.clone());

    let keep = match target {
        Target::Latest => applied.len(),
        Target::None => 0,
        Target::Version(version) => {
            applied
                .iter()
                .position(|e| &e.version == version)
                .ok_or_else(|| MigrateError::TargetNotFound {
                    target: version.clone(),
                    location: "ledger",
                })?
                + 1
        }
    };

    let steps: Vec<&MigrationDefinition> = registry.discover()[keep..applied.len()]
        .iter()
        .rev()
        .collect();
    if let Some(def) = steps.iter().find(|d| !d.is_reversible()) {
        return Err(MigrateError::Irreversible {
            version: def.version().clone(),
        });
    }

    let to = keep.checked_sub(1).map(|i| applied[i].version.clone());
    log::debug!(
        "Downgrade plan to {}: {} migration(s) to revert",
        target,
        steps.len()
    );
    Ok(Plan {
        direction: Direction::Down,
        from,
        to,
        steps,
    })
}

#[cfg(test)]
#[path = "plan_test.rs"]
mod tests;
