//! Strongly-typed migration version identifier.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

/// Opaque, totally ordered migration version (commonly a timestamp such as
/// `20240101120000`).
///
/// Ordering rules:
/// - two all-digit versions compare numerically, so `9` sorts before `10`
///   and leading zeros do not matter (`007` vs `7` falls back to the raw
///   string to keep the order consistent with equality);
/// - every all-digit version sorts before any version containing other
///   characters;
/// - two non-numeric versions compare byte-wise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MigrationVersion(String);

impl MigrationVersion {
    /// Validate and wrap a version string.
    pub fn parse(version: impl Into<String>) -> CoreResult<Self> {
        let s = version.into();
        if s.is_empty() {
            return Err(CoreError::InvalidVersion {
                version: s,
                reason: "version must not be empty".to_string(),
            });
        }
        // `_` separates version from name in migration file names
        if let Some(bad) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '.')))
        {
            return Err(CoreError::InvalidVersion {
                reason: format!("unsupported character '{bad}'"),
                version: s,
            });
        }
        Ok(Self(s))
    }

    /// Create a version, panicking on invalid input.
    ///
    /// Intended for statically authored definitions; prefer
    /// [`parse`](Self::parse) for untrusted input.
    pub fn new(version: impl Into<String>) -> Self {
        match Self::parse(version) {
            Ok(v) => v,
            Err(e) => panic!("{e}"),
        }
    }

    /// Return the underlying version as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Significant digits when the version is purely numeric.
    fn numeric_digits(&self) -> Option<&str> {
        if self.0.bytes().all(|b| b.is_ascii_digit()) {
            Some(self.0.trim_start_matches('0'))
        } else {
            None
        }
    }
}

impl Ord for MigrationVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric_digits(), other.numeric_digits()) {
            (Some(a), Some(b)) => a
                .len()
                .cmp(&b.len())
                .then_with(|| a.cmp(b))
                .then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for MigrationVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'de> Deserialize<'de> for MigrationVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        MigrationVersion::parse(s).map_err(serde::de::Error::custom)
    }
}

impl FromStr for MigrationVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MigrationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MigrationVersion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for MigrationVersion {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for MigrationVersion {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for MigrationVersion {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
#[path = "version_test.rs"]
mod tests;
