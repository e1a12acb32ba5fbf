//! Error types for tm-core

use thiserror::Error;

/// Core error type for Tidemark
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Version identifier is empty or contains unsupported characters
    #[error("[C001] Invalid migration version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    /// C002: Two migration definitions share a version
    #[error("[C002] Duplicate migration version '{version}': '{first}' and '{second}'")]
    DuplicateVersion {
        version: String,
        first: String,
        second: String,
    },

    /// C003: An operation has no inverse, so a down transformation cannot be derived
    #[error("[C003] Operation {index} ({kind}) has no inverse; declare the down transformation explicitly")]
    MissingInverse { index: usize, kind: &'static str },

    /// C010: An operation is structurally invalid
    #[error("[C010] Migration {version} ({direction}) operation {index} is invalid: {reason}")]
    InvalidOperation {
        version: String,
        direction: &'static str,
        index: usize,
        reason: String,
    },

    /// C004: Configuration file not found
    #[error("[C004] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C005: Invalid configuration value
    #[error("[C005] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C006: A migration file could not be interpreted
    #[error("[C006] Invalid migration file '{path}': {reason}")]
    MigrationFile { path: String, reason: String },

    /// C007: IO error
    #[error("[C007] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// C008: IO error with file path context
    #[error("[C008] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// C009: YAML parse error
    #[error("[C009] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
