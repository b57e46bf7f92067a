//! Error types for introspection, synchronization and migration runs.

use std::path::PathBuf;

use strata_core::dialect::DialectKind;
use strata_core::SchemaError;

/// Errors that can occur while talking to a live database.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Diffing, rendering or ledger bookkeeping failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A revert was requested but the ledger is empty.
    #[error("No migrations have been applied, nothing to revert")]
    NothingToRevert,

    /// A catalog query failed.
    #[error("Failed to introspect {dialect} schema ({context}): {source}")]
    Introspection {
        /// Dialect being introspected.
        dialect: DialectKind,
        /// What was being read.
        context: String,
        /// Driver error.
        source: sqlx::Error,
    },

    /// A catalog row could not be turned into a schema object.
    #[error("Malformed {dialect} catalog: {detail}")]
    MalformedCatalog {
        /// Dialect being introspected.
        dialect: DialectKind,
        /// What did not parse.
        detail: String,
    },

    /// A batch run without a single enclosing transaction stopped part way.
    #[error(
        "Migration '{failed}' failed after {} migration(s) were applied: {source}",
        applied.len()
    )]
    PartialBatchFailure {
        /// Migrations that were applied and stay applied.
        applied: Vec<String>,
        /// The migration that failed.
        failed: String,
        /// Why it failed.
        source: Box<MigrateError>,
    },

    /// A migration failed and the whole batch was rolled back.
    #[error("Migration '{name}' failed, batch rolled back: {source}")]
    MigrationFailed {
        /// The migration that failed.
        name: String,
        /// Why it failed.
        source: Box<MigrateError>,
    },

    /// The ledger records a migration that is not among the known ones.
    #[error("Migration not found: {0}")]
    MigrationNotFound(String),

    /// Migration file already exists.
    #[error("Migration file already exists: {0}")]
    MigrationExists(PathBuf),

    /// No migrations directory found.
    #[error("Migrations directory not found: {0}")]
    MigrationsDirNotFound(PathBuf),

    /// Failed to parse a migration or schema file.
    #[error("Failed to parse '{path}': {message}")]
    ParseError {
        /// Path to the file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database error during execution.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (reading/writing migration files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MigrateError {
    /// Wraps a driver error raised while reading `context` from the catalog.
    pub fn introspection(dialect: DialectKind, context: impl Into<String>) -> impl FnOnce(sqlx::Error) -> Self {
        let context = context.into();
        move |source| Self::Introspection {
            dialect,
            context,
            source,
        }
    }

    /// Builds a [`MigrateError::MalformedCatalog`].
    pub fn malformed(dialect: DialectKind, detail: impl Into<String>) -> Self {
        Self::MalformedCatalog {
            dialect,
            detail: detail.into(),
        }
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
