//! Error types for schema diffing and DDL synthesis.

use crate::dialect::{DialectKind, Feature};

/// Errors raised while validating, diffing, or rendering a schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The target dialect lacks a capability the model asks for.
    #[error("{dialect} does not support {feature} ({context})")]
    UnsupportedFeature {
        /// The missing capability.
        feature: Feature,
        /// The dialect that was asked.
        dialect: DialectKind,
        /// The object that needed it.
        context: String,
    },

    /// The dialect supports the objects involved but not this change to them.
    #[error("{dialect} cannot {operation}: {reason}")]
    UnsupportedOperation {
        /// Short description of the change.
        operation: String,
        /// The dialect that refused it.
        dialect: DialectKind,
        /// Why the change is refused.
        reason: String,
    },

    /// Two distinct objects resolve to the same stored name.
    #[error("Name '{name}' is shared by {first} and {second}")]
    AmbiguousName {
        /// The colliding name, after truncation.
        name: String,
        /// Identity of the first object.
        first: String,
        /// Identity of the second object.
        second: String,
    },

    /// The model violates a structural invariant.
    #[error("Invalid schema: {0}")]
    InvalidModel(String),

    /// An operation does not fit the schema state it is applied to.
    #[error("Invalid schema state: {0}")]
    InvalidState(String),

    /// A migration name carries no usable timestamp.
    #[error("Invalid migration name '{0}': expected a trailing 13-digit timestamp")]
    InvalidMigrationName(String),

    /// Two migrations resolve to the same id.
    #[error("Migrations '{first}' and '{second}' share id {id}")]
    DuplicateMigration {
        /// The shared id.
        id: i64,
        /// Name of the first migration.
        first: String,
        /// Name of the second migration.
        second: String,
    },
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
