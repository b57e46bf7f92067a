//! # strata-core
//!
//! Schema diffing and migration DDL synthesis across SQL dialects.
//!
//! This crate is pure computation: it never talks to a database. It provides:
//! - A schema object model ([`schema`]) shared by desired and live schemas
//! - Per-engine dialect rules ([`dialect`]) as plain data records
//! - A differ ([`diff()`]) that produces ordered, reversible changes
//! - A DDL synthesizer ([`render`]) that turns each change into SQL
//! - Migration bookkeeping ([`ledger`]) and model-level replay ([`state`])
//!
//! ## Example
//!
//! ```rust
//! use strata_core::prelude::*;
//!
//! let live = Schema::new().table(
//!     Table::new("post")
//!         .column(Column::new("id", "int").primary())
//!         .column(Column::new("title", "varchar").length("50")),
//! );
//! let desired = Schema::new().table(
//!     Table::new("post")
//!         .column(Column::new("id", "int").primary())
//!         .column(Column::new("title", "varchar").length("100")),
//! );
//!
//! let diff = diff(&desired, &live, &POSTGRES).unwrap();
//! let sql = diff.to_sql(&POSTGRES).unwrap();
//! assert_eq!(
//!     sql.up_queries[0].sql,
//!     "ALTER TABLE \"post\" ALTER COLUMN \"title\" TYPE varchar(100)"
//! );
//! ```

pub mod dialect;
pub mod diff;
pub mod error;
pub mod ledger;
pub mod naming;
pub mod operation;
pub mod query;
pub mod render;
pub mod schema;
pub mod state;
pub mod validate;

pub use diff::{diff, DiffWarning, SchemaDiff};
pub use error::{Result, SchemaError};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::dialect::{
        Dialect, DialectKind, Feature, COCKROACH, MYSQL, ORACLE, POSTGRES, SPANNER, SQLITE,
        SQL_SERVER,
    };
    pub use crate::diff::{diff, DiffWarning, SchemaDiff};
    pub use crate::error::{Result, SchemaError};
    pub use crate::ledger::{AppliedMigration, Migration, MigrationStatus, TransactionMode};
    pub use crate::operation::{Change, Operation};
    pub use crate::query::{Query, QueryValue, RenderedSql, SqlInMemory};
    pub use crate::render::render;
    pub use crate::schema::{
        CheckConstraint, Column, ComputedColumn, Deferrable, ExclusionConstraint, ForeignKey,
        Generation, Index, PrimaryKey, ReferentialAction, Schema, StorageMode, Table, TableName,
        UniqueConstraint, View,
    };
    pub use crate::state::SchemaState;
    pub use crate::validate::validate_schema;
}
