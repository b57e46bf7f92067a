//! # strata-migrate
//!
//! Live-database side of strata: introspection, schema synchronization and
//! a migration ledger, on top of the pure engine in `strata-core`.
//!
//! # Architecture
//!
//! - **Introspect** - Reads the live schema (SQLite, PostgreSQL, CockroachDB)
//! - **History** - The ledger table recording applied migrations
//! - **Executor** - Runs and reverts migrations in `all`, `each` or `none`
//!   transaction mode
//! - **Sync** - [`DataSource`], which diffs the live schema against a desired
//!   model and executes or records the result
//! - **Writer** - Migration files on disk
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_migrate::prelude::*;
//!
//! let source = DataSource::connect(DataSourceOptions::new("sqlite:app.db")).await?;
//! let desired = Schema::new().table(
//!     Table::new("post")
//!         .column(Column::new("id", "integer").primary().generated(Generation::Increment))
//!         .column(Column::new("title", "varchar").length("100")),
//! );
//!
//! // Print what would change, then apply it
//! println!("{}", source.log_sync_sql(&desired).await?.up_script());
//! source.synchronize(&desired, false).await?;
//! source.destroy().await?;
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Apply pending migrations, one transaction per migration
//! strata migration:run --transaction each
//!
//! # Revert the last applied migration
//! strata migration:revert
//!
//! # Write a migration for the difference to the desired schema
//! strata --schema schema.json migration:generate "add post summary"
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod history;
pub mod introspect;
pub mod sync;
pub mod writer;

pub use sync::DataSource;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{load_schema, DataSourceOptions};
    pub use crate::error::{MigrateError, Result};
    pub use crate::executor::{MigrationExecutor, RunOptions};
    pub use crate::history::MigrationHistory;
    pub use crate::introspect::{Introspector, PostgresIntrospector, SqliteIntrospector};
    pub use crate::sync::DataSource;
    pub use crate::writer::{generate_migration_name, load_migrations, MigrationWriter};
    pub use strata_core::prelude::{
        Column, Dialect, DialectKind, Generation, Migration, MigrationStatus, Schema,
        SqlInMemory, Table, TableName, TransactionMode,
    };
}
