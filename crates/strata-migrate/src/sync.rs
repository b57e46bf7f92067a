//! The data source: one database, its dialect, its ledger.
//!
//! [`DataSource`] ties the pure engine to a live connection pool. It reads
//! the live schema, diffs it against a desired model and either executes the
//! result (`synchronize`) or hands it back as a migration.

use chrono::Utc;
use sqlx::AnyPool;
use strata_core::dialect::Dialect;
use strata_core::ledger::{Migration, MigrationStatus};
use strata_core::query::SqlInMemory;
use strata_core::schema::{Schema, TableName};
use strata_core::{diff, SchemaDiff};
use tracing::{info, warn};

use crate::config::DataSourceOptions;
use crate::error::{MigrateError, Result};
use crate::executor::{MigrationExecutor, RunOptions};
use crate::introspect::{self, Introspector};
use crate::writer::generate_migration_name;

/// A connected database.
pub struct DataSource {
    options: DataSourceOptions,
    dialect: &'static Dialect,
    pool: AnyPool,
    introspector: Box<dyn Introspector>,
    executor: MigrationExecutor,
}

impl DataSource {
    /// Validates `options` and opens the connection pool.
    pub async fn connect(options: DataSourceOptions) -> Result<Self> {
        options.validate()?;
        let dialect = options.resolve_dialect()?;
        if !introspect::supports(dialect.kind) {
            return Err(MigrateError::Config(format!(
                "no database driver for {}, only sqlite, postgres and cockroachdb can be connected",
                dialect.kind
            )));
        }

        sqlx::any::install_default_drivers();
        info!(dialect = %dialect.kind, "Connecting to database");
        let pool = options.pool_options().connect(&options.connect_url()).await?;

        let introspector = introspect::introspector_for(pool.clone(), dialect)?;
        let executor = MigrationExecutor::new(pool.clone(), dialect, options.migrations_table_name());
        Ok(Self {
            options,
            dialect,
            pool,
            introspector,
            executor,
        })
    }

    /// The dialect of the connected database.
    #[must_use]
    pub const fn dialect(&self) -> &'static Dialect {
        self.dialect
    }

    /// The connection pool.
    #[must_use]
    pub const fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// The options the data source was built from.
    #[must_use]
    pub const fn options(&self) -> &DataSourceOptions {
        &self.options
    }

    /// Reads the live schema, without the ledger table.
    pub async fn introspect(&self, filter: Option<&[TableName]>) -> Result<Schema> {
        let mut schema = self.introspector.snapshot(filter).await?;
        let ledger = self.dialect.table_key(self.executor.history().table());
        schema
            .tables
            .retain(|t| self.dialect.table_key(&t.name) != ledger);
        Ok(schema)
    }

    async fn diff_against(&self, desired: &Schema) -> Result<SchemaDiff> {
        let current = self.introspect(None).await?;
        let diff = diff(desired, &current, self.dialect)?;
        for warning in &diff.warnings {
            warn!(warning = %warning, "Schema difference needs review");
        }
        Ok(diff)
    }

    /// The statements `synchronize` would run, without running them.
    pub async fn log_sync_sql(&self, desired: &Schema) -> Result<SqlInMemory> {
        let diff = self.diff_against(desired).await?;
        Ok(diff.to_sql(self.dialect)?)
    }

    /// Moves the database to `desired` in one transaction and returns the
    /// statements that were run.
    pub async fn synchronize(&self, desired: &Schema, drop_before_sync: bool) -> Result<SqlInMemory> {
        if drop_before_sync {
            self.drop_database().await?;
        }
        let sql = self.log_sync_sql(desired).await?;
        if sql.up_queries.is_empty() {
            info!("Schema is already up to date");
            return Ok(sql);
        }
        info!(statements = sql.up_queries.len(), "Synchronizing schema");
        self.executor.execute_in_transaction(&sql.up_queries).await?;
        Ok(sql)
    }

    /// Drops every table and view, the ledger included.
    pub async fn drop_database(&self) -> Result<()> {
        let current = self.introspector.snapshot(None).await?;
        let sql = diff(&Schema::new(), &current, self.dialect)?.to_sql(self.dialect)?;
        info!(
            tables = current.tables.len(),
            views = current.views.len(),
            "Dropping schema"
        );
        self.executor.execute_in_transaction(&sql.up_queries).await
    }

    /// Renders the difference between the live schema and `desired` as a
    /// migration named after `name` and the current time. `None` when there
    /// is nothing to do.
    pub async fn generate_migration(&self, desired: &Schema, name: &str) -> Result<Option<Migration>> {
        let diff = self.diff_against(desired).await?;
        if diff.is_empty() {
            return Ok(None);
        }
        let name = generate_migration_name(name, Utc::now().timestamp_millis())?;
        Ok(Some(Migration::from_diff(name, &diff, self.dialect)?))
    }

    /// Applies pending migrations.
    pub async fn run_migrations(&self, known: &[Migration], options: RunOptions) -> Result<Vec<Migration>> {
        self.executor.run_migrations(known, options).await
    }

    /// Undoes the most recently applied migration.
    pub async fn revert_last_migration(&self, known: &[Migration], options: RunOptions) -> Result<Migration> {
        self.executor.revert_last_migration(known, options).await
    }

    /// Applied status of every known migration.
    pub async fn show_migrations(&self, known: &[Migration]) -> Result<Vec<MigrationStatus>> {
        self.executor.show_migrations(known).await
    }

    /// `true` when some known migration has not been applied.
    pub async fn has_pending_migrations(&self, known: &[Migration]) -> Result<bool> {
        self.executor.has_pending_migrations(known).await
    }

    /// Closes the pool.
    pub async fn destroy(self) -> Result<()> {
        self.pool.close().await;
        info!("Connection closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::dialect::DialectKind;

    #[tokio::test]
    async fn test_connect_rejects_engines_without_a_driver() {
        let options = DataSourceOptions::new("mysql://localhost/app");
        let result = DataSource::connect(options).await;
        assert!(matches!(result, Err(MigrateError::Config(_))));

        let options = DataSourceOptions::new("sqlite::memory:").dialect(DialectKind::Oracle);
        assert!(DataSource::connect(options).await.is_err());
    }

    #[tokio::test]
    async fn test_connect_in_memory() {
        let source = DataSource::connect(DataSourceOptions::new("sqlite::memory:"))
            .await
            .unwrap();
        assert_eq!(source.dialect().kind, DialectKind::Sqlite);
        assert!(source.introspect(None).await.unwrap().tables.is_empty());
        source.destroy().await.unwrap();
    }
}
