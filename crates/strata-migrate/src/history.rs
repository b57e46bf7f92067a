//! Migration history tracking.
//!
//! This module manages the ledger table (`migrations` by default) that
//! records which migrations have been applied. The table has three columns:
//! the migration id, its name, and the millisecond timestamp it was applied
//! at.

use chrono::Utc;
use sqlx::any::{Any, AnyArguments};
use sqlx::AnyConnection;
use sqlx::Row;
use strata_core::dialect::Dialect;
use strata_core::ledger::{AppliedMigration, Migration};
use strata_core::query::{Query, QueryValue};
use strata_core::render::create_table_statements;
use strata_core::schema::{Column, PrimaryKey, Table, TableName};
use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::introspect::table_exists;

/// Binds a rendered statement's parameters for execution.
pub(crate) fn bind_query(query: &Query) -> sqlx::query::Query<'_, Any, AnyArguments<'_>> {
    query
        .parameters
        .iter()
        .fold(sqlx::query(&query.sql), |statement, value| match value {
            QueryValue::Integer(v) => statement.bind(*v),
            QueryValue::Text(v) => statement.bind(v.clone()),
        })
}

/// Runs `queries` in order on `conn`.
pub(crate) async fn execute_all(conn: &mut AnyConnection, queries: &[Query]) -> Result<()> {
    for query in queries {
        debug!(sql = %query.sql, "Executing SQL");
        bind_query(query).execute(&mut *conn).await?;
    }
    Ok(())
}

/// Reads and writes the ledger table.
#[derive(Debug, Clone)]
pub struct MigrationHistory {
    table: TableName,
    dialect: &'static Dialect,
}

impl MigrationHistory {
    /// Creates a history over `table`.
    #[must_use]
    pub const fn new(table: TableName, dialect: &'static Dialect) -> Self {
        Self { table, dialect }
    }

    /// The ledger table name.
    #[must_use]
    pub const fn table(&self) -> &TableName {
        &self.table
    }

    /// The ledger table as a schema object.
    #[must_use]
    pub fn definition(&self) -> Table {
        Table::new(self.table.clone())
            .column(Column::new("id", "bigint"))
            .column(Column::new("name", "varchar").length("255"))
            .column(Column::new("applied_at", "bigint"))
            .primary_key(PrimaryKey::new(["id"]))
    }

    /// Creates the ledger table unless it exists.
    pub async fn ensure_table(&self, conn: &mut AnyConnection) -> Result<()> {
        if table_exists(conn, self.dialect, &self.table).await? {
            return Ok(());
        }
        debug!(table = %self.table, "Creating migrations table");
        let statements = create_table_statements(&self.definition(), self.dialect)?;
        execute_all(conn, &statements).await
    }

    fn columns(&self) -> String {
        self.dialect
            .quote_list(&["id".to_string(), "name".to_string(), "applied_at".to_string()])
    }

    /// Records `migration` as applied now.
    pub async fn record_applied(&self, conn: &mut AnyConnection, migration: &Migration) -> Result<()> {
        let insert = Query::new(format!(
            "INSERT INTO {} ({}) VALUES ({}, {}, {})",
            self.dialect.quote_table(&self.table),
            self.columns(),
            self.dialect.placeholder(1),
            self.dialect.placeholder(2),
            self.dialect.placeholder(3),
        ))
        .bind(migration.id)
        .bind(migration.name.as_str())
        .bind(Utc::now().timestamp_millis());
        execute_all(conn, &[insert]).await
    }

    /// Removes the record of migration `id`.
    pub async fn record_reverted(&self, conn: &mut AnyConnection, id: i64) -> Result<()> {
        let delete = Query::new(format!(
            "DELETE FROM {} WHERE {} = {}",
            self.dialect.quote_table(&self.table),
            self.dialect.quote_identifier("id"),
            self.dialect.placeholder(1),
        ))
        .bind(id);
        let result = bind_query(&delete).execute(&mut *conn).await?;
        if result.rows_affected() == 0 {
            return Err(MigrateError::MigrationNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Every recorded migration, ordered by id.
    pub async fn applied(&self, conn: &mut AnyConnection) -> Result<Vec<AppliedMigration>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            self.columns(),
            self.dialect.quote_table(&self.table),
            self.dialect.quote_identifier("id"),
        );
        let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
        rows.iter()
            .map(|row| -> Result<AppliedMigration> {
                Ok(AppliedMigration {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    applied_at: row.try_get("applied_at")?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::any::AnyPoolOptions;
    use sqlx::AnyPool;
    use strata_core::dialect::SQLITE;
    use strata_core::ledger::last_applied;

    async fn create_test_pool() -> AnyPool {
        sqlx::any::install_default_drivers();
        AnyPoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory SQLite pool")
    }

    fn history() -> MigrationHistory {
        MigrationHistory::new(TableName::new("migrations"), &SQLITE)
    }

    fn migration(name: &str) -> Migration {
        Migration::from_sql(name, &["SELECT 1"], &[]).unwrap()
    }

    #[tokio::test]
    async fn test_ensure_table() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let history = history();

        history.ensure_table(&mut conn).await.unwrap();
        // Idempotent
        history.ensure_table(&mut conn).await.unwrap();
        assert!(table_exists(&mut conn, &SQLITE, history.table()).await.unwrap());
    }

    #[tokio::test]
    async fn test_record_and_read_applied() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let history = history();
        history.ensure_table(&mut conn).await.unwrap();

        assert!(history.applied(&mut conn).await.unwrap().is_empty());

        history
            .record_applied(&mut conn, &migration("AddEmail1700000000002"))
            .await
            .unwrap();
        history
            .record_applied(&mut conn, &migration("CreateUsers1700000000001"))
            .await
            .unwrap();

        let applied = history.applied(&mut conn).await.unwrap();
        assert_eq!(applied.len(), 2);
        assert_eq!(applied[0].id, 1_700_000_000_001);
        assert_eq!(applied[0].name, "CreateUsers1700000000001");
        assert!(applied[0].applied_at > 0);
    }

    #[tokio::test]
    async fn test_record_reverted() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let history = history();
        history.ensure_table(&mut conn).await.unwrap();

        let m = migration("CreateUsers1700000000001");
        history.record_applied(&mut conn, &m).await.unwrap();
        history.record_reverted(&mut conn, m.id).await.unwrap();
        assert!(history.applied(&mut conn).await.unwrap().is_empty());

        let result = history.record_reverted(&mut conn, m.id).await;
        assert!(matches!(result, Err(MigrateError::MigrationNotFound(_))));
    }

    #[tokio::test]
    async fn test_last_applied_follows_application_time() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let history = history();
        history.ensure_table(&mut conn).await.unwrap();

        history
            .record_applied(&mut conn, &migration("First1700000000001"))
            .await
            .unwrap();
        history
            .record_applied(&mut conn, &migration("Second1700000000002"))
            .await
            .unwrap();

        let applied = history.applied(&mut conn).await.unwrap();
        let last = last_applied(&applied).unwrap();
        assert_eq!(last.name, "Second1700000000002");
    }
}
