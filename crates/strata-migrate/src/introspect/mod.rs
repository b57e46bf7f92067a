//! Reading the live schema of a database into the object model.
//!
//! Each engine with a driver has an [`Introspector`] built on its catalog.
//! Introspected names are preserved exactly as stored, and a schema
//! qualifier equal to the connection's current schema is dropped, so the
//! result can be diffed against a model written without qualifiers.

mod ddl;
mod postgres;
mod sqlite;

use async_trait::async_trait;
use sqlx::any::{Any, AnyRow};
use sqlx::{AnyConnection, AnyPool};
use sqlx::Row;
use strata_core::dialect::{Dialect, DialectKind};
use strata_core::schema::{Schema, TableName};
use strata_core::SchemaError;

use crate::error::{MigrateError, Result};

pub use postgres::PostgresIntrospector;
pub use sqlite::SqliteIntrospector;

/// Reads a [`Schema`] from a live database.
#[async_trait]
pub trait Introspector: Send + Sync {
    /// The dialect the catalog belongs to.
    fn dialect(&self) -> &'static Dialect;

    /// Reads every table (or only those named in `filter`) and every view.
    async fn snapshot(&self, filter: Option<&[TableName]>) -> Result<Schema>;

    /// `true` when `table` exists.
    async fn has_table(&self, table: &TableName) -> Result<bool>;
}

/// `true` when an introspector exists for `kind`.
#[must_use]
pub const fn supports(kind: DialectKind) -> bool {
    matches!(
        kind,
        DialectKind::Sqlite | DialectKind::Postgres | DialectKind::Cockroach
    )
}

fn unsupported(dialect: &Dialect) -> MigrateError {
    MigrateError::Schema(SchemaError::UnsupportedOperation {
        operation: "introspect the live schema".to_string(),
        dialect: dialect.kind,
        reason: "no catalog driver is available".to_string(),
    })
}

/// Builds the introspector for `dialect` over `pool`.
pub fn introspector_for(pool: AnyPool, dialect: &'static Dialect) -> Result<Box<dyn Introspector>> {
    match dialect.kind {
        DialectKind::Sqlite => Ok(Box::new(SqliteIntrospector::new(pool))),
        DialectKind::Postgres | DialectKind::Cockroach => {
            Ok(Box::new(PostgresIntrospector::new(pool, dialect)))
        }
        _ => Err(unsupported(dialect)),
    }
}

/// `true` when `table` exists, checked on an open connection.
pub async fn table_exists(
    conn: &mut AnyConnection,
    dialect: &Dialect,
    table: &TableName,
) -> Result<bool> {
    let context = format!("existence of table '{}'", table);
    let count: i64 = match dialect.kind {
        DialectKind::Sqlite => sqlx::query(
            "SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table.name.clone())
        .fetch_one(&mut *conn)
        .await
        .and_then(|row| row.try_get("n"))
        .map_err(MigrateError::introspection(dialect.kind, context))?,
        DialectKind::Postgres | DialectKind::Cockroach => sqlx::query(
            "SELECT COUNT(*)::int8 AS n FROM pg_catalog.pg_tables \
             WHERE schemaname = COALESCE($1, current_schema()) AND tablename = $2",
        )
        .bind(table.schema.clone())
        .bind(table.name.clone())
        .fetch_one(&mut *conn)
        .await
        .and_then(|row| row.try_get("n"))
        .map_err(MigrateError::introspection(dialect.kind, context))?,
        _ => return Err(unsupported(dialect)),
    };
    Ok(count > 0)
}

/// Decodes one column of a catalog row.
fn field<'r, T>(row: &'r AnyRow, column: &str, kind: DialectKind) -> Result<T>
where
    T: sqlx::Decode<'r, Any> + sqlx::Type<Any>,
{
    row.try_get(column).map_err(MigrateError::introspection(
        kind,
        format!("column '{}' of a catalog row", column),
    ))
}

/// `true` when `table` passes `filter`, compared under the dialect's
/// schema folding.
fn selected(dialect: &Dialect, filter: Option<&[TableName]>, table: &TableName) -> bool {
    filter.map_or(true, |names| {
        let key = dialect.table_key(table);
        names.iter().any(|n| dialect.table_key(n) == key)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::dialect::{MYSQL, POSTGRES};

    #[test]
    fn filter_folds_the_default_schema() {
        let filter = [TableName::qualified("public", "post")];
        assert!(selected(&POSTGRES, Some(&filter), &TableName::new("post")));
        assert!(!selected(&POSTGRES, Some(&filter), &TableName::new("user")));
        assert!(selected(&POSTGRES, None, &TableName::new("user")));
    }

    #[test]
    fn only_driver_backed_dialects_introspect() {
        assert!(supports(DialectKind::Sqlite));
        assert!(supports(DialectKind::Cockroach));
        assert!(!supports(DialectKind::Oracle));
        let err = unsupported(&MYSQL);
        assert!(err.to_string().contains("introspect the live schema"));
    }
}
