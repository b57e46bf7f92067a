//! PostgreSQL and CockroachDB introspection over `pg_catalog`.
//!
//! Every catalog value is cast to `text`, `int8` or `bool` in the query so
//! the `Any` driver can decode it.

use async_trait::async_trait;
use sqlx::{AnyConnection, AnyPool};
use strata_core::dialect::{strip_wrapping_parens, Dialect, DialectKind};
use strata_core::schema::{
    CheckConstraint, Column, ComputedColumn, Deferrable, ExclusionConstraint, ForeignKey,
    Generation, Index, PrimaryKey, ReferentialAction, Schema, StorageMode, Table, TableName,
    UniqueConstraint, View,
};
use tracing::{debug, warn};

use super::{field, selected, table_exists, Introspector};
use crate::error::{MigrateError, Result};

/// Separator for aggregated column names.
const UNIT_SEPARATOR: char = '\u{1f}';

const TABLES: &str = "\
SELECT n.nspname::text AS schema_name, c.relname::text AS table_name,
       obj_description(c.oid, 'pg_class')::text AS comment, c.oid::int8 AS oid
FROM pg_class c
JOIN pg_namespace n ON n.oid = c.relnamespace
WHERE c.relkind IN ('r', 'p') AND n.nspname = $1
ORDER BY c.relname";

const COLUMNS: &str = "\
SELECT a.attname::text AS name,
       format_type(a.atttypid, a.atttypmod)::text AS data_type,
       a.attnotnull AS not_null,
       pg_get_expr(d.adbin, d.adrelid)::text AS default_expr,
       a.attidentity::text AS identity,
       a.attgenerated::text AS generated,
       CASE WHEN a.attcollation <> t.typcollation THEN co.collname::text END AS collation,
       col_description(a.attrelid, a.attnum)::text AS comment,
       t.typtype::text AS type_kind,
       a.atttypid::int8 AS type_oid
FROM pg_attribute a
JOIN pg_type t ON t.oid = a.atttypid
LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
LEFT JOIN pg_collation co ON co.oid = a.attcollation
WHERE a.attrelid = $1::int8::oid AND a.attnum > 0 AND NOT a.attisdropped
ORDER BY a.attnum";

const ENUM_LABELS: &str = "\
SELECT enumlabel::text AS label FROM pg_enum
WHERE enumtypid = $1::int8::oid
ORDER BY enumsortorder";

const CONSTRAINTS: &str = "\
SELECT c.conname::text AS name,
       c.contype::text AS kind,
       (SELECT string_agg(a.attname::text, chr(31) ORDER BY k.ord)
          FROM unnest(c.conkey) WITH ORDINALITY AS k(attnum, ord)
          JOIN pg_attribute a ON a.attrelid = c.conrelid AND a.attnum = k.attnum) AS columns,
       (SELECT string_agg(a.attname::text, chr(31) ORDER BY k.ord)
          FROM unnest(c.confkey) WITH ORDINALITY AS k(attnum, ord)
          JOIN pg_attribute a ON a.attrelid = c.confrelid AND a.attnum = k.attnum) AS referenced_columns,
       rn.nspname::text AS referenced_schema,
       rc.relname::text AS referenced_table,
       c.confdeltype::text AS on_delete,
       c.confupdtype::text AS on_update,
       c.condeferrable AS is_deferrable,
       c.condeferred AS is_deferred,
       pg_get_constraintdef(c.oid)::text AS definition
FROM pg_constraint c
LEFT JOIN pg_class rc ON rc.oid = c.confrelid
LEFT JOIN pg_namespace rn ON rn.oid = rc.relnamespace
WHERE c.conrelid = $1::int8::oid
ORDER BY c.conname";

const INDICES: &str = "\
SELECT i.relname::text AS name,
       x.indisunique AS is_unique,
       am.amname::text AS method,
       pg_get_expr(x.indpred, x.indrelid)::text AS predicate,
       (SELECT string_agg(a.attname::text, chr(31) ORDER BY k.ord)
          FROM unnest(x.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
          JOIN pg_attribute a ON a.attrelid = x.indrelid AND a.attnum = k.attnum) AS columns,
       (SELECT count(*) FROM unnest(x.indkey::int2[]) AS k(attnum) WHERE k.attnum = 0)::int8 AS expressions
FROM pg_index x
JOIN pg_class i ON i.oid = x.indexrelid
JOIN pg_am am ON am.oid = i.relam
WHERE x.indrelid = $1::int8::oid
  AND NOT x.indisprimary
  AND NOT EXISTS (SELECT 1 FROM pg_constraint c WHERE c.conindid = x.indexrelid)
ORDER BY i.relname";

const VIEWS: &str = "\
SELECT viewname::text AS name, definition::text AS definition, false AS materialized
FROM pg_views WHERE schemaname = $1
UNION ALL
SELECT matviewname::text AS name, definition::text AS definition, true AS materialized
FROM pg_matviews WHERE schemaname = $1
ORDER BY name";

/// Splits a `chr(31)`-joined aggregate into names.
fn split_names(joined: Option<String>) -> Vec<String> {
    joined
        .map(|s| s.split(UNIT_SEPARATOR).map(str::to_string).collect())
        .unwrap_or_default()
}

/// Decodes `pg_constraint.confdeltype` / `confupdtype`.
fn referential_action(code: &str) -> Option<ReferentialAction> {
    match code {
        "a" => Some(ReferentialAction::NoAction),
        "r" => Some(ReferentialAction::Restrict),
        "c" => Some(ReferentialAction::Cascade),
        "n" => Some(ReferentialAction::SetNull),
        "d" => Some(ReferentialAction::SetDefault),
        _ => None,
    }
}

/// The generation strategy implied by a column default.
fn generation_from_default(expression: &str) -> Option<Generation> {
    let lowered = expression.trim().to_ascii_lowercase();
    if lowered.starts_with("nextval(") {
        Some(Generation::Increment)
    } else if lowered.starts_with("gen_random_uuid()") || lowered.starts_with("uuid_generate_v4()") {
        Some(Generation::Uuid)
    } else if lowered.starts_with("unique_rowid()") {
        Some(Generation::Rowid)
    } else {
        None
    }
}

/// CockroachDB adds a hidden `rowid` key column to tables declared without a
/// primary key.
fn is_hidden_rowid(kind: DialectKind, name: &str, default: Option<&str>) -> bool {
    kind == DialectKind::Cockroach
        && name == "rowid"
        && default.is_some_and(|d| d.trim().to_ascii_lowercase().starts_with("unique_rowid()"))
}

/// The body of a `pg_get_constraintdef` result after its keyword.
fn constraint_body(definition: &str, keyword: &str) -> String {
    let trimmed = definition.trim();
    let body = if trimmed.len() >= keyword.len()
        && trimmed[..keyword.len()].eq_ignore_ascii_case(keyword)
    {
        &trimmed[keyword.len()..]
    } else {
        trimmed
    };
    let body = body.trim().trim_end_matches(" NOT VALID");
    strip_wrapping_parens(body).to_string()
}

/// Drops the schema qualifier when it is the connection's current schema.
fn local_name(current: &str, schema: &str, name: String) -> TableName {
    if schema == current {
        TableName::new(name)
    } else {
        TableName::qualified(schema, name)
    }
}

/// Introspector over `pg_catalog`, shared by PostgreSQL and CockroachDB.
pub struct PostgresIntrospector {
    pool: AnyPool,
    dialect: &'static Dialect,
}

impl PostgresIntrospector {
    /// Creates an introspector for `dialect` over `pool`.
    #[must_use]
    pub const fn new(pool: AnyPool, dialect: &'static Dialect) -> Self {
        Self { pool, dialect }
    }

    const fn kind(&self) -> DialectKind {
        self.dialect.kind
    }

    async fn read_columns(&self, conn: &mut AnyConnection, oid: i64, table: &mut Table) -> Result<()> {
        let kind = self.kind();
        let rows = sqlx::query(COLUMNS)
            .bind(oid)
            .fetch_all(&mut *conn)
            .await
            .map_err(MigrateError::introspection(kind, format!("columns of '{}'", table.name)))?;

        for row in &rows {
            let name: String = field(row, "name", kind)?;
            let data_type: String = field(row, "data_type", kind)?;
            let not_null: bool = field(row, "not_null", kind)?;
            let default_expr: Option<String> = field(row, "default_expr", kind)?;
            let identity: Option<String> = field(row, "identity", kind)?;
            let generated: Option<String> = field(row, "generated", kind)?;
            let collation: Option<String> = field(row, "collation", kind)?;
            let comment: Option<String> = field(row, "comment", kind)?;
            let type_kind: String = field(row, "type_kind", kind)?;
            let type_oid: i64 = field(row, "type_oid", kind)?;
            if is_hidden_rowid(kind, &name, default_expr.as_deref()) {
                continue;
            }

            let mut column = if type_kind == "e" {
                let mut column = Column::new(name.clone(), "enum");
                column.enum_values = self.read_enum_labels(conn, type_oid).await?;
                column
            } else {
                let decl = self.dialect.split_type(&data_type);
                let mut column = Column::new(name.clone(), decl.data_type);
                column.length = decl.length;
                column.precision = decl.precision;
                column.scale = decl.scale;
                column
            };
            column.nullable = !not_null;
            column.collation = collation;
            column.comment = comment;

            let mut default = default_expr;
            if generated.as_deref() == Some("s") {
                let expression = default.take().ok_or_else(|| {
                    MigrateError::malformed(
                        kind,
                        format!("generated column '{}' of '{}' has no expression", name, table.name),
                    )
                })?;
                column.computed = Some(ComputedColumn {
                    expression: strip_wrapping_parens(&expression).to_string(),
                    mode: StorageMode::Stored,
                });
            } else if matches!(identity.as_deref(), Some("a" | "d")) {
                column.generation = Some(Generation::Identity);
            } else {
                column.generation = default.as_deref().and_then(generation_from_default);
            }
            if column.generation.is_some() {
                default = None;
            }
            column.default = default.and_then(|raw| self.dialect.parse_default(&raw));
            table.columns.push(column);
        }
        Ok(())
    }

    async fn read_enum_labels(&self, conn: &mut AnyConnection, type_oid: i64) -> Result<Vec<String>> {
        let kind = self.kind();
        let rows = sqlx::query(ENUM_LABELS)
            .bind(type_oid)
            .fetch_all(&mut *conn)
            .await
            .map_err(MigrateError::introspection(kind, "enum labels"))?;
        rows.iter().map(|row| field(row, "label", kind)).collect()
    }

    async fn read_constraints(
        &self,
        conn: &mut AnyConnection,
        oid: i64,
        current: &str,
        table: &mut Table,
    ) -> Result<()> {
        let kind = self.kind();
        let rows = sqlx::query(CONSTRAINTS)
            .bind(oid)
            .fetch_all(&mut *conn)
            .await
            .map_err(MigrateError::introspection(kind, format!("constraints of '{}'", table.name)))?;

        for row in &rows {
            let name: String = field(row, "name", kind)?;
            let contype: String = field(row, "kind", kind)?;
            let columns = split_names(field(row, "columns", kind)?);
            let definition: String = field(row, "definition", kind)?;

            match contype.as_str() {
                "p" => {
                    let implicit = kind == DialectKind::Cockroach
                        && columns == ["rowid"]
                        && table.get_column("rowid").is_none();
                    if !implicit {
                        table.primary_key = Some(PrimaryKey::new(columns).named(name));
                    }
                }
                "u" => table.uniques.push(UniqueConstraint::new(columns).named(name)),
                "c" => table
                    .checks
                    .push(CheckConstraint::new(constraint_body(&definition, "CHECK")).named(name)),
                "x" => table.exclusions.push(
                    ExclusionConstraint::new(constraint_body(&definition, "EXCLUDE")).named(name),
                ),
                "f" => {
                    let referenced_schema: Option<String> = field(row, "referenced_schema", kind)?;
                    let referenced_table: Option<String> = field(row, "referenced_table", kind)?;
                    let referenced_columns = split_names(field(row, "referenced_columns", kind)?);
                    let on_delete: String = field(row, "on_delete", kind)?;
                    let on_update: String = field(row, "on_update", kind)?;
                    let is_deferrable: bool = field(row, "is_deferrable", kind)?;
                    let is_deferred: bool = field(row, "is_deferred", kind)?;

                    let (Some(schema), Some(referenced)) = (referenced_schema, referenced_table) else {
                        return Err(MigrateError::malformed(
                            kind,
                            format!("foreign key '{}' has no referenced table", name),
                        ));
                    };
                    let action = |code: &str| {
                        referential_action(code).ok_or_else(|| {
                            MigrateError::malformed(
                                kind,
                                format!("unknown referential action '{}' on '{}'", code, name),
                            )
                        })
                    };
                    let mut fk = ForeignKey::new(
                        columns,
                        local_name(current, &schema, referenced),
                        referenced_columns,
                    )
                    .named(name.clone())
                    .on_delete(action(&on_delete)?)
                    .on_update(action(&on_update)?);
                    if is_deferrable {
                        fk = fk.deferrable(if is_deferred {
                            Deferrable::InitiallyDeferred
                        } else {
                            Deferrable::InitiallyImmediate
                        });
                    }
                    table.foreign_keys.push(fk);
                }
                // Triggers and not-null constraints are reported elsewhere.
                _ => {}
            }
        }
        Ok(())
    }

    async fn read_indices(&self, conn: &mut AnyConnection, oid: i64, table: &TableName) -> Result<Vec<Index>> {
        let kind = self.kind();
        let rows = sqlx::query(INDICES)
            .bind(oid)
            .fetch_all(&mut *conn)
            .await
            .map_err(MigrateError::introspection(kind, format!("indices of '{}'", table)))?;

        let mut indices = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = field(row, "name", kind)?;
            let expressions: i64 = field(row, "expressions", kind)?;
            if expressions > 0 {
                warn!(index = %name, table = %table, "Skipping expression index");
                continue;
            }
            let unique: bool = field(row, "is_unique", kind)?;
            let method: String = field(row, "method", kind)?;
            let predicate: Option<String> = field(row, "predicate", kind)?;
            indices.push(Index {
                name: Some(name),
                columns: split_names(field(row, "columns", kind)?),
                unique,
                predicate: predicate.map(|p| strip_wrapping_parens(&p).to_string()),
                method: (method != "btree" && method != "prefix").then_some(method),
            });
        }
        Ok(indices)
    }

    async fn read_views(&self, conn: &mut AnyConnection, namespace: &str, current: &str) -> Result<Vec<View>> {
        let kind = self.kind();
        let rows = sqlx::query(VIEWS)
            .bind(namespace.to_string())
            .fetch_all(&mut *conn)
            .await
            .map_err(MigrateError::introspection(kind, format!("views of schema '{}'", namespace)))?;

        let mut views = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = field(row, "name", kind)?;
            let definition: Option<String> = field(row, "definition", kind)?;
            let materialized: bool = field(row, "materialized", kind)?;
            let definition = definition.ok_or_else(|| {
                MigrateError::malformed(kind, format!("view '{}' has no readable body", name))
            })?;
            let mut view = View::new(
                local_name(current, namespace, name),
                definition.trim().trim_end_matches(';').trim(),
            );
            view.materialized = materialized;
            views.push(view);
        }
        Ok(views)
    }
}

#[async_trait]
impl Introspector for PostgresIntrospector {
    fn dialect(&self) -> &'static Dialect {
        self.dialect
    }

    async fn snapshot(&self, filter: Option<&[TableName]>) -> Result<Schema> {
        let kind = self.kind();
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(MigrateError::introspection(kind, "acquire a connection"))?;

        let current: String = sqlx::query("SELECT current_schema()::text AS name")
            .fetch_one(&mut *conn)
            .await
            .map_err(MigrateError::introspection(kind, "current schema"))
            .and_then(|row| field(&row, "name", kind))?;

        let mut namespaces = vec![current.clone()];
        for qualifier in filter.unwrap_or_default().iter().filter_map(|t| t.schema.as_ref()) {
            if !namespaces.contains(qualifier) {
                namespaces.push(qualifier.clone());
            }
        }

        let mut schema = Schema::new();
        for namespace in &namespaces {
            let rows = sqlx::query(TABLES)
                .bind(namespace.clone())
                .fetch_all(&mut *conn)
                .await
                .map_err(MigrateError::introspection(kind, format!("tables of schema '{}'", namespace)))?;

            for row in &rows {
                let schema_name: String = field(row, "schema_name", kind)?;
                let table_name: String = field(row, "table_name", kind)?;
                let name = local_name(&current, &schema_name, table_name);
                if !selected(self.dialect, filter, &name) {
                    continue;
                }
                let comment: Option<String> = field(row, "comment", kind)?;
                let oid: i64 = field(row, "oid", kind)?;

                let mut table = Table::new(name);
                table.comment = comment;
                self.read_columns(&mut conn, oid, &mut table).await?;
                self.read_constraints(&mut conn, oid, &current, &mut table).await?;
                table.indices = self.read_indices(&mut conn, oid, &table.name).await?;
                schema.tables.push(table);
            }
            let views = self.read_views(&mut conn, namespace, &current).await?;
            schema.views.extend(views);
        }

        debug!(
            dialect = %kind,
            schema = %current,
            tables = schema.tables.len(),
            views = schema.views.len(),
            "Introspected schema"
        );
        Ok(schema)
    }

    async fn has_table(&self, table: &TableName) -> Result<bool> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(MigrateError::introspection(self.kind(), "acquire a connection"))?;
        table_exists(&mut conn, self.dialect, table).await
    }
}
