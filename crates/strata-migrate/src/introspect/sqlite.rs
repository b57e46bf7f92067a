//! SQLite introspection.
//!
//! The pragmas report columns, key membership, indices and foreign keys.
//! Constraint names, collations, computed columns, `AUTOINCREMENT` and enum
//! checks only survive in the stored `CREATE TABLE` text, which is parsed
//! here.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use sqlx::{AnyConnection, AnyPool};
use strata_core::dialect::{Dialect, DialectKind, SQLITE};
use strata_core::naming;
use strata_core::schema::{
    CheckConstraint, Column, ComputedColumn, Deferrable, ForeignKey, Generation, Index,
    PrimaryKey, ReferentialAction, Schema, StorageMode, Table, TableName, UniqueConstraint, View,
};
use tracing::{debug, warn};

use super::ddl::{
    balanced_group, identifier_list, leading_identifier, literal_list, mask, split_top_level,
    table_body, unquote_identifier,
};
use super::{field, selected, table_exists, Introspector};
use crate::error::{MigrateError, Result};

const KIND: DialectKind = DialectKind::Sqlite;

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid SQLite DDL regex")
}

static CONSTRAINT_PREFIX: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)^CONSTRAINT\s"));
static TABLE_CONSTRAINT: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)^(PRIMARY\s+KEY|UNIQUE|CHECK|FOREIGN\s+KEY)\b"));
static CHECK: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)(?:\bCONSTRAINT\s+(\S+)\s+)?\bCHECK\s*\("));
static UNIQUE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)(?:\bCONSTRAINT\s+(\S+)\s+)?\bUNIQUE\b"));
static COLLATE: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\bCOLLATE\s+(\S+)"));
static COMPUTED: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)\b(?:GENERATED\s+ALWAYS\s+)?AS\s*\("));
static STORAGE: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)^\s*(STORED|VIRTUAL)\b"));
static AUTOINCREMENT: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\bAUTOINCREMENT\b"));
static PRIMARY_KEY: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\bPRIMARY\s+KEY\b"));
static REFERENCES: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\bREFERENCES\s+"));
static ACTION: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)\bON\s+(DELETE|UPDATE)\s+(SET\s+NULL|SET\s+DEFAULT|CASCADE|RESTRICT|NO\s+ACTION)")
});
static DEFERRABLE: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)\b(NOT\s+)?DEFERRABLE(?:\s+INITIALLY\s+(DEFERRED|IMMEDIATE))?\b")
});
static WITHOUT_ROWID: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\bWITHOUT\s+ROWID\b"));
static ENUM_BODY: LazyLock<Regex> = LazyLock::new(|| {
    regex(r#"(?is)^\s*("(?:[^"]|"")*"|`[^`]*`|\[[^\]]*\]|[A-Za-z_][\w$]*)\s+IN\s*\((.*)\)\s*$"#)
});
static WHERE: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\bWHERE\b"));
static VIEW_AS: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\bAS\b"));
static GENERATED_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)\s+GENERATED\s+ALWAYS\s*$"));

// ============================================================================
// CREATE TABLE text
// ============================================================================

/// What the column definition says beyond its type.
#[derive(Debug, Clone, Default)]
struct ColumnClauses {
    collation: Option<String>,
    computed: Option<ComputedColumn>,
    inline_primary_key: bool,
    autoincrement: bool,
}

/// The parts of a stored `CREATE TABLE` the pragmas do not report.
#[derive(Debug, Default)]
struct CreateTable {
    columns: Vec<(String, ColumnClauses)>,
    uniques: Vec<UniqueConstraint>,
    checks: Vec<CheckConstraint>,
    foreign_keys: Vec<ForeignKey>,
    without_rowid: bool,
}

fn constraint_name(element: &str) -> (Option<String>, &str) {
    match CONSTRAINT_PREFIX.find(element) {
        Some(m) => match leading_identifier(&element[m.end()..]) {
            Some((name, rest)) => (Some(name), rest.trim_start()),
            None => (None, element),
        },
        None => (None, element),
    }
}

fn group_after<'a>(text: &'a str, what: &str) -> std::result::Result<(&'a str, usize), String> {
    text.find('(')
        .and_then(|open| balanced_group(text, open))
        .ok_or_else(|| format!("unbalanced parentheses in {}", what))
}

fn deferrable(masked: &str) -> Option<Deferrable> {
    let caps = DEFERRABLE.captures(masked)?;
    if caps.get(1).is_some() {
        return None;
    }
    match caps.get(2).map(|m| m.as_str().to_ascii_uppercase()) {
        Some(initially) if initially == "DEFERRED" => Some(Deferrable::InitiallyDeferred),
        _ => Some(Deferrable::InitiallyImmediate),
    }
}

fn parse_foreign_key(
    name: Option<String>,
    rest: &str,
) -> std::result::Result<ForeignKey, String> {
    let (columns, end) = group_after(rest, "foreign key columns")?;
    let after = &rest[end..];
    let masked = mask(after);
    let references = REFERENCES
        .find(&masked)
        .ok_or_else(|| "foreign key without REFERENCES".to_string())?;
    let (table, tail) = leading_identifier(&after[references.end()..])
        .ok_or_else(|| "foreign key without a referenced table".to_string())?;
    let tail = tail.trim_start();
    let referenced = match balanced_group(tail, 0) {
        Some((inner, _)) => identifier_list(inner),
        None => Vec::new(),
    };

    let mut fk = ForeignKey::new(identifier_list(columns), TableName::new(table), referenced);
    fk.name = name;
    let masked_tail = mask(tail);
    for caps in ACTION.captures_iter(&masked_tail) {
        let action = ReferentialAction::parse(&caps[2].split_whitespace().collect::<Vec<_>>().join(" "));
        if let Some(action) = action {
            if caps[1].eq_ignore_ascii_case("DELETE") {
                fk.on_delete = action;
            } else {
                fk.on_update = action;
            }
        }
    }
    fk.deferrable = deferrable(&masked_tail);
    Ok(fk)
}

fn parse_table_constraint(
    parsed: &mut CreateTable,
    name: Option<String>,
    rest: &str,
    kind: &str,
) -> std::result::Result<(), String> {
    let kind = kind.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_uppercase();
    match kind.as_str() {
        "UNIQUE" => {
            let (columns, _) = group_after(rest, "unique constraint")?;
            parsed.uniques.push(UniqueConstraint {
                name,
                columns: identifier_list(columns),
            });
        }
        "CHECK" => {
            let (body, _) = group_after(rest, "check constraint")?;
            parsed.checks.push(CheckConstraint {
                name,
                expression: body.trim().to_string(),
            });
        }
        "FOREIGN KEY" => parsed.foreign_keys.push(parse_foreign_key(name, rest)?),
        // Key membership comes from the pragma.
        _ => {}
    }
    Ok(())
}

fn parse_column(
    parsed: &mut CreateTable,
    column: &str,
    definition: &str,
) -> std::result::Result<ColumnClauses, String> {
    let masked = mask(definition);
    let mut clauses = ColumnClauses::default();

    if let Some(name) = COLLATE.captures(&masked).and_then(|c| c.get(1)) {
        clauses.collation = Some(unquote_identifier(&definition[name.range()]));
    }
    if let Some(m) = COMPUTED.find(&masked) {
        let (expression, end) = balanced_group(definition, m.end() - 1)
            .ok_or_else(|| format!("unbalanced computed expression on '{}'", column))?;
        let stored = STORAGE
            .captures(&masked[end..])
            .is_some_and(|c| c[1].eq_ignore_ascii_case("STORED"));
        clauses.computed = Some(ComputedColumn {
            expression: expression.trim().to_string(),
            mode: if stored {
                StorageMode::Stored
            } else {
                StorageMode::Virtual
            },
        });
    }
    clauses.inline_primary_key = PRIMARY_KEY.is_match(&masked);
    clauses.autoincrement = AUTOINCREMENT.is_match(&masked);

    for caps in CHECK.captures_iter(&masked) {
        let name = caps.get(1).map(|g| unquote_identifier(&definition[g.range()]));
        let open = caps.get(0).map_or(0, |m| m.end() - 1);
        let (body, _) = balanced_group(definition, open)
            .ok_or_else(|| format!("unbalanced check on '{}'", column))?;
        parsed.checks.push(CheckConstraint {
            name,
            expression: body.trim().to_string(),
        });
    }
    for caps in UNIQUE.captures_iter(&masked) {
        let name = caps.get(1).map(|g| unquote_identifier(&definition[g.range()]));
        parsed.uniques.push(UniqueConstraint {
            name,
            columns: vec![column.to_string()],
        });
    }
    Ok(clauses)
}

fn parse_create_table(sql: &str) -> std::result::Result<CreateTable, String> {
    let (body, tail) = table_body(sql).ok_or_else(|| "no element list".to_string())?;
    let mut parsed = CreateTable {
        without_rowid: WITHOUT_ROWID.is_match(&mask(tail)),
        ..CreateTable::default()
    };
    for element in split_top_level(body, b',') {
        let (name, rest) = constraint_name(element);
        if let Some(kind) = TABLE_CONSTRAINT.captures(rest) {
            let kind = kind[1].to_string();
            parse_table_constraint(&mut parsed, name, rest, &kind)?;
            continue;
        }
        let (column, definition) = leading_identifier(element)
            .ok_or_else(|| format!("unreadable element '{}'", element))?;
        let clauses = parse_column(&mut parsed, &column, definition)?;
        parsed.columns.push((column, clauses));
    }
    Ok(parsed)
}

/// Column and values of a CHECK that guards an enum column.
fn enum_check(table: &TableName, check: &CheckConstraint) -> Option<(String, Vec<String>)> {
    let caps = ENUM_BODY.captures(&check.expression)?;
    let column = unquote_identifier(&caps[1]);
    let expected = SQLITE.truncate_name(&naming::enum_check_name(table, &column), &table.name);
    if check.name.as_deref() != Some(expected.as_str()) {
        return None;
    }
    Some((column, literal_list(&caps[2])?))
}

/// Turns enum-guarding checks back into enum columns.
fn restore_enums(table: &mut Table) {
    let mut remaining = Vec::new();
    for check in std::mem::take(&mut table.checks) {
        if let Some((name, values)) = enum_check(&table.name, &check) {
            if let Some(column) = table.get_column_mut(&name) {
                column.data_type = "enum".to_string();
                column.length = None;
                column.enum_values = values;
                continue;
            }
        }
        remaining.push(check);
    }
    table.checks = remaining;
}

fn index_predicate(sql: &str) -> Option<String> {
    let masked = mask(sql);
    let found = WHERE.find(&masked)?;
    Some(sql[found.end()..].trim().trim_end_matches(';').trim().to_string())
}

fn view_expression(sql: &str) -> Option<String> {
    let masked = mask(sql);
    let found = VIEW_AS.find(&masked)?;
    Some(sql[found.end()..].trim().trim_end_matches(';').trim().to_string())
}

// ============================================================================
// Catalog
// ============================================================================

/// Introspector over `sqlite_master` and the table pragmas.
pub struct SqliteIntrospector {
    pool: AnyPool,
}

impl SqliteIntrospector {
    /// Creates an introspector over `pool`.
    #[must_use]
    pub const fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    async fn read_table(&self, conn: &mut AnyConnection, name: &str, sql: &str) -> Result<Table> {
        let ddl = parse_create_table(sql)
            .map_err(|detail| MigrateError::malformed(KIND, format!("table '{}': {}", name, detail)))?;
        let mut table = Table::new(name);
        table.without_rowid = ddl.without_rowid;

        let rows = sqlx::query(
            "SELECT name, type, \"notnull\" AS not_null, dflt_value, pk, hidden \
             FROM pragma_table_xinfo(?) ORDER BY cid",
        )
        .bind(name.to_string())
        .fetch_all(&mut *conn)
        .await
        .map_err(MigrateError::introspection(KIND, format!("columns of '{}'", name)))?;

        let mut key: Vec<(i64, String)> = Vec::new();
        for row in &rows {
            let hidden: i64 = field(row, "hidden", KIND)?;
            if hidden == 1 {
                continue;
            }
            let column_name: String = field(row, "name", KIND)?;
            let declared: Option<String> = field(row, "type", KIND)?;
            let not_null: i64 = field(row, "not_null", KIND)?;
            let default: Option<String> = field(row, "dflt_value", KIND)?;
            let pk: i64 = field(row, "pk", KIND)?;

            let declared = declared.unwrap_or_default();
            let decl = SQLITE.split_type(&GENERATED_SUFFIX.replace(&declared, ""));
            let mut column = Column::new(column_name.clone(), decl.data_type);
            column.length = decl.length;
            column.precision = decl.precision;
            column.scale = decl.scale;
            column.nullable = not_null == 0;
            column.default = default.as_deref().and_then(|raw| SQLITE.parse_default(raw));

            let clauses = ddl
                .columns
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(&column_name))
                .map(|(_, c)| c.clone())
                .unwrap_or_default();
            column.collation = clauses.collation;
            column.computed = clauses.computed;
            if clauses.inline_primary_key {
                if clauses.autoincrement {
                    column.generation = Some(Generation::Increment);
                } else if column.data_type == "integer" {
                    column.generation = Some(Generation::Rowid);
                }
            }
            if hidden >= 2 && column.computed.is_none() {
                return Err(MigrateError::malformed(
                    KIND,
                    format!(
                        "generated column '{}' of '{}' has no readable expression",
                        column_name, name
                    ),
                ));
            }
            if column.computed.is_some() || column.generation.is_some() {
                column.default = None;
            }
            if pk > 0 {
                key.push((pk, column_name));
            }
            table.columns.push(column);
        }
        if !key.is_empty() {
            key.sort_by_key(|(position, _)| *position);
            table.primary_key = Some(PrimaryKey::new(key.into_iter().map(|(_, c)| c)));
        }

        table.uniques = ddl.uniques;
        table.checks = ddl.checks;
        table.foreign_keys = self.read_foreign_keys(conn, name, &ddl.foreign_keys).await?;
        table.indices = self.read_indices(conn, name).await?;
        restore_enums(&mut table);
        Ok(table)
    }

    async fn read_foreign_keys(
        &self,
        conn: &mut AnyConnection,
        table: &str,
        declared: &[ForeignKey],
    ) -> Result<Vec<ForeignKey>> {
        let rows = sqlx::query(
            "SELECT id, \"table\" AS ref_table, \"from\" AS from_col, \"to\" AS to_col, \
             on_update, on_delete FROM pragma_foreign_key_list(?) ORDER BY id, seq",
        )
        .bind(table.to_string())
        .fetch_all(&mut *conn)
        .await
        .map_err(MigrateError::introspection(KIND, format!("foreign keys of '{}'", table)))?;

        let action = |raw: &str| {
            ReferentialAction::parse(raw).ok_or_else(|| {
                MigrateError::malformed(
                    KIND,
                    format!("unknown referential action '{}' on '{}'", raw, table),
                )
            })
        };

        let mut groups: Vec<(i64, ForeignKey)> = Vec::new();
        for row in &rows {
            let id: i64 = field(row, "id", KIND)?;
            let from: String = field(row, "from_col", KIND)?;
            let to: Option<String> = field(row, "to_col", KIND)?;
            match groups.last_mut() {
                Some((group, fk)) if *group == id => {
                    fk.columns.push(from);
                    fk.referenced_columns.extend(to);
                }
                _ => {
                    let referenced: String = field(row, "ref_table", KIND)?;
                    let on_update: String = field(row, "on_update", KIND)?;
                    let on_delete: String = field(row, "on_delete", KIND)?;
                    let mut fk = ForeignKey::new([from], referenced.as_str(), to.into_iter().collect::<Vec<String>>());
                    fk.on_update = action(&on_update)?;
                    fk.on_delete = action(&on_delete)?;
                    groups.push((id, fk));
                }
            }
        }

        let mut foreign_keys: Vec<(usize, ForeignKey)> = Vec::new();
        for (_, mut fk) in groups {
            let position = declared.iter().position(|d| {
                d.columns == fk.columns
                    && d.referenced_table.name.eq_ignore_ascii_case(&fk.referenced_table.name)
            });
            if let Some(position) = position {
                let source = &declared[position];
                fk.name = source.name.clone();
                fk.deferrable = source.deferrable;
                if fk.referenced_columns.is_empty() {
                    fk.referenced_columns = source.referenced_columns.clone();
                }
            }
            if fk.referenced_columns.is_empty() {
                return Err(MigrateError::malformed(
                    KIND,
                    format!(
                        "foreign key on '{}' ({}) does not name its referenced columns",
                        table,
                        fk.columns.join(", ")
                    ),
                ));
            }
            foreign_keys.push((position.unwrap_or(usize::MAX), fk));
        }
        foreign_keys.sort_by_key(|(position, _)| *position);
        Ok(foreign_keys.into_iter().map(|(_, fk)| fk).collect())
    }

    async fn read_indices(&self, conn: &mut AnyConnection, table: &str) -> Result<Vec<Index>> {
        let rows = sqlx::query(
            "SELECT name, \"unique\" AS is_unique, origin, partial FROM pragma_index_list(?)",
        )
        .bind(table.to_string())
        .fetch_all(&mut *conn)
        .await
        .map_err(MigrateError::introspection(KIND, format!("indices of '{}'", table)))?;

        let mut indices = Vec::new();
        for row in &rows {
            let origin: String = field(row, "origin", KIND)?;
            if origin != "c" {
                continue;
            }
            let name: String = field(row, "name", KIND)?;
            let unique: i64 = field(row, "is_unique", KIND)?;
            let partial: i64 = field(row, "partial", KIND)?;

            let column_rows = sqlx::query("SELECT name FROM pragma_index_info(?) ORDER BY seqno")
                .bind(name.clone())
                .fetch_all(&mut *conn)
                .await
                .map_err(MigrateError::introspection(KIND, format!("columns of index '{}'", name)))?;
            let mut columns = Vec::with_capacity(column_rows.len());
            for column_row in &column_rows {
                let column: Option<String> = field(column_row, "name", KIND)?;
                columns.push(column);
            }
            let Some(columns) = columns.into_iter().collect::<Option<Vec<String>>>() else {
                warn!(index = %name, table = %table, "Skipping expression index");
                continue;
            };

            let predicate = if partial == 0 {
                None
            } else {
                let sql: Option<String> = sqlx::query(
                    "SELECT sql FROM sqlite_master WHERE type = 'index' AND name = ?",
                )
                .bind(name.clone())
                .fetch_one(&mut *conn)
                .await
                .map_err(MigrateError::introspection(KIND, format!("definition of index '{}'", name)))
                .and_then(|row| field(&row, "sql", KIND))?;
                sql.as_deref().and_then(index_predicate)
            };

            indices.push(Index {
                name: Some(name),
                columns,
                unique: unique != 0,
                predicate,
                method: None,
            });
        }
        indices.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(indices)
    }

    async fn read_views(&self, conn: &mut AnyConnection) -> Result<Vec<View>> {
        let rows = sqlx::query("SELECT name, sql FROM sqlite_master WHERE type = 'view' ORDER BY name")
            .fetch_all(&mut *conn)
            .await
            .map_err(MigrateError::introspection(KIND, "views"))?;
        let mut views = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = field(row, "name", KIND)?;
            let sql: Option<String> = field(row, "sql", KIND)?;
            let expression = sql.as_deref().and_then(view_expression).ok_or_else(|| {
                MigrateError::malformed(KIND, format!("view '{}' has no readable body", name))
            })?;
            views.push(View::new(name, expression));
        }
        Ok(views)
    }
}

#[async_trait]
impl Introspector for SqliteIntrospector {
    fn dialect(&self) -> &'static Dialect {
        &SQLITE
    }

    async fn snapshot(&self, filter: Option<&[TableName]>) -> Result<Schema> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(MigrateError::introspection(KIND, "acquire a connection"))?;

        let rows = sqlx::query(
            "SELECT name, sql FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' ORDER BY name",
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(MigrateError::introspection(KIND, "tables"))?;

        let mut schema = Schema::new();
        for row in &rows {
            let name: String = field(row, "name", KIND)?;
            if !selected(&SQLITE, filter, &TableName::new(name.as_str())) {
                continue;
            }
            let sql: Option<String> = field(row, "sql", KIND)?;
            let sql = sql.ok_or_else(|| {
                MigrateError::malformed(KIND, format!("table '{}' has no stored definition", name))
            })?;
            let table = self.read_table(&mut conn, &name, &sql).await?;
            schema.tables.push(table);
        }
        schema.views = self.read_views(&mut conn).await?;

        debug!(
            tables = schema.tables.len(),
            views = schema.views.len(),
            "Introspected SQLite schema"
        );
        Ok(schema)
    }

    async fn has_table(&self, table: &TableName) -> Result<bool> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(MigrateError::introspection(KIND, "acquire a connection"))?;
        table_exists(&mut conn, &SQLITE, table).await
    }
}
