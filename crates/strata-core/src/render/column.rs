//! Column definitions and in-place column changes.

use crate::dialect::{quote_literal, Dialect, DialectKind, EnumStyle, Feature};
use crate::error::{Result, SchemaError};
use crate::naming;
use crate::query::Query;
use crate::schema::{Column, ComputedColumn, Generation, StorageMode, TableName};
use crate::validate::validate_column;

pub(crate) fn is_enum(column: &Column) -> bool {
    column.data_type.eq_ignore_ascii_case("enum")
}

fn is_postgres_family(dialect: &Dialect) -> bool {
    matches!(dialect.kind, DialectKind::Postgres | DialectKind::Cockroach)
}

/// Quoted name of the native enum type backing `column`.
pub(crate) fn enum_type_sql(table: &TableName, column: &Column, dialect: &Dialect) -> String {
    let name = dialect.truncate_name(
        &naming::enum_type_name(table, &column.name),
        &table.name,
    );
    match &table.schema {
        Some(schema) => format!(
            "{}.{}",
            dialect.quote_identifier(schema),
            dialect.quote_identifier(&name)
        ),
        None => dialect.quote_identifier(&name),
    }
}

fn enum_value_list(column: &Column, separator: &str) -> String {
    column
        .enum_values
        .iter()
        .map(|v| quote_literal(v))
        .collect::<Vec<_>>()
        .join(separator)
}

pub(crate) fn create_enum_type(table: &TableName, column: &Column, dialect: &Dialect) -> Query {
    Query::new(format!(
        "CREATE TYPE {} AS ENUM({})",
        enum_type_sql(table, column, dialect),
        enum_value_list(column, ", ")
    ))
}

pub(crate) fn drop_enum_type(table: &TableName, column: &Column, dialect: &Dialect) -> Query {
    Query::new(format!("DROP TYPE {}", enum_type_sql(table, column, dialect)))
}

/// Whether `column` is backed by a native enum type on this dialect.
pub(crate) fn has_enum_type(column: &Column, dialect: &Dialect) -> bool {
    is_enum(column) && dialect.enum_style == EnumStyle::NamedType
}

/// Name and body of the CHECK guarding an enum column, on dialects that
/// emulate enums with a string column.
pub(crate) fn enum_check(
    table: &TableName,
    column: &Column,
    dialect: &Dialect,
) -> Option<(String, String)> {
    if !is_enum(column) || dialect.enum_style != EnumStyle::Check {
        return None;
    }
    let name = dialect.truncate_name(&naming::enum_check_name(table, &column.name), &table.name);
    let body = format!(
        "{} IN ({})",
        dialect.quote_identifier(&column.name),
        enum_value_list(column, ", ")
    );
    Some((name, body))
}

/// Spanner only accepts CHECK as a table element.
pub(crate) fn enum_check_is_inline(dialect: &Dialect) -> bool {
    dialect.kind != DialectKind::Spanner
}

/// The column type without any generation-specific spelling.
pub(crate) fn declared_type(table: &TableName, column: &Column, dialect: &Dialect) -> String {
    if is_enum(column) {
        return match dialect.enum_style {
            EnumStyle::NamedType => enum_type_sql(table, column, dialect),
            EnumStyle::Inline => format!("enum({})", enum_value_list(column, ",")),
            EnumStyle::Check => {
                format!("{}({})", dialect.enum_fallback.0, dialect.enum_fallback.1)
            }
        };
    }

    let base = column.data_type.trim();
    if base.contains('(') {
        return base.to_string();
    }
    let normalized = dialect.normalize_type(base);
    if dialect.has_length(&normalized) {
        if let Some(length) = dialect.effective_length(column) {
            return with_arguments(base, &length);
        }
    }
    if dialect.has_precision(&normalized) {
        if let Some(precision) = column.precision {
            return match column.scale {
                Some(scale) => with_arguments(base, &format!("{}, {}", precision, scale)),
                None => with_arguments(base, &precision.to_string()),
            };
        }
    }
    base.to_string()
}

/// Places the argument list after the leading type word, before any
/// `with`/`without time zone` suffix.
fn with_arguments(base: &str, arguments: &str) -> String {
    match base.to_ascii_lowercase().find(" with") {
        Some(at) => format!("{}({}){}", &base[..at], arguments, &base[at..]),
        None => format!("{}({})", base, arguments),
    }
}

/// The type as written in CREATE TABLE / ADD COLUMN.
fn creation_type(table: &TableName, column: &Column, dialect: &Dialect) -> String {
    let normalized = dialect.normalize_type(&column.data_type);
    match (column.generation, dialect.kind) {
        (Some(Generation::Increment), DialectKind::Postgres) => match normalized.as_str() {
            "bigint" => "bigserial".to_string(),
            "smallint" => "smallserial".to_string(),
            _ => "serial".to_string(),
        },
        (Some(Generation::Increment), DialectKind::Cockroach) => match normalized.as_str() {
            "int4" => "serial4".to_string(),
            "int2" => "serial2".to_string(),
            _ => "serial8".to_string(),
        },
        (Some(Generation::Increment | Generation::Rowid), DialectKind::Sqlite) => {
            "integer".to_string()
        }
        _ => declared_type(table, column, dialect),
    }
}

fn collate_clause(collation: &str, dialect: &Dialect) -> String {
    if is_postgres_family(dialect) {
        format!("COLLATE {}", dialect.quote_identifier(collation))
    } else {
        format!("COLLATE {}", collation)
    }
}

fn computed_clause(computed: &ComputedColumn, dialect: &Dialect) -> String {
    let mode = match computed.mode {
        StorageMode::Stored => "STORED",
        StorageMode::Virtual => "VIRTUAL",
    };
    match dialect.kind {
        DialectKind::Postgres | DialectKind::Mysql | DialectKind::Oracle => {
            format!("GENERATED ALWAYS AS ({}) {}", computed.expression, mode)
        }
        DialectKind::SqlServer => match computed.mode {
            StorageMode::Stored => format!("AS ({}) PERSISTED", computed.expression),
            StorageMode::Virtual => format!("AS ({})", computed.expression),
        },
        DialectKind::Sqlite | DialectKind::Cockroach | DialectKind::Spanner => {
            format!("AS ({}) {}", computed.expression, mode)
        }
    }
}

fn identity_clause(column: &Column, dialect: &Dialect) -> Option<&'static str> {
    match (column.generation?, dialect.kind) {
        (Generation::Increment, DialectKind::Mysql) => Some("AUTO_INCREMENT"),
        (Generation::Increment | Generation::Identity, DialectKind::SqlServer) => {
            Some("IDENTITY(1,1)")
        }
        (Generation::Increment, DialectKind::Oracle) => Some("GENERATED BY DEFAULT AS IDENTITY"),
        (Generation::Identity, DialectKind::Oracle) => Some("GENERATED ALWAYS AS IDENTITY"),
        (Generation::Identity, DialectKind::Postgres) => Some("GENERATED BY DEFAULT AS IDENTITY"),
        _ => None,
    }
}

/// The default as it should appear after `DEFAULT`, if any.
///
/// Generated columns get the engine's generator expression; explicit
/// defaults go through `format_default`.
pub(crate) fn default_value(column: &Column, dialect: &Dialect) -> Option<String> {
    if column.computed.is_some() {
        return None;
    }
    match column.generation {
        Some(Generation::Uuid) => {
            return Some(
                match dialect.kind {
                    DialectKind::Mysql => "(UUID())",
                    DialectKind::SqlServer => "NEWSEQUENTIALID()",
                    DialectKind::Spanner => "GENERATE_UUID()",
                    _ => "gen_random_uuid()",
                }
                .to_string(),
            );
        }
        Some(Generation::Rowid) if dialect.kind == DialectKind::Cockroach => {
            return Some("unique_rowid()".to_string());
        }
        Some(_) => return None,
        None => {}
    }
    column
        .default
        .as_deref()
        .and_then(|raw| dialect.format_default(raw))
}

/// Name of the SQL Server default constraint for `column`.
pub(crate) fn default_constraint(table: &TableName, column: &str, dialect: &Dialect) -> String {
    dialect.truncate_name(&naming::default_constraint_name(table, column), &table.name)
}

fn default_clause(table: &TableName, column: &Column, value: &str, dialect: &Dialect) -> String {
    match dialect.kind {
        DialectKind::SqlServer => format!(
            "CONSTRAINT {} DEFAULT {}",
            dialect.quote_identifier(&default_constraint(table, &column.name, dialect)),
            value
        ),
        DialectKind::Sqlite | DialectKind::Spanner => format!("DEFAULT ({})", value),
        _ => format!("DEFAULT {}", value),
    }
}

/// Full column definition as used in CREATE TABLE and ADD COLUMN.
///
/// `inline_primary_key` marks the SQLite rowid alias column, whose
/// `PRIMARY KEY` has to be declared on the column itself.
pub(crate) fn column_definition(
    table: &TableName,
    column: &Column,
    dialect: &Dialect,
    inline_primary_key: bool,
) -> String {
    let mut parts = vec![dialect.quote_identifier(&column.name)];

    if dialect.kind == DialectKind::Spanner {
        parts.push(creation_type(table, column, dialect));
        if !column.nullable {
            parts.push("NOT NULL".to_string());
        }
        if let Some(computed) = &column.computed {
            parts.push(computed_clause(computed, dialect));
        } else if let Some(value) = default_value(column, dialect) {
            parts.push(default_clause(table, column, &value, dialect));
        }
        return parts.join(" ");
    }

    let mssql_computed = dialect.kind == DialectKind::SqlServer && column.computed.is_some();
    if !mssql_computed {
        parts.push(creation_type(table, column, dialect));
    }
    if let Some(collation) = &column.collation {
        parts.push(collate_clause(collation, dialect));
    }
    if let Some(computed) = &column.computed {
        parts.push(computed_clause(computed, dialect));
    }
    if let Some(identity) = identity_clause(column, dialect) {
        parts.push(identity.to_string());
    }
    if inline_primary_key {
        if column.generation == Some(Generation::Increment) {
            parts.push("PRIMARY KEY AUTOINCREMENT".to_string());
        } else {
            parts.push("PRIMARY KEY".to_string());
        }
    }
    if let Some(value) = default_value(column, dialect) {
        parts.push(default_clause(table, column, &value, dialect));
    }
    if !(mssql_computed && column.computed.as_ref().map(|c| c.mode) == Some(StorageMode::Virtual))
    {
        parts.push(if column.nullable { "NULL" } else { "NOT NULL" }.to_string());
    }
    if dialect.kind == DialectKind::Mysql {
        if let Some(comment) = &column.comment {
            parts.push(format!("COMMENT {}", quote_literal(comment)));
        }
    }
    if enum_check_is_inline(dialect) {
        if let Some((name, body)) = enum_check(table, column, dialect) {
            parts.push(format!(
                "CONSTRAINT {} CHECK ({})",
                dialect.quote_identifier(&name),
                body
            ));
        }
    }
    parts.join(" ")
}

/// `COMMENT ON COLUMN` for dialects that keep comments out of the definition.
pub(crate) fn column_comment(table: &TableName, column: &Column, dialect: &Dialect) -> Option<Query> {
    if !dialect.supports(Feature::Comments) || dialect.kind == DialectKind::Mysql {
        return None;
    }
    let value = match (&column.comment, dialect.kind) {
        (Some(comment), _) => quote_literal(comment),
        (None, DialectKind::Oracle) => "''".to_string(),
        (None, _) => "NULL".to_string(),
    };
    Some(Query::new(format!(
        "COMMENT ON COLUMN {}.{} IS {}",
        dialect.quote_table(table),
        dialect.quote_identifier(&column.name),
        value
    )))
}

fn alter_table(table: &TableName, dialect: &Dialect, rest: impl AsRef<str>) -> Query {
    Query::new(format!(
        "ALTER TABLE {} {}",
        dialect.quote_table(table),
        rest.as_ref()
    ))
}

fn add_check_statement(table: &TableName, name: &str, body: &str, dialect: &Dialect) -> Query {
    alter_table(
        table,
        dialect,
        format!(
            "ADD CONSTRAINT {} CHECK ({})",
            dialect.quote_identifier(name),
            body
        ),
    )
}

fn drop_constraint_statement(table: &TableName, name: &str, dialect: &Dialect) -> Query {
    alter_table(
        table,
        dialect,
        format!("DROP CONSTRAINT {}", dialect.quote_identifier(name)),
    )
}

pub(crate) fn add_column(table: &TableName, column: &Column, dialect: &Dialect) -> Result<Vec<Query>> {
    validate_column(table, column, dialect)?;
    let mut queries = Vec::new();
    if has_enum_type(column, dialect) {
        queries.push(create_enum_type(table, column, dialect));
    }
    queries.push(alter_table(
        table,
        dialect,
        format!(
            "{} {}",
            dialect.add_column,
            column_definition(table, column, dialect, false)
        ),
    ));
    if !enum_check_is_inline(dialect) {
        if let Some((name, body)) = enum_check(table, column, dialect) {
            queries.push(add_check_statement(table, &name, &body, dialect));
        }
    }
    if column.comment.is_some() {
        queries.extend(column_comment(table, column, dialect));
    }
    Ok(queries)
}

pub(crate) fn drop_column(table: &TableName, column: &Column, dialect: &Dialect) -> Result<Vec<Query>> {
    let mut queries = Vec::new();
    if dialect.kind == DialectKind::SqlServer && default_value(column, dialect).is_some() {
        let name = default_constraint(table, &column.name, dialect);
        queries.push(drop_constraint_statement(table, &name, dialect));
    }
    if matches!(dialect.kind, DialectKind::SqlServer | DialectKind::Spanner) {
        if let Some((name, _)) = enum_check(table, column, dialect) {
            queries.push(drop_constraint_statement(table, &name, dialect));
        }
    }
    queries.push(alter_table(
        table,
        dialect,
        format!("DROP COLUMN {}", dialect.quote_identifier(&column.name)),
    ));
    if has_enum_type(column, dialect) {
        queries.push(drop_enum_type(table, column, dialect));
    }
    Ok(queries)
}

/// What differs between two definitions of the same column.
#[derive(Debug, Default)]
struct ColumnDelta {
    data_type: bool,
    enum_values: bool,
    nullable: bool,
    default: bool,
    comment: bool,
    collation: bool,
}

impl ColumnDelta {
    fn between(from: &Column, to: &Column, dialect: &Dialect) -> Self {
        let both_enum = is_enum(from) && is_enum(to);
        let data_type = if both_enum {
            false
        } else {
            is_enum(from) != is_enum(to)
                || dialect.normalize_type(&from.data_type) != dialect.normalize_type(&to.data_type)
                || dialect.effective_length(from) != dialect.effective_length(to)
                || from.precision != to.precision
                || from.scale != to.scale
        };
        Self {
            data_type,
            enum_values: both_enum && from.enum_values != to.enum_values,
            nullable: from.nullable != to.nullable,
            default: default_value(from, dialect) != default_value(to, dialect),
            comment: from.comment != to.comment,
            collation: from.collation != to.collation,
        }
    }
}

pub(crate) fn alter_column(
    table: &TableName,
    from: &Column,
    to: &Column,
    dialect: &Dialect,
) -> Result<Vec<Query>> {
    dialect.require(
        Feature::AlterColumn,
        format!("column '{}.{}'", table, to.name),
    )?;
    validate_column(table, to, dialect)?;
    if from.name != to.name {
        return Err(SchemaError::UnsupportedOperation {
            operation: format!("alter column '{}.{}' into '{}'", table, from.name, to.name),
            dialect: dialect.kind,
            reason: "columns are renamed by dropping and adding them".to_string(),
        });
    }
    if from.computed != to.computed || from.generation != to.generation {
        return Err(SchemaError::UnsupportedOperation {
            operation: format!("alter column '{}.{}' in place", table, to.name),
            dialect: dialect.kind,
            reason: "computed expression or generation strategy changed".to_string(),
        });
    }

    let delta = ColumnDelta::between(from, to, dialect);
    let mut queries = match dialect.kind {
        DialectKind::Postgres | DialectKind::Cockroach => {
            alter_postgres(table, from, to, &delta, dialect)
        }
        DialectKind::Mysql => alter_mysql(table, to, dialect),
        DialectKind::SqlServer => alter_sql_server(table, from, to, &delta, dialect),
        DialectKind::Oracle => alter_oracle(table, from, to, &delta, dialect),
        DialectKind::Spanner => alter_spanner(table, from, to, &delta, dialect),
        DialectKind::Sqlite => Vec::new(),
    };
    if delta.comment && dialect.kind != DialectKind::Mysql {
        queries.extend(column_comment(table, to, dialect));
    }
    Ok(queries)
}

fn alter_postgres(
    table: &TableName,
    from: &Column,
    to: &Column,
    delta: &ColumnDelta,
    dialect: &Dialect,
) -> Vec<Query> {
    let mut queries = Vec::new();
    let column = dialect.quote_identifier(&to.name);
    let alter = |rest: String| alter_table(table, dialect, format!("ALTER COLUMN {} {}", column, rest));
    let from_default = default_value(from, dialect);
    let to_default = default_value(to, dialect);
    let mut restore_default = false;

    if delta.enum_values {
        let current = enum_type_sql(table, from, dialect);
        let old_name = dialect.truncate_name(
            &format!("{}_old", naming::enum_type_name(table, &from.name)),
            &table.name,
        );
        queries.push(Query::new(format!(
            "ALTER TYPE {} RENAME TO {}",
            current,
            dialect.quote_identifier(&old_name)
        )));
        queries.push(create_enum_type(table, to, dialect));
        if from_default.is_some() {
            queries.push(alter("DROP DEFAULT".to_string()));
            restore_default = true;
        }
        queries.push(alter(format!(
            "TYPE {} USING {}::text::{}",
            current, column, current
        )));
        let old_qualified = match &table.schema {
            Some(schema) => format!(
                "{}.{}",
                dialect.quote_identifier(schema),
                dialect.quote_identifier(&old_name)
            ),
            None => dialect.quote_identifier(&old_name),
        };
        queries.push(Query::new(format!("DROP TYPE {}", old_qualified)));
    } else if delta.data_type || delta.collation {
        let target = declared_type(table, to, dialect);
        if has_enum_type(to, dialect) {
            queries.push(create_enum_type(table, to, dialect));
        }
        let base_changed = is_enum(from) != is_enum(to)
            || dialect.normalize_type(&from.data_type) != dialect.normalize_type(&to.data_type);
        if base_changed && from_default.is_some() {
            queries.push(alter("DROP DEFAULT".to_string()));
            restore_default = true;
        }
        let mut clause = format!("TYPE {}", target);
        if let Some(collation) = &to.collation {
            clause.push(' ');
            clause.push_str(&collate_clause(collation, dialect));
        }
        if base_changed {
            if has_enum_type(to, dialect) {
                clause.push_str(&format!(" USING {}::text::{}", column, target));
            } else {
                clause.push_str(&format!(" USING {}::{}", column, target));
            }
        }
        queries.push(alter(clause));
        if has_enum_type(from, dialect) {
            queries.push(drop_enum_type(table, from, dialect));
        }
    }

    if delta.nullable {
        queries.push(alter(
            if to.nullable {
                "DROP NOT NULL"
            } else {
                "SET NOT NULL"
            }
            .to_string(),
        ));
    }
    if delta.default || restore_default {
        match &to_default {
            Some(value) => queries.push(alter(format!("SET DEFAULT {}", value))),
            None if delta.default && !restore_default => {
                queries.push(alter("DROP DEFAULT".to_string()));
            }
            None => {}
        }
    }
    queries
}

fn alter_mysql(table: &TableName, to: &Column, dialect: &Dialect) -> Vec<Query> {
    let column = dialect.quote_identifier(&to.name);
    vec![alter_table(
        table,
        dialect,
        format!(
            "CHANGE {} {}",
            column,
            column_definition(table, to, dialect, false)
        ),
    )]
}

fn enum_check_swap(
    table: &TableName,
    from: &Column,
    to: &Column,
    delta: &ColumnDelta,
    dialect: &Dialect,
) -> (Vec<Query>, Vec<Query>) {
    let mut before = Vec::new();
    let mut after = Vec::new();
    let replace = delta.enum_values || delta.data_type;
    if replace {
        if let Some((name, _)) = enum_check(table, from, dialect) {
            before.push(drop_constraint_statement(table, &name, dialect));
        }
        if let Some((name, body)) = enum_check(table, to, dialect) {
            after.push(add_check_statement(table, &name, &body, dialect));
        }
    }
    (before, after)
}

fn alter_sql_server(
    table: &TableName,
    from: &Column,
    to: &Column,
    delta: &ColumnDelta,
    dialect: &Dialect,
) -> Vec<Query> {
    let mut queries = Vec::new();
    let default_name = default_constraint(table, &to.name, dialect);
    let reset_default = delta.default || delta.data_type;
    let (drop_checks, add_checks) = enum_check_swap(table, from, to, delta, dialect);

    if reset_default && default_value(from, dialect).is_some() {
        queries.push(drop_constraint_statement(table, &default_name, dialect));
    }
    queries.extend(drop_checks);
    if delta.data_type || delta.nullable || delta.collation {
        let mut clause = format!(
            "ALTER COLUMN {} {}",
            dialect.quote_identifier(&to.name),
            declared_type(table, to, dialect)
        );
        if let Some(collation) = &to.collation {
            clause.push(' ');
            clause.push_str(&collate_clause(collation, dialect));
        }
        clause.push_str(if to.nullable { " NULL" } else { " NOT NULL" });
        queries.push(alter_table(table, dialect, clause));
    }
    if reset_default {
        if let Some(value) = default_value(to, dialect) {
            queries.push(alter_table(
                table,
                dialect,
                format!(
                    "ADD CONSTRAINT {} DEFAULT {} FOR {}",
                    dialect.quote_identifier(&default_name),
                    value,
                    dialect.quote_identifier(&to.name)
                ),
            ));
        }
    }
    queries.extend(add_checks);
    queries
}

fn alter_oracle(
    table: &TableName,
    from: &Column,
    to: &Column,
    delta: &ColumnDelta,
    dialect: &Dialect,
) -> Vec<Query> {
    let mut queries = Vec::new();
    let (drop_checks, add_checks) = enum_check_swap(table, from, to, delta, dialect);
    queries.extend(drop_checks);

    let mut parts = Vec::new();
    if delta.data_type {
        parts.push(declared_type(table, to, dialect));
    }
    if delta.default {
        parts.push(format!(
            "DEFAULT {}",
            default_value(to, dialect).unwrap_or_else(|| "NULL".to_string())
        ));
    }
    if delta.nullable {
        parts.push(if to.nullable { "NULL" } else { "NOT NULL" }.to_string());
    }
    if !parts.is_empty() {
        queries.push(alter_table(
            table,
            dialect,
            format!(
                "MODIFY {} {}",
                dialect.quote_identifier(&to.name),
                parts.join(" ")
            ),
        ));
    }
    queries.extend(add_checks);
    queries
}

fn alter_spanner(
    table: &TableName,
    from: &Column,
    to: &Column,
    delta: &ColumnDelta,
    dialect: &Dialect,
) -> Vec<Query> {
    let mut queries = Vec::new();
    let column = dialect.quote_identifier(&to.name);
    let (drop_checks, add_checks) = enum_check_swap(table, from, to, delta, dialect);
    queries.extend(drop_checks);
    if delta.data_type || delta.nullable {
        let mut clause = format!("ALTER COLUMN {} {}", column, declared_type(table, to, dialect));
        if !to.nullable {
            clause.push_str(" NOT NULL");
        }
        queries.push(alter_table(table, dialect, clause));
    }
    if delta.default {
        let clause = match default_value(to, dialect) {
            Some(value) => format!("ALTER COLUMN {} SET DEFAULT ({})", column, value),
            None => format!("ALTER COLUMN {} DROP DEFAULT", column),
        };
        queries.push(alter_table(table, dialect, clause));
    }
    queries.extend(add_checks);
    queries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{COCKROACH, MYSQL, ORACLE, POSTGRES, SPANNER, SQLITE, SQL_SERVER};

    fn users() -> TableName {
        TableName::new("users")
    }

    fn sql(queries: &[Query]) -> Vec<&str> {
        queries.iter().map(|q| q.sql.as_str()).collect()
    }

    #[test]
    fn definitions_order_default_before_nullability() {
        let column = Column::new("description", "varchar")
            .length("100")
            .default_value("'x'");
        assert_eq!(
            column_definition(&users(), &column, &POSTGRES, false),
            "\"description\" varchar(100) DEFAULT 'x' NOT NULL"
        );
        assert_eq!(
            column_definition(&users(), &column, &ORACLE, false),
            "\"description\" varchar(100) DEFAULT 'x' NOT NULL"
        );
        assert_eq!(
            column_definition(&users(), &column, &SQLITE, false),
            "\"description\" varchar(100) DEFAULT ('x') NOT NULL"
        );
        assert_eq!(
            column_definition(&users(), &column, &SPANNER, false),
            "`description` varchar(100) NOT NULL DEFAULT ('x')"
        );
    }

    #[test]
    fn generation_strategies_per_dialect() {
        let id = Column::new("id", "int").generated(Generation::Increment);
        assert_eq!(
            column_definition(&users(), &id, &POSTGRES, false),
            "\"id\" serial NOT NULL"
        );
        assert_eq!(
            column_definition(&users(), &id, &MYSQL, false),
            "`id` int AUTO_INCREMENT NOT NULL"
        );
        assert_eq!(
            column_definition(&users(), &id, &SQL_SERVER, false),
            "\"id\" int IDENTITY(1,1) NOT NULL"
        );
        assert_eq!(
            column_definition(&users(), &id, &SQLITE, true),
            "\"id\" integer PRIMARY KEY AUTOINCREMENT NOT NULL"
        );
        assert_eq!(
            column_definition(&users(), &id, &ORACLE, false),
            "\"id\" int GENERATED BY DEFAULT AS IDENTITY NOT NULL"
        );

        let uuid = Column::new("id", "uuid").generated(Generation::Uuid);
        assert_eq!(
            column_definition(&users(), &uuid, &POSTGRES, false),
            "\"id\" uuid DEFAULT gen_random_uuid() NOT NULL"
        );
        assert!(column_definition(&users(), &uuid, &SQL_SERVER, false)
            .contains("DEFAULT NEWSEQUENTIALID()"));
    }

    #[test]
    fn sql_server_defaults_are_named_constraints() {
        let column = Column::new("status", "varchar").default_value("'new'");
        let definition = column_definition(&users(), &column, &SQL_SERVER, false);
        assert!(definition.starts_with("\"status\" varchar(255) CONSTRAINT \"DF_"));
        assert!(definition.ends_with("DEFAULT 'new' NOT NULL"));
    }

    #[test]
    fn temporal_precision_precedes_time_zone_suffix() {
        let at = Column::new("at", "timestamp with time zone").precision(3, None);
        assert_eq!(
            declared_type(&users(), &at, &POSTGRES),
            "timestamp(3) with time zone"
        );
        let at = Column::new("at", "datetime2").precision(7, None);
        assert_eq!(declared_type(&users(), &at, &SQL_SERVER), "datetime2(7)");
        let amount = Column::new("amount", "numeric").precision(10, Some(2));
        assert_eq!(declared_type(&users(), &amount, &POSTGRES), "numeric(10, 2)");
    }

    #[test]
    fn enums_follow_dialect_style() {
        let status = Column::new("status", "enum").enum_values(["new", "done"]);
        assert_eq!(
            column_definition(&users(), &status, &POSTGRES, false),
            "\"status\" \"users_status_enum\" NOT NULL"
        );
        assert_eq!(
            column_definition(&users(), &status, &MYSQL, false),
            "`status` enum('new','done') NOT NULL"
        );
        let on_sqlite = column_definition(&users(), &status, &SQLITE, false);
        assert!(on_sqlite.starts_with("\"status\" varchar(255) NOT NULL CONSTRAINT \"CHK_"));
        assert!(on_sqlite.ends_with("CHECK (\"status\" IN ('new', 'done'))"));
    }

    #[test]
    fn computed_columns_per_dialect() {
        let full = Column::new("full_name", "text")
            .nullable()
            .computed("first || ' ' || last", StorageMode::Stored);
        assert_eq!(
            column_definition(&users(), &full, &POSTGRES, false),
            "\"full_name\" text GENERATED ALWAYS AS (first || ' ' || last) STORED NULL"
        );
        assert_eq!(
            column_definition(&users(), &full, &SQLITE, false),
            "\"full_name\" text AS (first || ' ' || last) STORED NULL"
        );
        assert_eq!(
            column_definition(&users(), &full, &SQL_SERVER, false),
            "\"full_name\" AS (first || ' ' || last) PERSISTED NULL"
        );
    }

    #[test]
    fn add_column_keyword_differs() {
        let column = Column::new("bio", "text").nullable();
        let pg = add_column(&users(), &column, &POSTGRES).unwrap();
        assert_eq!(sql(&pg), vec!["ALTER TABLE \"users\" ADD \"bio\" text NULL"]);
        let lite = add_column(&users(), &column, &SQLITE).unwrap();
        assert_eq!(
            sql(&lite),
            vec!["ALTER TABLE \"users\" ADD COLUMN \"bio\" text NULL"]
        );
    }

    #[test]
    fn postgres_enum_columns_create_and_drop_their_type() {
        let status = Column::new("status", "enum").enum_values(["a", "b"]);
        let up = add_column(&users(), &status, &POSTGRES).unwrap();
        assert_eq!(
            sql(&up),
            vec![
                "CREATE TYPE \"users_status_enum\" AS ENUM('a', 'b')",
                "ALTER TABLE \"users\" ADD \"status\" \"users_status_enum\" NOT NULL",
            ]
        );
        let down = drop_column(&users(), &status, &POSTGRES).unwrap();
        assert_eq!(
            sql(&down),
            vec![
                "ALTER TABLE \"users\" DROP COLUMN \"status\"",
                "DROP TYPE \"users_status_enum\"",
            ]
        );
    }

    #[test]
    fn varchar_growth_alters_type_in_place() {
        let from = Column::new("name", "varchar").length("50");
        let to = Column::new("name", "varchar").length("100");
        assert_eq!(
            sql(&alter_column(&users(), &from, &to, &POSTGRES).unwrap()),
            vec!["ALTER TABLE \"users\" ALTER COLUMN \"name\" TYPE varchar(100)"]
        );
        assert_eq!(
            sql(&alter_column(&users(), &from, &to, &COCKROACH).unwrap()),
            vec!["ALTER TABLE \"users\" ALTER COLUMN \"name\" TYPE varchar(100)"]
        );
        assert_eq!(
            sql(&alter_column(&users(), &from, &to, &MYSQL).unwrap()),
            vec!["ALTER TABLE `users` CHANGE `name` `name` varchar(100) NOT NULL"]
        );
        assert_eq!(
            sql(&alter_column(&users(), &from, &to, &SQL_SERVER).unwrap()),
            vec!["ALTER TABLE \"users\" ALTER COLUMN \"name\" varchar(100) NOT NULL"]
        );
        assert_eq!(
            sql(&alter_column(&users(), &from, &to, &ORACLE).unwrap()),
            vec!["ALTER TABLE \"users\" MODIFY \"name\" varchar(100)"]
        );
        assert_eq!(
            sql(&alter_column(&users(), &from, &to, &SPANNER).unwrap()),
            vec!["ALTER TABLE `users` ALTER COLUMN `name` varchar(100) NOT NULL"]
        );
        assert!(matches!(
            alter_column(&users(), &from, &to, &SQLITE),
            Err(SchemaError::UnsupportedFeature {
                feature: Feature::AlterColumn,
                ..
            })
        ));
    }

    #[test]
    fn postgres_type_change_casts_and_restores_default() {
        let from = Column::new("score", "varchar").default_value("'0'");
        let to = Column::new("score", "int").default_value("0");
        assert_eq!(
            sql(&alter_column(&users(), &from, &to, &POSTGRES).unwrap()),
            vec![
                "ALTER TABLE \"users\" ALTER COLUMN \"score\" DROP DEFAULT",
                "ALTER TABLE \"users\" ALTER COLUMN \"score\" TYPE int USING \"score\"::int",
                "ALTER TABLE \"users\" ALTER COLUMN \"score\" SET DEFAULT 0",
            ]
        );
    }

    #[test]
    fn postgres_enum_value_change_swaps_the_type() {
        let from = Column::new("status", "enum").enum_values(["a", "b"]);
        let to = Column::new("status", "enum").enum_values(["a", "b", "c"]);
        assert_eq!(
            sql(&alter_column(&users(), &from, &to, &POSTGRES).unwrap()),
            vec![
                "ALTER TYPE \"users_status_enum\" RENAME TO \"users_status_enum_old\"",
                "CREATE TYPE \"users_status_enum\" AS ENUM('a', 'b', 'c')",
                "ALTER TABLE \"users\" ALTER COLUMN \"status\" TYPE \"users_status_enum\" USING \"status\"::text::\"users_status_enum\"",
                "DROP TYPE \"users_status_enum_old\"",
            ]
        );
    }

    #[test]
    fn nullability_and_default_changes() {
        let from = Column::new("bio", "text");
        let to = Column::new("bio", "text").nullable().default_value("'-'");
        assert_eq!(
            sql(&alter_column(&users(), &from, &to, &POSTGRES).unwrap()),
            vec![
                "ALTER TABLE \"users\" ALTER COLUMN \"bio\" DROP NOT NULL",
                "ALTER TABLE \"users\" ALTER COLUMN \"bio\" SET DEFAULT '-'",
            ]
        );
        assert_eq!(
            sql(&alter_column(&users(), &from, &to, &ORACLE).unwrap()),
            vec!["ALTER TABLE \"users\" MODIFY \"bio\" DEFAULT '-' NULL"]
        );
        let mssql = alter_column(&users(), &from, &to, &SQL_SERVER).unwrap();
        assert_eq!(mssql.len(), 2);
        assert!(mssql[1].sql.contains("DEFAULT '-' FOR \"bio\""));
    }

    #[test]
    fn generation_change_is_refused() {
        let from = Column::new("id", "int");
        let to = Column::new("id", "int").generated(Generation::Increment);
        assert!(matches!(
            alter_column(&users(), &from, &to, &POSTGRES),
            Err(SchemaError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn sql_server_drop_column_drops_default_first() {
        let column = Column::new("status", "varchar").default_value("'new'");
        let queries = drop_column(&users(), &column, &SQL_SERVER).unwrap();
        assert_eq!(queries.len(), 2);
        assert!(queries[0].sql.starts_with("ALTER TABLE \"users\" DROP CONSTRAINT \"DF_"));
        assert_eq!(queries[1].sql, "ALTER TABLE \"users\" DROP COLUMN \"status\"");
    }
}
