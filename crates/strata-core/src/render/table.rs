//! CREATE / DROP / rebuild of whole tables, views and table comments.

use crate::dialect::{quote_literal, Dialect, DialectKind, Feature};
use crate::error::Result;
use crate::naming::resolve_names;
use crate::query::Query;
use crate::schema::{Generation, Table, TableName, View};
use crate::validate::validate_table;

use super::column::{
    column_comment, column_definition, create_enum_type, drop_enum_type, enum_check,
    enum_check_is_inline, has_enum_type,
};
use super::constraint::{
    check_element, create_index, drop_index, exclusion_element, foreign_key_element,
    primary_key_element, unique_element, unique_name,
};

/// The SQLite column that aliases the rowid and therefore declares
/// `PRIMARY KEY` inline.
fn rowid_alias(table: &Table, dialect: &Dialect) -> Option<String> {
    if dialect.kind != DialectKind::Sqlite {
        return None;
    }
    let pk = table.primary_key.as_ref()?;
    if pk.columns.len() != 1 {
        return None;
    }
    let column = table.get_column(&pk.columns[0])?;
    matches!(
        column.generation,
        Some(Generation::Increment | Generation::Rowid)
    )
    .then(|| column.name.clone())
}

fn table_comment(name: &TableName, comment: Option<&str>, dialect: &Dialect) -> Query {
    if dialect.kind == DialectKind::Mysql {
        return Query::new(format!(
            "ALTER TABLE {} COMMENT = {}",
            dialect.quote_table(name),
            quote_literal(comment.unwrap_or(""))
        ));
    }
    let value = match (comment, dialect.kind) {
        (Some(text), _) => quote_literal(text),
        (None, DialectKind::Oracle) => "''".to_string(),
        (None, _) => "NULL".to_string(),
    };
    Query::new(format!(
        "COMMENT ON TABLE {} IS {}",
        dialect.quote_table(name),
        value
    ))
}

/// Renders CREATE TABLE plus the statements the table needs around it
/// (enum types before, indices and comments after).
pub(crate) fn create_table(table: &Table, dialect: &Dialect) -> Result<Vec<Query>> {
    validate_table(table, dialect)?;
    let table = resolve_names(table, dialect);
    let name = &table.name;
    let mut queries = Vec::new();

    for column in table.columns.iter().filter(|c| has_enum_type(c, dialect)) {
        queries.push(create_enum_type(name, column, dialect));
    }

    let inline_pk = rowid_alias(&table, dialect);
    let mut elements: Vec<String> = table
        .columns
        .iter()
        .map(|c| column_definition(name, c, dialect, inline_pk.as_deref() == Some(c.name.as_str())))
        .collect();

    let spanner = dialect.kind == DialectKind::Spanner;
    if let Some(pk) = &table.primary_key {
        if inline_pk.is_none() && !spanner {
            elements.push(primary_key_element(name, pk, dialect));
        }
    }
    if !spanner {
        elements.extend(table.uniques.iter().map(|u| unique_element(name, u, dialect)));
    }
    elements.extend(table.checks.iter().map(|c| check_element(name, c, dialect)));
    if !enum_check_is_inline(dialect) {
        for column in &table.columns {
            if let Some((check, body)) = enum_check(name, column, dialect) {
                elements.push(format!(
                    "CONSTRAINT {} CHECK ({})",
                    dialect.quote_identifier(&check),
                    body
                ));
            }
        }
    }
    elements.extend(
        table
            .exclusions
            .iter()
            .map(|x| exclusion_element(name, x, dialect)),
    );
    elements.extend(
        table
            .foreign_keys
            .iter()
            .map(|fk| foreign_key_element(name, fk, dialect)),
    );

    let mut sql = format!(
        "CREATE TABLE {} ({})",
        dialect.quote_table(name),
        elements.join(", ")
    );
    if spanner {
        let columns = table
            .primary_key
            .as_ref()
            .map(|pk| dialect.quote_list(&pk.columns))
            .unwrap_or_default();
        sql.push_str(&format!(" PRIMARY KEY ({})", columns));
    }
    if table.without_rowid {
        sql.push_str(" WITHOUT ROWID");
    }
    if dialect.kind == DialectKind::Mysql {
        if let Some(engine) = &table.engine {
            sql.push_str(&format!(" ENGINE={}", engine));
        }
        if let Some(comment) = &table.comment {
            sql.push_str(&format!(" COMMENT={}", quote_literal(comment)));
        }
    }
    queries.push(Query::new(sql));

    if spanner {
        for unique in &table.uniques {
            queries.push(Query::new(format!(
                "CREATE UNIQUE INDEX {} ON {} ({})",
                dialect.quote_identifier(&unique_name(name, unique, dialect)),
                dialect.quote_table(name),
                dialect.quote_list(&unique.columns)
            )));
        }
    }
    for index in &table.indices {
        queries.push(create_index(name, index, dialect)?);
    }

    if dialect.supports(Feature::Comments) && dialect.kind != DialectKind::Mysql {
        if table.comment.is_some() {
            queries.push(table_comment(name, table.comment.as_deref(), dialect));
        }
        for column in table.columns.iter().filter(|c| c.comment.is_some()) {
            queries.extend(column_comment(name, column, dialect));
        }
    }
    Ok(queries)
}

pub(crate) fn drop_table(table: &Table, dialect: &Dialect) -> Result<Vec<Query>> {
    let table = resolve_names(table, dialect);
    let name = &table.name;
    let mut queries = Vec::new();

    if dialect.kind == DialectKind::Spanner {
        for index in &table.indices {
            queries.push(drop_index(name, index, dialect));
        }
        for unique in &table.uniques {
            queries.push(Query::new(format!(
                "DROP INDEX {}",
                dialect.quote_identifier(&unique_name(name, unique, dialect))
            )));
        }
    }
    queries.push(Query::new(format!("DROP TABLE {}", dialect.quote_table(name))));
    for column in table.columns.iter().filter(|c| has_enum_type(c, dialect)) {
        queries.push(drop_enum_type(name, column, dialect));
    }
    Ok(queries)
}

/// Name of the scratch table used while rebuilding `name`.
fn scratch_name(name: &TableName) -> TableName {
    TableName {
        schema: name.schema.clone(),
        name: format!("temporary_{}", name.name),
    }
}

/// Rebuilds a table: create the new shape under a scratch name, copy the
/// surviving columns, drop the old table, rename, re-create indices.
pub(crate) fn recreate_table(from: &Table, to: &Table, dialect: &Dialect) -> Result<Vec<Query>> {
    validate_table(to, dialect)?;
    let to = resolve_names(to, dialect);
    let scratch = scratch_name(&to.name);

    let mut staged = to.clone();
    staged.name = scratch.clone();
    staged.indices.clear();
    let mut queries = create_table(&staged, dialect)?;

    let common: Vec<String> = to
        .columns
        .iter()
        .filter(|c| c.computed.is_none())
        .filter(|c| {
            from.get_column(&c.name)
                .is_some_and(|old| old.computed.is_none())
        })
        .map(|c| c.name.clone())
        .collect();
    if !common.is_empty() {
        let columns = dialect.quote_list(&common);
        queries.push(Query::new(format!(
            "INSERT INTO {}({}) SELECT {} FROM {}",
            dialect.quote_table(&scratch),
            columns,
            columns,
            dialect.quote_table(&from.name)
        )));
    }
    queries.push(Query::new(format!(
        "DROP TABLE {}",
        dialect.quote_table(&from.name)
    )));
    queries.push(Query::new(format!(
        "ALTER TABLE {} RENAME TO {}",
        dialect.quote_table(&scratch),
        dialect.quote_identifier(&to.name.name)
    )));
    for index in &to.indices {
        queries.push(create_index(&to.name, index, dialect)?);
    }
    Ok(queries)
}

fn view_keyword(view: &View) -> &'static str {
    if view.materialized {
        "MATERIALIZED VIEW"
    } else {
        "VIEW"
    }
}

pub(crate) fn create_view(view: &View, dialect: &Dialect) -> Result<Query> {
    dialect.require(Feature::Views, format!("view '{}'", view.name))?;
    if view.materialized {
        dialect.require(Feature::MaterializedViews, format!("view '{}'", view.name))?;
    }
    Ok(Query::new(format!(
        "CREATE {} {} AS {}",
        view_keyword(view),
        dialect.quote_table(&view.name),
        view.expression.trim()
    )))
}

pub(crate) fn drop_view(view: &View, dialect: &Dialect) -> Result<Query> {
    dialect.require(Feature::Views, format!("view '{}'", view.name))?;
    Ok(Query::new(format!(
        "DROP {} {}",
        view_keyword(view),
        dialect.quote_table(&view.name)
    )))
}

pub(crate) fn set_table_comment(
    table: &TableName,
    comment: Option<&str>,
    dialect: &Dialect,
) -> Result<Query> {
    dialect.require(Feature::Comments, format!("table '{}'", table))?;
    Ok(table_comment(table, comment, dialect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MYSQL, POSTGRES, SPANNER, SQLITE};
    use crate::schema::{Column, ForeignKey, Index, PrimaryKey, UniqueConstraint};

    fn sql(queries: &[Query]) -> Vec<&str> {
        queries.iter().map(|q| q.sql.as_str()).collect()
    }

    fn post() -> Table {
        Table::new("post")
            .column(Column::new("id", "integer").generated(Generation::Increment))
            .column(Column::new("title", "varchar").length("200"))
            .column(Column::new("user_id", "integer"))
            .primary_key(PrimaryKey::new(["id"]).named("PK_post"))
            .index(Index::new(["title"]).named("IDX_post_title"))
            .foreign_key(ForeignKey::new(["user_id"], "user", ["id"]).named("FK_post_user"))
    }

    #[test]
    fn sqlite_table_with_inline_rowid_key_and_foreign_key() {
        let queries = create_table(&post(), &SQLITE).unwrap();
        assert_eq!(
            sql(&queries),
            vec![
                "CREATE TABLE \"post\" (\"id\" integer PRIMARY KEY AUTOINCREMENT NOT NULL, \"title\" varchar(200) NOT NULL, \"user_id\" integer NOT NULL, CONSTRAINT \"FK_post_user\" FOREIGN KEY (\"user_id\") REFERENCES \"user\" (\"id\") ON DELETE NO ACTION ON UPDATE NO ACTION)",
                "CREATE INDEX \"IDX_post_title\" ON \"post\" (\"title\")",
            ]
        );
    }

    #[test]
    fn postgres_table_has_named_primary_key() {
        let mut table = post();
        table.foreign_keys.clear();
        let queries = create_table(&table, &POSTGRES).unwrap();
        assert_eq!(
            queries[0].sql,
            "CREATE TABLE \"post\" (\"id\" serial NOT NULL, \"title\" varchar(200) NOT NULL, \"user_id\" integer NOT NULL, CONSTRAINT \"PK_post\" PRIMARY KEY (\"id\"))"
        );
        assert_eq!(queries.len(), 2);
    }

    #[test]
    fn spanner_primary_key_follows_the_column_list() {
        let table = Table::new("singers")
            .column(Column::new("id", "int64"))
            .column(Column::new("name", "string").nullable())
            .primary_key(PrimaryKey::new(["id"]))
            .unique(UniqueConstraint::new(["name"]).named("UQ_name"));
        let queries = create_table(&table, &SPANNER).unwrap();
        assert_eq!(
            sql(&queries),
            vec![
                "CREATE TABLE `singers` (`id` int64 NOT NULL, `name` string(MAX)) PRIMARY KEY (`id`)",
                "CREATE UNIQUE INDEX `UQ_name` ON `singers` (`name`)",
            ]
        );
        let down = drop_table(&table, &SPANNER).unwrap();
        assert_eq!(
            sql(&down),
            vec!["DROP INDEX `UQ_name`", "DROP TABLE `singers`"]
        );
    }

    #[test]
    fn mysql_table_options() {
        let table = Table::new("logs")
            .column(Column::new("id", "int").primary())
            .engine("InnoDB")
            .comment("audit trail");
        assert_eq!(
            create_table(&table, &MYSQL).unwrap()[0].sql,
            "CREATE TABLE `logs` (`id` int NOT NULL, PRIMARY KEY (`id`)) ENGINE=InnoDB COMMENT='audit trail'"
        );
    }

    #[test]
    fn postgres_comments_are_separate_statements() {
        let table = Table::new("logs")
            .column(Column::new("id", "int").comment("row id"))
            .comment("audit trail");
        assert_eq!(
            sql(&create_table(&table, &POSTGRES).unwrap()),
            vec![
                "CREATE TABLE \"logs\" (\"id\" int NOT NULL)",
                "COMMENT ON TABLE \"logs\" IS 'audit trail'",
                "COMMENT ON COLUMN \"logs\".\"id\" IS 'row id'",
            ]
        );
    }

    #[test]
    fn recreate_copies_surviving_columns() {
        let from = Table::new("users")
            .column(Column::new("id", "integer"))
            .column(Column::new("name", "varchar").length("50"))
            .column(Column::new("legacy", "text").nullable())
            .primary_key(PrimaryKey::new(["id"]))
            .index(Index::new(["name"]).named("IDX_name"));
        let to = Table::new("users")
            .column(Column::new("id", "integer"))
            .column(Column::new("name", "varchar").length("100"))
            .primary_key(PrimaryKey::new(["id"]))
            .index(Index::new(["name"]).named("IDX_name"));
        assert_eq!(
            sql(&recreate_table(&from, &to, &SQLITE).unwrap()),
            vec![
                "CREATE TABLE \"temporary_users\" (\"id\" integer NOT NULL, \"name\" varchar(100) NOT NULL, PRIMARY KEY (\"id\"))",
                "INSERT INTO \"temporary_users\"(\"id\", \"name\") SELECT \"id\", \"name\" FROM \"users\"",
                "DROP TABLE \"users\"",
                "ALTER TABLE \"temporary_users\" RENAME TO \"users\"",
                "CREATE INDEX \"IDX_name\" ON \"users\" (\"name\")",
            ]
        );
    }

    #[test]
    fn views_and_materialized_views() {
        let view = View::new("active_users", " SELECT * FROM users WHERE active ");
        assert_eq!(
            create_view(&view, &POSTGRES).unwrap().sql,
            "CREATE VIEW \"active_users\" AS SELECT * FROM users WHERE active"
        );
        let materialized = view.materialized();
        assert_eq!(
            drop_view(&materialized, &POSTGRES).unwrap().sql,
            "DROP MATERIALIZED VIEW \"active_users\""
        );
        assert!(create_view(&materialized, &MYSQL).is_err());
    }
}
