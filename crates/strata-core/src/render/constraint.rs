//! Keys, indices and table constraints.

use crate::dialect::{Dialect, DialectKind, Feature};
use crate::error::{Result, SchemaError};
use crate::naming;
use crate::query::Query;
use crate::schema::{
    CheckConstraint, ExclusionConstraint, ForeignKey, Index, PrimaryKey, ReferentialAction,
    TableName, UniqueConstraint,
};

fn fit(name: String, table: &TableName, dialect: &Dialect) -> String {
    dialect.truncate_name(&name, &table.name)
}

pub(crate) fn primary_key_name(table: &TableName, pk: &PrimaryKey, dialect: &Dialect) -> String {
    let name = pk
        .name
        .clone()
        .unwrap_or_else(|| naming::primary_key_name(table, &pk.columns));
    fit(name, table, dialect)
}

pub(crate) fn index_name(table: &TableName, index: &Index, dialect: &Dialect) -> String {
    let name = index.name.clone().unwrap_or_else(|| {
        let predicate = index
            .predicate
            .as_deref()
            .map(|p| dialect.normalize_expression(p));
        naming::index_name(table, &index.columns, predicate.as_deref())
    });
    fit(name, table, dialect)
}

pub(crate) fn unique_name(table: &TableName, unique: &UniqueConstraint, dialect: &Dialect) -> String {
    let name = unique
        .name
        .clone()
        .unwrap_or_else(|| naming::unique_name(table, &unique.columns));
    fit(name, table, dialect)
}

pub(crate) fn check_name(table: &TableName, check: &CheckConstraint, dialect: &Dialect) -> String {
    let name = check.name.clone().unwrap_or_else(|| {
        naming::check_name(table, &dialect.normalize_expression(&check.expression))
    });
    fit(name, table, dialect)
}

pub(crate) fn exclusion_name(
    table: &TableName,
    exclusion: &ExclusionConstraint,
    dialect: &Dialect,
) -> String {
    let name = exclusion.name.clone().unwrap_or_else(|| {
        naming::exclusion_name(table, &dialect.normalize_expression(&exclusion.expression))
    });
    fit(name, table, dialect)
}

pub(crate) fn foreign_key_name(table: &TableName, fk: &ForeignKey, dialect: &Dialect) -> String {
    let name = fk
        .name
        .clone()
        .unwrap_or_else(|| naming::foreign_key_name(table, &fk.columns));
    fit(name, table, dialect)
}

fn alter_table(table: &TableName, dialect: &Dialect, rest: impl AsRef<str>) -> Query {
    Query::new(format!(
        "ALTER TABLE {} {}",
        dialect.quote_table(table),
        rest.as_ref()
    ))
}

fn require_alter_constraints(table: &TableName, dialect: &Dialect, what: &str) -> Result<()> {
    dialect.require(
        Feature::AlterConstraints,
        format!("{} on existing table '{}'", what, table),
    )
}

// ============================================================================
// Table elements (CREATE TABLE bodies)
// ============================================================================

/// `PRIMARY KEY (...)`, named where the engine keeps the name.
pub(crate) fn primary_key_element(table: &TableName, pk: &PrimaryKey, dialect: &Dialect) -> String {
    if dialect.supports(Feature::NamedPrimaryKeys) {
        format!(
            "CONSTRAINT {} PRIMARY KEY ({})",
            dialect.quote_identifier(&primary_key_name(table, pk, dialect)),
            dialect.quote_list(&pk.columns)
        )
    } else {
        format!("PRIMARY KEY ({})", dialect.quote_list(&pk.columns))
    }
}

pub(crate) fn unique_element(
    table: &TableName,
    unique: &UniqueConstraint,
    dialect: &Dialect,
) -> String {
    let name = dialect.quote_identifier(&unique_name(table, unique, dialect));
    let columns = dialect.quote_list(&unique.columns);
    if dialect.kind == DialectKind::Mysql {
        format!("UNIQUE INDEX {} ({})", name, columns)
    } else {
        format!("CONSTRAINT {} UNIQUE ({})", name, columns)
    }
}

pub(crate) fn check_element(table: &TableName, check: &CheckConstraint, dialect: &Dialect) -> String {
    format!(
        "CONSTRAINT {} CHECK ({})",
        dialect.quote_identifier(&check_name(table, check, dialect)),
        check.expression
    )
}

pub(crate) fn exclusion_element(
    table: &TableName,
    exclusion: &ExclusionConstraint,
    dialect: &Dialect,
) -> String {
    format!(
        "CONSTRAINT {} EXCLUDE {}",
        dialect.quote_identifier(&exclusion_name(table, exclusion, dialect)),
        exclusion.expression
    )
}

pub(crate) fn foreign_key_element(table: &TableName, fk: &ForeignKey, dialect: &Dialect) -> String {
    let mut sql = format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        dialect.quote_identifier(&foreign_key_name(table, fk, dialect)),
        dialect.quote_list(&fk.columns),
        dialect.quote_table(&fk.referenced_table),
        dialect.quote_list(&fk.referenced_columns)
    );
    let omit_delete = dialect.kind == DialectKind::Oracle && fk.on_delete == ReferentialAction::NoAction;
    if !omit_delete {
        sql.push_str(&format!(" ON DELETE {}", fk.on_delete));
    }
    if dialect.supports(Feature::OnUpdateActions) {
        sql.push_str(&format!(" ON UPDATE {}", fk.on_update));
    }
    if let Some(deferrable) = fk.deferrable {
        sql.push(' ');
        sql.push_str(deferrable.as_sql());
    }
    sql
}

// ============================================================================
// Indices
// ============================================================================

pub(crate) fn create_index(table: &TableName, index: &Index, dialect: &Dialect) -> Result<Query> {
    let context = format!("index on '{}'", table);
    if index.predicate.is_some() {
        dialect.require(Feature::PartialIndexes, context.clone())?;
    }
    if index.method.is_some() {
        dialect.require(Feature::IndexMethods, context)?;
    }
    let mut sql = format!(
        "CREATE {}INDEX {} ON {}",
        if index.unique { "UNIQUE " } else { "" },
        dialect.quote_identifier(&index_name(table, index, dialect)),
        dialect.quote_table(table)
    );
    if let Some(method) = &index.method {
        sql.push_str(&format!(" USING {}", method));
    }
    sql.push_str(&format!(" ({})", dialect.quote_list(&index.columns)));
    if let Some(predicate) = &index.predicate {
        sql.push_str(&format!(" WHERE {}", predicate));
    }
    Ok(Query::new(sql))
}

pub(crate) fn drop_index(table: &TableName, index: &Index, dialect: &Dialect) -> Query {
    let name = dialect.quote_identifier(&index_name(table, index, dialect));
    let sql = match dialect.kind {
        DialectKind::Postgres => match &table.schema {
            Some(schema) => format!("DROP INDEX {}.{}", dialect.quote_identifier(schema), name),
            None => format!("DROP INDEX {}", name),
        },
        DialectKind::Cockroach => format!("DROP INDEX {}@{}", dialect.quote_table(table), name),
        DialectKind::Mysql | DialectKind::SqlServer => {
            format!("DROP INDEX {} ON {}", name, dialect.quote_table(table))
        }
        DialectKind::Oracle | DialectKind::Sqlite | DialectKind::Spanner => {
            format!("DROP INDEX {}", name)
        }
    };
    Query::new(sql)
}

// ============================================================================
// Constraints on existing tables
// ============================================================================

pub(crate) fn add_unique(
    table: &TableName,
    unique: &UniqueConstraint,
    dialect: &Dialect,
) -> Result<Query> {
    let name = dialect.quote_identifier(&unique_name(table, unique, dialect));
    let columns = dialect.quote_list(&unique.columns);
    if dialect.kind == DialectKind::Spanner {
        return Ok(Query::new(format!(
            "CREATE UNIQUE INDEX {} ON {} ({})",
            name,
            dialect.quote_table(table),
            columns
        )));
    }
    require_alter_constraints(table, dialect, "unique constraint")?;
    Ok(alter_table(
        table,
        dialect,
        format!("ADD {}", unique_element(table, unique, dialect)),
    ))
}

pub(crate) fn drop_unique(
    table: &TableName,
    unique: &UniqueConstraint,
    dialect: &Dialect,
) -> Result<Query> {
    let name = dialect.quote_identifier(&unique_name(table, unique, dialect));
    match dialect.kind {
        DialectKind::Spanner => Ok(Query::new(format!("DROP INDEX {}", name))),
        DialectKind::Mysql => Ok(alter_table(table, dialect, format!("DROP INDEX {}", name))),
        _ => {
            require_alter_constraints(table, dialect, "unique constraint")?;
            Ok(alter_table(table, dialect, format!("DROP CONSTRAINT {}", name)))
        }
    }
}

pub(crate) fn add_check(table: &TableName, check: &CheckConstraint, dialect: &Dialect) -> Result<Query> {
    dialect.require(Feature::CheckConstraints, format!("check on '{}'", table))?;
    require_alter_constraints(table, dialect, "check constraint")?;
    Ok(alter_table(
        table,
        dialect,
        format!("ADD {}", check_element(table, check, dialect)),
    ))
}

pub(crate) fn drop_check(
    table: &TableName,
    check: &CheckConstraint,
    dialect: &Dialect,
) -> Result<Query> {
    dialect.require(Feature::CheckConstraints, format!("check on '{}'", table))?;
    require_alter_constraints(table, dialect, "check constraint")?;
    Ok(alter_table(
        table,
        dialect,
        format!(
            "DROP CONSTRAINT {}",
            dialect.quote_identifier(&check_name(table, check, dialect))
        ),
    ))
}

pub(crate) fn add_exclusion(
    table: &TableName,
    exclusion: &ExclusionConstraint,
    dialect: &Dialect,
) -> Result<Query> {
    dialect.require(
        Feature::ExclusionConstraints,
        format!("exclusion on '{}'", table),
    )?;
    Ok(alter_table(
        table,
        dialect,
        format!("ADD {}", exclusion_element(table, exclusion, dialect)),
    ))
}

pub(crate) fn drop_exclusion(
    table: &TableName,
    exclusion: &ExclusionConstraint,
    dialect: &Dialect,
) -> Result<Query> {
    dialect.require(
        Feature::ExclusionConstraints,
        format!("exclusion on '{}'", table),
    )?;
    Ok(alter_table(
        table,
        dialect,
        format!(
            "DROP CONSTRAINT {}",
            dialect.quote_identifier(&exclusion_name(table, exclusion, dialect))
        ),
    ))
}

pub(crate) fn add_foreign_key(table: &TableName, fk: &ForeignKey, dialect: &Dialect) -> Result<Query> {
    require_alter_constraints(table, dialect, "foreign key")?;
    Ok(alter_table(
        table,
        dialect,
        format!("ADD {}", foreign_key_element(table, fk, dialect)),
    ))
}

pub(crate) fn drop_foreign_key(table: &TableName, fk: &ForeignKey, dialect: &Dialect) -> Result<Query> {
    require_alter_constraints(table, dialect, "foreign key")?;
    let name = dialect.quote_identifier(&foreign_key_name(table, fk, dialect));
    let clause = if dialect.kind == DialectKind::Mysql {
        format!("DROP FOREIGN KEY {}", name)
    } else {
        format!("DROP CONSTRAINT {}", name)
    };
    Ok(alter_table(table, dialect, clause))
}

pub(crate) fn add_primary_key(table: &TableName, pk: &PrimaryKey, dialect: &Dialect) -> Result<Query> {
    require_alter_constraints(table, dialect, "primary key")?;
    Ok(alter_table(
        table,
        dialect,
        format!("ADD {}", primary_key_element(table, pk, dialect)),
    ))
}

pub(crate) fn drop_primary_key(table: &TableName, pk: &PrimaryKey, dialect: &Dialect) -> Result<Query> {
    if !dialect.supports(Feature::DropPrimaryKey) {
        return Err(SchemaError::UnsupportedOperation {
            operation: format!("drop the primary key of '{}'", table),
            dialect: dialect.kind,
            reason: "primary keys cannot be dropped on this engine".to_string(),
        });
    }
    let clause = if dialect.supports(Feature::NamedPrimaryKeys) {
        format!(
            "DROP CONSTRAINT {}",
            dialect.quote_identifier(&primary_key_name(table, pk, dialect))
        )
    } else {
        "DROP PRIMARY KEY".to_string()
    };
    Ok(alter_table(table, dialect, clause))
}

pub(crate) fn rename_primary_key(
    table: &TableName,
    from: &str,
    to: &str,
    dialect: &Dialect,
) -> Result<Query> {
    dialect.require(
        Feature::RenameConstraint,
        format!("primary key of '{}'", table),
    )?;
    let from = fit(from.to_string(), table, dialect);
    let to = fit(to.to_string(), table, dialect);
    if dialect.kind == DialectKind::SqlServer {
        let qualified = match &table.schema {
            Some(schema) => format!("{}.{}", schema, from),
            None => from,
        };
        return Ok(Query::new(format!(
            "EXEC sp_rename N'{}', N'{}', N'OBJECT'",
            qualified.replace('\'', "''"),
            to.replace('\'', "''")
        )));
    }
    Ok(alter_table(
        table,
        dialect,
        format!(
            "RENAME CONSTRAINT {} TO {}",
            dialect.quote_identifier(&from),
            dialect.quote_identifier(&to)
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{COCKROACH, MYSQL, ORACLE, POSTGRES, SPANNER, SQLITE, SQL_SERVER};

    fn post() -> TableName {
        TableName::new("post")
    }

    #[test]
    fn foreign_key_clauses_follow_dialect_actions() {
        let fk = ForeignKey::new(["user_id"], "user", ["id"])
            .named("FK_post_user")
            .on_delete(ReferentialAction::Cascade);
        assert_eq!(
            add_foreign_key(&post(), &fk, &POSTGRES).unwrap().sql,
            "ALTER TABLE \"post\" ADD CONSTRAINT \"FK_post_user\" FOREIGN KEY (\"user_id\") REFERENCES \"user\" (\"id\") ON DELETE CASCADE ON UPDATE NO ACTION"
        );
        assert_eq!(
            add_foreign_key(&post(), &fk, &ORACLE).unwrap().sql,
            "ALTER TABLE \"post\" ADD CONSTRAINT \"FK_post_user\" FOREIGN KEY (\"user_id\") REFERENCES \"user\" (\"id\") ON DELETE CASCADE"
        );
        let plain = ForeignKey::new(["user_id"], "user", ["id"]).named("FK_x");
        assert!(!add_foreign_key(&post(), &plain, &ORACLE)
            .unwrap()
            .sql
            .contains("ON DELETE"));
        assert_eq!(
            drop_foreign_key(&post(), &fk, &MYSQL).unwrap().sql,
            "ALTER TABLE `post` DROP FOREIGN KEY `FK_post_user`"
        );
        assert!(matches!(
            add_foreign_key(&post(), &fk, &SQLITE),
            Err(SchemaError::UnsupportedFeature {
                feature: Feature::AlterConstraints,
                ..
            })
        ));
    }

    #[test]
    fn drop_index_syntax_varies() {
        let index = Index::new(["title"]).named("IDX_title");
        assert_eq!(drop_index(&post(), &index, &POSTGRES).sql, "DROP INDEX \"IDX_title\"");
        assert_eq!(
            drop_index(&TableName::qualified("blog", "post"), &index, &POSTGRES).sql,
            "DROP INDEX \"blog\".\"IDX_title\""
        );
        assert_eq!(
            drop_index(&post(), &index, &COCKROACH).sql,
            "DROP INDEX \"post\"@\"IDX_title\""
        );
        assert_eq!(
            drop_index(&post(), &index, &MYSQL).sql,
            "DROP INDEX `IDX_title` ON `post`"
        );
        assert_eq!(
            drop_index(&post(), &index, &SQL_SERVER).sql,
            "DROP INDEX \"IDX_title\" ON \"post\""
        );
    }

    #[test]
    fn create_index_with_method_and_predicate() {
        let index = Index::new(["tags"])
            .named("IDX_tags")
            .method("gin")
            .predicate("deleted_at IS NULL");
        assert_eq!(
            create_index(&post(), &index, &POSTGRES).unwrap().sql,
            "CREATE INDEX \"IDX_tags\" ON \"post\" USING gin (\"tags\") WHERE deleted_at IS NULL"
        );
        assert!(create_index(&post(), &index, &MYSQL).is_err());
    }

    #[test]
    fn unnamed_index_gets_generated_name() {
        let index = Index::new(["name", "email"]);
        assert_eq!(
            create_index(&TableName::new("users"), &index, &SQLITE)
                .unwrap()
                .sql,
            "CREATE INDEX \"IDX_d852abf0705b35ff56face9183\" ON \"users\" (\"name\", \"email\")"
        );
    }

    #[test]
    fn uniques_per_dialect() {
        let unique = UniqueConstraint::new(["slug"]).named("UQ_slug");
        assert_eq!(
            add_unique(&post(), &unique, &POSTGRES).unwrap().sql,
            "ALTER TABLE \"post\" ADD CONSTRAINT \"UQ_slug\" UNIQUE (\"slug\")"
        );
        assert_eq!(
            add_unique(&post(), &unique, &MYSQL).unwrap().sql,
            "ALTER TABLE `post` ADD UNIQUE INDEX `UQ_slug` (`slug`)"
        );
        assert_eq!(
            drop_unique(&post(), &unique, &MYSQL).unwrap().sql,
            "ALTER TABLE `post` DROP INDEX `UQ_slug`"
        );
        assert_eq!(
            add_unique(&post(), &unique, &SPANNER).unwrap().sql,
            "CREATE UNIQUE INDEX `UQ_slug` ON `post` (`slug`)"
        );
    }

    #[test]
    fn primary_keys_per_dialect() {
        let pk = PrimaryKey::new(["id"]).named("PK_post");
        assert_eq!(
            add_primary_key(&post(), &pk, &POSTGRES).unwrap().sql,
            "ALTER TABLE \"post\" ADD CONSTRAINT \"PK_post\" PRIMARY KEY (\"id\")"
        );
        assert_eq!(
            add_primary_key(&post(), &pk, &MYSQL).unwrap().sql,
            "ALTER TABLE `post` ADD PRIMARY KEY (`id`)"
        );
        assert_eq!(
            drop_primary_key(&post(), &pk, &MYSQL).unwrap().sql,
            "ALTER TABLE `post` DROP PRIMARY KEY"
        );
        assert!(matches!(
            drop_primary_key(&post(), &pk, &COCKROACH),
            Err(SchemaError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn primary_key_renames() {
        assert_eq!(
            rename_primary_key(&post(), "PK_1", "PK_2", &POSTGRES).unwrap().sql,
            "ALTER TABLE \"post\" RENAME CONSTRAINT \"PK_1\" TO \"PK_2\""
        );
        assert_eq!(
            rename_primary_key(&TableName::qualified("dbo", "post"), "PK_1", "PK_2", &SQL_SERVER)
                .unwrap()
                .sql,
            "EXEC sp_rename N'dbo.PK_1', N'PK_2', N'OBJECT'"
        );
        assert!(rename_primary_key(&post(), "PK_1", "PK_2", &MYSQL).is_err());
    }

    #[test]
    fn checks_are_refused_on_mysql() {
        let check = CheckConstraint::new("views >= 0").named("CHK_views");
        assert_eq!(
            add_check(&post(), &check, &POSTGRES).unwrap().sql,
            "ALTER TABLE \"post\" ADD CONSTRAINT \"CHK_views\" CHECK (views >= 0)"
        );
        assert!(matches!(
            add_check(&post(), &check, &MYSQL),
            Err(SchemaError::UnsupportedFeature {
                feature: Feature::CheckConstraints,
                ..
            })
        ));
    }
}
