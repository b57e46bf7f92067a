//! Dialect capability checks for a desired model.
//!
//! Structural checks live on the model itself ([`Schema::validate`]); this
//! module adds everything that depends on the target engine. A model that
//! asks for something the engine cannot do is rejected up front instead of
//! being silently approximated.

use crate::dialect::{Dialect, Feature};
use crate::error::{Result, SchemaError};
use crate::schema::{
    Column, Generation, ReferentialAction, Schema, StorageMode, Table, TableName, View,
};

/// Validates `schema` structurally and against the capabilities of `dialect`.
pub fn validate_schema(schema: &Schema, dialect: &Dialect) -> Result<()> {
    schema.validate()?;
    for table in &schema.tables {
        validate_table(table, dialect)?;
    }
    for view in &schema.views {
        validate_view(view, dialect)?;
    }
    Ok(())
}

/// Validates a single table against `dialect`.
pub fn validate_table(table: &Table, dialect: &Dialect) -> Result<()> {
    let pk_columns = table
        .effective_primary_key()
        .map(|pk| pk.columns)
        .unwrap_or_default();

    for column in &table.columns {
        validate_column(&table.name, column, dialect)?;
        let auto_increment = matches!(
            column.generation,
            Some(Generation::Increment | Generation::Rowid)
        );
        if auto_increment && (pk_columns.len() != 1 || pk_columns[0] != column.name) {
            dialect.require(
                Feature::CompositeAutoIncrement,
                format!("auto-increment column '{}.{}'", table.name, column.name),
            )?;
        }
    }

    if table.comment.is_some() {
        dialect.require(Feature::Comments, format!("table '{}'", table.name))?;
    }
    if table.without_rowid {
        dialect.require(Feature::WithoutRowid, format!("table '{}'", table.name))?;
    }

    for index in &table.indices {
        let context = format!("index on '{}' ({})", table.name, index.columns.join(", "));
        if index.predicate.is_some() {
            dialect.require(Feature::PartialIndexes, context.clone())?;
        }
        if index.method.is_some() {
            dialect.require(Feature::IndexMethods, context)?;
        }
    }
    if !table.checks.is_empty() {
        dialect.require(
            Feature::CheckConstraints,
            format!("check constraint on '{}'", table.name),
        )?;
    }
    if !table.exclusions.is_empty() {
        dialect.require(
            Feature::ExclusionConstraints,
            format!("exclusion constraint on '{}'", table.name),
        )?;
    }

    for fk in &table.foreign_keys {
        let context = format!(
            "foreign key '{}' ({}) -> '{}'",
            table.name,
            fk.columns.join(", "),
            fk.referenced_table
        );
        if fk.deferrable.is_some() {
            dialect.require(Feature::DeferrableConstraints, context.clone())?;
        }
        dialect.require(Feature::DeleteAction(fk.on_delete), context.clone())?;
        if fk.on_update != ReferentialAction::NoAction {
            dialect.require(Feature::OnUpdateActions, context.clone())?;
            dialect.require(Feature::UpdateAction(fk.on_update), context)?;
        }
    }
    Ok(())
}

/// Validates one column's generation, computation, comment and collation
/// against `dialect`.
pub fn validate_column(table: &TableName, column: &Column, dialect: &Dialect) -> Result<()> {
    let context = format!("column '{}.{}'", table, column.name);

    if let Some(generation) = column.generation {
        dialect.require(Feature::Generation(generation), context.clone())?;
    }
    if let Some(computed) = &column.computed {
        if !dialect.supports_computed(computed.mode) {
            let feature = match computed.mode {
                StorageMode::Stored => Feature::StoredComputedColumns,
                StorageMode::Virtual => Feature::VirtualComputedColumns,
            };
            dialect.require(feature, context.clone())?;
        }
        if column.generation.is_some() {
            return Err(SchemaError::InvalidModel(format!(
                "{} cannot be both computed and generated",
                context
            )));
        }
    }
    if column.comment.is_some() {
        dialect.require(Feature::Comments, context.clone())?;
    }
    if column.collation.is_some() {
        dialect.require(Feature::Collations, context)?;
    }
    Ok(())
}

fn validate_view(view: &View, dialect: &Dialect) -> Result<()> {
    let context = format!("view '{}'", view.name);
    dialect.require(Feature::Views, context.clone())?;
    if view.materialized {
        dialect.require(Feature::MaterializedViews, context)?;
    }
    if view.expression.trim().is_empty() {
        return Err(SchemaError::InvalidModel(format!(
            "view '{}' has an empty definition",
            view.name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{DialectKind, COCKROACH, MYSQL, ORACLE, POSTGRES, SPANNER, SQLITE};
    use crate::schema::{
        CheckConstraint, Deferrable, ExclusionConstraint, ForeignKey, Index, PrimaryKey,
    };

    fn users() -> Table {
        Table::new("users")
            .column(Column::new("id", "int").primary().generated(Generation::Increment))
            .column(Column::new("age", "int"))
    }

    #[test]
    fn accepts_portable_table_everywhere_it_can_be_generated() {
        for dialect in [&POSTGRES, &MYSQL, &SQLITE, &ORACLE, &COCKROACH] {
            validate_table(&users(), dialect).unwrap();
        }
    }

    #[test]
    fn rejects_increment_on_spanner() {
        let err = validate_table(&users(), &SPANNER).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnsupportedFeature {
                feature: Feature::Generation(Generation::Increment),
                dialect: DialectKind::Spanner,
                ..
            }
        ));
    }

    #[test]
    fn sqlite_autoincrement_must_be_sole_key() {
        let table = Table::new("pairs")
            .column(Column::new("a", "integer").generated(Generation::Increment))
            .column(Column::new("b", "integer"))
            .primary_key(PrimaryKey::new(["a", "b"]));
        let err = validate_table(&table, &SQLITE).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnsupportedFeature {
                feature: Feature::CompositeAutoIncrement,
                ..
            }
        ));
        validate_table(&table, &POSTGRES).unwrap();

        let unkeyed = Table::new("counters")
            .column(Column::new("n", "integer").generated(Generation::Increment));
        assert!(validate_table(&unkeyed, &SQLITE).is_err());
    }

    #[test]
    fn rejects_checks_on_mysql() {
        let table = users().check(CheckConstraint::new("age > 0"));
        let err = validate_table(&table, &MYSQL).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnsupportedFeature {
                feature: Feature::CheckConstraints,
                ..
            }
        ));
    }

    #[test]
    fn rejects_exclusions_outside_postgres() {
        let table = users().exclusion(ExclusionConstraint::new("USING gist (age WITH =)"));
        validate_table(&table, &POSTGRES).unwrap();
        assert!(validate_table(&table, &COCKROACH).is_err());
    }

    #[test]
    fn rejects_virtual_computed_on_postgres() {
        let table = users()
            .column(Column::new("double_age", "int").computed("age * 2", StorageMode::Virtual));
        let err = validate_table(&table, &POSTGRES).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnsupportedFeature {
                feature: Feature::VirtualComputedColumns,
                ..
            }
        ));
    }

    #[test]
    fn rejects_partial_index_on_mysql() {
        let table = users().index(Index::new(["age"]).predicate("age > 18"));
        assert!(validate_table(&table, &MYSQL).is_err());
        validate_table(&table, &SQLITE).unwrap();
    }

    #[test]
    fn rejects_restrict_on_oracle_and_deferrable_on_mysql() {
        let orders = Table::new("orders")
            .column(Column::new("id", "int").primary())
            .column(Column::new("user_id", "int"));
        let restrict = orders.clone().foreign_key(
            ForeignKey::new(["user_id"], "users", ["id"]).on_delete(ReferentialAction::Restrict),
        );
        let err = validate_table(&restrict, &ORACLE).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnsupportedFeature {
                feature: Feature::DeleteAction(ReferentialAction::Restrict),
                dialect: DialectKind::Oracle,
                context: "foreign key 'orders' (user_id) -> 'users'".to_string(),
            }
        );
        validate_table(&restrict, &POSTGRES).unwrap();

        let on_update = orders.clone().foreign_key(
            ForeignKey::new(["user_id"], "users", ["id"]).on_update(ReferentialAction::Cascade),
        );
        assert!(matches!(
            validate_table(&on_update, &ORACLE).unwrap_err(),
            SchemaError::UnsupportedFeature { .. }
        ));

        let deferred = orders.foreign_key(
            ForeignKey::new(["user_id"], "users", ["id"]).deferrable(Deferrable::InitiallyDeferred),
        );
        assert!(validate_table(&deferred, &MYSQL).is_err());
        validate_table(&deferred, &POSTGRES).unwrap();
    }

    #[test]
    fn rejects_materialized_views_on_mysql() {
        let schema = Schema::new()
            .table(users())
            .view(View::new("adults", "SELECT * FROM users WHERE age >= 18").materialized());
        assert!(validate_schema(&schema, &MYSQL).is_err());
        validate_schema(&schema, &POSTGRES).unwrap();
    }
}
