//! Semantic equality of schema objects under a dialect.
//!
//! Two objects are "the same" when the engine would store them the same
//! way: types are compared after alias folding and default lengths,
//! expressions after normalization, index methods with `btree` as the
//! implicit method.

use std::collections::BTreeSet;

use crate::dialect::{Dialect, Feature};
use crate::naming;
use crate::schema::{
    CheckConstraint, Column, ExclusionConstraint, ForeignKey, Index, PrimaryKey, TableName,
    UniqueConstraint,
};

// ================================================================
// Columns
// ================================================================

/// `true` when the stored type differs: type tag, length, precision, scale
/// or enum values.
pub(crate) fn type_changed(from: &Column, to: &Column, dialect: &Dialect) -> bool {
    let from_type = dialect.normalize_type(&from.data_type);
    let to_type = dialect.normalize_type(&to.data_type);
    if from_type != to_type {
        return true;
    }
    if from_type == "enum" {
        return from.enum_values != to.enum_values;
    }
    if dialect.effective_length(from) != dialect.effective_length(to) {
        return true;
    }
    dialect.has_precision(&to_type)
        && dialect.effective_precision(from) != dialect.effective_precision(to)
}

/// `true` when the column can only change by being dropped and re-added.
pub(crate) fn needs_readd(from: &Column, to: &Column, dialect: &Dialect) -> bool {
    if from.generation != to.generation {
        return true;
    }
    match (&from.computed, &to.computed) {
        (None, None) => false,
        (Some(a), Some(b)) => {
            a.mode != b.mode
                || dialect.normalize_expression(&a.expression)
                    != dialect.normalize_expression(&b.expression)
        }
        _ => true,
    }
}

/// `true` when anything an in-place ALTER can change differs.
pub(crate) fn column_changed(from: &Column, to: &Column, dialect: &Dialect) -> bool {
    if type_changed(from, to, dialect) || from.nullable != to.nullable {
        return true;
    }
    let generated = to.generation.is_some() || to.computed.is_some();
    if !generated && !dialect.defaults_equal(from.default.as_deref(), to.default.as_deref()) {
        return true;
    }
    if from.comment != to.comment {
        return true;
    }
    // A collation the model leaves unset is whatever the engine defaults to.
    to.collation.is_some() && from.collation != to.collation
}

// ================================================================
// Keys, indices and constraints
// ================================================================

fn method(index: &Index) -> String {
    index
        .method
        .as_deref()
        .unwrap_or("btree")
        .to_ascii_lowercase()
}

fn predicate(index: &Index, dialect: &Dialect) -> Option<String> {
    index
        .predicate
        .as_deref()
        .map(|p| dialect.normalize_expression(p))
}

pub(crate) fn same_primary_key_columns(from: &PrimaryKey, to: &PrimaryKey) -> bool {
    from.columns == to.columns
}

pub(crate) fn same_index(from: &Index, to: &Index, dialect: &Dialect) -> bool {
    from.columns == to.columns
        && from.unique == to.unique
        && predicate(from, dialect) == predicate(to, dialect)
        && method(from) == method(to)
}

pub(crate) fn same_foreign_key(from: &ForeignKey, to: &ForeignKey, dialect: &Dialect) -> bool {
    let on_update = !dialect.supports(Feature::OnUpdateActions) || from.on_update == to.on_update;
    from.columns == to.columns
        && dialect.table_key(&from.referenced_table) == dialect.table_key(&to.referenced_table)
        && from.referenced_columns == to.referenced_columns
        && from.on_delete == to.on_delete
        && on_update
        && from.deferrable == to.deferrable
}

pub(crate) fn same_unique(from: &UniqueConstraint, to: &UniqueConstraint) -> bool {
    from.columns == to.columns
}

pub(crate) fn same_check(from: &CheckConstraint, to: &CheckConstraint, dialect: &Dialect) -> bool {
    dialect.normalize_expression(&from.expression) == dialect.normalize_expression(&to.expression)
}

pub(crate) fn same_exclusion(
    from: &ExclusionConstraint,
    to: &ExclusionConstraint,
    dialect: &Dialect,
) -> bool {
    dialect.normalize_expression(&from.expression) == dialect.normalize_expression(&to.expression)
}

// ================================================================
// Generated names
// ================================================================

/// The names the naming scheme would give each kind of object, after
/// truncation. An object carrying exactly this name is treated as
/// auto-named, and its name then takes part in its identity.
pub(crate) struct GeneratedNames<'a> {
    table: &'a TableName,
    dialect: &'a Dialect,
}

impl<'a> GeneratedNames<'a> {
    pub(crate) fn new(table: &'a TableName, dialect: &'a Dialect) -> Self {
        Self { table, dialect }
    }

    fn fit(&self, name: String) -> String {
        self.dialect.truncate_name(&name, &self.table.name)
    }

    pub(crate) fn index(&self, index: &Index) -> String {
        let predicate = predicate(index, self.dialect);
        self.fit(naming::index_name(
            self.table,
            &index.columns,
            predicate.as_deref(),
        ))
    }

    pub(crate) fn foreign_key(&self, fk: &ForeignKey) -> String {
        self.fit(naming::foreign_key_name(self.table, &fk.columns))
    }

    pub(crate) fn unique(&self, unique: &UniqueConstraint) -> String {
        self.fit(naming::unique_name(self.table, &unique.columns))
    }

    pub(crate) fn check(&self, check: &CheckConstraint) -> String {
        self.fit(naming::check_name(
            self.table,
            &self.dialect.normalize_expression(&check.expression),
        ))
    }

    pub(crate) fn exclusion(&self, exclusion: &ExclusionConstraint) -> String {
        self.fit(naming::exclusion_name(
            self.table,
            &self.dialect.normalize_expression(&exclusion.expression),
        ))
    }
}

// ================================================================
// Dependencies
// ================================================================

/// `true` when `expression` mentions `word` as a whole identifier,
/// quoted or not, ignoring case.
pub(crate) fn mentions(expression: &str, word: &str) -> bool {
    let haystack = expression.to_ascii_lowercase();
    let needle = word.to_ascii_lowercase();
    if needle.is_empty() {
        return false;
    }
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$';
    let mut start = 0;
    while let Some(found) = haystack[start..].find(&needle) {
        let at = start + found;
        let end = at + needle.len();
        let before = haystack[..at].chars().next_back();
        let after = haystack[end..].chars().next();
        if !before.is_some_and(is_ident) && !after.is_some_and(is_ident) {
            return true;
        }
        start = end;
    }
    false
}

/// `true` when any of `columns` is in `touched`.
pub(crate) fn touches(columns: &[String], touched: &BTreeSet<String>) -> bool {
    columns.iter().any(|c| touched.contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MYSQL, POSTGRES, SQLITE, SQL_SERVER};
    use crate::schema::{Generation, StorageMode};

    #[test]
    fn type_spellings_are_equivalent() {
        let a = Column::new("id", "int4");
        let b = Column::new("id", "integer");
        assert!(!type_changed(&a, &b, &POSTGRES));

        let a = Column::new("flag", "bool");
        let b = Column::new("flag", "boolean");
        assert!(!type_changed(&a, &b, &MYSQL));
    }

    #[test]
    fn default_lengths_are_implicit() {
        let declared = Column::new("name", "varchar");
        let explicit = Column::new("name", "varchar").length("255");
        assert!(!type_changed(&declared, &explicit, &MYSQL));
        assert!(type_changed(&declared, &explicit, &POSTGRES));
    }

    #[test]
    fn numeric_and_decimal_stay_distinct_where_the_engine_keeps_them() {
        let a = Column::new("price", "numeric").precision(10, Some(2));
        let b = Column::new("price", "decimal").precision(10, Some(2));
        assert!(!type_changed(&a, &b, &POSTGRES));
        assert!(type_changed(&a, &b, &SQL_SERVER));
    }

    #[test]
    fn default_spelling_variants_do_not_count() {
        let a = Column::new("description", "varchar")
            .length("255")
            .default_value("'this is description'");
        let b = Column::new("description", "varchar")
            .length("255")
            .default_value("  ('this is description')  ");
        for dialect in [&POSTGRES, &MYSQL, &SQLITE, &SQL_SERVER] {
            assert!(!column_changed(&a, &b, dialect), "{}", dialect);
        }
    }

    #[test]
    fn unset_collation_matches_any() {
        let live = Column::new("name", "text").collation("C");
        let model = Column::new("name", "text");
        assert!(!column_changed(&live, &model, &POSTGRES));
        assert!(column_changed(&model, &live, &POSTGRES));
    }

    #[test]
    fn generation_and_computed_changes_need_readd() {
        let plain = Column::new("id", "int");
        let serial = Column::new("id", "int").generated(Generation::Increment);
        assert!(needs_readd(&plain, &serial, &POSTGRES));

        let a = Column::new("total", "int").computed("price * qty", StorageMode::Stored);
        let b = Column::new("total", "int").computed("(price * qty)", StorageMode::Stored);
        assert!(!needs_readd(&a, &b, &POSTGRES));
        let c = Column::new("total", "int").computed("price * qty", StorageMode::Virtual);
        assert!(needs_readd(&a, &c, &POSTGRES));
    }

    #[test]
    fn index_method_defaults_to_btree() {
        let a = Index::new(["email"]);
        let b = Index::new(["email"]).method("BTREE");
        assert!(same_index(&a, &b, &POSTGRES));
        assert!(!same_index(&a, &Index::new(["email"]).method("gin"), &POSTGRES));
    }

    #[test]
    fn foreign_keys_ignore_update_action_without_support() {
        use crate::dialect::ORACLE;
        use crate::schema::ReferentialAction;
        let a = ForeignKey::new(["user_id"], "user", ["id"]);
        let mut b = a.clone();
        b.on_update = ReferentialAction::Cascade;
        assert!(same_foreign_key(&a, &b, &ORACLE));
        assert!(!same_foreign_key(&a, &b, &POSTGRES));
    }

    #[test]
    fn default_schema_matches_unqualified_reference() {
        let a = ForeignKey::new(["user_id"], TableName::qualified("public", "user"), ["id"]);
        let b = ForeignKey::new(["user_id"], "user", ["id"]);
        assert!(same_foreign_key(&a, &b, &POSTGRES));
    }

    #[test]
    fn mentions_matches_whole_identifiers() {
        assert!(mentions("SELECT * FROM \"user\" u", "user"));
        assert!(mentions("select id from Users", "users"));
        assert!(!mentions("SELECT * FROM user_profile", "user"));
        assert!(!mentions("SELECT * FROM superuser", "user"));
    }
}
