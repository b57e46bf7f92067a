//! Schema diff engine.
//!
//! [`diff`] compares a desired [`Schema`] against the live one and produces
//! the ordered list of [`Change`]s that turns the live schema into the
//! desired one. Each change carries its inverse, so the same list drives
//! both directions of a migration.
//!
//! Changes come out in an order every supported engine accepts:
//!
//! 1. views, foreign keys, indices, checks, exclusions, uniques and primary
//!    keys that go away or must be rebuilt are dropped;
//! 2. tables are created (in foreign-key dependency order), columns are
//!    dropped, added and altered, SQLite tables are rebuilt, primary keys
//!    are added and tables are dropped (in reverse dependency order);
//! 3. indices, checks, exclusions and uniques are created, then foreign keys
//!    in dependency order of their owning table, then views;
//! 4. primary keys are renamed and table comments set.

mod compare;
mod order;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::dialect::{Dialect, Feature};
use crate::error::{Result, SchemaError};
use crate::naming::resolve_names;
use crate::operation::{Change, Operation};
use crate::query::SqlInMemory;
use crate::render::render_changes;
use crate::schema::{Column, ForeignKey, Schema, Table, TableName, View};
use crate::validate::validate_schema;

use compare::{
    column_changed, mentions, needs_readd, same_check, same_exclusion, same_foreign_key,
    same_index, same_primary_key_columns, same_unique, touches, type_changed, GeneratedNames,
};

/// Minimum normalized similarity score (0.0–1.0) for a
/// (dropped, added) column pair to be flagged as a possible rename.
const RENAME_SIMILARITY_THRESHOLD: f64 = 0.4;

// ================================================================
// String similarity helpers
// ================================================================

/// Computes the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let n = b.len();
    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[n]
}

/// Returns a normalized similarity score in `[0.0, 1.0]`.
/// 1.0 means identical, 0.0 means completely different.
fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein(a, b) as f64 / max_len as f64)
}

// ================================================================
// Public types
// ================================================================

/// Something the diff noticed but did not act on.
///
/// Warnings never change the operation list. A dropped and an added object
/// with the same shape and a similar name may really be a rename; the
/// generated migration drops and re-adds it, and the caller decides whether
/// to hand-edit that.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiffWarning {
    /// A dropped and an added column share a type and have similar names.
    PossibleColumnRename {
        /// Owning table.
        table: TableName,
        /// The column that is dropped.
        old_column: String,
        /// The column that is added.
        new_column: String,
        /// Name similarity score (0.0–1.0).
        similarity: f64,
    },
    /// A dropped and a created table have the same columns.
    PossibleTableRename {
        /// The table that is dropped.
        old_table: TableName,
        /// The table that is created.
        new_table: TableName,
        /// Name similarity score (0.0–1.0).
        similarity: f64,
    },
}

impl fmt::Display for DiffWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PossibleColumnRename {
                table,
                old_column,
                new_column,
                similarity,
            } => write!(
                f,
                "Column '{}.{}' is dropped and '{}' added; possible rename ({:.2})",
                table, old_column, new_column, similarity
            ),
            Self::PossibleTableRename {
                old_table,
                new_table,
                similarity,
            } => write!(
                f,
                "Table '{}' is dropped and '{}' created with the same columns; possible rename ({:.2})",
                old_table, new_table, similarity
            ),
        }
    }
}

/// Result of comparing two schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaDiff {
    /// Ordered changes; applying every `up` in order reaches the desired
    /// schema.
    pub changes: Vec<Change>,
    /// Non-fatal observations.
    pub warnings: Vec<DiffWarning>,
}

impl SchemaDiff {
    /// Returns `true` when the schemas already match. Warnings alone do not
    /// make a diff non-empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Forward operations in execution order.
    #[must_use]
    pub fn up_operations(&self) -> Vec<&Operation> {
        self.changes.iter().map(|c| &c.up).collect()
    }

    /// Backward operations in execution order (last change undone first).
    #[must_use]
    pub fn down_operations(&self) -> Vec<&Operation> {
        self.changes.iter().rev().map(|c| &c.down).collect()
    }

    /// Returns `true` if applying the diff can lose data.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        self.changes.iter().any(|c| c.up.is_destructive())
    }

    /// Renders every change for `dialect`.
    pub fn to_sql(&self, dialect: &Dialect) -> Result<SqlInMemory> {
        render_changes(&self.changes, dialect)
    }
}

// ================================================================
// Schema-level diff
// ================================================================

/// Compares `desired` against `actual` and returns the changes that
/// migrate `actual` to `desired` on `dialect`.
///
/// The desired model is validated against the dialect first; anything the
/// engine cannot express fails the whole diff. Both sides have their
/// generated names filled in before comparison, and tables in the dialect's
/// default schema compare equal to unqualified ones.
pub fn diff(desired: &Schema, actual: &Schema, dialect: &Dialect) -> Result<SchemaDiff> {
    validate_schema(desired, dialect)?;

    let wanted: Vec<Table> = desired
        .tables
        .iter()
        .map(|t| prepare_table(t, dialect))
        .collect();
    let live: Vec<Table> = actual
        .tables
        .iter()
        .map(|t| prepare_table(t, dialect))
        .collect();
    check_name_collisions(&wanted)?;

    let wanted_refs: Vec<&Table> = wanted.iter().collect();
    let live_refs: Vec<&Table> = live.iter().collect();
    let wanted_by_name: BTreeMap<&TableName, &Table> =
        wanted.iter().map(|t| (&t.name, t)).collect();
    let live_by_name: BTreeMap<&TableName, &Table> = live.iter().map(|t| (&t.name, t)).collect();

    let creation_order = order::dependency_order(&wanted_refs);
    let mut differ = Differ::new(dialect, order::ranks(&creation_order));

    // ---- New tables ---------------------------------------------
    let created: Vec<&Table> = creation_order
        .iter()
        .filter(|name| !live_by_name.contains_key(name))
        .filter_map(|name| wanted_by_name.get(name).copied())
        .collect();
    for table in &created {
        differ.create_table(table);
    }

    // ---- Removed tables, dependents first -----------------------
    let dropped: Vec<&Table> = order::dependency_order(&live_refs)
        .iter()
        .rev()
        .filter(|name| !wanted_by_name.contains_key(name))
        .filter_map(|name| live_by_name.get(name).copied())
        .collect();
    for table in &dropped {
        differ.drop_table(table);
    }
    differ.table_rename_warnings(&dropped, &created);

    // ---- Existing tables ----------------------------------------
    let common: Vec<(&Table, &Table)> = creation_order
        .iter()
        .filter_map(|name| Some((*live_by_name.get(name)?, *wanted_by_name.get(name)?)))
        .collect();
    // Column and key changes first: constraint rebuilds in other tables
    // depend on which columns were touched here.
    for (from, to) in &common {
        differ.diff_columns(from, to)?;
    }
    for (from, to) in &common {
        differ.diff_constraints(from, to);
    }

    differ.diff_views(&desired.views, &actual.views);

    let warnings = differ.warnings;
    let changes = differ.plan.into_changes();
    debug!(
        dialect = %dialect,
        changes = changes.len(),
        warnings = warnings.len(),
        "Schema diff computed"
    );
    Ok(SchemaDiff { changes, warnings })
}

/// Resolves generated names and strips the default schema so both sides
/// key tables the same way.
fn prepare_table(table: &Table, dialect: &Dialect) -> Table {
    let mut table = resolve_names(table, dialect);
    table.name = dialect.table_key(&table.name);
    for fk in &mut table.foreign_keys {
        fk.referenced_table = dialect.table_key(&fk.referenced_table);
    }
    table
}

fn prepare_view(view: &View, dialect: &Dialect) -> View {
    View {
        name: dialect.table_key(&view.name),
        ..view.clone()
    }
}

/// Every named object of a table with a description of what it is.
fn named_objects(table: &Table) -> Vec<(String, String)> {
    let mut objects = Vec::new();
    let name = &table.name;
    if let Some(pk) = &table.primary_key {
        if let Some(pk_name) = &pk.name {
            objects.push((
                pk_name.clone(),
                format!("primary key {}({})", name, pk.columns.join(", ")),
            ));
        }
    }
    for index in &table.indices {
        if let Some(index_name) = &index.name {
            let mut identity = format!("index {}({})", name, index.columns.join(", "));
            if let Some(predicate) = &index.predicate {
                identity.push_str(&format!(" WHERE {}", predicate));
            }
            objects.push((index_name.clone(), identity));
        }
    }
    for unique in &table.uniques {
        if let Some(unique_name) = &unique.name {
            objects.push((
                unique_name.clone(),
                format!("unique {}({})", name, unique.columns.join(", ")),
            ));
        }
    }
    for fk in &table.foreign_keys {
        if let Some(fk_name) = &fk.name {
            objects.push((
                fk_name.clone(),
                format!(
                    "foreign key {}({}) -> {}",
                    name,
                    fk.columns.join(", "),
                    fk.referenced_table
                ),
            ));
        }
    }
    for check in &table.checks {
        if let Some(check_name) = &check.name {
            objects.push((
                check_name.clone(),
                format!("check {} ({})", name, check.expression),
            ));
        }
    }
    for exclusion in &table.exclusions {
        if let Some(exclusion_name) = &exclusion.name {
            objects.push((
                exclusion_name.clone(),
                format!("exclusion {} ({})", name, exclusion.expression),
            ));
        }
    }
    objects
}

/// Fails when two distinct objects end up with the same stored name,
/// typically after truncation to the identifier limit.
fn check_name_collisions(tables: &[Table]) -> Result<()> {
    let mut owners: HashMap<String, String> = HashMap::new();
    for table in tables {
        for (name, identity) in named_objects(table) {
            match owners.get(&name) {
                Some(first) if *first != identity => {
                    return Err(SchemaError::AmbiguousName {
                        name,
                        first: first.clone(),
                        second: identity,
                    });
                }
                Some(_) => {}
                None => {
                    owners.insert(name, identity);
                }
            }
        }
    }
    Ok(())
}

/// `true` when `name` is exactly what the naming scheme would generate.
fn auto_named(name: Option<&str>, generated: &str) -> bool {
    name == Some(generated)
}

/// `true` when both slices hold the same items under `same`.
fn same_set<T>(from: &[T], to: &[T], same: impl Fn(&T, &T) -> bool) -> bool {
    from.len() == to.len()
        && to.iter().all(|t| from.iter().any(|f| same(f, t)))
        && from.iter().all(|f| to.iter().any(|t| same(f, t)))
}

/// Pairs items of `from` with items of `to`.
///
/// Returns the items to drop and the items to create: unmatched live items,
/// unmatched desired items, and matched pairs for which `rebuild` holds.
fn match_sets<T: Clone>(
    from: &[T],
    to: &[T],
    same: impl Fn(&T, &T) -> bool,
    rebuild: impl Fn(&T) -> bool,
) -> (Vec<T>, Vec<T>) {
    let mut matched = vec![false; from.len()];
    let mut drops = Vec::new();
    let mut adds = Vec::new();
    for wanted in to {
        let found = from
            .iter()
            .enumerate()
            .position(|(i, existing)| !matched[i] && same(existing, wanted));
        match found {
            Some(i) => {
                matched[i] = true;
                if rebuild(wanted) {
                    drops.push(from[i].clone());
                    adds.push(wanted.clone());
                }
            }
            None => adds.push(wanted.clone()),
        }
    }
    for (i, existing) in from.iter().enumerate() {
        if !matched[i] {
            drops.push(existing.clone());
        }
    }
    (drops, adds)
}

// ================================================================
// Change buckets
// ================================================================

/// Operations grouped by the phase they run in.
#[derive(Default)]
struct Plan {
    drop_views: Vec<Operation>,
    drop_foreign_keys: Vec<Operation>,
    drop_indices: Vec<Operation>,
    drop_checks: Vec<Operation>,
    drop_exclusions: Vec<Operation>,
    drop_uniques: Vec<Operation>,
    drop_primary_keys: Vec<Operation>,
    create_tables: Vec<Operation>,
    drop_columns: Vec<Operation>,
    add_columns: Vec<Operation>,
    alter_columns: Vec<Operation>,
    recreate_tables: Vec<Operation>,
    add_primary_keys: Vec<Operation>,
    drop_tables: Vec<Operation>,
    create_indices: Vec<Operation>,
    add_checks: Vec<Operation>,
    add_exclusions: Vec<Operation>,
    add_uniques: Vec<Operation>,
    /// Keyed by the dependency rank of the owning table.
    add_foreign_keys: Vec<(usize, Operation)>,
    create_views: Vec<Operation>,
    rename_primary_keys: Vec<Operation>,
    comments: Vec<Operation>,
}

impl Plan {
    fn into_changes(mut self) -> Vec<Change> {
        self.add_foreign_keys.sort_by_key(|(rank, _)| *rank);
        let add_foreign_keys = self.add_foreign_keys.into_iter().map(|(_, op)| op).collect();
        [
            self.drop_views,
            self.drop_foreign_keys,
            self.drop_indices,
            self.drop_checks,
            self.drop_exclusions,
            self.drop_uniques,
            self.drop_primary_keys,
            self.create_tables,
            self.drop_columns,
            self.add_columns,
            self.alter_columns,
            self.recreate_tables,
            self.add_primary_keys,
            self.drop_tables,
            self.create_indices,
            self.add_checks,
            self.add_exclusions,
            self.add_uniques,
            add_foreign_keys,
            self.create_views,
            self.rename_primary_keys,
            self.comments,
        ]
        .into_iter()
        .flatten()
        .map(Change::new)
        .collect()
    }
}

// ================================================================
// Differ
// ================================================================

struct Differ<'d> {
    dialect: &'d Dialect,
    plan: Plan,
    warnings: Vec<DiffWarning>,
    ranks: BTreeMap<TableName, usize>,
    /// Columns, per table, whose dependents must be dropped and re-created.
    touched: BTreeMap<TableName, BTreeSet<String>>,
    /// Tables whose primary key columns change.
    rekeyed: BTreeSet<TableName>,
    /// Tables rebuilt through `RecreateTable`.
    recreated: BTreeSet<TableName>,
    /// Tables whose columns change in any way, or that go away.
    reshaped: BTreeSet<TableName>,
}

impl<'d> Differ<'d> {
    fn new(dialect: &'d Dialect, ranks: BTreeMap<TableName, usize>) -> Self {
        Self {
            dialect,
            plan: Plan::default(),
            warnings: Vec::new(),
            ranks,
            touched: BTreeMap::new(),
            rekeyed: BTreeSet::new(),
            recreated: BTreeSet::new(),
            reshaped: BTreeSet::new(),
        }
    }

    fn rank(&self, table: &TableName) -> usize {
        self.ranks.get(table).copied().unwrap_or(usize::MAX)
    }

    /// Creates a table. Where constraints can be added afterwards the
    /// foreign keys are split off, so that tables referencing each other
    /// can all be created first.
    fn create_table(&mut self, table: &Table) {
        let mut table = table.clone();
        if self.dialect.supports(Feature::AlterConstraints) {
            let rank = self.rank(&table.name);
            for foreign_key in std::mem::take(&mut table.foreign_keys) {
                self.plan.add_foreign_keys.push((
                    rank,
                    Operation::AddForeignKey {
                        table: table.name.clone(),
                        foreign_key,
                    },
                ));
            }
        }
        debug!(table = %table.name, "Table added");
        self.plan.create_tables.push(Operation::CreateTable { table });
    }

    fn drop_table(&mut self, table: &Table) {
        let mut table = table.clone();
        if self.dialect.supports(Feature::AlterConstraints) {
            for foreign_key in std::mem::take(&mut table.foreign_keys) {
                self.plan.drop_foreign_keys.push(Operation::DropForeignKey {
                    table: table.name.clone(),
                    foreign_key,
                });
            }
        }
        debug!(table = %table.name, "Table removed");
        self.reshaped.insert(table.name.clone());
        self.plan.drop_tables.push(Operation::DropTable { table });
    }

    // ---- Columns and primary keys -------------------------------

    fn diff_columns(&mut self, from: &Table, to: &Table) -> Result<()> {
        if !self.dialect.supports(Feature::AlterColumn) {
            self.diff_rebuilt_table(from, to);
            return Ok(());
        }
        let dialect = self.dialect;
        let table = &to.name;
        let mut touched = BTreeSet::new();
        let mut altered = BTreeSet::new();

        let added: Vec<&Column> = to
            .columns
            .iter()
            .filter(|c| from.get_column(&c.name).is_none())
            .collect();
        let dropped: Vec<&Column> = from
            .columns
            .iter()
            .filter(|c| to.get_column(&c.name).is_none())
            .collect();

        for column in &to.columns {
            let Some(old) = from.get_column(&column.name) else {
                self.plan.add_columns.push(Operation::AddColumn {
                    table: table.clone(),
                    column: column.clone(),
                });
                continue;
            };
            if needs_readd(old, column, dialect) {
                debug!(table = %table, column = %column.name, "Column re-added");
                self.plan.drop_columns.push(Operation::DropColumn {
                    table: table.clone(),
                    column: old.clone(),
                });
                self.plan.add_columns.push(Operation::AddColumn {
                    table: table.clone(),
                    column: column.clone(),
                });
                touched.insert(column.name.clone());
            } else if column_changed(old, column, dialect) {
                debug!(table = %table, column = %column.name, "Column altered");
                self.plan.alter_columns.push(Operation::AlterColumn {
                    table: table.clone(),
                    from: old.clone(),
                    to: column.clone(),
                });
                if type_changed(old, column, dialect) {
                    touched.insert(column.name.clone());
                }
                altered.insert(column.name.clone());
            }
        }
        for column in &dropped {
            self.plan.drop_columns.push(Operation::DropColumn {
                table: table.clone(),
                column: (*column).clone(),
            });
        }
        self.column_rename_warnings(table, &dropped, &added);

        self.diff_primary_key(from, to)?;

        if dialect.alter_requires_index_rebuild {
            touched.extend(altered.iter().cloned());
        }
        if !touched.is_empty() || !altered.is_empty() || !dropped.is_empty() {
            self.reshaped.insert(table.clone());
        }
        self.touched.insert(table.clone(), touched);

        if from.comment != to.comment && dialect.supports(Feature::Comments) {
            self.plan.comments.push(Operation::SetTableComment {
                table: table.clone(),
                from: from.comment.clone(),
                to: to.comment.clone(),
            });
        }
        Ok(())
    }

    fn diff_primary_key(&mut self, from: &Table, to: &Table) -> Result<()> {
        let dialect = self.dialect;
        let table = &to.name;
        match (&from.primary_key, &to.primary_key) {
            (None, None) => {}
            (Some(old), Some(new)) if same_primary_key_columns(old, new) => {
                if !dialect.supports(Feature::NamedPrimaryKeys) {
                    return Ok(());
                }
                if let (Some(old_name), Some(new_name)) = (&old.name, &new.name) {
                    if old_name != new_name {
                        self.plan.rename_primary_keys.push(Operation::RenamePrimaryKey {
                            table: table.clone(),
                            columns: new.columns.clone(),
                            from: old_name.clone(),
                            to: new_name.clone(),
                        });
                    }
                }
            }
            (old, new) => {
                if let Some(old) = old {
                    if !dialect.supports(Feature::DropPrimaryKey) {
                        return Err(SchemaError::UnsupportedOperation {
                            operation: format!("change the primary key of '{}'", table),
                            dialect: dialect.kind,
                            reason: "an existing primary key cannot be dropped".to_string(),
                        });
                    }
                    self.plan.drop_primary_keys.push(Operation::DropPrimaryKey {
                        table: table.clone(),
                        primary_key: old.clone(),
                    });
                }
                if let Some(new) = new {
                    self.plan.add_primary_keys.push(Operation::AddPrimaryKey {
                        table: table.clone(),
                        primary_key: new.clone(),
                    });
                }
                self.rekeyed.insert(table.clone());
            }
        }
        Ok(())
    }

    /// Engines without in-place alteration rebuild the table whenever
    /// anything beyond plain column additions or indices changes.
    fn diff_rebuilt_table(&mut self, from: &Table, to: &Table) {
        let dialect = self.dialect;
        let added: Vec<&Column> = to
            .columns
            .iter()
            .filter(|c| from.get_column(&c.name).is_none())
            .collect();
        let dropped: Vec<&Column> = from
            .columns
            .iter()
            .filter(|c| to.get_column(&c.name).is_none())
            .collect();
        self.column_rename_warnings(&to.name, &dropped, &added);

        let columns_changed = !dropped.is_empty()
            || to.columns.iter().any(|c| {
                from.get_column(&c.name).is_some_and(|old| {
                    needs_readd(old, c, dialect) || column_changed(old, c, dialect)
                })
            });
        let addable = added.iter().all(|c| {
            c.computed.is_none()
                && c.generation.is_none()
                && (c.nullable || c.default.is_some())
        });
        let primary_key_changed = from.primary_key.as_ref().map(|pk| &pk.columns)
            != to.primary_key.as_ref().map(|pk| &pk.columns);
        let constraints_changed = primary_key_changed
            || from.without_rowid != to.without_rowid
            || !same_set(&from.foreign_keys, &to.foreign_keys, |a, b| {
                same_foreign_key(a, b, dialect)
            })
            || !same_set(&from.uniques, &to.uniques, same_unique)
            || !same_set(&from.checks, &to.checks, |a, b| same_check(a, b, dialect))
            || !same_set(&from.exclusions, &to.exclusions, |a, b| {
                same_exclusion(a, b, dialect)
            });

        if columns_changed || constraints_changed || !addable {
            debug!(table = %to.name, "Table recreated");
            self.recreated.insert(to.name.clone());
            self.reshaped.insert(to.name.clone());
            self.plan.recreate_tables.push(Operation::RecreateTable {
                from: from.clone(),
                to: to.clone(),
            });
            return;
        }
        for column in added {
            self.plan.add_columns.push(Operation::AddColumn {
                table: to.name.clone(),
                column: column.clone(),
            });
        }
        self.diff_indices(from, to, &BTreeSet::new());
    }

    // ---- Indices and constraints --------------------------------

    /// `true` when the key references columns that are being rebuilt or a
    /// primary key that is being replaced.
    fn reference_reshaped(&self, fk: &ForeignKey) -> bool {
        self.rekeyed.contains(&fk.referenced_table)
            || self
                .touched
                .get(&fk.referenced_table)
                .is_some_and(|columns| touches(&fk.referenced_columns, columns))
    }

    fn diff_constraints(&mut self, from: &Table, to: &Table) {
        let dialect = self.dialect;
        if !dialect.supports(Feature::AlterColumn) {
            // Handled together with the columns.
            return;
        }
        let table = &to.name;
        let touched = self.touched.get(table).cloned().unwrap_or_default();
        let names = GeneratedNames::new(table, dialect);

        let (drops, adds) = match_sets(
            &from.foreign_keys,
            &to.foreign_keys,
            |a, b| {
                same_foreign_key(a, b, dialect)
                    && (!auto_named(b.name.as_deref(), &names.foreign_key(b)) || a.name == b.name)
            },
            |fk| touches(&fk.columns, &touched) || self.reference_reshaped(fk),
        );
        let rank = self.rank(table);
        for foreign_key in drops {
            self.plan.drop_foreign_keys.push(Operation::DropForeignKey {
                table: table.clone(),
                foreign_key,
            });
        }
        for foreign_key in adds {
            self.plan.add_foreign_keys.push((
                rank,
                Operation::AddForeignKey {
                    table: table.clone(),
                    foreign_key,
                },
            ));
        }

        self.diff_indices(from, to, &touched);

        let (drops, adds) = match_sets(
            &from.uniques,
            &to.uniques,
            |a, b| {
                same_unique(a, b)
                    && (!auto_named(b.name.as_deref(), &names.unique(b)) || a.name == b.name)
            },
            |u| touches(&u.columns, &touched),
        );
        for unique in drops {
            self.plan.drop_uniques.push(Operation::DropUnique {
                table: table.clone(),
                unique,
            });
        }
        for unique in adds {
            self.plan.add_uniques.push(Operation::AddUnique {
                table: table.clone(),
                unique,
            });
        }

        let (drops, adds) = match_sets(
            &from.checks,
            &to.checks,
            |a, b| {
                same_check(a, b, dialect)
                    && (!auto_named(b.name.as_deref(), &names.check(b)) || a.name == b.name)
            },
            |c| touched.iter().any(|column| mentions(&c.expression, column)),
        );
        for check in drops {
            self.plan.drop_checks.push(Operation::DropCheck {
                table: table.clone(),
                check,
            });
        }
        for check in adds {
            self.plan.add_checks.push(Operation::AddCheck {
                table: table.clone(),
                check,
            });
        }

        let (drops, adds) = match_sets(
            &from.exclusions,
            &to.exclusions,
            |a, b| {
                same_exclusion(a, b, dialect)
                    && (!auto_named(b.name.as_deref(), &names.exclusion(b)) || a.name == b.name)
            },
            |x| touched.iter().any(|column| mentions(&x.expression, column)),
        );
        for exclusion in drops {
            self.plan.drop_exclusions.push(Operation::DropExclusion {
                table: table.clone(),
                exclusion,
            });
        }
        for exclusion in adds {
            self.plan.add_exclusions.push(Operation::AddExclusion {
                table: table.clone(),
                exclusion,
            });
        }
    }

    fn diff_indices(&mut self, from: &Table, to: &Table, touched: &BTreeSet<String>) {
        let dialect = self.dialect;
        let table = &to.name;
        let names = GeneratedNames::new(table, dialect);
        let (drops, adds) = match_sets(
            &from.indices,
            &to.indices,
            |a, b| {
                same_index(a, b, dialect)
                    && (!auto_named(b.name.as_deref(), &names.index(b)) || a.name == b.name)
            },
            |index| touches(&index.columns, touched),
        );
        for index in drops {
            self.plan.drop_indices.push(Operation::DropIndex {
                table: table.clone(),
                index,
            });
        }
        for index in adds {
            self.plan.create_indices.push(Operation::CreateIndex {
                table: table.clone(),
                index,
            });
        }
    }

    // ---- Views --------------------------------------------------

    /// Views are compared by normalized text. A view over a table whose
    /// columns change is re-created even when its text is unchanged; on
    /// engines that rebuild tables, any rebuild re-creates every view.
    fn diff_views(&mut self, desired: &[View], actual: &[View]) {
        let dialect = self.dialect;
        let wanted: Vec<View> = desired.iter().map(|v| prepare_view(v, dialect)).collect();
        let live: Vec<View> = actual.iter().map(|v| prepare_view(v, dialect)).collect();
        let rebuild_all = !self.recreated.is_empty();

        for old in &live {
            if !wanted.iter().any(|v| v.name == old.name) {
                self.plan
                    .drop_views
                    .push(Operation::DropView { view: old.clone() });
            }
        }
        for view in &wanted {
            let Some(old) = live.iter().find(|v| v.name == view.name) else {
                self.plan
                    .create_views
                    .push(Operation::CreateView { view: view.clone() });
                continue;
            };
            let same = old.materialized == view.materialized
                && dialect.normalize_expression(&old.expression)
                    == dialect.normalize_expression(&view.expression);
            let depends = rebuild_all
                || self
                    .reshaped
                    .iter()
                    .any(|table| mentions(&view.expression, &table.name));
            if !same || depends {
                debug!(view = %view.name, "View recreated");
                self.plan
                    .drop_views
                    .push(Operation::DropView { view: old.clone() });
                self.plan
                    .create_views
                    .push(Operation::CreateView { view: view.clone() });
            }
        }
    }

    // ---- Rename detection ---------------------------------------

    fn column_rename_warnings(&mut self, table: &TableName, dropped: &[&Column], added: &[&Column]) {
        let dialect = self.dialect;
        let mut candidates: Vec<(&str, &str, f64)> = Vec::new();
        for old in dropped {
            for new in added {
                if dialect.normalize_type(&old.data_type) != dialect.normalize_type(&new.data_type) {
                    continue;
                }
                let score = similarity(&old.name, &new.name);
                if score >= RENAME_SIMILARITY_THRESHOLD {
                    candidates.push((old.name.as_str(), new.name.as_str(), score));
                }
            }
        }
        // Greedy matching: highest similarity first.
        candidates.sort_by(|a, b| b.2.total_cmp(&a.2));
        let mut used_old = BTreeSet::new();
        let mut used_new = BTreeSet::new();
        for (old, new, score) in candidates {
            if used_old.contains(old) || used_new.contains(new) {
                continue;
            }
            used_old.insert(old);
            used_new.insert(new);
            self.warnings.push(DiffWarning::PossibleColumnRename {
                table: table.clone(),
                old_column: old.to_string(),
                new_column: new.to_string(),
                similarity: score,
            });
        }
    }

    fn table_rename_warnings(&mut self, dropped: &[&Table], created: &[&Table]) {
        let dialect = self.dialect;
        let shape = |table: &Table| -> Vec<(String, String)> {
            table
                .columns
                .iter()
                .map(|c| (c.name.clone(), dialect.normalize_type(&c.data_type)))
                .collect()
        };
        let mut candidates: Vec<(&TableName, &TableName, f64)> = Vec::new();
        for old in dropped {
            for new in created {
                if shape(old) == shape(new) {
                    candidates.push((&old.name, &new.name, similarity(&old.name.name, &new.name.name)));
                }
            }
        }
        candidates.sort_by(|a, b| b.2.total_cmp(&a.2));
        let mut used_old = BTreeSet::new();
        let mut used_new = BTreeSet::new();
        for (old, new, score) in candidates {
            if used_old.contains(old) || used_new.contains(new) {
                continue;
            }
            used_old.insert(old);
            used_new.insert(new);
            self.warnings.push(DiffWarning::PossibleTableRename {
                old_table: old.clone(),
                new_table: new.clone(),
                similarity: score,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{COCKROACH, MYSQL, POSTGRES, SQLITE, SQL_SERVER};
    use crate::schema::{CheckConstraint, Index, PrimaryKey, UniqueConstraint};

    fn users() -> Table {
        Table::new("users")
            .column(Column::new("id", "int").primary())
            .column(Column::new("email", "varchar").length("255").unique())
            .column(Column::new("name", "varchar").length("100").nullable())
            .index(Index::new(["name"]))
    }

    fn ups(diff: &SchemaDiff) -> Vec<&Operation> {
        diff.up_operations()
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn similarity_bounds() {
        assert!((similarity("", "") - 1.0).abs() < f64::EPSILON);
        assert!((similarity("abc", "abc") - 1.0).abs() < f64::EPSILON);
        assert!(similarity("abc", "xyz") < f64::EPSILON);
    }

    #[test]
    fn identical_schemas_produce_no_changes() {
        let schema = Schema::new().table(users());
        let diff = diff(&schema, &schema, &POSTGRES).unwrap();
        assert!(diff.is_empty());
        assert_eq!(diff.len(), 0);
    }

    #[test]
    fn new_table_is_created() {
        let desired = Schema::new().table(users());
        let diff = diff(&desired, &Schema::new(), &POSTGRES).unwrap();
        assert_eq!(diff.len(), 1);
        assert!(matches!(ups(&diff)[0], Operation::CreateTable { table } if table.name.name == "users"));
        assert!(matches!(&diff.changes[0].down, Operation::DropTable { .. }));
    }

    #[test]
    fn default_schema_is_transparent() {
        let mut qualified = users();
        qualified.name = TableName::qualified("public", "users");
        let desired = Schema::new().table(qualified);
        let actual = Schema::new().table(users());
        assert!(diff(&desired, &actual, &POSTGRES).unwrap().is_empty());
    }

    #[test]
    fn added_and_dropped_columns() {
        let desired = Schema::new().table(users().column(Column::new("age", "int").nullable()));
        let actual = Schema::new().table(users().column(Column::new("legacy", "text").nullable()));
        let diff = diff(&desired, &actual, &POSTGRES).unwrap();
        let ops = ups(&diff);
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], Operation::DropColumn { column, .. } if column.name == "legacy"));
        assert!(matches!(ops[1], Operation::AddColumn { column, .. } if column.name == "age"));
    }

    #[test]
    fn altered_column_is_altered_in_place() {
        let mut grown = users();
        grown.get_column_mut("name").unwrap().length = Some("200".to_string());
        let diff = diff(&Schema::new().table(grown), &Schema::new().table(users()), &MYSQL).unwrap();
        assert_eq!(diff.len(), 1);
        assert!(matches!(
            ups(&diff)[0],
            Operation::AlterColumn { from, to, .. }
                if from.length.as_deref() == Some("100") && to.length.as_deref() == Some("200")
        ));
    }

    #[test]
    fn sql_server_rebuilds_indices_over_altered_columns() {
        let mut grown = users();
        grown.get_column_mut("name").unwrap().nullable = false;
        let diff = diff(
            &Schema::new().table(grown),
            &Schema::new().table(users()),
            &SQL_SERVER,
        )
        .unwrap();
        let ops = ups(&diff);
        assert!(matches!(ops[0], Operation::DropIndex { .. }));
        assert!(matches!(ops[1], Operation::AlterColumn { .. }));
        assert!(matches!(ops[2], Operation::CreateIndex { .. }));
    }

    #[test]
    fn computed_change_drops_and_adds() {
        use crate::schema::StorageMode;
        let base = Table::new("line")
            .column(Column::new("id", "int").primary())
            .column(Column::new("qty", "int"));
        let desired = base
            .clone()
            .column(Column::new("twice", "int").computed("qty * 2", StorageMode::Stored));
        let actual = base.column(Column::new("twice", "int").computed("qty * 3", StorageMode::Stored));
        let diff = diff(
            &Schema::new().table(desired),
            &Schema::new().table(actual),
            &POSTGRES,
        )
        .unwrap();
        let ops = ups(&diff);
        assert!(matches!(ops[0], Operation::DropColumn { .. }));
        assert!(matches!(ops[1], Operation::AddColumn { .. }));
    }

    #[test]
    fn sqlite_changes_recreate_the_table() {
        let mut grown = users();
        grown.get_column_mut("name").unwrap().length = Some("200".to_string());
        let diff = diff(&Schema::new().table(grown), &Schema::new().table(users()), &SQLITE).unwrap();
        assert_eq!(diff.len(), 1);
        assert!(matches!(ups(&diff)[0], Operation::RecreateTable { .. }));
    }

    #[test]
    fn sqlite_nullable_addition_stays_an_add_column() {
        let desired = users().column(Column::new("bio", "text").nullable());
        let diff = diff(&Schema::new().table(desired), &Schema::new().table(users()), &SQLITE).unwrap();
        assert_eq!(diff.len(), 1);
        assert!(matches!(ups(&diff)[0], Operation::AddColumn { .. }));
    }

    #[test]
    fn primary_key_rename_is_isolated() {
        let v1 = users().primary_key(PrimaryKey::new(["id"]).named("PK_1"));
        let v2 = users().primary_key(PrimaryKey::new(["id"]).named("PK_2"));
        let diff = diff(&Schema::new().table(v2), &Schema::new().table(v1), &POSTGRES).unwrap();
        assert_eq!(diff.len(), 1);
        assert!(matches!(
            ups(&diff)[0],
            Operation::RenamePrimaryKey { from, to, .. } if from == "PK_1" && to == "PK_2"
        ));
    }

    #[test]
    fn primary_key_column_change_is_refused_on_cockroach() {
        let v1 = Table::new("pair")
            .column(Column::new("a", "int"))
            .column(Column::new("b", "int"))
            .primary_key(PrimaryKey::new(["a"]));
        let v2 = v1.clone().primary_key(PrimaryKey::new(["a", "b"]));
        let err = diff(&Schema::new().table(v2.clone()), &Schema::new().table(v1.clone()), &COCKROACH)
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedOperation { .. }));

        let diff = diff(&Schema::new().table(v2), &Schema::new().table(v1), &POSTGRES).unwrap();
        let ops = ups(&diff);
        assert!(matches!(ops[0], Operation::DropPrimaryKey { .. }));
        assert!(matches!(ops[1], Operation::AddPrimaryKey { .. }));
    }

    #[test]
    fn explicitly_named_constraints_match_by_meaning() {
        let live = users().check(CheckConstraint::new("id > 0").named("CHK_old"));
        let model = users().check(CheckConstraint::new("(id > 0)").named("CHK_new"));
        let diff = diff(&Schema::new().table(model), &Schema::new().table(live), &POSTGRES).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn auto_named_constraints_also_match_by_name() {
        let live = users().unique(UniqueConstraint::new(["name"]).named("legacy_unique"));
        let model = users().unique(UniqueConstraint::new(["name"]));
        let diff = diff(&Schema::new().table(model), &Schema::new().table(live), &POSTGRES).unwrap();
        let ops = ups(&diff);
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], Operation::DropUnique { unique, .. } if unique.name.as_deref() == Some("legacy_unique")));
        assert!(matches!(ops[1], Operation::AddUnique { .. }));
    }

    #[test]
    fn type_change_rebuilds_referencing_foreign_keys() {
        let account = |ty: &str| {
            Table::new("account").column(Column::new("id", ty).primary())
        };
        let post = Table::new("post")
            .column(Column::new("id", "int").primary())
            .column(Column::new("account_id", "int"))
            .foreign_key(ForeignKey::new(["account_id"], "account", ["id"]));
        let desired = Schema::new().table(account("bigint")).table(post.clone());
        let actual = Schema::new().table(account("int")).table(post);
        let diff = diff(&desired, &actual, &POSTGRES).unwrap();
        let ops = ups(&diff);
        assert!(matches!(ops[0], Operation::DropForeignKey { .. }));
        assert!(matches!(ops[1], Operation::AlterColumn { .. }));
        assert!(matches!(ops[2], Operation::AddForeignKey { .. }));
    }

    #[test]
    fn shared_names_are_rejected() {
        let long = "x".repeat(40);
        let table = Table::new("t")
            .column(Column::new("a", "int"))
            .column(Column::new("b", "int"))
            .index(Index::new(["a"]).named(format!("{}_a", long)))
            .index(Index::new(["b"]).named(format!("{}_a", long)));
        let err = diff(&Schema::new().table(table), &Schema::new(), &POSTGRES).unwrap_err();
        assert!(matches!(err, SchemaError::AmbiguousName { .. }));
    }

    #[test]
    fn views_over_reshaped_tables_are_recreated() {
        let view = View::new("active_users", "SELECT id, name FROM users");
        let mut grown = users();
        grown.get_column_mut("name").unwrap().length = Some("200".to_string());
        let desired = Schema::new().table(grown).view(view.clone());
        let actual = Schema::new().table(users()).view(view);
        let diff = diff(&desired, &actual, &POSTGRES).unwrap();
        let ops = ups(&diff);
        assert!(matches!(ops.first(), Some(Operation::DropView { .. })));
        assert!(matches!(ops.last(), Some(Operation::CreateView { .. })));
    }

    #[test]
    fn rename_candidates_are_reported() {
        let desired = users().column(Column::new("full_name", "text").nullable());
        let actual = users().column(Column::new("fullname", "text").nullable());
        let diff = diff(&Schema::new().table(desired), &Schema::new().table(actual), &POSTGRES).unwrap();
        assert_eq!(diff.len(), 2);
        assert!(matches!(
            &diff.warnings[..],
            [DiffWarning::PossibleColumnRename { old_column, new_column, .. }]
                if old_column == "fullname" && new_column == "full_name"
        ));
    }

    #[test]
    fn down_operations_run_in_reverse() {
        let desired = Schema::new().table(users().column(Column::new("age", "int").nullable()));
        let actual = Schema::new().table(users().column(Column::new("legacy", "text").nullable()));
        let diff = diff(&desired, &actual, &POSTGRES).unwrap();
        let downs = diff.down_operations();
        assert!(matches!(downs[0], Operation::DropColumn { column, .. } if column.name == "age"));
        assert!(matches!(downs[1], Operation::AddColumn { column, .. } if column.name == "legacy"));
    }
}
