//! Schema object model.
//!
//! These types describe tables, columns, indices, constraints, and views.
//! The same types are used for the desired model handed in by the caller and
//! for the live model produced by introspection, so the differ compares like
//! with like. All of them are plain values: builders consume and return
//! `self`, and nothing in the crate mutates a schema it was given.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};

/// A possibly schema-qualified table or view name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableName {
    /// Schema (namespace) qualifier, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Unqualified name.
    pub name: String,
}

impl TableName {
    /// Creates an unqualified name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Creates a schema-qualified name.
    #[must_use]
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }
}

impl From<&str> for TableName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TableName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// How a column's value is generated by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    /// Auto-incrementing integer (serial, `AUTO_INCREMENT`, `IDENTITY(1,1)`).
    Increment,
    /// Database-generated UUID.
    Uuid,
    /// Row id assigned by the engine (SQLite, CockroachDB).
    Rowid,
    /// SQL-standard identity column.
    Identity,
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Increment => "increment",
            Self::Uuid => "uuid",
            Self::Rowid => "rowid",
            Self::Identity => "identity",
        })
    }
}

/// Storage of a computed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Computed on write and stored.
    Stored,
    /// Computed on read.
    Virtual,
}

/// A column whose value is computed from an expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedColumn {
    /// The generating expression.
    pub expression: String,
    /// Whether the value is stored or virtual.
    pub mode: StorageMode,
}

/// Action taken on referencing rows when the referenced row changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    /// Fail at the end of the statement.
    #[default]
    NoAction,
    /// Fail immediately.
    Restrict,
    /// Propagate the change.
    Cascade,
    /// Set referencing columns to NULL.
    SetNull,
    /// Set referencing columns to their defaults.
    SetDefault,
}

impl ReferentialAction {
    /// Returns the SQL keyword(s).
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    /// Parses a catalog spelling (`"SET NULL"`, `"set_null"`, `"CASCADE"`).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().replace('_', " ").as_str() {
            "NO ACTION" => Some(Self::NoAction),
            "RESTRICT" => Some(Self::Restrict),
            "CASCADE" => Some(Self::Cascade),
            "SET NULL" => Some(Self::SetNull),
            "SET DEFAULT" => Some(Self::SetDefault),
            _ => None,
        }
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Deferrability of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deferrable {
    /// `DEFERRABLE INITIALLY IMMEDIATE`.
    InitiallyImmediate,
    /// `DEFERRABLE INITIALLY DEFERRED`.
    InitiallyDeferred,
}

impl Deferrable {
    /// Returns the SQL clause.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::InitiallyImmediate => "DEFERRABLE INITIALLY IMMEDIATE",
            Self::InitiallyDeferred => "DEFERRABLE INITIALLY DEFERRED",
        }
    }
}

/// A table column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Logical type, mapped per dialect (`varchar`, `int`, `enum`, ...).
    pub data_type: String,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Size descriptor (`"255"`, `"MAX"`).
    pub length: Option<String>,
    /// Numeric precision.
    pub precision: Option<u32>,
    /// Numeric scale.
    pub scale: Option<u32>,
    /// Default as raw SQL text.
    pub default: Option<String>,
    /// Value generation strategy.
    pub generation: Option<Generation>,
    /// Computed-column definition.
    pub computed: Option<ComputedColumn>,
    /// Column comment.
    pub comment: Option<String>,
    /// Collation name.
    pub collation: Option<String>,
    /// Allowed values when `data_type` is `enum`.
    pub enum_values: Vec<String>,
    /// Shorthand for a single-column unique constraint.
    pub unique: bool,
    /// Shorthand for membership in the table's primary key.
    pub primary: bool,
}

impl Column {
    /// Creates a NOT NULL column of the given logical type.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            ..Self::default()
        }
    }

    /// Allows NULL values.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets the size descriptor.
    #[must_use]
    pub fn length(mut self, length: impl Into<String>) -> Self {
        self.length = Some(length.into());
        self
    }

    /// Sets numeric precision and scale.
    #[must_use]
    pub const fn precision(mut self, precision: u32, scale: Option<u32>) -> Self {
        self.precision = Some(precision);
        self.scale = scale;
        self
    }

    /// Sets the default expression (raw SQL).
    #[must_use]
    pub fn default_value(mut self, sql: impl Into<String>) -> Self {
        self.default = Some(sql.into());
        self
    }

    /// Sets the value generation strategy.
    #[must_use]
    pub const fn generated(mut self, generation: Generation) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Makes this a computed column.
    #[must_use]
    pub fn computed(mut self, expression: impl Into<String>, mode: StorageMode) -> Self {
        self.computed = Some(ComputedColumn {
            expression: expression.into(),
            mode,
        });
        self
    }

    /// Sets the column comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Sets the collation.
    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    /// Sets the allowed enum values.
    #[must_use]
    pub fn enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the column unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the column as part of the primary key.
    #[must_use]
    pub const fn primary(mut self) -> Self {
        self.primary = true;
        self
    }
}

/// A primary key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    /// Constraint name; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Key columns in order.
    pub columns: Vec<String>,
}

impl PrimaryKey {
    /// Creates an unnamed primary key.
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Sets the constraint name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A table index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Index {
    /// Index name; generated when absent.
    pub name: Option<String>,
    /// Indexed columns in order.
    pub columns: Vec<String>,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
    /// Partial index predicate (WHERE text).
    pub predicate: Option<String>,
    /// Access method (USING clause).
    pub method: Option<String>,
}

impl Index {
    /// Creates a non-unique index over the given columns.
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sets the index name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Makes the index unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Restricts the index to rows matching `predicate`.
    #[must_use]
    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    /// Sets the access method.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }
}

/// A foreign key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForeignKey {
    /// Constraint name; generated when absent.
    pub name: Option<String>,
    /// Owning columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub referenced_table: TableName,
    /// Referenced columns, positionally matched with `columns`.
    pub referenced_columns: Vec<String>,
    /// Action on delete.
    pub on_delete: ReferentialAction,
    /// Action on update.
    pub on_update: ReferentialAction,
    /// Deferrability.
    pub deferrable: Option<Deferrable>,
}

impl ForeignKey {
    /// Creates a foreign key with `NO ACTION` semantics.
    #[must_use]
    pub fn new<I, S, J, T>(columns: I, referenced_table: impl Into<TableName>, referenced: J) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        J: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            referenced_table: referenced_table.into(),
            referenced_columns: referenced.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sets the constraint name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub const fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub const fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = action;
        self
    }

    /// Makes the constraint deferrable.
    #[must_use]
    pub const fn deferrable(mut self, deferrable: Deferrable) -> Self {
        self.deferrable = Some(deferrable);
        self
    }
}

/// A multi-column unique constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueConstraint {
    /// Constraint name; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Constrained columns.
    pub columns: Vec<String>,
}

impl UniqueConstraint {
    /// Creates an unnamed unique constraint.
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Sets the constraint name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A CHECK constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConstraint {
    /// Constraint name; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Boolean expression.
    pub expression: String,
}

impl CheckConstraint {
    /// Creates an unnamed check constraint.
    #[must_use]
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            name: None,
            expression: expression.into(),
        }
    }

    /// Sets the constraint name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// An EXCLUDE constraint (Postgres).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionConstraint {
    /// Constraint name; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Everything after `EXCLUDE`, e.g. `USING gist ("room" WITH =)`.
    pub expression: String,
}

impl ExclusionConstraint {
    /// Creates an unnamed exclusion constraint.
    #[must_use]
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            name: None,
            expression: expression.into(),
        }
    }

    /// Sets the constraint name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Table {
    /// Table name.
    pub name: TableName,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
    /// Primary key.
    pub primary_key: Option<PrimaryKey>,
    /// Indices.
    pub indices: Vec<Index>,
    /// Foreign keys.
    pub foreign_keys: Vec<ForeignKey>,
    /// Unique constraints.
    pub uniques: Vec<UniqueConstraint>,
    /// Check constraints.
    pub checks: Vec<CheckConstraint>,
    /// Exclusion constraints.
    pub exclusions: Vec<ExclusionConstraint>,
    /// SQLite `WITHOUT ROWID`.
    pub without_rowid: bool,
    /// MySQL storage engine.
    pub engine: Option<String>,
    /// Table comment.
    pub comment: Option<String>,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<TableName>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the primary key.
    #[must_use]
    pub fn primary_key(mut self, primary_key: PrimaryKey) -> Self {
        self.primary_key = Some(primary_key);
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: Index) -> Self {
        self.indices.push(index);
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Adds a unique constraint.
    #[must_use]
    pub fn unique(mut self, unique: UniqueConstraint) -> Self {
        self.uniques.push(unique);
        self
    }

    /// Adds a check constraint.
    #[must_use]
    pub fn check(mut self, check: CheckConstraint) -> Self {
        self.checks.push(check);
        self
    }

    /// Adds an exclusion constraint.
    #[must_use]
    pub fn exclusion(mut self, exclusion: ExclusionConstraint) -> Self {
        self.exclusions.push(exclusion);
        self
    }

    /// Marks the table `WITHOUT ROWID`.
    #[must_use]
    pub const fn without_rowid(mut self) -> Self {
        self.without_rowid = true;
        self
    }

    /// Sets the storage engine.
    #[must_use]
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    /// Sets the table comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Looks up a column by name, mutably.
    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Returns the primary key, folding in columns flagged `primary`.
    #[must_use]
    pub fn effective_primary_key(&self) -> Option<PrimaryKey> {
        if let Some(pk) = &self.primary_key {
            return Some(pk.clone());
        }
        let columns: Vec<String> = self
            .columns
            .iter()
            .filter(|c| c.primary)
            .map(|c| c.name.clone())
            .collect();
        if columns.is_empty() {
            None
        } else {
            Some(PrimaryKey {
                name: None,
                columns,
            })
        }
    }

    /// Returns the unique constraints, folding in columns flagged `unique`.
    ///
    /// A flagged column already covered by a single-column constraint does
    /// not produce a second one.
    #[must_use]
    pub fn effective_uniques(&self) -> Vec<UniqueConstraint> {
        let mut uniques = self.uniques.clone();
        for column in self.columns.iter().filter(|c| c.unique) {
            let covered = uniques
                .iter()
                .any(|u| u.columns.len() == 1 && u.columns[0] == column.name);
            if !covered {
                uniques.push(UniqueConstraint::new([column.name.clone()]));
            }
        }
        uniques
    }

    /// Checks the structural invariants of the table.
    pub fn validate(&self) -> Result<()> {
        if self.name.name.is_empty() {
            return Err(SchemaError::InvalidModel("table name is empty".to_string()));
        }
        if self.columns.is_empty() {
            return Err(SchemaError::InvalidModel(format!(
                "table '{}' has no columns",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.name.is_empty() {
                return Err(SchemaError::InvalidModel(format!(
                    "table '{}' has a column without a name",
                    self.name
                )));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(SchemaError::InvalidModel(format!(
                    "column '{}' is declared twice in table '{}'",
                    column.name, self.name
                )));
            }
            if column.computed.is_some() && column.default.is_some() {
                return Err(SchemaError::InvalidModel(format!(
                    "computed column '{}.{}' cannot have a default",
                    self.name, column.name
                )));
            }
            if column.data_type.eq_ignore_ascii_case("enum") && column.enum_values.is_empty() {
                return Err(SchemaError::InvalidModel(format!(
                    "enum column '{}.{}' has no values",
                    self.name, column.name
                )));
            }
        }

        if let Some(pk) = &self.primary_key {
            if self.columns.iter().any(|c| c.primary) {
                let flagged: Vec<&str> = self
                    .columns
                    .iter()
                    .filter(|c| c.primary)
                    .map(|c| c.name.as_str())
                    .collect();
                if flagged.iter().any(|name| !pk.columns.iter().any(|c| c == name)) {
                    return Err(SchemaError::InvalidModel(format!(
                        "table '{}' flags primary columns outside its primary key",
                        self.name
                    )));
                }
            }
        }
        if let Some(pk) = self.effective_primary_key() {
            self.check_columns_exist("primary key", &pk.columns)?;
        }
        for index in &self.indices {
            self.check_columns_exist("index", &index.columns)?;
        }
        for unique in &self.uniques {
            self.check_columns_exist("unique constraint", &unique.columns)?;
        }
        for fk in &self.foreign_keys {
            self.check_columns_exist("foreign key", &fk.columns)?;
            if fk.columns.len() != fk.referenced_columns.len() {
                return Err(SchemaError::InvalidModel(format!(
                    "foreign key on '{}' has {} columns but references {}",
                    self.name,
                    fk.columns.len(),
                    fk.referenced_columns.len()
                )));
            }
        }
        Ok(())
    }

    fn check_columns_exist(&self, what: &str, columns: &[String]) -> Result<()> {
        if columns.is_empty() {
            return Err(SchemaError::InvalidModel(format!(
                "{} on '{}' has no columns",
                what, self.name
            )));
        }
        for name in columns {
            if self.get_column(name).is_none() {
                return Err(SchemaError::InvalidModel(format!(
                    "{} on '{}' references unknown column '{}'",
                    what, self.name, name
                )));
            }
        }
        Ok(())
    }
}

/// A view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// View name.
    pub name: TableName,
    /// SELECT body.
    pub expression: String,
    /// Whether the view is materialized.
    #[serde(default)]
    pub materialized: bool,
}

impl View {
    /// Creates a plain view.
    #[must_use]
    pub fn new(name: impl Into<TableName>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            materialized: false,
        }
    }

    /// Makes the view materialized.
    #[must_use]
    pub const fn materialized(mut self) -> Self {
        self.materialized = true;
        self
    }
}

/// A complete schema: tables and views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    /// Tables.
    pub tables: Vec<Table>,
    /// Views.
    pub views: Vec<View>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table.
    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Adds a view.
    #[must_use]
    pub fn view(mut self, view: View) -> Self {
        self.views.push(view);
        self
    }

    /// Looks up a table by exact name.
    #[must_use]
    pub fn get_table(&self, name: &TableName) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == *name)
    }

    /// Looks up a table by exact name, mutably.
    pub fn get_table_mut(&mut self, name: &TableName) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == *name)
    }

    /// Validates every table.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for table in &self.tables {
            if !seen.insert(&table.name) {
                return Err(SchemaError::InvalidModel(format!(
                    "table '{}' is declared twice",
                    table.name
                )));
            }
            table.validate()?;
        }
        Ok(())
    }
}
