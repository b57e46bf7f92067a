//! Per-engine dialect rules.
//!
//! A [`Dialect`] is a plain record of policy: identifier quoting, type
//! aliases, default lengths, supported features, generation strategies and
//! referential actions. The differ, the renderer and the validator consult it;
//! none of them branch on a trait object. Adding an engine means adding a
//! record next to the existing ones.

mod cockroach;
mod expression;
mod mysql;
mod oracle;
mod postgres;
mod spanner;
mod sqlite;
mod sqlserver;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::naming;
use crate::schema::{Column, Generation, ReferentialAction, StorageMode, TableName};

pub use cockroach::COCKROACH;
pub use expression::strip_wrapping_parens;
pub use mysql::MYSQL;
pub use oracle::ORACLE;
pub use postgres::POSTGRES;
pub use spanner::SPANNER;
pub use sqlite::SQLITE;
pub use sqlserver::SQL_SERVER;

/// The supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// PostgreSQL.
    Postgres,
    /// MySQL / MariaDB.
    Mysql,
    /// Microsoft SQL Server.
    #[serde(rename = "mssql")]
    SqlServer,
    /// Oracle Database.
    Oracle,
    /// SQLite.
    Sqlite,
    /// CockroachDB.
    #[serde(rename = "cockroachdb")]
    Cockroach,
    /// Google Cloud Spanner.
    Spanner,
}

impl DialectKind {
    /// Every supported engine.
    pub const ALL: [Self; 7] = [
        Self::Postgres,
        Self::Mysql,
        Self::SqlServer,
        Self::Oracle,
        Self::Sqlite,
        Self::Cockroach,
        Self::Spanner,
    ];

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
            Self::SqlServer => "mssql",
            Self::Oracle => "oracle",
            Self::Sqlite => "sqlite",
            Self::Cockroach => "cockroachdb",
            Self::Spanner => "spanner",
        }
    }

    /// Infers the engine from a connection URL scheme.
    ///
    /// CockroachDB speaks the Postgres wire protocol and usually has a
    /// `postgres://` URL, so it is only detected from an explicit
    /// `cockroachdb://` scheme.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split(':').next()?;
        scheme.parse().ok()
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialectKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::Mysql),
            "mssql" | "sqlserver" => Ok(Self::SqlServer),
            "oracle" => Ok(Self::Oracle),
            "sqlite" => Ok(Self::Sqlite),
            "cockroachdb" | "cockroach" => Ok(Self::Cockroach),
            "spanner" => Ok(Self::Spanner),
            other => Err(format!("unknown dialect '{}'", other)),
        }
    }
}

/// Capabilities that differ between engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// `EXCLUDE` constraints.
    ExclusionConstraints,
    /// Indices with a WHERE predicate.
    PartialIndexes,
    /// Index access methods (`USING gin`).
    IndexMethods,
    /// Stored computed columns.
    StoredComputedColumns,
    /// Virtual computed columns.
    VirtualComputedColumns,
    /// Table and column comments.
    Comments,
    /// CHECK constraints.
    CheckConstraints,
    /// Deferrable constraints.
    DeferrableConstraints,
    /// Changing a column's type, nullability or default in place.
    AlterColumn,
    /// Adding and dropping constraints on an existing table.
    AlterConstraints,
    /// Dropping a table's primary key.
    DropPrimaryKey,
    /// Renaming a constraint.
    RenameConstraint,
    /// Primary keys carry a meaningful name.
    NamedPrimaryKeys,
    /// Column collations.
    Collations,
    /// Views.
    Views,
    /// Materialized views.
    MaterializedViews,
    /// SQLite `WITHOUT ROWID` tables.
    WithoutRowid,
    /// Referential actions on update.
    OnUpdateActions,
    /// Auto-increment columns that are not the table's sole primary key
    /// column.
    CompositeAutoIncrement,
    /// A column value generation strategy.
    Generation(Generation),
    /// A referential action for ON DELETE.
    DeleteAction(ReferentialAction),
    /// A referential action for ON UPDATE.
    UpdateAction(ReferentialAction),
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ExclusionConstraints => "exclusion constraints",
            Self::PartialIndexes => "partial indices",
            Self::IndexMethods => "index methods",
            Self::StoredComputedColumns => "stored computed columns",
            Self::VirtualComputedColumns => "virtual computed columns",
            Self::Comments => "comments",
            Self::CheckConstraints => "check constraints",
            Self::DeferrableConstraints => "deferrable constraints",
            Self::AlterColumn => "in-place column alteration",
            Self::AlterConstraints => "altering constraints of existing tables",
            Self::DropPrimaryKey => "dropping primary keys",
            Self::RenameConstraint => "renaming constraints",
            Self::NamedPrimaryKeys => "named primary keys",
            Self::Collations => "collations",
            Self::Views => "views",
            Self::MaterializedViews => "materialized views",
            Self::WithoutRowid => "WITHOUT ROWID tables",
            Self::OnUpdateActions => "ON UPDATE actions",
            Self::CompositeAutoIncrement => {
                "auto-increment columns outside a single-column primary key"
            }
            Self::Generation(strategy) => return write!(f, "'{}' generation", strategy),
            Self::DeleteAction(action) => return write!(f, "ON DELETE {}", action),
            Self::UpdateAction(action) => return write!(f, "ON UPDATE {}", action),
        };
        f.write_str(name)
    }
}

/// How enum columns are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumStyle {
    /// A named type created with `CREATE TYPE .. AS ENUM`.
    NamedType,
    /// An inline `enum('a','b')` column type.
    Inline,
    /// A string column guarded by a CHECK constraint.
    Check,
}

/// Bound-parameter placeholder syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterStyle {
    /// `?`
    Question,
    /// `$1`
    Dollar,
    /// `@p1`
    AtP,
    /// `:1`
    Colon,
}

/// Declared type split into its parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDeclaration {
    /// Canonical type tag.
    pub data_type: String,
    /// Size descriptor.
    pub length: Option<String>,
    /// Numeric precision.
    pub precision: Option<u32>,
    /// Numeric scale.
    pub scale: Option<u32>,
}

/// Policy record for one database engine.
#[derive(Debug)]
pub struct Dialect {
    /// Which engine this record describes.
    pub kind: DialectKind,
    /// Opening and closing identifier quote.
    pub quote: (char, char),
    /// Longest identifier the engine stores without truncating.
    pub max_identifier_length: usize,
    /// Supported capabilities.
    pub features: &'static [Feature],
    /// Supported column generation strategies.
    pub generation_strategies: &'static [Generation],
    /// Supported ON DELETE actions.
    pub delete_actions: &'static [ReferentialAction],
    /// Supported ON UPDATE actions.
    pub update_actions: &'static [ReferentialAction],
    /// Spelling variants folded to a canonical type tag.
    pub type_aliases: &'static [(&'static str, &'static str)],
    /// Types that take a size descriptor.
    pub length_types: &'static [&'static str],
    /// Types that take precision and scale.
    pub precision_types: &'static [&'static str],
    /// Length assumed when a sized type omits one.
    pub default_lengths: &'static [(&'static str, &'static str)],
    /// Literals used for boolean TRUE and FALSE defaults.
    pub boolean_literals: (&'static str, &'static str),
    /// How enum columns are expressed.
    pub enum_style: EnumStyle,
    /// Type and length used for enum columns without a native enum type.
    pub enum_fallback: (&'static str, &'static str),
    /// Placeholder syntax for bound parameters.
    pub parameter_style: ParameterStyle,
    /// Schema an unqualified name resolves to.
    pub default_schema: Option<&'static str>,
    /// Keyword used to add a column (`ADD` or `ADD COLUMN`).
    pub add_column: &'static str,
    /// Whether altering a column requires its indices to be dropped first.
    pub alter_requires_index_rebuild: bool,
}

impl Dialect {
    /// Returns the record for `kind`.
    #[must_use]
    pub fn for_kind(kind: DialectKind) -> &'static Self {
        match kind {
            DialectKind::Postgres => &POSTGRES,
            DialectKind::Mysql => &MYSQL,
            DialectKind::SqlServer => &SQL_SERVER,
            DialectKind::Oracle => &ORACLE,
            DialectKind::Sqlite => &SQLITE,
            DialectKind::Cockroach => &COCKROACH,
            DialectKind::Spanner => &SPANNER,
        }
    }

    /// Returns `true` when the engine has `feature`.
    #[must_use]
    pub fn supports(&self, feature: Feature) -> bool {
        match feature {
            Feature::Generation(strategy) => self.supports_generation(strategy),
            Feature::DeleteAction(action) => self.supports_delete_action(action),
            Feature::UpdateAction(action) => self.supports_update_action(action),
            other => self.features.contains(&other),
        }
    }

    /// Fails with [`SchemaError::UnsupportedFeature`] unless the engine has
    /// `feature`.
    pub fn require(&self, feature: Feature, context: impl Into<String>) -> Result<()> {
        if self.supports(feature) {
            Ok(())
        } else {
            Err(SchemaError::UnsupportedFeature {
                feature,
                dialect: self.kind,
                context: context.into(),
            })
        }
    }

    /// Returns `true` when the engine can generate values with `strategy`.
    #[must_use]
    pub fn supports_generation(&self, strategy: Generation) -> bool {
        self.generation_strategies.contains(&strategy)
    }

    /// Returns `true` when the engine can compute columns in `mode`.
    #[must_use]
    pub fn supports_computed(&self, mode: StorageMode) -> bool {
        match mode {
            StorageMode::Stored => self.supports(Feature::StoredComputedColumns),
            StorageMode::Virtual => self.supports(Feature::VirtualComputedColumns),
        }
    }

    /// Returns `true` when `action` is accepted for ON DELETE.
    #[must_use]
    pub fn supports_delete_action(&self, action: ReferentialAction) -> bool {
        self.delete_actions.contains(&action)
    }

    /// Returns `true` when `action` is accepted for ON UPDATE.
    #[must_use]
    pub fn supports_update_action(&self, action: ReferentialAction) -> bool {
        self.update_actions.contains(&action)
    }

    /// Quotes an identifier, doubling any embedded closing quote.
    #[must_use]
    pub fn quote_identifier(&self, name: &str) -> String {
        let (open, close) = self.quote;
        let mut quoted = String::with_capacity(name.len() + 2);
        quoted.push(open);
        for ch in name.chars() {
            if ch == close {
                quoted.push(close);
            }
            quoted.push(ch);
        }
        quoted.push(close);
        quoted
    }

    /// Quotes a possibly schema-qualified table name.
    #[must_use]
    pub fn quote_table(&self, table: &TableName) -> String {
        match &table.schema {
            Some(schema) => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(&table.name)
            ),
            None => self.quote_identifier(&table.name),
        }
    }

    /// Quotes a list of identifiers, comma separated.
    #[must_use]
    pub fn quote_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.quote_identifier(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Drops the schema qualifier when it names the default schema, so that
    /// `public.users` and `users` compare equal on Postgres.
    #[must_use]
    pub fn table_key(&self, table: &TableName) -> TableName {
        let schema = table
            .schema
            .as_deref()
            .filter(|s| Some(*s) != self.default_schema)
            .map(str::to_string);
        TableName {
            schema,
            name: table.name.clone(),
        }
    }

    /// Folds a type spelling to the canonical lower-case tag.
    ///
    /// Parenthesised arguments are removed wherever they appear, so
    /// `timestamp(3) with time zone` folds like `timestamp with time zone`;
    /// see [`Self::split_type`] for reading them out of a declaration.
    #[must_use]
    pub fn normalize_type(&self, raw: &str) -> String {
        let mut base = String::with_capacity(raw.len());
        let mut depth = 0usize;
        for ch in raw.chars() {
            match ch {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                _ if depth == 0 => base.push(ch),
                _ => {}
            }
        }
        let lowered = base
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase();
        match self.type_aliases.iter().find(|(alias, _)| *alias == lowered) {
            Some((_, canonical)) => (*canonical).to_string(),
            None => lowered,
        }
    }

    /// Splits a declared type such as `varchar(50)`, `decimal(10,2)` or
    /// `timestamp(3) with time zone`.
    #[must_use]
    pub fn split_type(&self, declared: &str) -> TypeDeclaration {
        let declared = declared.trim();
        let data_type = self.normalize_type(declared);
        let args: Vec<&str> = declared
            .find('(')
            .and_then(|open| {
                let close = open + declared[open..].find(')')?;
                Some(&declared[open + 1..close])
            })
            .map(|group| {
                group
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let mut decl = TypeDeclaration {
            data_type,
            ..TypeDeclaration::default()
        };
        match args.as_slice() {
            [] => {}
            [single] if !self.has_precision(&decl.data_type) => {
                decl.length = Some((*single).to_string());
            }
            [precision] => decl.precision = precision.parse().ok(),
            [precision, scale, ..] => {
                decl.precision = precision.parse().ok();
                decl.scale = scale.parse().ok();
            }
        }
        decl
    }

    /// Returns `true` when the canonical type takes a size descriptor.
    #[must_use]
    pub fn has_length(&self, normalized_type: &str) -> bool {
        self.length_types.contains(&normalized_type)
    }

    /// Returns `true` when the canonical type takes precision and scale.
    #[must_use]
    pub fn has_precision(&self, normalized_type: &str) -> bool {
        self.precision_types.contains(&normalized_type)
    }

    /// Returns the engine's implicit length for a sized type.
    #[must_use]
    pub fn default_length(&self, normalized_type: &str) -> Option<&'static str> {
        self.default_lengths
            .iter()
            .find(|(ty, _)| *ty == normalized_type)
            .map(|(_, len)| *len)
    }

    /// Returns the column's length as the engine stores it: the explicit
    /// length, one written inline in the type, or the implicit default.
    #[must_use]
    pub fn effective_length(&self, column: &Column) -> Option<String> {
        let decl = self.split_type(&column.data_type);
        if !self.has_length(&decl.data_type) {
            return None;
        }
        column
            .length
            .as_deref()
            .or(decl.length.as_deref())
            .or_else(|| self.default_length(&decl.data_type))
            .map(|len| {
                if len.eq_ignore_ascii_case("max") {
                    "MAX".to_string()
                } else {
                    len.trim().to_string()
                }
            })
    }

    /// Returns the column's precision and scale, explicit or written inline
    /// in the type.
    #[must_use]
    pub fn effective_precision(&self, column: &Column) -> (Option<u32>, Option<u32>) {
        let decl = self.split_type(&column.data_type);
        (
            column.precision.or(decl.precision),
            column.scale.or(decl.scale),
        )
    }

    /// Canonical form of an SQL expression (defaults, checks, predicates,
    /// computed columns).
    #[must_use]
    pub fn normalize_expression(&self, raw: &str) -> String {
        expression::normalize(raw, self.kind)
    }

    /// Canonical rendering of a default value.
    ///
    /// Returns `None` for an absent or NULL default. Idempotent: feeding the
    /// result back through [`Self::parse_default`] and `format_default`
    /// yields the same text.
    #[must_use]
    pub fn format_default(&self, value: &str) -> Option<String> {
        let normalized = self.normalize_expression(value);
        if normalized.is_empty() || normalized == "NULL" {
            return None;
        }
        Some(match normalized.as_str() {
            "TRUE" => self.boolean_literals.0.to_string(),
            "FALSE" => self.boolean_literals.1.to_string(),
            _ => normalized,
        })
    }

    /// Reads a default as reported by the catalog into canonical form.
    #[must_use]
    pub fn parse_default(&self, raw: &str) -> Option<String> {
        self.format_default(raw)
    }

    /// Compares two optional defaults after formatting.
    #[must_use]
    pub fn defaults_equal(&self, a: Option<&str>, b: Option<&str>) -> bool {
        a.and_then(|v| self.format_default(v)) == b.and_then(|v| self.format_default(v))
    }

    /// Shortens `name` to the engine's identifier limit.
    ///
    /// Names within the limit come back unchanged. Longer names keep a prefix
    /// and gain `_` plus eight hex digits of SHA-256 over `seed` and the full
    /// name, so the result is deterministic across runs.
    #[must_use]
    pub fn truncate_name(&self, name: &str, seed: &str) -> String {
        if name.chars().count() <= self.max_identifier_length {
            return name.to_string();
        }
        let suffix = naming::short_hash(&format!("{}:{}", seed, name), 8);
        let keep = self.max_identifier_length.saturating_sub(suffix.len() + 1);
        let prefix: String = name.chars().take(keep).collect();
        format!("{}_{}", prefix, suffix)
    }

    /// Returns the placeholder for the `index`-th (1-based) parameter.
    #[must_use]
    pub fn placeholder(&self, index: usize) -> String {
        match self.parameter_style {
            ParameterStyle::Question => "?".to_string(),
            ParameterStyle::Dollar => format!("${}", index),
            ParameterStyle::AtP => format!("@p{}", index),
            ParameterStyle::Colon => format!(":{}", index),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

/// Quotes a string literal, doubling embedded single quotes.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
