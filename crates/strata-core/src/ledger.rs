//! Migration bookkeeping that does not need a database.
//!
//! A [`Migration`] is a named, ordered pair of statement lists. Its id is the
//! 13-digit millisecond timestamp that ends its name
//! (`CreateUsers1700000000000`), which also fixes the order migrations run
//! in. [`pending`] and [`last_applied`] decide what to run or revert from
//! the rows of the history table.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::diff::SchemaDiff;
use crate::error::{Result, SchemaError};
use crate::query::Query;

/// Number of trailing digits that make up a migration id.
const ID_DIGITS: usize = 13;

/// Extracts the id from a migration name.
pub fn migration_id(name: &str) -> Result<i64> {
    let digits = name
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .count();
    if digits < ID_DIGITS {
        return Err(SchemaError::InvalidMigrationName(name.to_string()));
    }
    name[name.len() - ID_DIGITS..]
        .parse()
        .map_err(|_| SchemaError::InvalidMigrationName(name.to_string()))
}

/// A migration: statements to apply and statements to undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    /// Ordering key.
    pub id: i64,
    /// Migration name.
    pub name: String,
    /// Statements that apply the migration.
    pub up: Vec<Query>,
    /// Statements that undo it, in execution order.
    pub down: Vec<Query>,
}

impl Migration {
    /// Creates a migration whose id is read from its name.
    pub fn new(name: impl Into<String>, up: Vec<Query>, down: Vec<Query>) -> Result<Self> {
        let name = name.into();
        let id = migration_id(&name)?;
        Ok(Self { id, name, up, down })
    }

    /// Creates a migration with an explicit id.
    #[must_use]
    pub fn with_id(id: i64, name: impl Into<String>, up: Vec<Query>, down: Vec<Query>) -> Self {
        Self {
            id,
            name: name.into(),
            up,
            down,
        }
    }

    /// Creates a migration from raw SQL strings.
    pub fn from_sql(name: impl Into<String>, up: &[&str], down: &[&str]) -> Result<Self> {
        Self::new(
            name,
            up.iter().map(|sql| Query::new(*sql)).collect(),
            down.iter().map(|sql| Query::new(*sql)).collect(),
        )
    }

    /// Renders a diff into a migration.
    pub fn from_diff(name: impl Into<String>, diff: &SchemaDiff, dialect: &Dialect) -> Result<Self> {
        let sql = diff.to_sql(dialect)?;
        Self::new(name, sql.up_queries, sql.down_queries)
    }
}

/// A row of the history table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedMigration {
    /// Migration id.
    pub id: i64,
    /// Migration name.
    pub name: String,
    /// When it was applied, in milliseconds since the Unix epoch.
    pub applied_at: i64,
}

/// Whether a known migration has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    /// Migration id.
    pub id: i64,
    /// Migration name.
    pub name: String,
    /// Whether the history table records it.
    pub applied: bool,
}

fn ensure_unique_ids<'a>(migrations: impl IntoIterator<Item = &'a Migration>) -> Result<()> {
    let mut seen: BTreeMap<i64, &str> = BTreeMap::new();
    for migration in migrations {
        if let Some(first) = seen.insert(migration.id, &migration.name) {
            return Err(SchemaError::DuplicateMigration {
                id: migration.id,
                first: first.to_string(),
                second: migration.name.clone(),
            });
        }
    }
    Ok(())
}

/// The migrations of `known` that `applied` does not record, ordered by id.
pub fn pending<'a>(known: &'a [Migration], applied: &[AppliedMigration]) -> Result<Vec<&'a Migration>> {
    ensure_unique_ids(known)?;
    let mut pending: Vec<&Migration> = known
        .iter()
        .filter(|m| !applied.iter().any(|a| a.id == m.id))
        .collect();
    pending.sort_by_key(|m| m.id);
    Ok(pending)
}

/// The most recently applied record: latest `applied_at`, then highest id.
#[must_use]
pub fn last_applied(applied: &[AppliedMigration]) -> Option<&AppliedMigration> {
    applied.iter().max_by_key(|a| (a.applied_at, a.id))
}

/// Applied status of every known migration, ordered by id.
pub fn statuses(known: &[Migration], applied: &[AppliedMigration]) -> Result<Vec<MigrationStatus>> {
    ensure_unique_ids(known)?;
    let mut statuses: Vec<MigrationStatus> = known
        .iter()
        .map(|m| MigrationStatus {
            id: m.id,
            name: m.name.clone(),
            applied: applied.iter().any(|a| a.id == m.id),
        })
        .collect();
    statuses.sort_by_key(|s| s.id);
    Ok(statuses)
}

/// Transaction boundaries for a migration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionMode {
    /// One transaction around the whole batch.
    #[default]
    All,
    /// One transaction per migration.
    Each,
    /// No transaction.
    None,
}

impl fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Each => "each",
            Self::None => "none",
        })
    }
}

impl FromStr for TransactionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "each" => Ok(Self::Each),
            "none" => Ok(Self::None),
            other => Err(format!(
                "unknown transaction mode '{}' (expected all, each or none)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migration(name: &str) -> Migration {
        Migration::from_sql(name, &["SELECT 1"], &[]).unwrap()
    }

    fn applied(id: i64, applied_at: i64) -> AppliedMigration {
        AppliedMigration {
            id,
            name: format!("M{}", id),
            applied_at,
        }
    }

    #[test]
    fn id_comes_from_trailing_timestamp() {
        assert_eq!(migration_id("CreateUsers1700000000000").unwrap(), 1_700_000_000_000);
        assert_eq!(migration_id("x_99_1700000000001").unwrap(), 1_700_000_000_001);
    }

    #[test]
    fn names_without_timestamp_are_rejected() {
        for name in ["CreateUsers", "CreateUsers170000", ""] {
            assert!(matches!(
                migration_id(name),
                Err(SchemaError::InvalidMigrationName(_))
            ));
        }
    }

    #[test]
    fn longer_digit_runs_use_the_last_thirteen() {
        assert_eq!(migration_id("V21700000000000").unwrap(), 1_700_000_000_000);
    }

    #[test]
    fn pending_is_ordered_and_skips_applied() {
        let known = vec![
            migration("Third1700000000003"),
            migration("First1700000000001"),
            migration("Second1700000000002"),
        ];
        let done = vec![applied(1_700_000_000_001, 10)];
        let names: Vec<&str> = pending(&known, &done)
            .unwrap()
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["Second1700000000002", "Third1700000000003"]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let known = vec![migration("A1700000000001"), migration("B1700000000001")];
        let err = pending(&known, &[]).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::DuplicateMigration { id: 1_700_000_000_001, .. }
        ));
    }

    #[test]
    fn last_applied_prefers_time_then_id() {
        let rows = vec![applied(3, 100), applied(1, 200), applied(2, 200)];
        assert_eq!(last_applied(&rows).unwrap().id, 2);
        assert!(last_applied(&[]).is_none());
    }

    #[test]
    fn statuses_mark_applied() {
        let known = vec![migration("B1700000000002"), migration("A1700000000001")];
        let rows = vec![applied(1_700_000_000_001, 5)];
        let statuses = statuses(&known, &rows).unwrap();
        assert_eq!(statuses[0].name, "A1700000000001");
        assert!(statuses[0].applied);
        assert!(!statuses[1].applied);
    }

    #[test]
    fn transaction_mode_parses() {
        assert_eq!("each".parse::<TransactionMode>().unwrap(), TransactionMode::Each);
        assert_eq!("ALL".parse::<TransactionMode>().unwrap(), TransactionMode::All);
        assert_eq!("none".parse::<TransactionMode>().unwrap(), TransactionMode::None);
        assert!("sometimes".parse::<TransactionMode>().is_err());
        assert_eq!(TransactionMode::default().to_string(), "all");
    }

    #[test]
    fn migration_round_trips_through_json() {
        let m = Migration::from_sql("AddBio1700000000000", &["ALTER TABLE a ADD b int"], &["ALTER TABLE a DROP COLUMN b"])
            .unwrap();
        let json = serde_json::to_string(&m).unwrap();
        let back: Migration = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
