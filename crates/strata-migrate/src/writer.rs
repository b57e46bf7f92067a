//! Migration files.
//!
//! A migration is stored as a JSON document named `<id>-<name>.json` holding
//! its up and down statements, so generated SQL can be reviewed and edited
//! before it runs.

use std::path::{Path, PathBuf};

use strata_core::ledger::Migration;
use strata_core::SchemaError;
use tracing::info;

use crate::error::{MigrateError, Result};

/// Builds `<Name><timestamp>` from free text such as `add user email`.
pub fn generate_migration_name(name: &str, timestamp: i64) -> Result<String> {
    let pascal: String = name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                format!("{}{}", first.to_ascii_uppercase(), chars.as_str())
            })
        })
        .collect();
    if pascal.is_empty() {
        return Err(SchemaError::InvalidMigrationName(name.to_string()).into());
    }
    Ok(format!("{}{}", pascal, timestamp))
}

/// Writes migration files into a directory.
#[derive(Debug, Clone)]
pub struct MigrationWriter {
    dir: PathBuf,
}

impl MigrationWriter {
    /// Creates a writer for `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path the migration would be written to.
    #[must_use]
    pub fn path_for(&self, migration: &Migration) -> PathBuf {
        self.dir
            .join(format!("{}-{}.json", migration.id, migration.name))
    }

    /// The file content for `migration`.
    pub fn preview(&self, migration: &Migration) -> Result<String> {
        Ok(serde_json::to_string_pretty(migration)?)
    }

    /// Writes `migration`, refusing to overwrite an existing file.
    pub fn write(&self, migration: &Migration) -> Result<PathBuf> {
        let path = self.path_for(migration);
        if path.exists() {
            return Err(MigrateError::MigrationExists(path));
        }
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(&path, self.preview(migration)?)?;
        info!(path = %path.display(), "Migration file written");
        Ok(path)
    }
}

/// Loads every `*.json` migration in `dir`, ordered by id.
pub fn load_migrations(dir: &Path) -> Result<Vec<Migration>> {
    if !dir.is_dir() {
        return Err(MigrateError::MigrationsDirNotFound(dir.to_path_buf()));
    }
    let mut migrations = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let content = std::fs::read_to_string(&path)?;
        let migration: Migration =
            serde_json::from_str(&content).map_err(|e| MigrateError::ParseError {
                path: path.clone(),
                message: e.to_string(),
            })?;
        migrations.push(migration);
    }
    migrations.sort_by_key(|m| m.id);
    Ok(migrations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migration(name: &str) -> Migration {
        Migration::from_sql(
            name,
            &["ALTER TABLE \"post\" ADD COLUMN \"summary\" text"],
            &["ALTER TABLE \"post\" DROP COLUMN \"summary\""],
        )
        .unwrap()
    }

    #[test]
    fn test_generate_migration_name() {
        assert_eq!(
            generate_migration_name("add user email", 1_700_000_000_000).unwrap(),
            "AddUserEmail1700000000000"
        );
        assert_eq!(
            generate_migration_name("create-posts_table", 1_700_000_000_000).unwrap(),
            "CreatePostsTable1700000000000"
        );
        assert!(generate_migration_name("--", 1_700_000_000_000).is_err());
    }

    #[test]
    fn test_write_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MigrationWriter::new(dir.path());

        let second = migration("AddSummary1700000000002");
        let first = migration("CreatePost1700000000001");
        let path = writer.write(&second).unwrap();
        writer.write(&first).unwrap();
        assert!(path.ends_with("1700000000002-AddSummary1700000000002.json"));

        let loaded = load_migrations(dir.path()).unwrap();
        assert_eq!(loaded, vec![first, second]);
    }

    #[test]
    fn test_write_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MigrationWriter::new(dir.path());
        let m = migration("CreatePost1700000000001");
        writer.write(&m).unwrap();
        assert!(matches!(writer.write(&m), Err(MigrateError::MigrationExists(_))));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            load_migrations(&missing),
            Err(MigrateError::MigrationsDirNotFound(_))
        ));

        std::fs::write(dir.path().join("bad.json"), "[").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        assert!(matches!(
            load_migrations(dir.path()),
            Err(MigrateError::ParseError { .. })
        ));
    }
}
