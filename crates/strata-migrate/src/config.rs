//! Data source configuration.
//!
//! Options are read from a JSON file and then overridden from the command
//! line. Everything has a default except the connection URL.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::any::AnyPoolOptions;
use strata_core::dialect::{Dialect, DialectKind};
use strata_core::ledger::TransactionMode;
use strata_core::schema::{Schema, TableName};

use crate::error::{MigrateError, Result};

/// Connection and ledger settings for a [`DataSource`](crate::DataSource).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSourceOptions {
    /// Connection URL (`sqlite::memory:`, `postgres://...`).
    pub url: String,
    /// Engine; inferred from the URL scheme when absent.
    pub dialect: Option<DialectKind>,
    /// Name of the ledger table.
    pub migrations_table: String,
    /// Directory holding migration files.
    pub migrations_dir: PathBuf,
    /// JSON file holding the desired schema.
    pub schema_file: Option<PathBuf>,
    /// Default transaction mode for migration runs.
    pub transaction: TransactionMode,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
}

impl Default for DataSourceOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            dialect: None,
            migrations_table: "migrations".to_string(),
            migrations_dir: PathBuf::from("migrations"),
            schema_file: None,
            transaction: TransactionMode::All,
            max_connections: 5,
        }
    }
}

impl DataSourceOptions {
    /// Creates options for `url` with every other setting at its default.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Sets the engine explicitly.
    #[must_use]
    pub const fn dialect(mut self, kind: DialectKind) -> Self {
        self.dialect = Some(kind);
        self
    }

    /// Sets the ledger table name.
    #[must_use]
    pub fn migrations_table(mut self, name: impl Into<String>) -> Self {
        self.migrations_table = name.into();
        self
    }

    /// Sets the migrations directory.
    #[must_use]
    pub fn migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = dir.into();
        self
    }

    /// Sets the desired-schema file.
    #[must_use]
    pub fn schema_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_file = Some(path.into());
        self
    }

    /// Sets the default transaction mode.
    #[must_use]
    pub const fn transaction(mut self, mode: TransactionMode) -> Self {
        self.transaction = mode;
        self
    }

    /// Sets the pool size.
    #[must_use]
    pub const fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Loads options from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|e| match e {
            MigrateError::Serialization(e) => MigrateError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
            other => other,
        })
    }

    /// Parses options from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        Ok(options)
    }

    /// Checks that the options can be used to connect.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(MigrateError::Config("database url is required".to_string()));
        }
        if self.migrations_table.trim().is_empty() {
            return Err(MigrateError::Config(
                "migrations table name must not be empty".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(MigrateError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        self.resolve_dialect()?;
        Ok(())
    }

    /// The dialect record for these options.
    pub fn resolve_dialect(&self) -> Result<&'static Dialect> {
        let kind = match self.dialect {
            Some(kind) => kind,
            None => DialectKind::from_url(&self.url).ok_or_else(|| {
                MigrateError::Config(format!(
                    "cannot infer the dialect from '{}', set it explicitly",
                    self.url
                ))
            })?,
        };
        Ok(Dialect::for_kind(kind))
    }

    /// The ledger table, split on a `schema.table` qualifier.
    #[must_use]
    pub fn migrations_table_name(&self) -> TableName {
        match self.migrations_table.split_once('.') {
            Some((schema, name)) => TableName::qualified(schema, name),
            None => TableName::new(self.migrations_table.as_str()),
        }
    }

    /// `true` for SQLite databases that live only as long as their connection.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    /// The URL handed to the driver. CockroachDB speaks the Postgres protocol.
    #[must_use]
    pub fn connect_url(&self) -> String {
        match self.url.strip_prefix("cockroachdb://") {
            Some(rest) => format!("postgres://{}", rest),
            None => self.url.clone(),
        }
    }

    /// Pool settings. An in-memory SQLite database is pinned to a single
    /// connection that is never recycled.
    #[must_use]
    pub fn pool_options(&self) -> AnyPoolOptions {
        if self.is_in_memory() {
            AnyPoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            AnyPoolOptions::new()
                .max_connections(self.max_connections)
                .acquire_timeout(Duration::from_secs(30))
        }
    }

    /// Reads the desired schema from `schema_file`.
    pub fn load_schema(&self) -> Result<Schema> {
        let path = self
            .schema_file
            .as_deref()
            .ok_or_else(|| MigrateError::Config("no schema file configured".to_string()))?;
        load_schema(path)
    }
}

/// Reads a desired schema from a JSON file.
pub fn load_schema(path: &Path) -> Result<Schema> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| MigrateError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let options = DataSourceOptions::from_json(r#"{"url": "sqlite::memory:"}"#).unwrap();
        assert_eq!(options.migrations_table, "migrations");
        assert_eq!(options.migrations_dir, PathBuf::from("migrations"));
        assert_eq!(options.transaction, TransactionMode::All);
        assert!(options.is_in_memory());
        options.validate().unwrap();
    }

    #[test]
    fn dialect_comes_from_url_or_setting() {
        let options = DataSourceOptions::new("postgres://localhost/app");
        assert_eq!(options.resolve_dialect().unwrap().kind, DialectKind::Postgres);

        let options = DataSourceOptions::new("postgres://localhost/app").dialect(DialectKind::Cockroach);
        assert_eq!(options.resolve_dialect().unwrap().kind, DialectKind::Cockroach);

        let options = DataSourceOptions::new("file.db");
        assert!(matches!(options.validate(), Err(MigrateError::Config(_))));
    }

    #[test]
    fn cockroach_urls_connect_over_postgres() {
        let options = DataSourceOptions::new("cockroachdb://root@localhost:26257/app");
        assert_eq!(options.connect_url(), "postgres://root@localhost:26257/app");
        assert_eq!(options.resolve_dialect().unwrap().kind, DialectKind::Cockroach);
    }

    #[test]
    fn ledger_table_may_be_qualified() {
        let options = DataSourceOptions::new("postgres://localhost/app").migrations_table("ops.history");
        assert_eq!(options.migrations_table_name(), TableName::qualified("ops", "history"));
        assert_eq!(
            DataSourceOptions::new("sqlite::memory:").migrations_table_name(),
            TableName::new("migrations")
        );
    }

    #[test]
    fn empty_url_is_rejected() {
        let err = DataSourceOptions::default().validate().unwrap_err();
        assert!(err.to_string().contains("database url is required"));
    }

    #[test]
    fn transaction_mode_is_lowercase_in_json() {
        let options =
            DataSourceOptions::from_json(r#"{"url": "sqlite:app.db", "transaction": "each"}"#).unwrap();
        assert_eq!(options.transaction, TransactionMode::Each);
    }

    #[test]
    fn load_reports_the_file_on_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = DataSourceOptions::load(&path).unwrap_err();
        assert!(matches!(err, MigrateError::ParseError { path: p, .. } if p == path));
    }
}
