//! Migration executor.
//!
//! This module applies and reverts migrations against a database. A batch
//! runs sequentially, in id order, on a single acquired connection.

use sqlx::{AnyConnection, AnyPool};
use sqlx::Connection;
use strata_core::dialect::{Dialect, DialectKind};
use strata_core::ledger::{
    self, AppliedMigration, Migration, MigrationStatus, TransactionMode,
};
use strata_core::query::Query;
use strata_core::schema::TableName;
use tracing::{debug, info, warn};

use crate::error::{MigrateError, Result};
use crate::history::{execute_all, MigrationHistory};

/// How a batch of migrations is run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Transaction boundaries.
    pub transaction: TransactionMode,
    /// Only write or remove ledger rows, without running any SQL.
    pub fake: bool,
}

impl RunOptions {
    /// Sets the transaction mode.
    #[must_use]
    pub const fn transaction(mut self, mode: TransactionMode) -> Self {
        self.transaction = mode;
        self
    }

    /// Enables or disables fake runs.
    #[must_use]
    pub const fn fake(mut self, fake: bool) -> Self {
        self.fake = fake;
        self
    }
}

fn partial_failure(applied: &[&Migration], failed: &Migration, source: MigrateError) -> MigrateError {
    MigrateError::PartialBatchFailure {
        applied: applied.iter().map(|m| m.name.clone()).collect(),
        failed: failed.name.clone(),
        source: Box::new(source),
    }
}

/// Executes migrations against a database.
pub struct MigrationExecutor {
    pool: AnyPool,
    dialect: &'static Dialect,
    history: MigrationHistory,
}

impl MigrationExecutor {
    /// Creates a new migration executor whose ledger lives in `table`.
    #[must_use]
    pub fn new(pool: AnyPool, dialect: &'static Dialect, table: TableName) -> Self {
        Self {
            pool,
            dialect,
            history: MigrationHistory::new(table, dialect),
        }
    }

    /// Returns the migration history.
    #[must_use]
    pub const fn history(&self) -> &MigrationHistory {
        &self.history
    }

    /// Ensures the ledger table exists.
    pub async fn init(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        self.history.ensure_table(&mut conn).await
    }

    /// Every ledger record, ordered by id.
    pub async fn applied(&self) -> Result<Vec<AppliedMigration>> {
        let mut conn = self.pool.acquire().await?;
        self.history.ensure_table(&mut conn).await?;
        self.history.applied(&mut conn).await
    }

    /// Applied status of every known migration.
    pub async fn show_migrations(&self, known: &[Migration]) -> Result<Vec<MigrationStatus>> {
        let applied = self.applied().await?;
        Ok(ledger::statuses(known, &applied)?)
    }

    /// `true` when some known migration is not recorded in the ledger.
    pub async fn has_pending_migrations(&self, known: &[Migration]) -> Result<bool> {
        let applied = self.applied().await?;
        Ok(!ledger::pending(known, &applied)?.is_empty())
    }

    /// SQLite refuses to drop or rebuild a referenced table while foreign
    /// keys are enforced. The pragma is a no-op inside a transaction.
    async fn set_foreign_keys(&self, conn: &mut AnyConnection, enabled: bool) -> Result<()> {
        if self.dialect.kind != DialectKind::Sqlite {
            return Ok(());
        }
        let sql = if enabled {
            "PRAGMA foreign_keys = ON"
        } else {
            "PRAGMA foreign_keys = OFF"
        };
        debug!(sql = %sql, "Executing SQL");
        sqlx::query(sql).execute(&mut *conn).await?;
        Ok(())
    }

    async fn apply(&self, conn: &mut AnyConnection, migration: &Migration, fake: bool) -> Result<()> {
        if fake {
            info!(id = migration.id, name = %migration.name, "Marking migration as applied");
        } else {
            info!(id = migration.id, name = %migration.name, "Applying migration");
            execute_all(conn, &migration.up).await?;
        }
        self.history.record_applied(conn, migration).await
    }

    async fn revert(&self, conn: &mut AnyConnection, migration: &Migration, fake: bool) -> Result<()> {
        if fake {
            info!(id = migration.id, name = %migration.name, "Marking migration as reverted");
        } else {
            info!(id = migration.id, name = %migration.name, "Reverting migration");
            execute_all(conn, &migration.down).await?;
        }
        self.history.record_reverted(conn, migration.id).await
    }

    async fn apply_batch(
        &self,
        conn: &mut AnyConnection,
        pending: &[&Migration],
        options: RunOptions,
    ) -> Result<()> {
        match options.transaction {
            TransactionMode::All => {
                let mut tx = conn.begin().await?;
                for migration in pending {
                    if let Err(source) = self.apply(&mut tx, migration, options.fake).await {
                        if let Err(e) = tx.rollback().await {
                            warn!(error = %e, "Rollback failed");
                        }
                        return Err(MigrateError::MigrationFailed {
                            name: migration.name.clone(),
                            source: Box::new(source),
                        });
                    }
                }
                tx.commit().await?;
            }
            TransactionMode::Each => {
                for (done, migration) in pending.iter().enumerate() {
                    let applied = &pending[..done];
                    let mut tx = conn
                        .begin()
                        .await
                        .map_err(|e| partial_failure(applied, migration, e.into()))?;
                    if let Err(source) = self.apply(&mut tx, migration, options.fake).await {
                        if let Err(e) = tx.rollback().await {
                            warn!(error = %e, "Rollback failed");
                        }
                        return Err(partial_failure(applied, migration, source));
                    }
                    tx.commit()
                        .await
                        .map_err(|e| partial_failure(applied, migration, e.into()))?;
                }
            }
            TransactionMode::None => {
                for (done, migration) in pending.iter().enumerate() {
                    if let Err(source) = self.apply(conn, migration, options.fake).await {
                        return Err(partial_failure(&pending[..done], migration, source));
                    }
                }
            }
        }
        Ok(())
    }

    /// Applies every pending migration in id order and returns them.
    pub async fn run_migrations(&self, known: &[Migration], options: RunOptions) -> Result<Vec<Migration>> {
        let mut conn = self.pool.acquire().await?;
        self.history.ensure_table(&mut conn).await?;
        let applied = self.history.applied(&mut conn).await?;
        let pending = ledger::pending(known, &applied)?;

        if pending.is_empty() {
            info!("No pending migrations");
            return Ok(Vec::new());
        }
        info!(
            count = pending.len(),
            transaction = %options.transaction,
            fake = options.fake,
            "Running migrations"
        );

        self.set_foreign_keys(&mut conn, false).await?;
        let result = self.apply_batch(&mut conn, &pending, options).await;
        let restored = self.set_foreign_keys(&mut conn, true).await;
        result?;
        restored?;

        info!(count = pending.len(), "Migrations applied successfully");
        Ok(pending.into_iter().cloned().collect())
    }

    /// Undoes the most recently applied migration and returns it.
    pub async fn revert_last_migration(&self, known: &[Migration], options: RunOptions) -> Result<Migration> {
        let mut conn = self.pool.acquire().await?;
        self.history.ensure_table(&mut conn).await?;
        let applied = self.history.applied(&mut conn).await?;

        let last = ledger::last_applied(&applied).ok_or(MigrateError::NothingToRevert)?;
        let migration = known
            .iter()
            .find(|m| m.id == last.id)
            .cloned()
            .ok_or_else(|| MigrateError::MigrationNotFound(last.name.clone()))?;

        self.set_foreign_keys(&mut conn, false).await?;
        let result = match options.transaction {
            TransactionMode::None => self.revert(&mut conn, &migration, options.fake).await,
            TransactionMode::All | TransactionMode::Each => {
                let mut tx = conn.begin().await?;
                match self.revert(&mut tx, &migration, options.fake).await {
                    Ok(()) => tx.commit().await.map_err(MigrateError::from),
                    Err(source) => {
                        if let Err(e) = tx.rollback().await {
                            warn!(error = %e, "Rollback failed");
                        }
                        Err(MigrateError::MigrationFailed {
                            name: migration.name.clone(),
                            source: Box::new(source),
                        })
                    }
                }
            }
        };
        let restored = self.set_foreign_keys(&mut conn, true).await;
        result?;
        restored?;

        info!(id = migration.id, name = %migration.name, "Migration reverted successfully");
        Ok(migration)
    }

    /// Runs `queries` in one transaction.
    pub async fn execute_in_transaction(&self, queries: &[Query]) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        self.set_foreign_keys(&mut conn, false).await?;
        let result = async {
            let mut tx = conn.begin().await?;
            execute_all(&mut tx, queries).await?;
            tx.commit().await?;
            Ok::<(), MigrateError>(())
        }
        .await;
        let restored = self.set_foreign_keys(&mut conn, true).await;
        result?;
        restored
    }
}
