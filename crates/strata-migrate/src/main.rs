//! strata CLI
//!
//! Command-line tool for schema synchronization and migrations.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use strata_migrate::prelude::*;

/// Schema diffing and migrations for SQL databases.
#[derive(Parser)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON options file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database URL (`sqlite:app.db`, `postgres://...`).
    #[arg(short, long, env = "DATABASE_URL")]
    database: Option<String>,

    /// Database engine, when the URL does not tell.
    #[arg(long)]
    dialect: Option<DialectKind>,

    /// Migrations directory.
    #[arg(short, long)]
    migrations_dir: Option<PathBuf>,

    /// Name of the migrations ledger table.
    #[arg(long)]
    migrations_table: Option<String>,

    /// JSON file holding the desired schema.
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations.
    #[command(name = "migration:run")]
    MigrationRun {
        /// Transaction mode: all, each or none.
        #[arg(short, long)]
        transaction: Option<TransactionMode>,

        /// Record migrations as applied without running them.
        #[arg(long)]
        fake: bool,
    },

    /// Revert the most recently applied migration.
    #[command(name = "migration:revert")]
    MigrationRevert {
        /// Transaction mode: all, each or none.
        #[arg(short, long)]
        transaction: Option<TransactionMode>,

        /// Remove the ledger record without running the down statements.
        #[arg(long)]
        fake: bool,
    },

    /// Show migration status.
    #[command(name = "migration:show")]
    MigrationShow,

    /// Write a migration for the difference to the desired schema.
    #[command(name = "migration:generate")]
    MigrationGenerate {
        /// Migration description, e.g. "add post summary".
        name: String,

        /// Print the migration without writing a file.
        #[arg(long)]
        dry_run: bool,
    },

    /// Move the database to the desired schema.
    #[command(name = "schema:sync")]
    SchemaSync {
        /// Drop everything first.
        #[arg(long)]
        drop: bool,
    },

    /// Print the SQL schema:sync would run.
    #[command(name = "schema:log")]
    SchemaLog,

    /// Drop every table and view.
    #[command(name = "schema:drop")]
    SchemaDrop,
}

fn options(cli: &Cli) -> anyhow::Result<DataSourceOptions> {
    let mut options = match &cli.config {
        Some(path) => DataSourceOptions::load(path)?,
        None => DataSourceOptions::default(),
    };
    if let Some(url) = &cli.database {
        options.url.clone_from(url);
    }
    if let Some(kind) = cli.dialect {
        options.dialect = Some(kind);
    }
    if let Some(dir) = &cli.migrations_dir {
        options.migrations_dir.clone_from(dir);
    }
    if let Some(table) = &cli.migrations_table {
        options.migrations_table.clone_from(table);
    }
    if let Some(schema) = &cli.schema {
        options.schema_file = Some(schema.clone());
    }
    Ok(options)
}

fn known_migrations(dir: &Path) -> anyhow::Result<Vec<Migration>> {
    match load_migrations(dir) {
        Ok(migrations) => Ok(migrations),
        Err(MigrateError::MigrationsDirNotFound(path)) => {
            warn!(dir = %path.display(), "Migrations directory not found");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_script(sql: &SqlInMemory) {
    for query in &sql.up_queries {
        println!("{};", query.sql);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let options = options(&cli)?;
    let source = DataSource::connect(options.clone()).await?;

    match cli.command {
        Commands::MigrationRun { transaction, fake } => {
            let known = known_migrations(&options.migrations_dir)?;
            let run = RunOptions::default()
                .transaction(transaction.unwrap_or(options.transaction))
                .fake(fake);
            let applied = source.run_migrations(&known, run).await?;
            info!(count = applied.len(), "Migration run finished");
        }

        Commands::MigrationRevert { transaction, fake } => {
            let known = known_migrations(&options.migrations_dir)?;
            let run = RunOptions::default()
                .transaction(transaction.unwrap_or(options.transaction))
                .fake(fake);
            match source.revert_last_migration(&known, run).await {
                Ok(migration) => info!(name = %migration.name, "Reverted"),
                Err(MigrateError::NothingToRevert) => info!("No migrations have been applied, nothing to revert."),
                Err(e) => return Err(e.into()),
            }
        }

        Commands::MigrationShow => {
            let known = known_migrations(&options.migrations_dir)?;
            let statuses = source.show_migrations(&known).await?;
            if statuses.is_empty() {
                info!("No migrations found.");
            } else {
                println!("\nMigrations:");
                println!("{:-<60}", "");
                for status in &statuses {
                    let mark = if status.applied { "X" } else { " " };
                    println!(" [{}] {}", mark, status.name);
                }
                println!();
            }
        }

        Commands::MigrationGenerate { name, dry_run } => {
            let desired = options.load_schema()?;
            match source.generate_migration(&desired, &name).await? {
                None => info!("No changes in database schema were found."),
                Some(migration) => {
                    let writer = MigrationWriter::new(&options.migrations_dir);
                    if dry_run {
                        println!("Would create migration: {}", writer.path_for(&migration).display());
                        println!("\n{}", writer.preview(&migration)?);
                    } else {
                        let path = writer.write(&migration)?;
                        info!("Created migration: {}", path.display());
                    }
                }
            }
        }

        Commands::SchemaSync { drop } => {
            let desired = options.load_schema()?;
            let sql = source.synchronize(&desired, drop).await?;
            info!(statements = sql.up_queries.len(), "Schema synchronized");
        }

        Commands::SchemaLog => {
            let desired = options.load_schema()?;
            let sql = source.log_sync_sql(&desired).await?;
            if sql.up_queries.is_empty() {
                info!("Your schema is up to date, there are no queries to be executed.");
            } else {
                print_script(&sql);
            }
        }

        Commands::SchemaDrop => {
            source.drop_database().await?;
            info!("Database schema dropped.");
        }
    }

    source.destroy().await?;
    Ok(())
}
