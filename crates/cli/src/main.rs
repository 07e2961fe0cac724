//! `labelpizza` — workspace sync, export, compare, and merge.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use labelpizza_core::merge::ConflictPolicy;
use labelpizza_db::{EntityStore, MemoryStore, PgStore};
use labelpizza_sync::engine::SyncOptions;
use labelpizza_sync::{compare, merge, workspace};

#[derive(Parser)]
#[command(name = "labelpizza", about = "Label Pizza workspace sync tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync a workspace folder into the database.
    Sync {
        /// Workspace folder holding the desired state.
        workspace: PathBuf,
        /// Postgres connection string. Falls back to DATABASE_URL.
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
        /// Maximum concurrent store operations per pipeline phase.
        #[arg(long, default_value_t = 16)]
        parallelism: usize,
        /// Validate and plan against an empty in-memory store instead of
        /// touching Postgres.
        #[arg(long)]
        dry_run: bool,
    },
    /// Export the database state as a workspace folder.
    Export {
        /// Output folder.
        out: PathBuf,
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },
    /// Diff two workspace folders and write per-type reports.
    Compare {
        folder1: PathBuf,
        folder2: PathBuf,
        /// Report output folder.
        #[arg(long)]
        out: PathBuf,
    },
    /// Merge two workspace folders into one.
    Merge {
        folder1: PathBuf,
        folder2: PathBuf,
        /// Merged workspace output folder.
        #[arg(long)]
        out: PathBuf,
        /// Resolve conflicts in favor of the second folder (the first wins
        /// by default).
        #[arg(long)]
        prefer_second: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "labelpizza=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Cli::parse().command {
        Command::Sync {
            workspace: folder,
            database_url,
            parallelism,
            dry_run,
        } => {
            let data = workspace::load_workspace(&folder)?;
            let options = SyncOptions { parallelism };

            let store: Arc<dyn EntityStore> = if dry_run {
                tracing::info!("dry run: syncing into an in-memory store");
                Arc::new(MemoryStore::new())
            } else {
                Arc::new(connect(database_url).await?)
            };

            let outcome = workspace::sync_workspace(store, &data, &options).await;
            for report in &outcome.reports {
                println!("{report}");
            }
            if let Some((entity, error)) = outcome.failure {
                anyhow::bail!("{entity} sync failed: {error}");
            }
        }
        Command::Export { out, database_url } => {
            let store = connect(database_url).await?;
            workspace::export_workspace(&store, &out).await?;
            println!("exported workspace to {}", out.display());
        }
        Command::Compare {
            folder1,
            folder2,
            out,
        } => {
            let totals = compare::compare_workspaces(&folder1, &folder2, &out)?;
            println!(
                "{} identical, {} only in folder1, {} only in folder2, {} different",
                totals.identical, totals.folder1_only, totals.folder2_only, totals.different
            );
            println!("reports written to {}", out.display());
        }
        Command::Merge {
            folder1,
            folder2,
            out,
            prefer_second,
        } => {
            let policy = if prefer_second {
                ConflictPolicy::PreferSecond
            } else {
                ConflictPolicy::PreferFirst
            };
            let summary = merge::merge_workspaces(&folder1, &folder2, &out, policy)?;
            println!(
                "merged workspace written to {} ({} conflicts)",
                out.display(),
                summary.total_conflicts
            );
        }
    }
    Ok(())
}

async fn connect(database_url: Option<String>) -> anyhow::Result<PgStore> {
    let url = database_url.context("DATABASE_URL is not set and --database-url was not given")?;
    let pool = labelpizza_db::create_pool(&url)
        .await
        .context("failed to connect to database")?;
    let store = PgStore::new(pool);
    store
        .migrate()
        .await
        .context("failed to run database migrations")?;
    Ok(store)
}
