//! `forgeflow` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`    — start the API server plus the worker pool.
//! - `migrate`  — run pending database migrations.
//! - `validate` — validate a workflow definition JSON file.
//!
//! The job queue is process-local: `serve` runs submission, queue, and
//! workers in one process, scaled with `--workers`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use engine::{ExecutionRunner, NoopNotifier, StoreUsageRecorder, Submitter};
use steps::{builtin_registry, ProviderKind, ProviderMap, StaticProvider, UsagePolicy};
use store::{MemoryStore, PgStore, Store};

#[derive(Parser)]
#[command(
    name = "forgeflow",
    about = "Asynchronous workflow automation engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server and the background worker pool.
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,

        /// Number of concurrent workers draining the job queue.
        #[arg(long, default_value_t = 4)]
        workers: usize,

        /// Postgres connection string; omitted = volatile in-memory store.
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,

        /// Confine file-operation steps to this directory.
        #[arg(long)]
        file_root: Option<PathBuf>,

        /// Log (instead of fail) generation steps whose usage record
        /// cannot be appended.
        #[arg(long)]
        lenient_usage: bool,
    },
    /// Run pending database migrations.
    Migrate {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },
    /// Validate a workflow definition JSON file.
    Validate {
        /// Path to the workflow definition JSON file.
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            bind,
            workers,
            database_url,
            file_root,
            lenient_usage,
        } => {
            let store: Arc<dyn Store> = match database_url {
                Some(url) => {
                    let store = PgStore::connect(&url, 10)
                        .await
                        .context("failed to connect to database")?;
                    store.run_migrations().await?;
                    Arc::new(store)
                }
                None => {
                    warn!("DATABASE_URL not set — using the in-memory store; state is lost on exit");
                    Arc::new(MemoryStore::new())
                }
            };

            // Offline providers keep credential-less runs working end to
            // end; deployments swap in real clients here.
            let mut providers = ProviderMap::new();
            providers.insert(
                ProviderKind::OpenAi,
                Arc::new(StaticProvider::new("gpt-4-turbo-preview")) as _,
            );
            providers.insert(
                ProviderKind::Anthropic,
                Arc::new(StaticProvider::new("claude-3-sonnet")) as _,
            );

            let policy = if lenient_usage {
                UsagePolicy::BestEffort
            } else {
                UsagePolicy::Required
            };
            let registry = builtin_registry(
                providers,
                Arc::new(StoreUsageRecorder::new(store.clone())),
                policy,
                reqwest::Client::new(),
                file_root,
            );

            let (producer, consumer) = queue::channel();
            let runner = Arc::new(ExecutionRunner::new(
                store.clone(),
                registry,
                Arc::new(NoopNotifier),
            ));
            let _workers = engine::spawn_workers(workers, consumer, runner, store.clone());

            let submitter = Arc::new(Submitter::new(store.clone(), producer));
            let recovered = submitter.recover().await?;
            if recovered > 0 {
                info!(recovered, "resumed journalled jobs from a previous run");
            }

            info!("Starting API server on {bind} with {workers} workers");
            api::serve(&bind, api::AppState { store, submitter }).await?;
        }

        Command::Migrate { database_url } => {
            let store = PgStore::connect(&database_url, 2)
                .await
                .context("failed to connect to database")?;
            store.run_migrations().await?;
            info!("Migrations applied successfully");
        }

        Command::Validate { path } => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read file {}", path.display()))?;

            let definition: engine::WorkflowDefinition =
                serde_json::from_str(&content).context("invalid workflow JSON")?;

            match engine::validate_steps(&definition.steps) {
                Ok(()) => {
                    println!(
                        "✅ Workflow is valid: {} steps, {} triggers",
                        definition.steps.len(),
                        definition.triggers.len()
                    );
                }
                Err(err) => {
                    eprintln!("❌ Validation failed: {err}");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
