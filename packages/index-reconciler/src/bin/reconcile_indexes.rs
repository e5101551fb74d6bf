//! Index reconciliation boot step
//!
//! Converges the application's MongoDB indexes and exits non-zero if any
//! desired index could not be ensured.
//!
//! # Usage
//!
//! ```bash
//! # From a config file
//! reconcile-indexes --config reconcile.yaml
//!
//! # From the environment
//! INDEX_RECONCILE_MONGO_URI=mongodb://localhost:27017 INDEX_RECONCILE_DATABASE=app reconcile-indexes
//!
//! # Print the desired-state table and exit
//! reconcile-indexes --print-desired
//! ```

use clap::Parser;
use index_reconciler::config::BootConfig;
use index_reconciler::{ensure_all, telemetry, DesiredState, ErrorKind, MongoIndexAdmin, ReconcileError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "reconcile-indexes")]
#[command(about = "Converge MongoDB indexes to the compiled-in desired state", long_about = None)]
struct Cli {
    /// YAML config file (schema version 1)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// MongoDB connection string
    #[arg(long)]
    mongo_uri: Option<String>,

    /// Database name
    #[arg(short, long)]
    database: Option<String>,

    /// Log level when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,

    /// Upper bound for the whole run, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print the desired-state table as JSON and exit
    #[arg(long)]
    print_desired: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(kind = %err.kind, "index reconciliation failed");
            eprintln!("index reconciliation failed: {}", err);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<(), ReconcileError> {
    let desired = DesiredState::standard();
    if cli.print_desired {
        desired.validate()?;
        let json = serde_json::to_string_pretty(&desired)
            .map_err(|e| ReconcileError::new(ErrorKind::InvalidDesiredState, e.to_string()).with_source(e))?;
        println!("{}", json);
        return Ok(());
    }

    let config = load_config(&cli)?;
    telemetry::init(&config.log_level);

    // both checked by BootConfig::validate
    let uri = config.mongo_uri.clone().unwrap_or_default();
    let database = config.database.clone().unwrap_or_default();
    let timeout = config.boot_timeout();

    info!(
        database = %database,
        timeout = ?timeout,
        listing_policy = %config.reconcile.listing_policy,
        "starting index reconciliation"
    );

    let reconcile = async {
        let admin = MongoIndexAdmin::connect(&uri, &database).await?;
        ensure_all(&admin, &desired, &config.reconcile).await
    };
    let report = tokio::time::timeout(timeout, reconcile)
        .await
        .map_err(|_| ReconcileError::timeout(format!("index reconciliation exceeded {:?}", timeout)))??;

    let summary = report.summary();
    info!(
        indexes = summary.total(),
        created = summary.created,
        renamed = summary.renamed,
        replaced = summary.replaced,
        "indexes ensured"
    );
    Ok(())
}

/// file, then environment, then flags
fn load_config(cli: &Cli) -> Result<BootConfig, ReconcileError> {
    let mut config = match &cli.config {
        Some(path) => BootConfig::from_yaml(path)?,
        None => BootConfig::default(),
    };
    config.apply_env_overrides();

    if let Some(uri) = &cli.mongo_uri {
        config.mongo_uri = Some(uri.clone());
    }
    if let Some(database) = &cli.database {
        config.database = Some(database.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(secs) = cli.timeout_secs {
        config.boot_timeout_secs = secs;
    }

    config.validate()?;
    Ok(config)
}
