//! SSB Loader - Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use ssb_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use tracing::info;

use ssb_loader::cli::Cli;
use ssb_loader::storage::{MemoryConnector, MemoryStore, PgConnector};
use ssb_loader::{Connector, LoadCoordinator, LoadSummary, LoaderConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Console)
        .log_file_prefix("ssb-loader")
        .build();

    // Environment variables take precedence
    let log_config = log_config.merge_env()?;
    let _guard = init_logging(&log_config)?;

    let config = cli.apply(LoaderConfig::load()?);
    config.validate()?;

    info!(
        dataset = %config.dataset_dir().display(),
        batch_size = config.batch_size,
        dry_run = config.dry_run,
        "Starting SSB load"
    );

    let summary = if config.dry_run {
        run(&config, MemoryConnector::new(MemoryStore::counting())).await?
    } else {
        let connector =
            PgConnector::new(&config.database).context("Invalid database connection URL")?;
        run(&config, connector).await?
    };

    summary.log();

    if !summary.is_success(config.max_malformed_rows) {
        anyhow::bail!(
            "SSB load incomplete: {} failed table(s), {} malformed record(s)",
            summary.failed_tables().len(),
            summary.total_malformed()
        );
    }

    Ok(())
}

async fn run<C: Connector>(config: &LoaderConfig, connector: C) -> Result<LoadSummary> {
    let coordinator = LoadCoordinator::from_config(config, connector)?;
    Ok(coordinator.run().await)
}
