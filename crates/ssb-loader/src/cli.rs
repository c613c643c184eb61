//! Command-line surface of the `ssb-loader` binary

use std::path::PathBuf;

use clap::Parser;

use crate::config::LoaderConfig;

/// Load Star Schema Benchmark `.tbl` files into PostgreSQL
#[derive(Parser, Debug)]
#[command(name = "ssb-loader")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory containing the ssb-sf<N> dataset directories
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Scale factor selecting data/ssb-sf<N>
    #[arg(short, long)]
    pub scale_factor: Option<f64>,

    /// Rows per flush
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Table to load (repeatable, defaults to all five)
    #[arg(short, long = "table", value_name = "TABLE")]
    pub tables: Vec<String>,

    /// PostgreSQL connection URL
    #[arg(long)]
    pub database_url: Option<String>,

    /// Fail the run when more records than this are dropped
    #[arg(long)]
    pub max_malformed: Option<u64>,

    /// Stream and coerce every file without writing to the database
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Override `config` with every flag that was given
    pub fn apply(&self, mut config: LoaderConfig) -> LoaderConfig {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(scale_factor) = self.scale_factor {
            config.scale_factor = scale_factor;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if !self.tables.is_empty() {
            config.tables = self.tables.clone();
        }
        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }
        if self.max_malformed.is_some() {
            config.max_malformed_rows = self.max_malformed;
        }
        config.dry_run |= self.dry_run;
        config
    }
}
