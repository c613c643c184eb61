//! Loader configuration
//!
//! Values come from the environment (optionally seeded by a `.env` file) and
//! are then overridden by command-line flags in `main`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use ssb_common::CommonError;

use crate::schema::{self, TableSchema};

// ============================================================================
// Loader Configuration Constants
// ============================================================================

/// Root directory holding the `ssb-sf<N>` dataset directories.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default SSB scale factor.
pub const DEFAULT_SCALE_FACTOR: f64 = 1.0;

/// Default number of rows per flush.
pub const DEFAULT_BATCH_SIZE: usize = 128;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/ssb";

/// Default database connection timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    pub data_dir: PathBuf,
    pub scale_factor: f64,
    pub batch_size: usize,
    /// Tables to load; empty means all five
    pub tables: Vec<String>,
    /// Upper bound on dropped records across all tables
    pub max_malformed_rows: Option<u64>,
    /// Stream and coerce without writing to the database
    pub dry_run: bool,
    pub database: DatabaseConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            scale_factor: DEFAULT_SCALE_FACTOR,
            batch_size: DEFAULT_BATCH_SIZE,
            tables: Vec::new(),
            max_malformed_rows: None,
            dry_run: false,
            database: DatabaseConfig::default(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, CommonError> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CommonError::invalid(key, raw)),
        _ => Ok(None),
    }
}

impl LoaderConfig {
    /// Load configuration from `.env`, the environment and defaults
    pub fn load() -> Result<Self, CommonError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source
    ///
    /// Unset or blank variables fall back to defaults; values that do not
    /// parse are rejected rather than ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CommonError> {
        let defaults = Self::default();

        Ok(Self {
            data_dir: lookup("SSB_DATA_DIR")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            scale_factor: parse_var(&lookup, "SSB_SCALE_FACTOR")?
                .unwrap_or(defaults.scale_factor),
            batch_size: parse_var(&lookup, "SSB_BATCH_SIZE")?.unwrap_or(defaults.batch_size),
            tables: lookup("SSB_TABLES")
                .map(|s| {
                    s.split(',')
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            max_malformed_rows: parse_var(&lookup, "SSB_MAX_MALFORMED")?,
            dry_run: parse_var(&lookup, "SSB_DRY_RUN")?.unwrap_or(defaults.dry_run),
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").unwrap_or(defaults.database.url),
                connect_timeout_secs: parse_var(&lookup, "DATABASE_CONNECT_TIMEOUT")?
                    .unwrap_or(defaults.database.connect_timeout_secs),
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), CommonError> {
        if self.batch_size == 0 {
            return Err(CommonError::Config(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(CommonError::Config(format!(
                "Scale factor must be a positive number, got {}",
                self.scale_factor
            )));
        }

        if !self.dry_run && self.database.url.trim().is_empty() {
            return Err(CommonError::Config(
                "Database URL cannot be empty".to_string(),
            ));
        }

        self.selected_tables()?;

        Ok(())
    }

    /// Directory holding this scale factor's `.tbl` files
    ///
    /// `ssb-sf1.0` is the canonical name. When only the short `ssb-sf1`
    /// spelling exists on disk, that directory is used instead.
    pub fn dataset_dir(&self) -> PathBuf {
        let canonical = self
            .data_dir
            .join(format!("ssb-sf{}", format_scale_factor(self.scale_factor)));
        if canonical.is_dir() {
            return canonical;
        }

        let short = self
            .data_dir
            .join(format!("ssb-sf{}", short_scale_factor(self.scale_factor)));
        if short.is_dir() {
            short
        } else {
            canonical
        }
    }

    /// Canonical source file for `schema`
    pub fn table_path(&self, schema: &TableSchema) -> PathBuf {
        self.dataset_dir().join(schema.file_name())
    }

    /// Schemas to load, deduplicated and in registry order
    pub fn selected_tables(&self) -> Result<Vec<&'static TableSchema>, CommonError> {
        if self.tables.is_empty() {
            return Ok(schema::all().to_vec());
        }

        let mut wanted = Vec::with_capacity(self.tables.len());
        for name in &self.tables {
            let table = schema::lookup(name)
                .ok_or_else(|| CommonError::invalid("table", name.as_str()))?;
            wanted.push(table.name);
        }

        Ok(schema::all()
            .iter()
            .copied()
            .filter(|table| wanted.contains(&table.name))
            .collect())
    }
}

/// Render a scale factor the way dataset directories are named
///
/// Whole numbers keep one fractional digit: `1.0` becomes `"1.0"`, `10.0`
/// becomes `"10.0"` and `0.1` stays `"0.1"`.
pub fn format_scale_factor(scale_factor: f64) -> String {
    format!("{scale_factor:?}")
}

/// Whole scale factors without the fraction (`1.0` becomes `"1"`)
fn short_scale_factor(scale_factor: f64) -> String {
    if scale_factor.fract() == 0.0 && scale_factor.abs() < 1e15 {
        format!("{}", scale_factor as i64)
    } else {
        format!("{scale_factor}")
    }
}
