//! SSB Loader Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Bulk loader for the Star Schema Benchmark tables. Each of the five dbgen
//! `.tbl` files is streamed, coerced against a fixed schema and written in
//! batches, one independent task per table.
//!
//! # Pipeline
//!
//! ```text
//! .tbl file -> RecordStream -> coerce_record -> BatchedSink -> RowWriter
//! ```
//!
//! [`LoadCoordinator`] spawns one [`TableLoadTask`] per table and gathers a
//! [`TaskReport`] from each into a [`LoadSummary`].
//!
//! # Example
//!
//! ```no_run
//! use ssb_loader::{LoadCoordinator, LoaderConfig, MemoryConnector};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = LoaderConfig::load()?;
//! let summary = LoadCoordinator::from_config(&config, MemoryConnector::default())?
//!     .run()
//!     .await;
//! summary.log();
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod coerce;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod schema;
pub mod sink;
pub mod storage;
pub mod stream;
pub mod task;

pub use coerce::{coerce_field, coerce_record, TypedRow, Value};
pub use config::{DatabaseConfig, LoaderConfig};
pub use coordinator::{LoadCoordinator, LoadSummary};
pub use error::{ErrorKind, LoadError, Result};
pub use schema::{ColumnType, TableSchema};
pub use sink::{BatchedSink, Connector, RowWriter};
pub use storage::{MemoryConnector, MemoryStore, PgConnector};
pub use stream::{RawRecord, RecordStream};
pub use task::{TableLoadTask, TaskReport, TaskState};
