//! SSB Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared plumbing for the SSB workspace members.
//!
//! - **Logging**: one place to build the global `tracing` subscriber
//! - **Error Handling**: error and result types shared by binaries
//!
//! # Example
//!
//! ```no_run
//! use ssb_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

pub use error::{CommonError, Result};
