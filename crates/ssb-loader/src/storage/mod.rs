//! Row writers behind [`crate::sink::RowWriter`]
//!
//! - `postgres`: parameterized multi-row INSERTs over a dedicated connection
//! - `memory`: in-process tables for dry runs and tests

pub mod memory;
pub mod postgres;

pub use memory::{MemoryConnector, MemoryRowWriter, MemoryStore, TableData};
pub use postgres::{PgConnector, PgRowWriter};
