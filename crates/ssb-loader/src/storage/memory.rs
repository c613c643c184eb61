//! In-process table storage
//!
//! Used for `--dry-run` validation of a dataset and as the storage double
//! in tests. A counting store keeps only row and batch counts so a full
//! scale-factor run stays within bounded memory.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::coerce::TypedRow;
use crate::schema::TableSchema;
use crate::sink::{Connector, RowWriter};

/// What one table received
#[derive(Debug, Clone, Default)]
pub struct TableData {
    /// Empty when the store only counts
    pub rows: Vec<TypedRow>,
    pub batch_sizes: Vec<usize>,
    pub row_count: u64,
}

/// Shared handle over every table written in memory
#[derive(Debug, Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<HashMap<&'static str, TableData>>>,
    retain_rows: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Store that keeps every written row
    pub fn new() -> Self {
        Self {
            tables: Arc::default(),
            retain_rows: true,
        }
    }

    /// Store that only counts rows and batches
    pub fn counting() -> Self {
        Self {
            retain_rows: false,
            ..Self::new()
        }
    }

    pub async fn table(&self, name: &str) -> Option<TableData> {
        self.tables.lock().await.get(name).cloned()
    }

    pub async fn row_count(&self, name: &str) -> u64 {
        self.tables
            .lock()
            .await
            .get(name)
            .map_or(0, |table| table.row_count)
    }

    pub fn writer(&self) -> MemoryRowWriter {
        MemoryRowWriter {
            store: self.clone(),
        }
    }
}

pub struct MemoryRowWriter {
    store: MemoryStore,
}

#[async_trait]
impl RowWriter for MemoryRowWriter {
    async fn write_batch(
        &mut self,
        schema: &'static TableSchema,
        rows: &[TypedRow],
    ) -> Result<(), sqlx::Error> {
        let mut tables = self.store.tables.lock().await;
        let table = tables.entry(schema.name).or_default();

        table.batch_sizes.push(rows.len());
        table.row_count += rows.len() as u64;
        if self.store.retain_rows {
            table.rows.extend_from_slice(rows);
        }

        Ok(())
    }
}

/// Connector handing out writers over one [`MemoryStore`]
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    store: MemoryStore,
}

impl MemoryConnector {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Writer = MemoryRowWriter;

    async fn connect(&self, _schema: &'static TableSchema) -> Result<MemoryRowWriter, sqlx::Error> {
        Ok(self.store.writer())
    }
}
