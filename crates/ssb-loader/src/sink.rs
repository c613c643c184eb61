//! Batched writes into one target table
//!
//! [`BatchedSink`] buffers coerced rows and hands them to a [`RowWriter`]
//! in one bulk write per batch. Bigger batches mean fewer round trips and
//! more memory held per task.

use async_trait::async_trait;
use tracing::debug;

use crate::coerce::TypedRow;
use crate::error::{LoadError, Result};
use crate::schema::TableSchema;

/// Storage seam for bulk writes
///
/// A writer is owned by exactly one sink, so implementations may hold a
/// dedicated connection without locking.
#[async_trait]
pub trait RowWriter: Send {
    /// Persist `rows` into `schema.name` as one unit
    async fn write_batch(
        &mut self,
        schema: &'static TableSchema,
        rows: &[TypedRow],
    ) -> std::result::Result<(), sqlx::Error>;
}

/// Hands every table load its own [`RowWriter`]
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Writer: RowWriter + 'static;

    async fn connect(
        &self,
        schema: &'static TableSchema,
    ) -> std::result::Result<Self::Writer, sqlx::Error>;
}

/// Row buffer for a single table that flushes at a fixed size
pub struct BatchedSink<W> {
    schema: &'static TableSchema,
    writer: W,
    batch: Vec<TypedRow>,
    batch_size: usize,
    rows_written: u64,
    flushes: u64,
}

impl<W: RowWriter> BatchedSink<W> {
    /// A `batch_size` of 0 is treated as 1.
    pub fn new(schema: &'static TableSchema, writer: W, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            schema,
            writer,
            batch: Vec::with_capacity(batch_size),
            batch_size,
            rows_written: 0,
            flushes: 0,
        }
    }

    pub fn table(&self) -> &'static str {
        self.schema.name
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Rows buffered and not yet written
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    /// Buffer `row`, flushing before returning once the batch is full
    pub async fn append(&mut self, row: TypedRow) -> Result<()> {
        self.batch.push(row);
        if self.batch.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Write all buffered rows and clear the batch
    ///
    /// No-op on an empty batch. On failure the batch is dropped, not
    /// retried, and the error carries the number of rows lost.
    pub async fn flush(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }

        let rows = self.batch.len();
        let result = self.writer.write_batch(self.schema, &self.batch).await;
        self.batch.clear();

        match result {
            Ok(()) => {
                self.rows_written += rows as u64;
                self.flushes += 1;
                debug!(
                    table = self.schema.name,
                    rows,
                    total = self.rows_written,
                    "Batch flushed"
                );
                Ok(())
            }
            Err(source) => Err(LoadError::WriteFailure {
                table: self.schema.name,
                rows,
                source,
            }),
        }
    }

    /// Drop buffered rows without writing them, returning how many were lost
    pub fn discard(&mut self) -> usize {
        let dropped = self.batch.len();
        self.batch.clear();
        dropped
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::coerce::Value;
    use crate::schema::SUPPLIER;

    /// Records batch sizes; fails the nth write when asked to
    #[derive(Default)]
    struct ProbeWriter {
        batches: Vec<Vec<u64>>,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl RowWriter for ProbeWriter {
        async fn write_batch(
            &mut self,
            _schema: &'static TableSchema,
            rows: &[TypedRow],
        ) -> std::result::Result<(), sqlx::Error> {
            if self.fail_on == Some(self.batches.len()) {
                return Err(sqlx::Error::Protocol("constraint violation".into()));
            }
            self.batches.push(rows.iter().map(|r| r.line).collect());
            Ok(())
        }
    }

    fn row(line: u64) -> TypedRow {
        TypedRow {
            line,
            values: vec![Value::Integer(line as i32)],
        }
    }

    #[tokio::test]
    async fn test_exact_batch_size_triggers_one_flush() {
        let mut sink = BatchedSink::new(&SUPPLIER, ProbeWriter::default(), 4);
        for line in 1..=4 {
            sink.append(row(line)).await.unwrap();
        }

        assert_eq!(sink.flushes(), 1);
        assert_eq!(sink.pending(), 0);
        assert_eq!(sink.into_writer().batches, vec![vec![1, 2, 3, 4]]);
    }

    #[tokio::test]
    async fn test_never_holds_more_than_batch_size() {
        let mut sink = BatchedSink::new(&SUPPLIER, ProbeWriter::default(), 3);
        for line in 1..=10 {
            sink.append(row(line)).await.unwrap();
            assert!(sink.pending() < 3);
        }
        sink.flush().await.unwrap();

        assert_eq!(sink.rows_written(), 10);
        let batches = sink.into_writer().batches;
        assert_eq!(
            batches,
            vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9], vec![10]]
        );
    }

    #[tokio::test]
    async fn test_flush_on_empty_batch_writes_nothing() {
        let mut sink = BatchedSink::new(&SUPPLIER, ProbeWriter::default(), 8);
        sink.flush().await.unwrap();
        sink.flush().await.unwrap();

        assert_eq!(sink.flushes(), 0);
        assert!(sink.into_writer().batches.is_empty());
    }

    #[tokio::test]
    async fn test_failed_flush_reports_table_and_rows() {
        let writer = ProbeWriter {
            fail_on: Some(1),
            ..Default::default()
        };
        let mut sink = BatchedSink::new(&SUPPLIER, writer, 2);
        sink.append(row(1)).await.unwrap();
        sink.append(row(2)).await.unwrap();
        sink.append(row(3)).await.unwrap();

        match sink.append(row(4)).await.unwrap_err() {
            LoadError::WriteFailure { table, rows, .. } => {
                assert_eq!(table, "supplier");
                assert_eq!(rows, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(sink.pending(), 0);
        assert_eq!(sink.rows_written(), 2);
    }

    #[tokio::test]
    async fn test_discard_drops_open_batch() {
        let mut sink = BatchedSink::new(&SUPPLIER, ProbeWriter::default(), 10);
        sink.append(row(1)).await.unwrap();
        sink.append(row(2)).await.unwrap();

        assert_eq!(sink.discard(), 2);
        sink.flush().await.unwrap();
        assert!(sink.into_writer().batches.is_empty());
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        let sink = BatchedSink::new(&SUPPLIER, ProbeWriter::default(), 0);
        assert_eq!(sink.batch_size(), 1);
    }
}
