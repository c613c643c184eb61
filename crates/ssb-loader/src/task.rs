//! End-to-end load of one table
//!
//! A [`TableLoadTask`] is plain data: a schema, the resolved source path and
//! a batch size. Running it streams the file, coerces every record, feeds a
//! [`BatchedSink`] and returns a [`TaskReport`] describing how far it got.
//!
//! Malformed records are dropped and counted. A read failure or a failed
//! flush ends the task; rows already flushed stay written and the open batch
//! is discarded.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::io::AsyncBufRead;
use tracing::{debug, error, info, warn};

use crate::coerce::coerce_record;
use crate::error::LoadError;
use crate::schema::TableSchema;
use crate::sink::{BatchedSink, Connector, RowWriter};
use crate::stream::RecordStream;

/// Malformed-record errors kept verbatim in a report
pub const MAX_ERROR_SAMPLES: usize = 5;

/// Lifecycle of one table load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Opening,
    Streaming,
    Flushing,
    Done,
    Failed,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Opening => "opening",
            TaskState::Streaming => "streaming",
            TaskState::Flushing => "flushing",
            TaskState::Done => "done",
            TaskState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one table load
#[derive(Debug)]
pub struct TaskReport {
    pub table: &'static str,
    pub path: PathBuf,
    pub state: TaskState,
    /// Lines pulled from the source file, malformed ones included
    pub records_read: u64,
    pub rows_written: u64,
    pub flushes: u64,
    /// Coerced rows lost when the task stopped early
    pub rows_discarded: u64,
    pub malformed_rows: u64,
    /// The first [`MAX_ERROR_SAMPLES`] malformed-record errors
    pub malformed_samples: Vec<LoadError>,
    /// Error that moved the task to [`TaskState::Failed`]
    pub failure: Option<LoadError>,
    pub elapsed: Duration,
}

impl TaskReport {
    fn new(table: &'static str, path: PathBuf) -> Self {
        Self {
            table,
            path,
            state: TaskState::Opening,
            records_read: 0,
            rows_written: 0,
            flushes: 0,
            rows_discarded: 0,
            malformed_rows: 0,
            malformed_samples: Vec::new(),
            failure: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Report for a task whose body panicked
    pub fn panicked(
        table: &'static str,
        path: PathBuf,
        reason: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        let mut report = Self::new(table, path);
        report.fail(LoadError::Aborted {
            table,
            reason: reason.into(),
        });
        report.elapsed = elapsed;
        report
    }

    pub fn is_done(&self) -> bool {
        self.state == TaskState::Done
    }

    pub fn is_failed(&self) -> bool {
        self.state == TaskState::Failed
    }

    fn transition(&mut self, to: TaskState) {
        debug!(table = self.table, from = %self.state, to = %to, "Task state changed");
        self.state = to;
    }

    fn record_malformed(&mut self, err: LoadError) {
        warn!(table = self.table, error = %err, "Dropping malformed record");
        self.malformed_rows += 1;
        if self.malformed_samples.len() < MAX_ERROR_SAMPLES {
            self.malformed_samples.push(err);
        }
    }

    fn fail(&mut self, err: LoadError) {
        error!(
            table = self.table,
            kind = %err.kind(),
            error = %err,
            rows_written = self.rows_written,
            rows_discarded = self.rows_discarded,
            "Table load failed"
        );
        self.failure = Some(err);
        self.transition(TaskState::Failed);
    }

    fn absorb<W: RowWriter>(&mut self, sink: &BatchedSink<W>) {
        self.rows_written = sink.rows_written();
        self.flushes = sink.flushes();
    }
}

/// Load of a single table, bound to its schema and source file
#[derive(Debug, Clone)]
pub struct TableLoadTask {
    schema: &'static TableSchema,
    path: PathBuf,
    batch_size: usize,
}

impl TableLoadTask {
    pub fn new(schema: &'static TableSchema, path: impl Into<PathBuf>, batch_size: usize) -> Self {
        Self {
            schema,
            path: path.into(),
            batch_size,
        }
    }

    pub fn schema(&self) -> &'static TableSchema {
        self.schema
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Run the load against an already opened writer
    pub async fn run<W: RowWriter>(&self, writer: W) -> TaskReport {
        let started = Instant::now();
        let mut report = TaskReport::new(self.schema.name, self.path.clone());

        if let Some(records) = self.open(&mut report).await {
            self.stream_into(records, writer, &mut report).await;
        }

        self.finish(report, started)
    }

    /// Run the load, asking `connector` for a writer once the file is open
    ///
    /// A missing file fails the task before any storage session is opened.
    pub async fn run_with<C: Connector>(&self, connector: &C) -> TaskReport {
        let started = Instant::now();
        let mut report = TaskReport::new(self.schema.name, self.path.clone());

        if let Some(records) = self.open(&mut report).await {
            match connector.connect(self.schema).await {
                Ok(writer) => self.stream_into(records, writer, &mut report).await,
                Err(source) => report.fail(LoadError::Connection {
                    table: self.schema.name,
                    source,
                }),
            }
        }

        self.finish(report, started)
    }

    async fn open(&self, report: &mut TaskReport) -> Option<RecordStream> {
        info!(table = self.schema.name, path = %self.path.display(), "Table load started");

        match RecordStream::open(&self.path).await {
            Ok(records) => Some(records),
            Err(err) => {
                report.fail(err);
                None
            }
        }
    }

    async fn stream_into<R: AsyncBufRead + Unpin, W: RowWriter>(
        &self,
        mut records: RecordStream<R>,
        writer: W,
        report: &mut TaskReport,
    ) {
        let mut sink = BatchedSink::new(self.schema, writer, self.batch_size);
        report.transition(TaskState::Streaming);

        while let Some(next) = records.next_record().await {
            let result = match next {
                Ok(raw) => match coerce_record(self.schema, &raw) {
                    Ok(row) => sink.append(row).await,
                    Err(err) => Err(err),
                },
                Err(err) => Err(err),
            };

            match result {
                Ok(()) => {}
                Err(err) if err.is_record_level() => report.record_malformed(err),
                Err(err) => {
                    report.records_read = records.lines_read();
                    self.stop(&mut sink, report, err);
                    return;
                }
            }
        }
        report.records_read = records.lines_read();

        report.transition(TaskState::Flushing);
        match sink.flush().await {
            Ok(()) => {
                report.absorb(&sink);
                report.transition(TaskState::Done);
            }
            Err(err) => self.stop(&mut sink, report, err),
        }
    }

    /// Drop whatever is still buffered and fail the task with `err`
    fn stop<W: RowWriter>(&self, sink: &mut BatchedSink<W>, report: &mut TaskReport, err: LoadError) {
        let in_failed_flush = match &err {
            LoadError::WriteFailure { rows, .. } => *rows,
            _ => 0,
        };
        report.rows_discarded = (sink.discard() + in_failed_flush) as u64;
        report.absorb(sink);
        report.fail(err);
    }

    fn finish(&self, mut report: TaskReport, started: Instant) -> TaskReport {
        report.elapsed = started.elapsed();

        if report.is_done() {
            info!(
                table = report.table,
                rows_written = report.rows_written,
                flushes = report.flushes,
                malformed_rows = report.malformed_rows,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Table load complete"
            );
        }

        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::coerce::TypedRow;
    use crate::error::ErrorKind;
    use crate::schema::{PART, SUPPLIER};
    use crate::storage::{MemoryConnector, MemoryStore};
    use crate::stream::tests::failing_after;
    use async_trait::async_trait;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fixture(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    fn supplier_line(key: &str) -> String {
        format!("{key}|Supplier#{key}|addr|PERU     0|PERU|AMERICA|27-715-681-1215|\n")
    }

    fn supplier_file(keys: &[&str]) -> NamedTempFile {
        let text: String = keys.iter().map(|k| supplier_line(k)).collect();
        fixture(text.as_bytes())
    }

    struct FailingWriter;

    #[async_trait]
    impl RowWriter for FailingWriter {
        async fn write_batch(
            &mut self,
            _schema: &'static TableSchema,
            _rows: &[TypedRow],
        ) -> Result<(), sqlx::Error> {
            Err(sqlx::Error::Protocol("duplicate key".into()))
        }
    }

    struct RefusingConnector;

    #[async_trait]
    impl Connector for RefusingConnector {
        type Writer = FailingWriter;

        async fn connect(&self, _schema: &'static TableSchema) -> Result<FailingWriter, sqlx::Error> {
            Err(sqlx::Error::PoolTimedOut)
        }
    }

    #[tokio::test]
    async fn test_malformed_line_is_dropped_and_load_continues() {
        let file = supplier_file(&["1", "2", "three", "4", "5"]);
        let store = MemoryStore::new();

        let report = TableLoadTask::new(&SUPPLIER, file.path(), 2)
            .run(store.writer())
            .await;

        assert_eq!(report.state, TaskState::Done);
        assert_eq!(report.records_read, 5);
        assert_eq!(report.rows_written, 4);
        assert_eq!(report.malformed_rows, 1);
        assert_eq!(report.malformed_samples.len(), 1);
        assert_eq!(report.malformed_samples[0].line(), Some(3));
        assert!(report.failure.is_none());

        let lines: Vec<u64> = store
            .table("supplier")
            .await
            .unwrap()
            .rows
            .iter()
            .map(|r| r.line)
            .collect();
        assert_eq!(lines, vec![1, 2, 4, 5]);
    }

    #[tokio::test]
    async fn test_final_flush_writes_partial_batch() {
        let file = supplier_file(&["1", "2", "3", "4", "5"]);
        let store = MemoryStore::new();

        let report = TableLoadTask::new(&SUPPLIER, file.path(), 2)
            .run(store.writer())
            .await;

        assert!(report.is_done());
        assert_eq!(report.flushes, 3);
        assert_eq!(store.table("supplier").await.unwrap().batch_sizes, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_samples_are_capped() {
        let keys: Vec<String> = (0..8).map(|i| format!("bad{i}")).collect();
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        let file = supplier_file(&keys);

        let report = TableLoadTask::new(&SUPPLIER, file.path(), 4)
            .run(MemoryStore::new().writer())
            .await;

        assert!(report.is_done());
        assert_eq!(report.malformed_rows, 8);
        assert_eq!(report.malformed_samples.len(), MAX_ERROR_SAMPLES);
        assert_eq!(report.rows_written, 0);
    }

    #[tokio::test]
    async fn test_missing_file_fails_before_connecting() {
        let dir = tempfile::tempdir().unwrap();
        let task = TableLoadTask::new(&PART, dir.path().join("part.tbl"), 8);

        let report = task.run_with(&RefusingConnector).await;

        assert!(report.is_failed());
        assert_eq!(report.failure.unwrap().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_connect_failure_fails_task() {
        let file = supplier_file(&["1"]);
        let report = TableLoadTask::new(&SUPPLIER, file.path(), 8)
            .run_with(&RefusingConnector)
            .await;

        assert!(report.is_failed());
        assert_eq!(report.failure.unwrap().kind(), ErrorKind::Connection);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_dropped_and_load_continues() {
        let mut bytes = supplier_line("1").into_bytes();
        bytes.extend(supplier_line("2").into_bytes());
        bytes.extend(b"3|Caf\xe9|addr|PERU     0|PERU|AMERICA|27-715-681-1215|\n");
        bytes.extend(supplier_line("4").into_bytes());
        bytes.extend(supplier_line("5").into_bytes());
        let file = fixture(&bytes);
        let store = MemoryStore::new();

        let report = TableLoadTask::new(&SUPPLIER, file.path(), 10)
            .run(store.writer())
            .await;

        assert!(report.is_done());
        assert_eq!(report.records_read, 5);
        assert_eq!(report.rows_written, 4);
        assert_eq!(report.malformed_rows, 1);
        assert!(matches!(
            report.malformed_samples[0],
            LoadError::InvalidEncoding { line: 3, .. }
        ));
        assert_eq!(store.row_count("supplier").await, 4);
    }

    #[tokio::test]
    async fn test_read_failure_discards_open_batch() {
        const PREFIX: &[u8] = concat!(
            "1|Supplier#1|addr|PERU     0|PERU|AMERICA|27-715-681-1215|\n",
            "2|Supplier#2|addr|PERU     0|PERU|AMERICA|27-715-681-1215|\n",
        )
        .as_bytes();
        let store = MemoryStore::new();
        let task = TableLoadTask::new(&SUPPLIER, "broken.tbl", 10);
        let mut report = TaskReport::new(SUPPLIER.name, task.path().to_path_buf());

        task.stream_into(failing_after(PREFIX), store.writer(), &mut report)
            .await;

        assert!(report.is_failed());
        assert_eq!(report.failure.as_ref().unwrap().kind(), ErrorKind::IoFailure);
        assert_eq!(report.records_read, 2);
        assert_eq!(report.rows_discarded, 2);
        assert_eq!(report.rows_written, 0);
        assert!(store.table("supplier").await.is_none());
    }

    #[tokio::test]
    async fn test_write_failure_stops_task() {
        let file = supplier_file(&["1", "2", "3", "4", "5"]);

        let report = TableLoadTask::new(&SUPPLIER, file.path(), 2)
            .run(FailingWriter)
            .await;

        assert!(report.is_failed());
        assert_eq!(report.failure.as_ref().unwrap().kind(), ErrorKind::WriteFailure);
        assert_eq!(report.records_read, 2);
        assert_eq!(report.rows_written, 0);
        assert_eq!(report.rows_discarded, 2);
    }

    #[tokio::test]
    async fn test_run_with_memory_connector() {
        let file = supplier_file(&["1", "2", "3"]);
        let connector = MemoryConnector::default();

        let report = TableLoadTask::new(&SUPPLIER, file.path(), 128)
            .run_with(&connector)
            .await;

        assert!(report.is_done());
        assert_eq!(connector.store().row_count("supplier").await, 3);
    }

    #[test]
    fn test_panicked_report() {
        let report = TaskReport::panicked("part", PathBuf::from("part.tbl"), "boom", Duration::ZERO);
        assert!(report.is_failed());
        assert_eq!(report.failure.unwrap().kind(), ErrorKind::Aborted);
    }
}
