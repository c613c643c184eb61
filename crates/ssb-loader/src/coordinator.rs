//! Runs every table load concurrently
//!
//! Each [`TableLoadTask`] is spawned onto its own tokio task with its own
//! writer from the shared [`Connector`]. Tasks never wait on each other;
//! a failure or panic in one table is recorded in its report and the rest
//! keep running.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use ssb_common::CommonError;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::LoaderConfig;
use crate::sink::Connector;
use crate::task::{TableLoadTask, TaskReport};

/// Drives a fixed set of table loads to completion
pub struct LoadCoordinator<C: Connector> {
    connector: Arc<C>,
    tasks: Vec<TableLoadTask>,
}

impl<C: Connector> LoadCoordinator<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
            tasks: Vec::new(),
        }
    }

    /// One task per selected table, paths resolved from the scale factor
    pub fn from_config(config: &LoaderConfig, connector: C) -> Result<Self, CommonError> {
        let mut coordinator = Self::new(connector);
        for schema in config.selected_tables()? {
            coordinator.add_task(TableLoadTask::new(
                schema,
                config.table_path(schema),
                config.batch_size,
            ));
        }
        Ok(coordinator)
    }

    pub fn add_task(&mut self, task: TableLoadTask) {
        self.tasks.push(task);
    }

    pub fn tasks(&self) -> &[TableLoadTask] {
        &self.tasks
    }

    /// Run all tasks and wait for every one to reach a terminal state
    ///
    /// Reports come back in the order tasks were added, whatever order
    /// they finished in.
    pub async fn run(self) -> LoadSummary {
        let started = Instant::now();
        let mut handles: JoinSet<(usize, TaskReport)> = JoinSet::new();
        let mut reports: Vec<Option<TaskReport>> = Vec::with_capacity(self.tasks.len());

        for (idx, task) in self.tasks.iter().cloned().enumerate() {
            reports.push(None);
            let connector = Arc::clone(&self.connector);

            handles.spawn(async move {
                let task_started = Instant::now();
                let outcome = AssertUnwindSafe(task.run_with(connector.as_ref()))
                    .catch_unwind()
                    .await;

                let report = outcome.unwrap_or_else(|payload| {
                    TaskReport::panicked(
                        task.schema().name,
                        task.path().to_path_buf(),
                        panic_message(payload.as_ref()),
                        task_started.elapsed(),
                    )
                });
                (idx, report)
            });
        }

        info!(tables = handles.len(), "Spawned table loads");

        while let Some(joined) = handles.join_next().await {
            match joined {
                Ok((idx, report)) => reports[idx] = Some(report),
                Err(e) => error!(error = %e, "Table load task did not complete"),
            }
        }

        let reports = reports
            .into_iter()
            .zip(&self.tasks)
            .map(|(report, task)| {
                report.unwrap_or_else(|| {
                    TaskReport::panicked(
                        task.schema().name,
                        task.path().to_path_buf(),
                        "task was cancelled",
                        Duration::ZERO,
                    )
                })
            })
            .collect();

        LoadSummary {
            reports,
            elapsed: started.elapsed(),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "task panicked".to_string()
    }
}

/// Terminal reports of every table in one run
#[derive(Debug)]
pub struct LoadSummary {
    pub reports: Vec<TaskReport>,
    pub elapsed: Duration,
}

impl LoadSummary {
    pub fn report(&self, table: &str) -> Option<&TaskReport> {
        self.reports.iter().find(|r| r.table == table)
    }

    pub fn failed_tables(&self) -> Vec<&'static str> {
        self.reports
            .iter()
            .filter(|r| r.is_failed())
            .map(|r| r.table)
            .collect()
    }

    pub fn total_rows_written(&self) -> u64 {
        self.reports.iter().map(|r| r.rows_written).sum()
    }

    pub fn total_malformed(&self) -> u64 {
        self.reports.iter().map(|r| r.malformed_rows).sum()
    }

    /// No table failed and the malformed total stays within `max_malformed`
    pub fn is_success(&self, max_malformed: Option<u64>) -> bool {
        self.failed_tables().is_empty()
            && max_malformed.is_none_or(|max| self.total_malformed() <= max)
    }

    /// One line per table, then the totals
    pub fn log(&self) {
        for report in &self.reports {
            match &report.failure {
                None => info!(
                    table = report.table,
                    state = %report.state,
                    rows_written = report.rows_written,
                    malformed_rows = report.malformed_rows,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "Table summary"
                ),
                Some(err) => error!(
                    table = report.table,
                    state = %report.state,
                    rows_written = report.rows_written,
                    rows_discarded = report.rows_discarded,
                    malformed_rows = report.malformed_rows,
                    kind = %err.kind(),
                    error = %err,
                    "Table summary"
                ),
            }

            for sample in &report.malformed_samples {
                warn!(table = report.table, error = %sample, "Malformed record sample");
            }
        }

        info!(
            tables = self.reports.len(),
            failed = self.failed_tables().len(),
            rows_written = self.total_rows_written(),
            malformed_rows = self.total_malformed(),
            elapsed_ms = self.elapsed.as_millis() as u64,
            "Load finished"
        );
    }
}
