//! Error taxonomy for table loads
//!
//! Every variant stays inside the task that raised it. A task decides from
//! [`LoadError::kind`] whether to drop a record and continue or to stop.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoadError>;

/// Classification of a [`LoadError`] without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    IoFailure,
    MalformedField,
    WriteFailure,
    Connection,
    Aborted,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::IoFailure => "io_failure",
            ErrorKind::MalformedField => "malformed_field",
            ErrorKind::WriteFailure => "write_failure",
            ErrorKind::Connection => "connection",
            ErrorKind::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("source file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("read failed in {} after line {line}: {source}", path.display())]
    IoFailure {
        path: PathBuf,
        line: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}, column {column}: {value:?} is not a valid {expected}")]
    MalformedField {
        line: u64,
        column: String,
        value: String,
        expected: &'static str,
    },

    #[error("line {line}: not valid UTF-8 after byte {valid_up_to}")]
    InvalidEncoding { line: u64, valid_up_to: usize },

    #[error("line {line}: expected {expected} fields, found {actual}")]
    FieldCount {
        line: u64,
        expected: usize,
        actual: usize,
    },

    #[error("flush of {rows} rows into {table} failed: {source}")]
    WriteFailure {
        table: &'static str,
        rows: usize,
        #[source]
        source: sqlx::Error,
    },

    #[error("could not open a storage session for {table}: {source}")]
    Connection {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("load of {table} aborted: {reason}")]
    Aborted { table: &'static str, reason: String },
}

impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::NotFound { .. } => ErrorKind::NotFound,
            LoadError::IoFailure { .. } => ErrorKind::IoFailure,
            LoadError::MalformedField { .. }
            | LoadError::InvalidEncoding { .. }
            | LoadError::FieldCount { .. } => ErrorKind::MalformedField,
            LoadError::WriteFailure { .. } => ErrorKind::WriteFailure,
            LoadError::Connection { .. } => ErrorKind::Connection,
            LoadError::Aborted { .. } => ErrorKind::Aborted,
        }
    }

    /// True when the record is dropped and the task keeps going
    pub fn is_record_level(&self) -> bool {
        self.kind() == ErrorKind::MalformedField
    }

    /// Input line the error refers to, if any
    pub fn line(&self) -> Option<u64> {
        match self {
            LoadError::IoFailure { line, .. }
            | LoadError::MalformedField { line, .. }
            | LoadError::InvalidEncoding { line, .. }
            | LoadError::FieldCount { line, .. } => Some(*line),
            _ => None,
        }
    }
}
