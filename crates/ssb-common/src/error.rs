//! Error types shared across SSB binaries

use thiserror::Error;

/// Result type alias for shared operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors raised outside of the load pipeline itself
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

impl CommonError {
    /// Build an [`CommonError::InvalidValue`] for an environment variable or flag
    pub fn invalid(key: impl Into<String>, value: impl Into<String>) -> Self {
        CommonError::InvalidValue {
            key: key.into(),
            value: value.into(),
        }
    }
}
