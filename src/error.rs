use std::fmt;

use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source error: {0}")]
    Source(String),

    #[error("Ledger query error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Duplicate address {address} in the {source} input")]
    MergeInput { address: String, source: MergeSource },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Transient failures while talking to the ledger node. The validator
/// retries these; on exhaustion the affected account keeps its prior
/// values instead of failing the run.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Which merge input carried the offending record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeSource {
    Holdings,
    WellKnown,
}

impl fmt::Display for MergeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeSource::Holdings => write!(f, "holdings"),
            MergeSource::WellKnown => write!(f, "well-known registry"),
        }
    }
}

impl std::error::Error for MergeSource {}

impl From<reqwest::Error> for LedgerError {
    fn from(error: reqwest::Error) -> Self {
        LedgerError::Transport(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::Store(format!("I/O error: {}", error))
    }
}

impl From<csv::Error> for AppError {
    fn from(error: csv::Error) -> Self {
        AppError::Store(format!("CSV error: {}", error))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(format!("{:?}", error))
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
