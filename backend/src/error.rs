//! Error types for the migrastat backend.
//!
//! The aggregation engine itself never fails: malformed rows and cells are
//! skipped and reported as data (see [`crate::analysis`]). The types below
//! cover the layers around it:
//!
//! - [`CsvError`] - reading and decoding CSV input
//! - [`ConfigError`] - environment / CLI configuration
//! - [`PipelineError`] - parse + analyze orchestration
//! - [`ServerError`] - HTTP API failures
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors while reading a CSV export into a [`crate::models::RawTable`].
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The detected or requested encoding is not supported.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Delimiters must be single-byte characters.
    #[error("Invalid delimiter {0:?}: only ASCII delimiters are supported")]
    InvalidDelimiter(char),

    /// Malformed CSV record.
    #[error("Line {line}: {message}")]
    Parse { line: u64, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        match err.into_kind() {
            csv::ErrorKind::Io(io) => CsvError::Io(io),
            kind => CsvError::Parse {
                line,
                message: format!("{:?}", kind),
            },
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while assembling runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },

    /// The configured default dataset does not exist.
    #[error("Data file not found: {0}")]
    MissingDataFile(PathBuf),
}

// =============================================================================
// Pipeline Errors
// =============================================================================

/// Top-level errors of [`crate::analysis::pipeline`].
///
/// Only input handling can fail; a table that is not migration-shaped still
/// produces a report (flagged via [`crate::analysis::DatasetShape`]).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// No dataset has been loaded yet.
    #[error("No dataset loaded")]
    NoDataset,

    /// Socket / listener failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
