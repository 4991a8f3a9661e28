//! Error types for column extraction.
//!
//! Two families live here:
//!
//! - Row-scoped, recoverable errors: [`DataError`] and the [`ColumnError::Data`] /
//!   [`ColumnError::NotFound`] variants. These end up as [`ErrorRow`]s and never stop
//!   an interpretation run.
//! - Fatal errors: [`ExtractError`], [`ConfigError`] and [`ReadError`], returned to the
//!   caller through `?`.
//!
//! [`ErrorRow`]: crate::extractor::ErrorRow

use thiserror::Error;

use crate::extractor::ErrorRow;

/// Boxed error carried by unexpected transform faults.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// Data Errors (row-scoped)
// =============================================================================

/// A problem with the input data of a single row.
///
/// Caught at the row boundary by the extractor and turned into an error row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DataError {
    message: String,
    data_code: Option<String>,
}

impl DataError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data_code: None,
        }
    }

    /// Attach a caller-defined code identifying the offending entity.
    pub fn with_data_code(mut self, code: impl Into<String>) -> Self {
        self.data_code = Some(code.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data_code(&self) -> Option<&str> {
        self.data_code.as_deref()
    }

    /// Build the error record for the given 1-based input line.
    pub fn error_row(&self, line: usize) -> ErrorRow {
        ErrorRow {
            data_code: self.data_code.clone(),
            row: line,
            error: self.message.clone(),
        }
    }
}

// =============================================================================
// Column Errors
// =============================================================================

/// Failure while applying a column rule or its transform.
#[derive(Debug, Error)]
pub enum ColumnError {
    /// Invalid row data. Recorded as an error row.
    #[error(transparent)]
    Data(#[from] DataError),

    /// A lookup made by a transform found nothing. Recorded as an error row
    /// carrying this message.
    #[error("{0}")]
    NotFound(String),

    /// Anything else. Stops the run.
    #[error("{0}")]
    Fault(BoxError),
}

impl ColumnError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ColumnError::NotFound(message.into())
    }

    pub fn fault(err: impl Into<BoxError>) -> Self {
        ColumnError::Fault(err.into())
    }
}

// =============================================================================
// Extraction Errors (fatal)
// =============================================================================

/// Fatal error raised while interpreting a row.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A transform failed with something other than a data error.
    #[error("Unexpected failure on line {line}: {source}")]
    Fault {
        line: usize,
        #[source]
        source: BoxError,
    },
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while building column rules from configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A column rule was given no candidate names.
    #[error("Column rule needs at least one candidate name")]
    NoCandidates,

    /// A `replace` operation carries a pattern that does not compile.
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Failed to read a configuration file.
    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed configuration JSON.
    #[error("Config JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Reader Errors
// =============================================================================

/// Errors while driving an interpreter from CSV input.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Failed to read input.
    #[error("Failed to read input: {0}")]
    IoError(#[from] std::io::Error),

    /// The CSV tokenizer rejected the input.
    #[error("Invalid CSV input: {0}")]
    CsvError(#[from] csv::Error),

    /// Input could not be decoded.
    #[error("Failed to decode input: {0}")]
    EncodingError(String),

    /// The interpreter stopped on a fatal error.
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for column application.
pub type ColumnResult<T> = Result<T, ColumnError>;

/// Result type for row interpretation.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for CSV driving.
pub type ReadResult<T> = Result<T, ReadError>;
