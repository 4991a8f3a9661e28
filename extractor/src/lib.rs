//! # Column Extractor - header-bound CSV row interpretation
//!
//! Maps raw tabular rows into renamed, transformed records. Rows that cannot be mapped
//! are collected as error rows instead of aborting the import.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌──────────────┐
//! │  CSV input  │────▶│   Reader    │────▶│  Extractor  │────▶│  processed   │
//! │ (any codec) │     │ (csv crate) │     │  + Columns  │     │  + errors    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use column_extractor::{Column, Extractor};
//!
//! let mut extractor = Extractor::new([Column::new("foo").rename("A"), Column::new("bar")]);
//! extractor.interpret(&["foo", "bar"])?;
//! extractor.interpret(&["1", "2"])?;
//! extractor.interpret(&["1"])?;
//!
//! assert_eq!(extractor.processed()[0]["A"], "1");
//! assert_eq!(extractor.errors()[0].error, "Row does not have enough columns");
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Data, extraction, config and reader errors
//! - [`column`] - Column rules and bound rows
//! - [`extractor`] - Row state machine and result stores
//! - [`config`] - JSON column rules and value operations
//! - [`reader`] - Drive an interpreter from CSV bytes or files

pub mod error;

pub mod column;
pub mod extractor;

pub mod config;

pub mod reader;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    BoxError, ColumnError, ColumnResult, ConfigError, ConfigResult, DataError, ExtractError,
    ExtractResult, ReadError, ReadResult,
};

// =============================================================================
// Re-exports - Rules and extraction
// =============================================================================

pub use column::{BoundRow, Column, ColumnOutput, TransformFn};
pub use extractor::{ErrorRow, Extractor, Interpreter, Record, State, WIDTH_MISMATCH};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{
    Candidates, ColumnSpec, ExtractorConfig, Operation, OperationChain, Pattern,
};

// =============================================================================
// Re-exports - Reader
// =============================================================================

pub use reader::{
    decode_content, detect_delimiter, detect_encoding, interpret_bytes, interpret_path,
    interpret_reader, ReadSummary, ReaderOptions,
};
