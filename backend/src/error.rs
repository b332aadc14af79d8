//! Error types for the salescube pipeline.
//!
//! One enum per stage, wrapped by [`PipelineError`] at the top:
//!
//! - [`SourceError`] - the ledger file cannot be loaded or does not match the schema
//! - [`NormalizeError`] - a record cannot be normalized (unknown month name, bad year)
//! - [`EncodeError`] - internal dictionary-encoding invariant violated
//! - [`OutputError`] - the summary document cannot be validated or written
//! - [`QueryError`] - a consumer query cannot be answered
//!
//! Conversion is automatic via `From`, so `?` works across stage boundaries.

use thiserror::Error;

use crate::models::Dimension;
use crate::parser::CsvError;

// =============================================================================
// Source Errors
// =============================================================================

/// Errors while loading the raw ledger.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to read the file.
    #[error("Failed to read source '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to decode the bytes.
    #[error("Failed to decode source: {0}")]
    Encoding(String),

    /// Malformed row or cell.
    #[error("Invalid source data: {0}")]
    Csv(#[from] CsvError),

    /// Required columns are absent from the header.
    #[error("Missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Empty file.
    #[error("Source file is empty")]
    EmptyFile,
}

// =============================================================================
// Normalization Errors
// =============================================================================

/// Errors while normalizing raw records.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Month text not present in the month table.
    #[error("Unknown month name '{value}' on line {line}")]
    UnknownMonth { line: usize, value: String },

    /// Year outside the supported calendar range.
    #[error("Year {year} on line {line} is outside 1..=9999")]
    YearOutOfRange { line: usize, year: i32 },
}

// =============================================================================
// Encoding Errors
// =============================================================================

/// Errors while dictionary-encoding aggregated rows.
///
/// These never come from bad input: every map is built from the rows it
/// encodes, so a miss means the encoder itself is broken.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// A value has no code in its dimension map.
    #[error("Value '{value}' is not mapped in dimension '{dimension}'")]
    UnmappedValue { dimension: Dimension, value: String },
}

// =============================================================================
// Output Errors
// =============================================================================

/// Errors while assembling or writing the summary document.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Filesystem error.
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Output JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document does not satisfy the embedded schema.
    #[error("Summary document failed schema validation: {}", .errors.join("; "))]
    Schema { errors: Vec<String> },
}

// =============================================================================
// Query Errors
// =============================================================================

/// Errors from the consumer-side queries.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Failed to read the document.
    #[error("Failed to read summary: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid JSON for the summary layout.
    #[error("Invalid summary document: {0}")]
    Json(#[from] serde_json::Error),

    /// Unknown dimension key.
    #[error("Unknown dimension '{0}' (expected one of s, c, m, d, r)")]
    UnknownDimension(String),

    /// A row or monthly entry points outside `maps.p`.
    #[error("Period index {0} is out of range")]
    PeriodOutOfRange(usize),

    /// The search text could not be compiled into a matcher.
    #[error("Invalid search pattern: {0}")]
    InvalidPattern(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level error returned by [`crate::transform::pipeline::run_pipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source loading error.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Normalization error.
    #[error("Normalize error: {0}")]
    Normalize(#[from] NormalizeError),

    /// Encoding error.
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Output error.
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// Options file could not be read or parsed.
    #[error("Invalid options: {0}")]
    Options(String),

    /// No records survived loading and normalization.
    #[error("No records to process")]
    EmptyInput,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for source loading.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for output operations.
pub type OutputResult<T> = Result<T, OutputError>;

/// Result type for consumer queries.
pub type QueryResult<T> = Result<T, QueryError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
