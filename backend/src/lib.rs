//! # Salescube - sales ledger to dashboard summary
//!
//! Salescube turns a flat sales ledger export (one row per sale line) into a
//! compact, dictionary-encoded JSON summary that a static dashboard can load
//! in one request.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Ledger CSV │────▶│   Parser    │────▶│  Normalize  │────▶│  Aggregate  │────▶│   Encode    │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │  (periods)  │     │  (sum keys) │     │ (rank maps) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                                        │
//!                     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐            │
//!                     │ summary.json│◀────│   Output    │◀────│   Metrics   │◀───────────┘
//!                     │  (atomic)   │     │  (schema)   │     │ (yoy, kpis) │
//!                     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use salescube::{run_pipeline, PipelineConfig};
//!
//! fn main() {
//!     let config = PipelineConfig::new("base_de_dados.csv", "summary.json");
//!     let report = run_pipeline(&config).unwrap();
//!     println!("Encoded {} rows over {} periods", report.row_count, report.period_count);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per stage
//! - [`models`] - Records, periods, dimensions, encoded rows
//! - [`config`] - Column mapping, month table, pipeline options
//! - [`logs`] - Progress logging to stderr
//! - [`parser`] - Ledger loading with encoding and delimiter detection
//! - [`transform`] - Normalize, aggregate, encode, metrics, pipeline
//! - [`validation`] - Summary document schema validation
//! - [`output`] - Summary document and atomic writer
//! - [`query`] - Consumer-side queries over a written document

// Core modules
pub mod error;
pub mod models;
pub mod config;
pub mod logs;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// Output
pub mod output;

// Queries
pub mod query;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    EncodeError,
    NormalizeError,
    OutputError,
    PipelineError,
    PipelineResult,
    QueryError,
    SourceError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    AggregatedRow,
    Dimension,
    EncodedRow,
    Kpis,
    MonthlyEntry,
    NormalizedRecord,
    Period,
    RawRecord,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{
    ColumnMapping,
    MonthTable,
    PipelineConfig,
    PipelineOptions,
    UnknownMonthPolicy,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    detect_encoding,
    load_source,
    parse_bytes,
    CsvError,
    SourceData,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    is_valid,
    is_valid_summary_document,
    validate,
    validate_summary_document,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    build_summary,
    format_delimiter,
    run_pipeline,
    RunReport,
    SummaryBuild,
};

// =============================================================================
// Re-exports - Output
// =============================================================================

pub use output::{write_document, EncodedMaps, SummaryDocument};

// =============================================================================
// Re-exports - Queries
// =============================================================================

pub use query::{
    find_values,
    trend,
    verify,
    year_totals,
    yoy_delta,
    Delta,
    TrendComparison,
};
