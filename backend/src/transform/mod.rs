//! Transformation module.
//!
//! In-memory stages between the loader and the writer:
//! - Normalizer: month names to periods, blank categoricals to sentinels
//! - Aggregator: sum revenue and quantity per full dimension key
//! - Encoder: revenue-ranked dimension maps and encoded rows
//! - Metrics: monthly series, yearly totals, KPIs
//! - Pipeline: the stages wired together

pub mod aggregator;
pub mod encoder;
pub mod metrics;
pub mod normalizer;
pub mod pipeline;

pub use aggregator::aggregate;
pub use encoder::{encode_dimensions, encode_rows, DimensionMap, DimensionMaps};
pub use metrics::{build_metrics, DerivedMetrics};
pub use normalizer::{normalize, NormalizeOutcome};
pub use pipeline::*;
