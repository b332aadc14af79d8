//! The summary document and its all-or-nothing writer.
//!
//! ```text
//! {
//!   "maps":    { "s": [..], "c": [..], "m": [..], "d": [..], "r": [..], "p": [202401, ..] },
//!   "rows":    [[period_idx, store_idx, client_idx, mfr_idx, desc_idx, ref_idx, revenue, qty], ..],
//!   "monthly": [{ "name": "Jan/24", "rev": .., "pid": 0, "year": 2024 }, ..],
//!   "yoy":     { "2024": .., "2025": .. },
//!   "kpis":    { "rev": .., "qty": .., "avg": .., "cnt": .. },
//!   "updated_at": "DD/MM/YYYY HH:MM"
//! }
//! ```

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{OutputError, OutputResult, QueryResult};
use crate::models::{Dimension, EncodedRow, Kpis, MonthlyEntry, Period};
use crate::transform::encoder::DimensionMaps;
use crate::transform::metrics::DerivedMetrics;
use crate::validation::validate_summary_document;

/// Format of `updated_at`.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Dimension value lists; list index is the code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedMaps {
    pub s: Vec<String>,
    pub c: Vec<String>,
    pub m: Vec<String>,
    pub d: Vec<String>,
    pub r: Vec<String>,
    pub p: Vec<Period>,
}

impl EncodedMaps {
    /// Value list of a categorical dimension.
    pub fn values(&self, dimension: Dimension) -> Option<&[String]> {
        match dimension {
            Dimension::Period => None,
            Dimension::Store => Some(&self.s),
            Dimension::Client => Some(&self.c),
            Dimension::Manufacturer => Some(&self.m),
            Dimension::Description => Some(&self.d),
            Dimension::Reference => Some(&self.r),
        }
    }
}

impl From<DimensionMaps> for EncodedMaps {
    fn from(maps: DimensionMaps) -> Self {
        Self {
            s: maps.store.into_values(),
            c: maps.client.into_values(),
            m: maps.manufacturer.into_values(),
            d: maps.description.into_values(),
            r: maps.reference.into_values(),
            p: maps.period.into_values(),
        }
    }
}

/// The self-contained output of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryDocument {
    pub maps: EncodedMaps,
    pub rows: Vec<EncodedRow>,
    pub monthly: Vec<MonthlyEntry>,
    pub yoy: BTreeMap<i32, f64>,
    pub kpis: Kpis,
    pub updated_at: String,
}

impl SummaryDocument {
    pub fn assemble(
        maps: DimensionMaps,
        rows: Vec<EncodedRow>,
        metrics: DerivedMetrics,
        updated_at: String,
    ) -> Self {
        Self {
            maps: maps.into(),
            rows,
            monthly: metrics.monthly,
            yoy: metrics.yoy,
            kpis: metrics.kpis,
            updated_at,
        }
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read a document written by a previous run.
    pub fn load(path: &Path) -> QueryResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// Value of period code `idx`.
    pub fn period(&self, idx: usize) -> Option<Period> {
        self.maps.p.get(idx).copied()
    }
}

/// Format a source modification time for `updated_at`.
pub fn format_timestamp(time: &DateTime<Local>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Validate and serialize a document, then write it atomically.
pub fn write_document(document: &SummaryDocument, path: &Path, pretty: bool) -> OutputResult<usize> {
    let value = serde_json::to_value(document)?;
    validate_summary_document(&value).map_err(|errors| OutputError::Schema { errors })?;

    let json = document.to_json(pretty)?;
    write_atomic(path, json.as_bytes())?;
    Ok(json.len())
}

/// Write through a temporary file in the target directory, renamed into
/// place after a full flush. Missing parent directories are created.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> OutputResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
