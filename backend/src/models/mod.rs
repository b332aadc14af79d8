//! Domain models for the salescube pipeline.
//!
//! - [`RawRecord`] - one sale line as loaded from the ledger
//! - [`NormalizedRecord`] - a sale with resolved period and no missing categories
//! - [`Period`] - `year * 100 + month` key
//! - [`Dimension`] - the six axes of the fact table
//! - [`GroupKey`] / [`AggregatedRow`] - one distinct dimension tuple and its sums
//! - [`EncodedRow`], [`MonthlyEntry`], [`Kpis`] - pieces of the output document

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Sentinels
// =============================================================================

/// Substituted for a missing client.
pub const DEFAULT_CLIENT: &str = "Consumidor Final";

/// Substituted for a missing manufacturer.
pub const DEFAULT_MANUFACTURER: &str = "Não Inf.";

/// Substituted for a missing product description.
pub const DEFAULT_DESCRIPTION: &str = "Outros";

/// Substituted for a missing product reference.
pub const DEFAULT_REFERENCE: &str = "S/ REF";

// =============================================================================
// Raw Record
// =============================================================================

/// One sale line, already column-selected by the loader.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// 1-based line in the source file (header is line 1).
    pub line: usize,
    pub store: String,
    pub manufacturer: Option<String>,
    pub client: Option<String>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub year: i32,
    pub month_name: String,
    pub revenue: f64,
    pub quantity: i64,
}

// =============================================================================
// Period
// =============================================================================

/// Earliest year a ledger row may carry.
pub const MIN_YEAR: i32 = 1;

/// Latest year a ledger row may carry.
pub const MAX_YEAR: i32 = 9999;

/// Calendar month key: `year * 100 + month`.
///
/// Numeric order is chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Period(i32);

impl Period {
    /// Build from a year and a 1-based month.
    ///
    /// Saturates instead of overflowing; use [`Period::checked`] for
    /// untrusted input.
    pub fn new(year: i32, month: u32) -> Self {
        Self(year.saturating_mul(100).saturating_add(month as i32))
    }

    /// `None` unless `year` is in `MIN_YEAR..=MAX_YEAR` and `month` in `1..=12`.
    pub fn checked(year: i32, month: u32) -> Option<Self> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) || !(1..=12).contains(&month) {
            return None;
        }
        Some(Self(year * 100 + month as i32))
    }

    pub fn year(&self) -> i32 {
        self.0.div_euclid(100)
    }

    pub fn month(&self) -> u32 {
        self.0.rem_euclid(100) as u32
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Normalized Record
// =============================================================================

/// A sale with a resolved period and every categorical field filled.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub period: Period,
    pub store: String,
    pub client: String,
    pub manufacturer: String,
    pub description: String,
    pub reference: String,
    pub revenue: f64,
    pub quantity: i64,
}

// =============================================================================
// Dimension
// =============================================================================

/// A categorical axis of the fact table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Period,
    Store,
    Client,
    Manufacturer,
    Description,
    Reference,
}

impl Dimension {
    /// The five revenue-ranked dimensions, in output-document order.
    pub const CATEGORICAL: [Dimension; 5] = [
        Dimension::Store,
        Dimension::Client,
        Dimension::Manufacturer,
        Dimension::Description,
        Dimension::Reference,
    ];

    /// Short key used in `maps`.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Period => "p",
            Self::Store => "s",
            Self::Client => "c",
            Self::Manufacturer => "m",
            Self::Description => "d",
            Self::Reference => "r",
        }
    }

    /// Parse a short key or a full name.
    pub fn from_key(key: &str) -> Option<Self> {
        let normalized = key.trim().to_lowercase();
        match normalized.as_str() {
            "p" | "period" => Some(Self::Period),
            "s" | "store" => Some(Self::Store),
            "c" | "client" => Some(Self::Client),
            "m" | "mfr" | "manufacturer" => Some(Self::Manufacturer),
            "d" | "desc" | "description" => Some(Self::Description),
            "r" | "ref" | "reference" => Some(Self::Reference),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Period => "period",
            Self::Store => "store",
            Self::Client => "client",
            Self::Manufacturer => "manufacturer",
            Self::Description => "description",
            Self::Reference => "reference",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Aggregation
// =============================================================================

/// The full dimension tuple a sale is grouped by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub period: Period,
    pub store: String,
    pub client: String,
    pub manufacturer: String,
    pub description: String,
    pub reference: String,
}

impl GroupKey {
    pub fn from_record(record: &NormalizedRecord) -> Self {
        Self {
            period: record.period,
            store: record.store.clone(),
            client: record.client.clone(),
            manufacturer: record.manufacturer.clone(),
            description: record.description.clone(),
            reference: record.reference.clone(),
        }
    }

    /// Value of a categorical dimension; `None` for [`Dimension::Period`].
    pub fn categorical(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Period => None,
            Dimension::Store => Some(&self.store),
            Dimension::Client => Some(&self.client),
            Dimension::Manufacturer => Some(&self.manufacturer),
            Dimension::Description => Some(&self.description),
            Dimension::Reference => Some(&self.reference),
        }
    }
}

/// One distinct dimension tuple with summed measures (unrounded).
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    pub key: GroupKey,
    pub revenue: f64,
    pub quantity: i64,
}

// =============================================================================
// Output pieces
// =============================================================================

/// `[period_idx, store_idx, client_idx, mfr_idx, desc_idx, ref_idx, revenue, qty]`.
///
/// Serializes as a JSON array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncodedRow(
    pub usize,
    pub usize,
    pub usize,
    pub usize,
    pub usize,
    pub usize,
    pub f64,
    pub i64,
);

impl EncodedRow {
    pub fn period_idx(&self) -> usize {
        self.0
    }

    /// Code of a dimension in this row.
    pub fn code(&self, dimension: Dimension) -> usize {
        match dimension {
            Dimension::Period => self.0,
            Dimension::Store => self.1,
            Dimension::Client => self.2,
            Dimension::Manufacturer => self.3,
            Dimension::Description => self.4,
            Dimension::Reference => self.5,
        }
    }

    pub fn revenue(&self) -> f64 {
        self.6
    }

    pub fn quantity(&self) -> i64 {
        self.7
    }
}

/// Revenue of one calendar month across every other dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyEntry {
    /// Chart label, e.g. `Jan/24`.
    pub name: String,
    pub rev: f64,
    /// Index into `maps.p`.
    pub pid: usize,
    pub year: i32,
}

/// Global scalar metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    /// Total revenue.
    pub rev: f64,
    /// Total quantity.
    pub qty: i64,
    /// Mean revenue per sale record.
    pub avg: f64,
    /// Number of aggregated rows.
    pub cnt: usize,
}

/// Round to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
