//! Consumer-side queries over a finished summary document.
//!
//! These read only the published layout (`maps`, `rows`, `monthly`, `yoy`,
//! `kpis`), the same way dashboard scripts do, and double as a check that
//! the producer honours its contract. Every ratio is guarded: an empty group
//! or a zero denominator yields [`Delta::Undefined`].

use regex::RegexBuilder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{QueryError, QueryResult};
use crate::models::{round2, Dimension};
use crate::output::SummaryDocument;

/// Relative change in percent, or nothing when the base is zero or missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum Delta {
    Defined(f64),
    Undefined,
}

impl Delta {
    /// `(current / base - 1) * 100`.
    pub fn relative(current: f64, base: f64) -> Self {
        if base == 0.0 || !base.is_finite() || !current.is_finite() {
            return Self::Undefined;
        }
        Self::Defined((current / base - 1.0) * 100.0)
    }

    pub fn percent(&self) -> Option<f64> {
        match self {
            Self::Defined(v) => Some(*v),
            Self::Undefined => None,
        }
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defined(v) => write!(f, "{:.2}%", v),
            Self::Undefined => f.write_str("N/A"),
        }
    }
}

/// Revenue of each period code, summed over rows.
pub fn period_revenue(doc: &SummaryDocument) -> QueryResult<Vec<f64>> {
    let mut totals = vec![0.0; doc.maps.p.len()];
    for row in &doc.rows {
        let slot = totals
            .get_mut(row.period_idx())
            .ok_or(QueryError::PeriodOutOfRange(row.period_idx()))?;
        *slot += row.revenue();
    }
    Ok(totals)
}

/// Revenue per year summed over rows. Must agree with `doc.yoy`.
pub fn year_totals(doc: &SummaryDocument) -> QueryResult<BTreeMap<i32, f64>> {
    let mut totals: BTreeMap<i32, f64> = BTreeMap::new();
    for (idx, revenue) in period_revenue(doc)?.into_iter().enumerate() {
        let year = doc.period(idx).ok_or(QueryError::PeriodOutOfRange(idx))?.year();
        *totals.entry(year).or_insert(0.0) += revenue;
    }
    Ok(totals.into_iter().map(|(y, v)| (y, round2(v))).collect())
}

/// Change of the published yearly total from `from` to `to`.
pub fn yoy_delta(doc: &SummaryDocument, from: i32, to: i32) -> Delta {
    match (doc.yoy.get(&from), doc.yoy.get(&to)) {
        (Some(&base), Some(&current)) => Delta::relative(current, base),
        _ => Delta::Undefined,
    }
}

/// Trailing window of a year against the months before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendComparison {
    pub year: i32,
    /// Period codes before the window
    pub earlier: Vec<usize>,
    /// Period codes in the window
    pub trailing: Vec<usize>,
    pub earlier_avg: Option<f64>,
    pub trailing_avg: Option<f64>,
    pub delta: Delta,
}

fn average(values: &[f64], indices: &[usize]) -> Option<f64> {
    if indices.is_empty() {
        return None;
    }
    let sum: f64 = indices.iter().map(|&i| values[i]).sum();
    Some(sum / indices.len() as f64)
}

/// Compare the average monthly revenue of the last `window` periods of
/// `year` with the average of its earlier periods.
pub fn trend(doc: &SummaryDocument, year: i32, window: usize) -> QueryResult<TrendComparison> {
    let revenue = period_revenue(doc)?;
    let periods: Vec<usize> = doc
        .maps
        .p
        .iter()
        .enumerate()
        .filter(|(_, p)| p.year() == year)
        .map(|(idx, _)| idx)
        .collect();

    let split = periods.len().saturating_sub(window);
    let (earlier, trailing) = periods.split_at(split);

    let earlier_avg = average(&revenue, earlier);
    let trailing_avg = average(&revenue, trailing);
    let delta = match (earlier_avg, trailing_avg) {
        (Some(base), Some(current)) => Delta::relative(current, base),
        _ => Delta::Undefined,
    };

    Ok(TrendComparison {
        year,
        earlier: earlier.to_vec(),
        trailing: trailing.to_vec(),
        earlier_avg,
        trailing_avg,
        delta,
    })
}

/// Values of a categorical dimension containing `needle`, with their codes.
pub fn find_values(
    doc: &SummaryDocument,
    dimension: Dimension,
    needle: &str,
    case_sensitive: bool,
) -> QueryResult<Vec<(usize, String)>> {
    let values = doc
        .maps
        .values(dimension)
        .ok_or_else(|| QueryError::UnknownDimension(dimension.key().to_string()))?;

    let matcher = RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| QueryError::InvalidPattern(e.to_string()))?;

    Ok(values
        .iter()
        .enumerate()
        .filter(|(_, v)| matcher.is_match(v))
        .map(|(i, v)| (i, v.clone()))
        .collect())
}

/// Check the cross-field invariants of a document.
///
/// Returns every violation found: codes out of range, periods not strictly
/// ascending, revenue not conserved between rows, months and `kpis.rev`,
/// and per-year row totals disagreeing with `yoy`.
pub fn verify(doc: &SummaryDocument) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    for (i, row) in doc.rows.iter().enumerate() {
        if row.period_idx() >= doc.maps.p.len() {
            errors.push(format!("row {}: period code {} out of range", i, row.period_idx()));
        }
        for dim in Dimension::CATEGORICAL {
            let len = doc.maps.values(dim).map_or(0, <[String]>::len);
            if row.code(dim) >= len {
                errors.push(format!("row {}: {} code {} out of range", i, dim, row.code(dim)));
            }
        }
    }
    for entry in &doc.monthly {
        if entry.pid >= doc.maps.p.len() {
            errors.push(format!("monthly '{}': pid {} out of range", entry.name, entry.pid));
        }
    }
    if doc.maps.p.windows(2).any(|w| w[0] >= w[1]) {
        errors.push("maps.p is not strictly ascending".to_string());
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let row_tolerance = 0.005 * (doc.rows.len() + 1) as f64;
    let row_total: f64 = doc.rows.iter().map(|r| r.revenue()).sum();
    if (row_total - doc.kpis.rev).abs() > row_tolerance {
        errors.push(format!("rows sum to {:.2}, kpis.rev is {:.2}", row_total, doc.kpis.rev));
    }

    let month_tolerance = 0.005 * (doc.monthly.len() + 1) as f64;
    let month_total: f64 = doc.monthly.iter().map(|m| m.rev).sum();
    if (month_total - doc.kpis.rev).abs() > month_tolerance {
        errors.push(format!("monthly sums to {:.2}, kpis.rev is {:.2}", month_total, doc.kpis.rev));
    }

    match year_totals(doc) {
        Ok(from_rows) => {
            for (year, published) in &doc.yoy {
                let computed = from_rows.get(year).copied().unwrap_or(0.0);
                if (computed - published).abs() > row_tolerance {
                    errors.push(format!(
                        "year {}: rows sum to {:.2}, yoy is {:.2}",
                        year, computed, published
                    ));
                }
            }
            for year in from_rows.keys().filter(|y| !doc.yoy.contains_key(y)) {
                errors.push(format!("year {} has rows but no yoy entry", year));
            }
        }
        Err(e) => errors.push(e.to_string()),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
