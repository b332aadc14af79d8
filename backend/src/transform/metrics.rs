//! Derived metrics computed straight from normalized records.
//!
//! Nothing here reads the aggregated rows, so the figures do not depend on
//! how finely the fact table is grouped.

use std::collections::BTreeMap;

use crate::config::MonthTable;
use crate::error::EncodeError;
use crate::models::{round2, Dimension, Kpis, MonthlyEntry, NormalizedRecord, Period};

use super::encoder::DimensionMap;

/// Monthly summary, per-year totals and global KPIs.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedMetrics {
    pub monthly: Vec<MonthlyEntry>,
    pub yoy: BTreeMap<i32, f64>,
    pub kpis: Kpis,
}

/// Chart label for a period, e.g. `Jan/24`.
pub fn month_label(period: Period, months: &MonthTable) -> String {
    let label = months.label(period.month()).unwrap_or("???");
    format!("{}/{:02}", label, period.year().rem_euclid(100))
}

/// Revenue per period, ascending by period.
pub fn monthly_summary(
    records: &[NormalizedRecord],
    periods: &DimensionMap<Period>,
    months: &MonthTable,
) -> Result<Vec<MonthlyEntry>, EncodeError> {
    let mut totals: BTreeMap<Period, f64> = BTreeMap::new();
    for record in records {
        *totals.entry(record.period).or_insert(0.0) += record.revenue;
    }

    totals
        .into_iter()
        .map(|(period, revenue)| {
            let pid = periods.code(&period).ok_or_else(|| EncodeError::UnmappedValue {
                dimension: Dimension::Period,
                value: period.to_string(),
            })?;
            Ok(MonthlyEntry {
                name: month_label(period, months),
                rev: round2(revenue),
                pid,
                year: period.year(),
            })
        })
        .collect()
}

/// Revenue per calendar year.
pub fn year_totals(records: &[NormalizedRecord]) -> BTreeMap<i32, f64> {
    let mut totals: BTreeMap<i32, f64> = BTreeMap::new();
    for record in records {
        *totals.entry(record.period.year()).or_insert(0.0) += record.revenue;
    }
    totals.into_iter().map(|(year, rev)| (year, round2(rev))).collect()
}

/// Global KPIs. `row_count` is the number of aggregated rows.
pub fn global_kpis(records: &[NormalizedRecord], row_count: usize) -> Kpis {
    let revenue: f64 = records.iter().map(|r| r.revenue).sum();
    let quantity: i64 = records.iter().map(|r| r.quantity).sum();
    let avg = if records.is_empty() {
        0.0
    } else {
        revenue / records.len() as f64
    };

    Kpis {
        rev: round2(revenue),
        qty: quantity,
        avg: round2(avg),
        cnt: row_count,
    }
}

/// Build every derived metric.
pub fn build_metrics(
    records: &[NormalizedRecord],
    periods: &DimensionMap<Period>,
    months: &MonthTable,
    row_count: usize,
) -> Result<DerivedMetrics, EncodeError> {
    Ok(DerivedMetrics {
        monthly: monthly_summary(records, periods, months)?,
        yoy: year_totals(records),
        kpis: global_kpis(records, row_count),
    })
}
