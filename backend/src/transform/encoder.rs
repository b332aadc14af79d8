//! Dictionary encoding of the aggregated fact table.
//!
//! Each categorical dimension gets a [`DimensionMap`] whose codes follow
//! descending total revenue, so code 0 is always the top seller and a ranking
//! panel can read the first K codes without sorting. Ties keep the order in
//! which values first appear in the aggregated rows. Periods are coded in
//! ascending order instead.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

use crate::error::EncodeError;
use crate::models::{round2, AggregatedRow, Dimension, EncodedRow, NormalizedRecord, Period};

/// Bijection between the distinct values of one dimension and `0..len`.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionMap<T: Eq + Hash> {
    values: Vec<T>,
    codes: HashMap<T, usize>,
}

impl<T: Eq + Hash + Clone> DimensionMap<T> {
    /// Build from values already in code order. Duplicates keep their first position.
    pub fn from_ordered(ordered: impl IntoIterator<Item = T>) -> Self {
        let mut values = Vec::new();
        let mut codes = HashMap::new();
        for value in ordered {
            if !codes.contains_key(&value) {
                codes.insert(value.clone(), values.len());
                values.push(value);
            }
        }
        Self { values, codes }
    }

    /// Code of a value.
    pub fn code<Q>(&self, value: &Q) -> Option<usize>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.codes.get(value).copied()
    }

    /// Value behind a code.
    pub fn value(&self, code: usize) -> Option<&T> {
        self.values.get(code)
    }

    /// Values in code order.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }
}

/// The six maps of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionMaps {
    pub period: DimensionMap<Period>,
    pub store: DimensionMap<String>,
    pub client: DimensionMap<String>,
    pub manufacturer: DimensionMap<String>,
    pub description: DimensionMap<String>,
    pub reference: DimensionMap<String>,
}

impl DimensionMaps {
    /// Map of a categorical dimension; `None` for [`Dimension::Period`].
    pub fn categorical(&self, dimension: Dimension) -> Option<&DimensionMap<String>> {
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

/// Rank the values of one categorical dimension by total revenue, descending.
///
/// Totals are summed from the rounded revenue each encoded row publishes,
/// so a consumer re-summing `rows` sees the same order.
pub fn rank_by_revenue(rows: &[AggregatedRow], dimension: Dimension) -> DimensionMap<String> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut totals: Vec<(&str, f64)> = Vec::new();

    for row in rows {
        let Some(value) = row.key.categorical(dimension) else {
            continue;
        };
        let revenue = round2(row.revenue);
        match slots.get(value) {
            Some(&slot) => totals[slot].1 += revenue,
            None => {
                slots.insert(value, totals.len());
                totals.push((value, revenue));
            }
        }
    }

    // sort_by is stable: equal totals (0.0 and -0.0 included) keep first-seen order
    totals.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    DimensionMap::from_ordered(totals.into_iter().map(|(value, _)| value.to_string()))
}

/// Distinct periods of the normalized records, ascending.
pub fn period_map(records: &[NormalizedRecord]) -> DimensionMap<Period> {
    let periods: BTreeSet<Period> = records.iter().map(|r| r.period).collect();
    DimensionMap::from_ordered(periods)
}

/// Build all six dimension maps.
pub fn encode_dimensions(records: &[NormalizedRecord], rows: &[AggregatedRow]) -> DimensionMaps {
    DimensionMaps {
        period: period_map(records),
        store: rank_by_revenue(rows, Dimension::Store),
        client: rank_by_revenue(rows, Dimension::Client),
        manufacturer: rank_by_revenue(rows, Dimension::Manufacturer),
        description: rank_by_revenue(rows, Dimension::Description),
        reference: rank_by_revenue(rows, Dimension::Reference),
    }
}

fn lookup(maps: &DimensionMaps, row: &AggregatedRow, dimension: Dimension) -> Result<usize, EncodeError> {
    let value = row.key.categorical(dimension).unwrap_or_default();
    maps.categorical(dimension)
        .and_then(|map| map.code(value))
        .ok_or_else(|| EncodeError::UnmappedValue {
            dimension,
            value: value.to_string(),
        })
}

/// Replace every dimension value of every row with its code.
pub fn encode_rows(rows: &[AggregatedRow], maps: &DimensionMaps) -> Result<Vec<EncodedRow>, EncodeError> {
    rows.iter()
        .map(|row| {
            let period = maps
                .period
                .code(&row.key.period)
                .ok_or_else(|| EncodeError::UnmappedValue {
                    dimension: Dimension::Period,
                    value: row.key.period.to_string(),
                })?;

            Ok(EncodedRow(
                period,
                lookup(maps, row, Dimension::Store)?,
                lookup(maps, row, Dimension::Client)?,
                lookup(maps, row, Dimension::Manufacturer)?,
                lookup(maps, row, Dimension::Description)?,
                lookup(maps, row, Dimension::Reference)?,
                round2(row.revenue),
                row.quantity,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroupKey;

    fn row(period: Period, store: &str, client: &str, revenue: f64) -> AggregatedRow {
        AggregatedRow {
            key: GroupKey {
                period,
                store: store.into(),
                client: client.into(),
                manufacturer: "X".into(),
                description: "Y".into(),
                reference: "R1".into(),
            },
            revenue,
            quantity: 1,
        }
    }

    fn normalized(period: Period) -> NormalizedRecord {
        NormalizedRecord {
            period,
            store: "A".into(),
            client: "C".into(),
            manufacturer: "X".into(),
            description: "Y".into(),
            reference: "R1".into(),
            revenue: 1.0,
            quantity: 1,
        }
    }

    #[test]
    fn test_revenue_descending_order() {
        let p = Period::new(2024, 1);
        let rows = vec![
            row(p, "small", "c", 10.0),
            row(p, "big", "c", 100.0),
            row(p, "mid", "c", 40.0),
            row(p, "small", "c", 5.0),
        ];
        let map = rank_by_revenue(&rows, Dimension::Store);
        assert_eq!(map.values(), ["big", "mid", "small"]);
        assert_eq!(map.code("small"), Some(2));
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let p = Period::new(2024, 1);
        let rows = vec![
            row(p, "b", "c", 10.0),
            row(p, "a", "c", 10.0),
            row(p, "z", "c", 20.0),
        ];
        let map = rank_by_revenue(&rows, Dimension::Store);
        assert_eq!(map.values(), ["z", "b", "a"]);
    }

    #[test]
    fn test_ranking_uses_published_revenue() {
        let p = Period::new(2024, 1);
        let rows = vec![
            row(p, "A", "c1", 3.334),
            row(p, "A", "c2", 3.334),
            row(p, "A", "c3", 3.334),
            row(p, "B", "c1", 10.001),
        ];
        let maps = encode_dimensions(&[normalized(p)], &rows);
        assert_eq!(maps.store.values(), ["B", "A"]);

        let encoded = encode_rows(&rows, &maps).unwrap();
        let mut totals = vec![0.0; maps.store.len()];
        for r in &encoded {
            totals[r.code(Dimension::Store)] += r.revenue();
        }
        assert!(totals[0] >= totals[1], "{totals:?}");
    }

    #[test]
    fn test_signed_zero_totals_tie() {
        let p = Period::new(2024, 1);
        let rows = vec![
            row(p, "neg", "c", -0.0),
            row(p, "pos", "c", 0.0),
            row(p, "refund", "c", -5.0),
            row(p, "first", "c", 0.0),
        ];
        let map = rank_by_revenue(&rows, Dimension::Store);
        assert_eq!(map.values(), ["neg", "pos", "first", "refund"]);
    }

    #[test]
    fn test_period_map_ascending() {
        let records = vec![
            normalized(Period::new(2025, 1)),
            normalized(Period::new(2024, 12)),
            normalized(Period::new(2025, 1)),
            normalized(Period::new(2024, 3)),
        ];
        let map = period_map(&records);
        let values: Vec<i32> = map.values().iter().map(Period::value).collect();
        assert_eq!(values, vec![202403, 202412, 202501]);
    }

    #[test]
    fn test_encode_rows_uses_codes() {
        let p1 = Period::new(2024, 1);
        let p2 = Period::new(2024, 2);
        let rows = vec![row(p2, "A", "small", 1.004), row(p1, "B", "big", 99.0)];
        let records = vec![normalized(p1), normalized(p2)];
        let maps = encode_dimensions(&records, &rows);
        let encoded = encode_rows(&rows, &maps).unwrap();

        assert_eq!(encoded[0], EncodedRow(1, 1, 1, 0, 0, 0, 1.0, 1));
        assert_eq!(encoded[1], EncodedRow(0, 0, 0, 0, 0, 0, 99.0, 1));
    }

    #[test]
    fn test_unmapped_value_detected() {
        let p = Period::new(2024, 1);
        let rows = vec![row(p, "A", "c", 1.0)];
        let mut maps = encode_dimensions(&[normalized(p)], &rows);
        maps.client = DimensionMap::from_ordered(vec!["other".to_string()]);

        let err = encode_rows(&rows, &maps).unwrap_err();
        let EncodeError::UnmappedValue { dimension, value } = err;
        assert_eq!(dimension, Dimension::Client);
        assert_eq!(value, "c");
    }

    #[test]
    fn test_bijection() {
        let p = Period::new(2024, 1);
        let rows = vec![row(p, "A", "c1", 3.0), row(p, "B", "c2", 2.0), row(p, "A", "c3", 1.0)];
        let map = rank_by_revenue(&rows, Dimension::Client);
        for (code, value) in map.values().iter().enumerate() {
            assert_eq!(map.code(value.as_str()), Some(code));
            assert_eq!(map.value(code), Some(value));
        }
    }
}
