//! Raw record cleanup: month names to periods, sentinels for missing categories.

use crate::config::{MonthTable, UnknownMonthPolicy};
use crate::error::NormalizeError;
use crate::models::{
    NormalizedRecord, Period, RawRecord, DEFAULT_CLIENT, DEFAULT_DESCRIPTION,
    DEFAULT_MANUFACTURER, DEFAULT_REFERENCE,
};

/// Normalized records plus whatever the skip policy dropped.
#[derive(Debug, Default)]
pub struct NormalizeOutcome {
    pub records: Vec<NormalizedRecord>,
    /// Records dropped under [`UnknownMonthPolicy::Skip`].
    pub skipped: Vec<NormalizeError>,
}

/// Normalize one record.
pub fn normalize_record(raw: RawRecord, months: &MonthTable) -> Result<NormalizedRecord, NormalizeError> {
    let month = months
        .month_number(&raw.month_name)
        .ok_or_else(|| NormalizeError::UnknownMonth {
            line: raw.line,
            value: raw.month_name.clone(),
        })?;

    let period = Period::checked(raw.year, month).ok_or(NormalizeError::YearOutOfRange {
        line: raw.line,
        year: raw.year,
    })?;

    Ok(NormalizedRecord {
        period,
        store: raw.store,
        client: raw.client.unwrap_or_else(|| DEFAULT_CLIENT.to_string()),
        manufacturer: raw.manufacturer.unwrap_or_else(|| DEFAULT_MANUFACTURER.to_string()),
        description: raw.description.unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        reference: raw.reference.unwrap_or_else(|| DEFAULT_REFERENCE.to_string()),
        revenue: raw.revenue,
        quantity: raw.quantity,
    })
}

/// Normalize every record, applying the unknown-month policy.
pub fn normalize(
    raw: Vec<RawRecord>,
    months: &MonthTable,
    policy: UnknownMonthPolicy,
) -> Result<NormalizeOutcome, NormalizeError> {
    let mut outcome = NormalizeOutcome {
        records: Vec::with_capacity(raw.len()),
        skipped: Vec::new(),
    };

    for record in raw {
        match normalize_record(record, months) {
            Ok(normalized) => outcome.records.push(normalized),
            Err(err @ NormalizeError::UnknownMonth { .. }) => match policy {
                UnknownMonthPolicy::Abort => return Err(err),
                UnknownMonthPolicy::Skip => outcome.skipped.push(err),
            },
            Err(err) => return Err(err),
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(month: &str) -> RawRecord {
        RawRecord {
            line: 2,
            store: "A".into(),
            manufacturer: None,
            client: None,
            description: None,
            reference: None,
            year: 2024,
            month_name: month.into(),
            revenue: 10.0,
            quantity: 1,
        }
    }

    #[test]
    fn test_sentinels_substituted() {
        let record = normalize_record(raw("Janeiro"), &MonthTable::pt_br()).unwrap();
        assert_eq!(record.period, Period::new(2024, 1));
        assert_eq!(record.client, "Consumidor Final");
        assert_eq!(record.manufacturer, "Não Inf.");
        assert_eq!(record.description, "Outros");
        assert_eq!(record.reference, "S/ REF");
    }

    #[test]
    fn test_present_values_kept() {
        let mut r = raw("dezembro");
        r.client = Some("ACME".into());
        let record = normalize_record(r, &MonthTable::pt_br()).unwrap();
        assert_eq!(record.client, "ACME");
        assert_eq!(record.period.value(), 202412);
    }

    #[test]
    fn test_unknown_month_aborts_by_default() {
        let records = vec![raw("Janeiro"), raw("Janvier")];
        let err = normalize(records, &MonthTable::pt_br(), UnknownMonthPolicy::Abort).unwrap_err();
        let NormalizeError::UnknownMonth { value, line } = err else {
            panic!("expected an unknown month");
        };
        assert_eq!(value, "Janvier");
        assert_eq!(line, 2);
    }

    #[test]
    fn test_unknown_month_skipped() {
        let records = vec![raw("Janeiro"), raw(""), raw("Março")];
        let outcome = normalize(records, &MonthTable::pt_br(), UnknownMonthPolicy::Skip).unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.skipped.len(), 1);
    }

    #[test]
    fn test_year_out_of_range_aborts_even_when_skipping() {
        let mut huge = raw("Janeiro");
        huge.year = 30_000_000;
        let records = vec![raw("Janeiro"), huge];
        let err = normalize(records, &MonthTable::pt_br(), UnknownMonthPolicy::Skip).unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::YearOutOfRange { year: 30_000_000, line: 2 }
        ));
    }
}
