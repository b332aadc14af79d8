//! High-level pipeline API: ledger file in, summary document out.
//!
//! # Example
//!
//! ```rust,ignore
//! use salescube::{run_pipeline, PipelineConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::new("base_de_dados.csv", "dashboard/src/data/summary.json");
//!     let report = run_pipeline(&config)?;
//!     println!("{} rows encoded", report.row_count);
//!     Ok(())
//! }
//! ```

use chrono::Local;
use serde::Serialize;
use std::path::PathBuf;

use crate::config::{PipelineConfig, PipelineOptions};
use crate::error::{PipelineError, PipelineResult};
use crate::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::models::{Dimension, RawRecord};
use crate::output::{format_timestamp, write_document, SummaryDocument};
use crate::parser::{load_source, SourceData};

use super::aggregator::aggregate;
use super::encoder::{encode_dimensions, encode_rows};
use super::metrics::build_metrics;
use super::normalizer::normalize;

/// A built document plus what happened on the way.
#[derive(Debug, Clone)]
pub struct SummaryBuild {
    pub document: SummaryDocument,
    /// Records received from the loader
    pub raw_count: usize,
    /// Records dropped for an unknown month name
    pub skipped_count: usize,
}

/// Outcome of a complete run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub encoding: String,
    pub delimiter: char,
    pub raw_count: usize,
    pub skipped_count: usize,
    pub row_count: usize,
    pub period_count: usize,
    pub bytes_written: usize,
}

/// Run every in-memory stage on already-loaded records.
///
/// Pure: the same records, options and timestamp always give the same
/// document.
pub fn build_summary(
    raw: Vec<RawRecord>,
    options: &PipelineOptions,
    updated_at: String,
) -> PipelineResult<SummaryBuild> {
    let raw_count = raw.len();

    log_info("🧹 Normalizing records...");
    let normalized = normalize(raw, &options.months, options.unknown_month)?;
    if !normalized.skipped.is_empty() {
        log_warning(format!(
            "{} records skipped (unknown month name)",
            normalized.skipped.len()
        ));
        for err in normalized.skipped.iter().take(5) {
            log_info_indent(err.to_string(), 1);
        }
    }
    let records = normalized.records;
    if records.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    log_success(format!("{} records normalized", records.len()));

    log_info("📦 Aggregating...");
    let rows = aggregate(&records);
    log_success(format!("{} distinct rows", rows.len()));

    log_info("🔢 Sorting dimensions by revenue...");
    let maps = encode_dimensions(&records, &rows);
    for dim in Dimension::CATEGORICAL {
        if let Some(map) = maps.categorical(dim) {
            log_info_indent(format!("{}: {} values", dim, map.len()), 1);
        }
    }
    log_info_indent(format!("period: {} values", maps.period.len()), 1);

    log_info("⚙️  Encoding rows...");
    let encoded = encode_rows(&rows, &maps)?;

    log_info("📈 Computing monthly summary and KPIs...");
    let metrics = build_metrics(&records, &maps.period, &options.months, encoded.len())?;

    Ok(SummaryBuild {
        document: SummaryDocument::assemble(maps, encoded, metrics, updated_at),
        raw_count,
        skipped_count: normalized.skipped.len(),
    })
}

/// Load, transform and write in one go.
///
/// Either the whole document is written or nothing is.
pub fn run_pipeline(config: &PipelineConfig) -> PipelineResult<RunReport> {
    log_info(format!("📖 Reading {}...", config.input.display()));
    let source = load_source(&config.input, &config.options)?;
    log_source(&source);

    let updated_at = format_timestamp(&source.modified_at.unwrap_or_else(Local::now));

    let SourceData {
        records,
        encoding,
        delimiter,
        ..
    } = source;

    let build = build_summary(records, &config.options, updated_at)?;

    log_info(format!("💾 Saving {}...", config.output.display()));
    let bytes_written = write_document(&build.document, &config.output, config.options.pretty)?;
    log_success(format!("Done! {} rows encoded", build.document.rows.len()));

    Ok(RunReport {
        input: config.input.clone(),
        output: config.output.clone(),
        encoding,
        delimiter,
        raw_count: build.raw_count,
        skipped_count: build.skipped_count,
        row_count: build.document.rows.len(),
        period_count: build.document.maps.p.len(),
        bytes_written,
    })
}

fn log_source(source: &SourceData) {
    log_success(format!("Detected encoding: {}", source.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(source.delimiter)));
    log_success(format!("Read {} rows", source.records.len()));
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnMapping, UnknownMonthPolicy};
    use crate::error::NormalizeError;
    use crate::query::{trend, verify, year_totals, yoy_delta, Delta};
    use tempfile::tempdir;

    const STAMP: &str = "01/02/2025 10:00";

    fn raw(
        year: i32,
        month: &str,
        store: &str,
        client: Option<&str>,
        reference: &str,
        revenue: f64,
        quantity: i64,
    ) -> RawRecord {
        RawRecord {
            line: 0,
            store: store.into(),
            manufacturer: Some("X".into()),
            client: client.map(String::from),
            description: Some("Y".into()),
            reference: Some(reference.into()),
            year,
            month_name: month.into(),
            revenue,
            quantity,
        }
    }

    fn build(records: Vec<RawRecord>) -> SummaryDocument {
        build_summary(records, &PipelineOptions::default(), STAMP.into())
            .unwrap()
            .document
    }

    fn mixed_ledger() -> Vec<RawRecord> {
        vec![
            raw(2024, "Janeiro", "A", Some("ACME"), "R1", 100.0, 1),
            raw(2024, "Janeiro", "B", None, "R2", 20.25, 2),
            raw(2024, "Fevereiro", "A", Some("ACME"), "R1", 10.0, 1),
            raw(2024, "Março", "C", Some("Beta"), "R3", 300.0, 5),
            raw(2024, "Março", "B", None, "R2", 0.125, 1),
            raw(2025, "Janeiro", "A", Some("Beta"), "R1", 45.5, 3),
            raw(2024, "Janeiro", "A", Some("ACME"), "R1", 1.1, 1),
        ]
    }

    #[test]
    fn test_two_record_scenario() {
        let doc = build(vec![
            raw(2024, "Janeiro", "A", None, "R1", 100.0, 2),
            raw(2024, "Janeiro", "A", None, "R1", 50.5, 1),
        ]);

        assert_eq!(doc.rows.len(), 1);
        let row = doc.rows[0];
        assert_eq!(row.period_idx(), 0);
        assert_eq!(row.code(Dimension::Store), 0);
        assert_eq!(row.code(Dimension::Client), 0);
        assert_eq!(row.revenue(), 150.5);
        assert_eq!(row.quantity(), 3);
        assert_eq!(doc.maps.c[row.code(Dimension::Client)], "Consumidor Final");
        assert_eq!(doc.maps.p[0].value(), 202401);
        assert_eq!(doc.kpis.rev, 150.5);
        assert_eq!(doc.kpis.qty, 3);
        assert_eq!(doc.kpis.cnt, 1);
        assert_eq!(doc.kpis.avg, 75.25);
    }

    #[test]
    fn test_yoy_scenario() {
        let doc = build(vec![
            raw(2024, "Janeiro", "A", None, "R1", 400.0, 1),
            raw(2024, "Junho", "A", None, "R1", 600.0, 1),
            raw(2025, "Janeiro", "A", None, "R1", 500.0, 1),
            raw(2025, "Junho", "A", None, "R1", 700.0, 1),
        ]);

        assert_eq!(doc.yoy.get(&2024), Some(&1000.0));
        assert_eq!(doc.yoy.get(&2025), Some(&1200.0));
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["yoy"], serde_json::json!({ "2024": 1000.0, "2025": 1200.0 }));

        let delta = yoy_delta(&doc, 2024, 2025);
        assert_eq!(delta.to_string(), "20.00%");
        assert_eq!(year_totals(&doc).unwrap(), doc.yoy);
    }

    #[test]
    fn test_deterministic_output() {
        let a = build(mixed_ledger()).to_json(false).unwrap();
        let b = build(mixed_ledger()).to_json(false).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_bijection_every_code_used() {
        let doc = build(mixed_ledger());
        for dim in Dimension::CATEGORICAL {
            let n = doc.maps.values(dim).unwrap().len();
            let mut used = vec![false; n];
            for row in &doc.rows {
                used[row.code(dim)] = true;
            }
            assert!(used.iter().all(|u| *u), "orphaned code in {dim}");
        }
        let mut used = vec![false; doc.maps.p.len()];
        for row in &doc.rows {
            used[row.period_idx()] = true;
        }
        assert!(used.iter().all(|u| *u));
    }

    #[test]
    fn test_revenue_conservation() {
        let doc = build(mixed_ledger());
        let tolerance = 0.005 * (doc.rows.len() + 1) as f64;
        let rows: f64 = doc.rows.iter().map(|r| r.revenue()).sum();
        let monthly: f64 = doc.monthly.iter().map(|m| m.rev).sum();
        assert!((rows - doc.kpis.rev).abs() <= tolerance);
        assert!((monthly - doc.kpis.rev).abs() <= tolerance);
        assert!(verify(&doc).is_ok());
    }

    #[test]
    fn test_sort_invariant() {
        let doc = build(mixed_ledger());
        for dim in Dimension::CATEGORICAL {
            let n = doc.maps.values(dim).unwrap().len();
            let mut totals = vec![0.0; n];
            for row in &doc.rows {
                totals[row.code(dim)] += row.revenue();
            }
            for pair in totals.windows(2) {
                assert!(pair[0] >= pair[1], "{dim} not revenue-descending: {totals:?}");
            }
        }
        assert_eq!(doc.maps.s, vec!["C", "A", "B"]);
        assert_eq!(doc.maps.c[0], "Beta");
    }

    #[test]
    fn test_periods_strictly_ascending() {
        let doc = build(mixed_ledger());
        let values: Vec<i32> = doc.maps.p.iter().map(|p| p.value()).collect();
        assert_eq!(values, vec![202401, 202402, 202403, 202501]);
        assert_eq!(doc.monthly.len(), 4);
        assert_eq!(doc.monthly[3].pid, 3);
        assert_eq!(doc.monthly[3].name, "Jan/25");
    }

    #[test]
    fn test_sentinel_client_resolves() {
        let doc = build(mixed_ledger());
        let sentinel = doc
            .maps
            .c
            .iter()
            .position(|c| c == "Consumidor Final")
            .unwrap();
        let store_b = doc.maps.s.iter().position(|s| s == "B").unwrap();
        for row in doc.rows.iter().filter(|r| r.code(Dimension::Store) == store_b) {
            assert_eq!(row.code(Dimension::Client), sentinel);
        }
    }

    #[test]
    fn test_unknown_month_aborts() {
        let mut records = mixed_ledger();
        records.push(raw(2024, "Brumaire", "A", None, "R1", 1.0, 1));
        let err = build_summary(records, &PipelineOptions::default(), STAMP.into()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Normalize(NormalizeError::UnknownMonth { .. })
        ));
    }

    #[test]
    fn test_unknown_month_skip_policy() {
        let mut records = mixed_ledger();
        records.push(raw(2024, "Brumaire", "A", None, "R1", 1.0, 1));
        let options = PipelineOptions {
            unknown_month: UnknownMonthPolicy::Skip,
            ..PipelineOptions::default()
        };
        let outcome = build_summary(records, &options, STAMP.into()).unwrap();
        assert_eq!(outcome.skipped_count, 1);
        assert_eq!(outcome.raw_count, 8);
        assert_eq!(outcome.document, build(mixed_ledger()));
    }

    #[test]
    fn test_out_of_range_year_rejected() {
        let mut records = mixed_ledger();
        records.push(raw(30_000_000, "Janeiro", "A", None, "R1", 1.0, 1));
        let err = build_summary(records, &PipelineOptions::default(), STAMP.into()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Normalize(NormalizeError::YearOutOfRange { year: 30_000_000, .. })
        ));
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = build_summary(vec![], &PipelineOptions::default(), STAMP.into()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }

    #[test]
    fn test_trend_on_built_document() {
        let doc = build(mixed_ledger());
        let t = trend(&doc, 2024, 1).unwrap();
        assert_eq!(t.trailing.len(), 1);
        assert_eq!(t.earlier.len(), 2);
        assert!(matches!(t.delta, Delta::Defined(_)));
    }

    fn short_columns() -> ColumnMapping {
        ColumnMapping {
            store: "loja".into(),
            manufacturer: "fabricante".into(),
            client: "cliente".into(),
            description: "descricao".into(),
            reference: "ref".into(),
            year: "ano".into(),
            month: "mes".into(),
            revenue: "receita".into(),
            quantity: "qtd".into(),
        }
    }

    #[test]
    fn test_run_pipeline_end_to_end() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("base.csv");
        let output = dir.path().join("out").join("summary.json");
        std::fs::write(
            &input,
            "loja;fabricante;cliente;descricao;ref;ano;mes;receita;qtd\n\
             A;X;;Y;R1;2024;Janeiro;100,00;2\n\
             A;X;;Y;R1;2024;janeiro;50,50;1\n",
        )
        .unwrap();

        let options = PipelineOptions {
            columns: short_columns(),
            ..PipelineOptions::default()
        };
        let config = PipelineConfig::new(&input, &output).with_options(options);
        let report = run_pipeline(&config).unwrap();

        assert_eq!(report.raw_count, 2);
        assert_eq!(report.row_count, 1);
        assert_eq!(report.delimiter, ';');

        let summary = serde_json::to_value(&report).unwrap();
        assert_eq!(summary["row_count"], 1);
        assert_eq!(summary["encoding"], "utf-8");
        assert_eq!(summary["delimiter"], ";");

        let doc = SummaryDocument::load(&output).unwrap();
        assert_eq!(doc.rows[0].revenue(), 150.5);
        assert_eq!(doc.maps.c, vec!["Consumidor Final"]);
        assert_eq!(doc.updated_at.len(), "DD/MM/YYYY HH:MM".len());
    }

    #[test]
    fn test_failed_run_leaves_no_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("base.csv");
        let output = dir.path().join("summary.json");
        std::fs::write(
            &input,
            "loja;fabricante;cliente;descricao;ref;ano;mes;receita;qtd\n\
             A;X;;Y;R1;2024;Janvier;100,00;2\n",
        )
        .unwrap();

        let options = PipelineOptions {
            columns: short_columns(),
            ..PipelineOptions::default()
        };
        let config = PipelineConfig::new(&input, &output).with_options(options);
        assert!(run_pipeline(&config).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_columns_abort_run() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("base.csv");
        let output = dir.path().join("summary.json");
        std::fs::write(&input, "loja;ano\nA;2024\n").unwrap();

        let config = PipelineConfig::new(&input, &output);
        let err = run_pipeline(&config).unwrap_err();
        assert!(matches!(err, PipelineError::Source(_)));
        assert!(!output.exists());
    }
}
