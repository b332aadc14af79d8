//! Ledger loader: delimited text file to typed [`RawRecord`]s.
//!
//! Encoding and delimiter are auto-detected, then the configured column
//! schema is checked once against the header before any row is read.

use chrono::{DateTime, Local};
use std::path::Path;

use crate::config::{ColumnMapping, PipelineOptions};
use crate::error::{SourceError, SourceResult};
use crate::models::{RawRecord, MAX_YEAR, MIN_YEAR};

/// Row-level parsing error with context
#[derive(Debug, Clone)]
pub struct CsvError {
    pub line: usize,
    pub column: Option<String>,
    pub value: Option<String>,
    pub message: String,
}

impl std::fmt::Display for CsvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.column, &self.value) {
            (Some(col), Some(val)) => {
                write!(f, "Line {}, column '{}' (value '{}'): {}", self.line, col, val, self.message)
            }
            (Some(col), None) => {
                write!(f, "Line {}, column '{}': {}", self.line, col, self.message)
            }
            _ => {
                write!(f, "Line {}: {}", self.line, self.message)
            }
        }
    }
}

impl std::error::Error for CsvError {}

impl CsvError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column: None,
            value: None,
            message: message.into(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Loaded ledger with metadata
#[derive(Debug, Clone)]
pub struct SourceData {
    pub records: Vec<RawRecord>,
    /// Detected encoding
    pub encoding: String,
    /// Detected or configured delimiter
    pub delimiter: char,
    /// Header row as found in the file
    pub headers: Vec<String>,
    /// Last modification of the source file, when read from disk
    pub modified_at: Option<DateTime<Local>>,
}

/// Detect the encoding of raw bytes.
///
/// Valid UTF-8 is taken as is; chardet only guesses for everything else.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes using the given encoding label.
///
/// Invalid UTF-8 falls back to Windows-1252, which is what spreadsheet
/// exports mislabelled as UTF-8 usually are.
pub fn decode_content(bytes: &[u8], encoding: &str) -> SourceResult<String> {
    let text = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match String::from_utf8(bytes.to_vec()) {
            Ok(s) => s,
            Err(_) => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        },
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => {
                let (text, _, had_errors) = enc.decode(bytes);
                if had_errors {
                    return Err(SourceError::Encoding(format!(
                        "invalid byte sequence for {}",
                        enc.name()
                    )));
                }
                text.into_owned()
            }
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };

    Ok(text.trim_start_matches('\u{feff}').to_string())
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ';';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse a decimal cell.
///
/// Accepts `1234.56`, `1234,56` and `1.234,56`. A lone comma is always the
/// decimal separator.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let s: String = raw.trim().chars().filter(|c| !c.is_whitespace()).collect();
    if s.is_empty() {
        return None;
    }

    let normalized = match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) => s.replace(',', "."),
        _ => s,
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an integer cell, tolerating integral decimals such as `2024.0`.
pub fn parse_integral(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v);
    }
    let v = parse_decimal(trimmed)?;
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

/// Load a ledger file from disk.
pub fn load_source<P: AsRef<Path>>(path: P, options: &PipelineOptions) -> SourceResult<SourceData> {
    let path = path.as_ref();
    let io_err = |source| SourceError::Io {
        path: path.display().to_string(),
        source,
    };

    let bytes = std::fs::read(path).map_err(io_err)?;
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(io_err)?;

    let mut data = parse_bytes(&bytes, options)?;
    data.modified_at = Some(DateTime::<Local>::from(modified));
    Ok(data)
}

/// Parse ledger bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes(bytes: &[u8], options: &PipelineOptions) -> SourceResult<SourceData> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(SourceError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = options
        .delimiter
        .unwrap_or_else(|| detect_delimiter(&content));

    let (headers, records) = parse_records(&content, delimiter, &options.columns)?;

    Ok(SourceData {
        records,
        encoding,
        delimiter,
        headers,
        modified_at: None,
    })
}

/// Column positions resolved from the header row.
struct ColumnIndex {
    store: usize,
    manufacturer: usize,
    client: usize,
    description: usize,
    reference: usize,
    year: usize,
    month: usize,
    revenue: usize,
    quantity: usize,
}

impl ColumnIndex {
    fn resolve(headers: &[String], columns: &ColumnMapping) -> SourceResult<Self> {
        let missing: Vec<String> = columns
            .headers()
            .iter()
            .filter(|name| !headers.iter().any(|h| h == *name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(SourceError::MissingColumns(missing));
        }

        let find = |name: &str| headers.iter().position(|h| h == name).unwrap_or_default();
        Ok(Self {
            store: find(&columns.store),
            manufacturer: find(&columns.manufacturer),
            client: find(&columns.client),
            description: find(&columns.description),
            reference: find(&columns.reference),
            year: find(&columns.year),
            month: find(&columns.month),
            revenue: find(&columns.revenue),
            quantity: find(&columns.quantity),
        })
    }
}

/// Parse decoded text into raw records.
///
/// Returns the header row and the records. Empty cells in the nullable
/// categorical columns become `None`.
pub fn parse_records(
    content: &str,
    delimiter: char,
    columns: &ColumnMapping,
) -> SourceResult<(Vec<String>, Vec<RawRecord>)> {
    if !delimiter.is_ascii() {
        return Err(CsvError::new(1, format!("delimiter '{}' is not ASCII", delimiter)).into());
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CsvError::new(1, format!("Cannot read header: {}", e)))?
        .iter()
        .map(|h| h.trim_matches('"').to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(SourceError::EmptyFile);
    }

    let index = ColumnIndex::resolve(&headers, columns)?;

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|e| {
            let line = e.position().map(|p| p.line() as usize).unwrap_or_default();
            CsvError::new(line, e.to_string())
        })?;
        let line = row.position().map(|p| p.line() as usize).unwrap_or_default();

        let cell = |idx: usize| row.get(idx).unwrap_or("");
        let optional = |idx: usize| {
            let v = cell(idx);
            if v.is_empty() {
                None
            } else {
                Some(v.to_string())
            }
        };
        let invalid = |column: &str, value: &str, message: &str| {
            CsvError::new(line, message)
                .with_column(column)
                .with_value(value)
        };

        let store = cell(index.store);
        if store.is_empty() {
            return Err(CsvError::new(line, "store is required")
                .with_column(&columns.store)
                .into());
        }

        let year_raw = cell(index.year);
        let year = parse_integral(year_raw)
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| invalid(&columns.year, year_raw, "expected an integer year"))?;
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(invalid(
                &columns.year,
                year_raw,
                &format!("year must be between {} and {}", MIN_YEAR, MAX_YEAR),
            )
            .into());
        }

        let revenue_raw = cell(index.revenue);
        let revenue = parse_decimal(revenue_raw)
            .ok_or_else(|| invalid(&columns.revenue, revenue_raw, "expected a number"))?;

        let quantity_raw = cell(index.quantity);
        let quantity = parse_integral(quantity_raw)
            .ok_or_else(|| invalid(&columns.quantity, quantity_raw, "expected an integer"))?;

        records.push(RawRecord {
            line,
            store: store.to_string(),
            manufacturer: optional(index.manufacturer),
            client: optional(index.client),
            description: optional(index.description),
            reference: optional(index.reference),
            year,
            month_name: cell(index.month).to_string(),
            revenue,
            quantity,
        });
    }

    Ok((headers, records))
}
