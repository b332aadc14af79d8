//! Pipeline configuration.
//!
//! [`PipelineOptions`] is plain serde data so it can live in a JSON file next
//! to the ledger export; [`PipelineConfig`] adds the input and output paths.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};

/// Default output file name.
pub const DEFAULT_OUTPUT: &str = "summary.json";

// =============================================================================
// Column mapping
// =============================================================================

/// Source header name for each raw-record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub store: String,
    pub manufacturer: String,
    pub client: String,
    pub description: String,
    pub reference: String,
    pub year: String,
    pub month: String,
    pub revenue: String,
    pub quantity: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            store: "Nome_Loja[Loja]".to_string(),
            manufacturer: "PRODUTO[NOME_FABRICANTE]".to_string(),
            client: "MOVIMENTO[NOME_CLIENTE]".to_string(),
            description: "GABARITO HARM[descricao]".to_string(),
            reference: "PRODUTO[CODIGO_REFERENCIA_PRODUTO]".to_string(),
            year: "Dcalendario[Ano]".to_string(),
            month: "Dcalendario[Mês]".to_string(),
            revenue: "[Receita_Líquida]".to_string(),
            quantity: "[QTD]".to_string(),
        }
    }
}

impl ColumnMapping {
    /// Every configured header, in raw-record field order.
    pub fn headers(&self) -> [&str; 9] {
        [
            self.store.as_str(),
            self.manufacturer.as_str(),
            self.client.as_str(),
            self.description.as_str(),
            self.reference.as_str(),
            self.year.as_str(),
            self.month.as_str(),
            self.revenue.as_str(),
            self.quantity.as_str(),
        ]
    }
}

// =============================================================================
// Month table
// =============================================================================

/// Full month names (matched case-insensitively) and their chart labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthTable {
    /// Full names, January first.
    pub names: [String; 12],
    /// Three-letter labels, January first.
    pub labels: [String; 12],
}

impl MonthTable {
    /// Brazilian Portuguese month names.
    pub fn pt_br() -> Self {
        Self::from_strs(
            [
                "janeiro", "fevereiro", "março", "abril", "maio", "junho", "julho", "agosto",
                "setembro", "outubro", "novembro", "dezembro",
            ],
            [
                "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
            ],
        )
    }

    fn from_strs(names: [&str; 12], labels: [&str; 12]) -> Self {
        Self {
            names: names.map(str::to_string),
            labels: labels.map(str::to_string),
        }
    }

    /// 1-based month number for a name, ignoring case and surrounding spaces.
    pub fn month_number(&self, name: &str) -> Option<u32> {
        let needle = name.trim().to_lowercase();
        self.names
            .iter()
            .position(|n| n.to_lowercase() == needle)
            .map(|i| i as u32 + 1)
    }

    /// Label for a 1-based month number.
    pub fn label(&self, month: u32) -> Option<&str> {
        let idx = (month as usize).checked_sub(1)?;
        self.labels.get(idx).map(String::as_str)
    }
}

impl Default for MonthTable {
    fn default() -> Self {
        Self::pt_br()
    }
}

// =============================================================================
// Options
// =============================================================================

/// What to do with a record whose month text is not in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownMonthPolicy {
    /// Fail the whole run.
    #[default]
    Abort,
    /// Drop the record and keep going.
    Skip,
}

/// Options for a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Source header names.
    pub columns: ColumnMapping,

    /// Month names and labels.
    pub months: MonthTable,

    /// Unknown month handling.
    pub unknown_month: UnknownMonthPolicy,

    /// Force a delimiter instead of detecting it.
    pub delimiter: Option<char>,

    /// Pretty-print the output document.
    pub pretty: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            columns: ColumnMapping::default(),
            months: MonthTable::default(),
            unknown_month: UnknownMonthPolicy::Abort,
            delimiter: None,
            pretty: false,
        }
    }
}

impl PipelineOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load options from a JSON file.
    pub fn from_file(path: &Path) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Options(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_json(&content)
            .map_err(|e| PipelineError::Options(format!("'{}': {}", path.display(), e)))
    }
}

// =============================================================================
// Run configuration
// =============================================================================

/// Everything one run needs: where to read, where to write, and how.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub options: PipelineOptions,
}

impl PipelineConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }
}
