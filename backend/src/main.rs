//! Salescube CLI - Build and inspect dashboard sales summaries
//!
//! # Main Commands
//!
//! ```bash
//! salescube build base_de_dados.csv -o summary.json   # Ledger CSV to summary JSON
//! salescube check summary.json                        # Schema and consistency check
//! ```
//!
//! # Query Commands
//!
//! ```bash
//! salescube yoy summary.json --from 2024 --to 2025    # Year-over-year change
//! salescube trend summary.json --year 2025            # Last 3 months vs the rest
//! salescube find summary.json c "consumidor"          # Search a dimension map
//! salescube example-config                            # Print default options
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use salescube::logs::{log_error, log_info, log_success, log_warning, LogFormat, LOGGER};
use salescube::{
    find_values, format_delimiter, run_pipeline, trend, validate_summary_document, verify,
    Dimension, PipelineConfig, PipelineOptions, SummaryDocument, UnknownMonthPolicy,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "salescube")]
#[command(about = "Turn a sales ledger export into a compact dashboard summary", long_about = None)]
struct Cli {
    /// Suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Progress output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormatArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: ledger CSV → summary JSON
    Build {
        /// Input ledger CSV
        input: PathBuf,

        /// Output summary file
        #[arg(short, long, default_value = salescube::config::DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Options JSON file (columns, month names, policies)
        #[arg(short, long, env = "SALESCUBE_CONFIG")]
        config: Option<PathBuf>,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Drop rows with an unknown month name instead of aborting
        #[arg(long)]
        skip_unknown_months: bool,

        /// Indent the output JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Year-over-year change between two years of a summary
    Yoy {
        /// Summary JSON file
        summary: PathBuf,

        /// Base year (default: the year before `--to`)
        #[arg(long)]
        from: Option<i32>,

        /// Compared year (default: latest year in the summary)
        #[arg(long)]
        to: Option<i32>,
    },

    /// Trailing months of a year against its earlier months
    Trend {
        /// Summary JSON file
        summary: PathBuf,

        /// Year to inspect
        #[arg(long)]
        year: i32,

        /// Number of trailing months
        #[arg(short, long, default_value = "3")]
        window: usize,
    },

    /// Search the values of a dimension map
    Find {
        /// Summary JSON file
        summary: PathBuf,

        /// Dimension key (s, c, m, d, r) or name
        dimension: String,

        /// Text to look for
        needle: String,

        /// Match case exactly
        #[arg(long)]
        case_sensitive: bool,
    },

    /// Validate a summary against the schema and its own totals
    Check {
        /// Summary JSON file
        summary: PathBuf,
    },

    /// Show the default options file
    ExampleConfig,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    LOGGER.set_quiet(cli.quiet);
    LOGGER.set_format(cli.log_format.into());
    let json_report = matches!(cli.log_format, LogFormatArg::Json);

    let result = match cli.command {
        Commands::Build {
            input,
            output,
            config,
            delimiter,
            skip_unknown_months,
            pretty,
        } => cmd_build(
            input,
            output,
            config.as_deref(),
            delimiter,
            skip_unknown_months,
            pretty,
            json_report,
        ),

        Commands::Yoy { summary, from, to } => cmd_yoy(&summary, from, to),

        Commands::Trend {
            summary,
            year,
            window,
        } => cmd_trend(&summary, year, window),

        Commands::Find {
            summary,
            dimension,
            needle,
            case_sensitive,
        } => cmd_find(&summary, &dimension, &needle, case_sensitive),

        Commands::Check { summary } => cmd_check(&summary),

        Commands::ExampleConfig => cmd_example_config(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_build(
    input: PathBuf,
    output: PathBuf,
    config_path: Option<&Path>,
    delimiter: Option<char>,
    skip_unknown_months: bool,
    pretty: bool,
    json_report: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = match config_path {
        Some(path) => {
            log_info(format!("⚙️  Options: {}", path.display()));
            PipelineOptions::from_file(path)?
        }
        None => PipelineOptions::default(),
    };

    // Command-line flags win over the options file
    if delimiter.is_some() {
        options.delimiter = delimiter;
    }
    if skip_unknown_months {
        options.unknown_month = UnknownMonthPolicy::Skip;
    }
    if pretty {
        options.pretty = true;
    }

    let config = PipelineConfig::new(input, output).with_options(options);
    let report = run_pipeline(&config)?;

    if json_report {
        println!("{}", serde_json::to_string(&report)?);
        return Ok(());
    }

    log_info(format!("   Encoding: {}", report.encoding));
    log_info(format!("   Delimiter: '{}'", format_delimiter(report.delimiter)));
    log_info(format!("   Records: {} read, {} skipped", report.raw_count, report.skipped_count));
    log_info(format!(
        "   Rows: {} over {} periods",
        report.row_count, report.period_count
    ));
    log_success(format!(
        "{} bytes written to {}",
        report.bytes_written,
        report.output.display()
    ));
    Ok(())
}

fn cmd_yoy(
    summary: &Path,
    from: Option<i32>,
    to: Option<i32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = SummaryDocument::load(summary)?;

    let to = to
        .or_else(|| doc.yoy.keys().next_back().copied())
        .ok_or("Summary has no yearly totals")?;
    let from = from
        .or_else(|| doc.yoy.range(..to).next_back().map(|(y, _)| *y))
        .ok_or_else(|| format!("No year before {} in summary", to))?;

    for year in [from, to] {
        match doc.yoy.get(&year) {
            Some(total) => println!("{}: {:.2}", year, total),
            None => println!("{}: no data", year),
        }
    }
    println!("{} → {}: {}", from, to, salescube::yoy_delta(&doc, from, to));
    Ok(())
}

fn cmd_trend(summary: &Path, year: i32, window: usize) -> Result<(), Box<dyn std::error::Error>> {
    let doc = SummaryDocument::load(summary)?;
    let t = trend(&doc, year, window)?;

    if t.trailing.is_empty() {
        log_warning(format!("No periods for {}", year));
    }
    println!(
        "Last {} months avg: {}",
        t.trailing.len(),
        format_average(t.trailing_avg)
    );
    println!(
        "Previous {} months avg: {}",
        t.earlier.len(),
        format_average(t.earlier_avg)
    );
    println!("Trend: {}", t.delta);
    if t.delta.percent().is_some_and(|p| p < 0.0) {
        log_warning(format!("Revenue for {} is trending down", year));
    }
    Ok(())
}

fn format_average(avg: Option<f64>) -> String {
    match avg {
        Some(v) => format!("{:.2}", v),
        None => "N/A".to_string(),
    }
}

fn cmd_find(
    summary: &Path,
    dimension: &str,
    needle: &str,
    case_sensitive: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let dimension = Dimension::from_key(dimension)
        .ok_or_else(|| format!("Unknown dimension: {}", dimension))?;
    let doc = SummaryDocument::load(summary)?;

    let hits = find_values(&doc, dimension, needle, case_sensitive)?;
    if hits.is_empty() {
        log_warning(format!("No {} matches '{}'", dimension, needle));
        return Ok(());
    }
    for (code, value) in hits {
        println!("{}\t{}", code, value);
    }
    Ok(())
}

fn cmd_check(summary: &Path) -> Result<(), Box<dyn std::error::Error>> {
    log_info(format!("✔️  Checking: {}", summary.display()));

    let content = fs::read_to_string(summary)?;
    let value: Value = serde_json::from_str(&content)?;

    if let Err(errors) = validate_summary_document(&value) {
        for err in errors.iter().take(5) {
            log_error(err.clone());
        }
        return Err(format!("{} schema violation(s)", errors.len()).into());
    }
    log_success("Schema valid");

    let doc: SummaryDocument = serde_json::from_value(value)?;
    if let Err(errors) = verify(&doc) {
        for err in errors.iter().take(5) {
            log_error(err.clone());
        }
        return Err(format!("{} consistency violation(s)", errors.len()).into());
    }
    log_success(format!(
        "Consistent: {} rows, {} periods, revenue {:.2}",
        doc.rows.len(),
        doc.maps.p.len(),
        doc.kpis.rev
    ));
    Ok(())
}

fn cmd_example_config() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", PipelineOptions::default().to_json()?);
    Ok(())
}
