//! Pipeline progress logging.
//!
//! Every stage reports through the process-wide [`LOGGER`]. Entries go to
//! stderr so stdout stays free for query results, either as prefixed text or
//! as one JSON object per line for scripted runs.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth for sub-steps
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Info, message: message.into(), indent: 0 }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Success, message: message.into(), indent: 0 }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Warning, message: message.into(), indent: 0 }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Error, message: message.into(), indent: 0 }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Human-readable rendering.
    pub fn render_text(&self) -> String {
        let prefix = match self.level {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        };
        let indent = "   ".repeat(self.indent as usize);
        format!("{}{} {}", indent, prefix, self.message)
    }
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Global logger
pub static LOGGER: Lazy<Logger> = Lazy::new(Logger::new);

/// Writes log entries to stderr.
pub struct Logger {
    quiet: AtomicBool,
    json: AtomicBool,
}

impl Logger {
    pub fn new() -> Self {
        Self {
            quiet: AtomicBool::new(false),
            json: AtomicBool::new(false),
        }
    }

    /// Suppress everything except errors.
    pub fn set_quiet(&self, quiet: bool) {
        self.quiet.store(quiet, Ordering::Relaxed);
    }

    pub fn set_format(&self, format: LogFormat) {
        self.json.store(format == LogFormat::Json, Ordering::Relaxed);
    }

    pub fn log(&self, entry: LogEntry) {
        if self.quiet.load(Ordering::Relaxed) && entry.level != LogLevel::Error {
            return;
        }

        if self.json.load(Ordering::Relaxed) {
            match serde_json::to_string(&entry) {
                Ok(line) => eprintln!("{}", line),
                Err(_) => eprintln!("{}", entry.render_text()),
            }
        } else {
            eprintln!("{}", entry.render_text());
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenient logging functions
pub fn log_info(msg: impl Into<String>) {
    LOGGER.log(LogEntry::info(msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOGGER.log(LogEntry::success(msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOGGER.log(LogEntry::warning(msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOGGER.log(LogEntry::error(msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LOGGER.log(LogEntry::info(msg).with_indent(indent));
}
