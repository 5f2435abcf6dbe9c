//! Structured logging for the flood data tooling.
//!
//! Provides context-rich logging with data-source tags, item identifiers
//! (tile names, site numbers, tool names), timestamps, and severity levels.
//! Supports console output and an optional append-only log file.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// USGS The National Map product API (DEM tiles).
    Tnm,
    /// USGS NWIS water services (stream gauges).
    Usgs,
    /// NOAA Storm Events data.
    Noaa,
    Gdal,
    Whitebox,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Tnm => write!(f, "TNM"),
            DataSource::Usgs => write!(f, "USGS"),
            DataSource::Noaa => write!(f, "NOAA"),
            DataSource::Gdal => write!(f, "GDAL"),
            DataSource::Whitebox => write!(f, "WBT"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the product was withdrawn or moved upstream
    Expected,
    /// Unexpected failure - indicates service degradation or a network problem
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        // A poisoned lock only means another thread panicked mid-log.
        let mut slot = LOGGER.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(logger);
    }

    fn log(&self, level: LogLevel, source: &DataSource, item: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let item_part = item.map(|s| format!(" [{}]", s)).unwrap_or_default();
        let log_entry = format_entry(&timestamp.to_string(), level, source, item, message);

        if self.console_timestamps {
            match level {
                LogLevel::Error | LogLevel::Warning => eprintln!("{}", log_entry),
                LogLevel::Info | LogLevel::Debug => println!("{}", log_entry),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", source, item_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", source, item_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}{}: {}", source, item_part, message),
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

/// `"<timestamp> <LEVEL> <SOURCE> [item]: message"`
fn format_entry(
    timestamp: &str,
    level: LogLevel,
    source: &DataSource,
    item: Option<&str>,
    message: &str,
) -> String {
    let item_part = item.map(|s| format!(" [{}]", s)).unwrap_or_default();
    format!("{} {} {}{}: {}", timestamp, level, source, item_part, message)
}

fn with_logger(level: LogLevel, source: DataSource, item: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, &source, item, message);
        }
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

/// Log a general informational message
pub fn info(source: DataSource, item: Option<&str>, message: &str) {
    with_logger(LogLevel::Info, source, item, message);
}

/// Log a warning message
pub fn warn(source: DataSource, item: Option<&str>, message: &str) {
    with_logger(LogLevel::Warning, source, item, message);
}

/// Log an error message
pub fn error(source: DataSource, item: Option<&str>, message: &str) {
    with_logger(LogLevel::Error, source, item, message);
}

/// Log a debug message
pub fn debug(source: DataSource, item: Option<&str>, message: &str) {
    with_logger(LogLevel::Debug, source, item, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a per-item download failure from its error message.
pub fn classify_download_failure(error_message: &str) -> FailureType {
    // TNM occasionally lists products whose files have been withdrawn
    if error_message.contains("HTTP error: 404") || error_message.contains("HTTP error: 410") {
        FailureType::Expected
    } else if error_message.contains("HTTP error")
        || error_message.contains("timed out")
        || error_message.contains("timeout")
    {
        FailureType::Unexpected
    } else {
        FailureType::Unknown
    }
}

/// Log a per-item download failure with automatic classification
pub fn log_download_failure(
    source: DataSource,
    item: &str,
    operation: &str,
    err: &dyn std::error::Error,
) {
    let error_msg = err.to_string();
    let failure_type = classify_download_failure(&error_msg);

    let message = format!("{} failed [{}]: {}", operation, failure_type, error_msg);

    match failure_type {
        FailureType::Expected => debug(source, Some(item), &message),
        FailureType::Unexpected => error(source, Some(item), &message),
        FailureType::Unknown => warn(source, Some(item), &message),
    }
}

// ---------------------------------------------------------------------------
// Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a batch of downloads
pub fn log_download_summary(source: DataSource, total: usize, successful: usize, failed: usize) {
    let message = format!(
        "Download complete: {}/{} successful, {} failed",
        successful, total, failed
    );

    if failed == 0 {
        info(source, None, &message);
    } else if successful == 0 {
        error(source, None, &message);
    } else {
        warn(source, None, &message);
    }
}
