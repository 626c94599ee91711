use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("CSV parsing system error: {source}")]
    CsvSystemError {
        #[from]
        source: csv::Error,
    },

    #[error("CSV data format error: {0}")]
    CsvDataFormatError(String),

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("Archive error: {source}")]
    ArchiveError {
        #[from]
        source: zip::result::ZipError,
    },

    #[error("JSON error: {source}")]
    JsonError {
        #[from]
        source: serde_json::Error,
    },

    #[error("Column '{0}' is not present in the table")]
    ColumnAbsent(String),

    #[error("Background task failed: {0}")]
    TaskError(String),
}

/// Why a lookup produced no source at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundReason {
    SymbolMissing { symbol: String },
    NoMatchingFile { pattern: String },
    ColumnMissing { feature: String },
    NoPriceColumns,
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundReason::SymbolMissing { symbol } => write!(f, "no data directory for symbol '{}'", symbol),
            NotFoundReason::NoMatchingFile { pattern } => write!(f, "no file matching '{}'", pattern),
            NotFoundReason::ColumnMissing { feature } => write!(f, "no source exposes column '{}'", feature),
            NotFoundReason::NoPriceColumns => f.write_str("no source exposes price columns"),
        }
    }
}

/// Result of a single lookup. Only `Failed` reflects a fault; the other
/// non-data variants are ordinary answers.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Data(T),
    /// The source existed but nothing survived windowing.
    Empty,
    NotFound(NotFoundReason),
    Failed(String),
}

impl<T> Outcome<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            Outcome::Data(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Outcome::Data(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Outcome::Data(_))
    }

    /// Human readable note for anything that is not data.
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            Outcome::Data(_) => None,
            Outcome::Empty => Some("no data in the requested window".to_string()),
            Outcome::NotFound(reason) => Some(reason.to_string()),
            Outcome::Failed(msg) => Some(format!("lookup failed: {}", msg)),
        }
    }
}

impl<T> From<Result<Outcome<T>, EngineError>> for Outcome<T> {
    fn from(result: Result<Outcome<T>, EngineError>) -> Self {
        match result {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(error = %err, "Lookup fault converted to an empty result");
                Outcome::Failed(err.to_string())
            }
        }
    }
}
