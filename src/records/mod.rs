//! Play-event record sources.
//!
//! A [`RecordSource`] produces a lazy, finite sequence of [`PlayEvent`]s. Every
//! call to [`RecordSource::scan`] starts over from the beginning of the
//! underlying table, so the same source can serve any number of queries.
//!
//! Rows that cannot be turned into a play event are reported as recoverable
//! [`RecordError::Malformed`] items; consumers count and skip them. Every other
//! error means the table itself cannot be read any further.

mod csv_source;
mod json_source;
mod memory_source;
mod play_event;
pub mod timestamp;

pub use csv_source::CsvRecordSource;
pub use json_source::{JsonLayout, JsonRecordSource};
pub use memory_source::MemorySource;
pub use play_event::PlayEvent;

use std::path::Path;
use thiserror::Error;

/// Why a single row was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("missing required field {0}")]
    MissingField(&'static str),

    #[error("unparseable timestamp \"{0}\"")]
    BadTimestamp(String),

    #[error("invalid durationMs \"{0}\"")]
    BadDuration(String),

    #[error("unreadable row: {0}")]
    Unparseable(String),
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("row {row}: {reason}")]
    Malformed { row: u64, reason: MalformedReason },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid record table: {0}")]
    Format(String),
}

impl RecordError {
    /// Whether the scan can continue past this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RecordError::Malformed { .. })
    }
}

pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<PlayEvent, RecordError>> + Send + 'a>;

/// A restartable table of play events.
pub trait RecordSource: Send + Sync {
    /// Opens a fresh pass over the table.
    fn scan(&self) -> Result<RecordIter<'_>, RecordError>;

    /// Short human-readable description, used in logs.
    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RecordFormat {
    Csv,
    Json,
    Jsonl,
}

impl RecordFormat {
    pub fn from_path(path: &Path) -> Option<RecordFormat> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(RecordFormat::Csv),
            "json" => Some(RecordFormat::Json),
            "jsonl" | "ndjson" => Some(RecordFormat::Jsonl),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordFormat::Csv => write!(f, "csv"),
            RecordFormat::Json => write!(f, "json"),
            RecordFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

/// Opens the record table at `path`, inferring the format from the file
/// extension when `format` is not given.
pub fn open_source(
    path: &Path,
    format: Option<RecordFormat>,
) -> Result<Box<dyn RecordSource>, RecordError> {
    let format = match format.or_else(|| RecordFormat::from_path(path)) {
        Some(format) => format,
        None => {
            return Err(RecordError::Format(format!(
                "cannot infer the record format of {:?}, please specify it explicitly",
                path
            )))
        }
    };
    let source: Box<dyn RecordSource> = match format {
        RecordFormat::Csv => Box::new(CsvRecordSource::new(path)),
        RecordFormat::Json => Box::new(JsonRecordSource::new(path, JsonLayout::Array)),
        RecordFormat::Jsonl => Box::new(JsonRecordSource::new(path, JsonLayout::Lines)),
    };
    Ok(source)
}
