use super::play_event::RawPlay;
use super::{MalformedReason, RecordError, RecordIter, RecordSource};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

const REQUIRED_COLUMNS: [&str; 4] = ["userId", "songId", "timestamp", "durationMs"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsvPlayRow {
    user_id: Option<String>,
    song_id: Option<String>,
    timestamp: Option<String>,
    duration_ms: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    artist: Option<String>,
}

impl From<CsvPlayRow> for RawPlay {
    fn from(row: CsvPlayRow) -> Self {
        RawPlay {
            user_id: row.user_id,
            song_id: row.song_id,
            timestamp: row.timestamp,
            duration_ms: row.duration_ms,
            title: row.title,
            artist: row.artist,
        }
    }
}

/// Play table stored as comma-separated text with a header row.
///
/// Rows are decoded one at a time from a buffered reader, the file is never
/// loaded as a whole.
pub struct CsvRecordSource {
    path: PathBuf,
}

impl CsvRecordSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_owned(),
        }
    }
}

fn convert_csv_error(row: u64, err: csv::Error) -> RecordError {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(io_err) => RecordError::Io(io_err),
        _ => RecordError::Malformed {
            row,
            reason: MalformedReason::Unparseable(message),
        },
    }
}

impl RecordSource for CsvRecordSource {
    fn scan(&self) -> Result<RecordIter<'_>, RecordError> {
        let file = File::open(&self.path)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(BufReader::new(file));

        let headers = reader.headers().map_err(|err| convert_csv_error(0, err))?;
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|column| !headers.iter().any(|header| header == *column))
            .collect();
        if !missing.is_empty() {
            return Err(RecordError::Format(format!(
                "{:?} is missing required columns: {}",
                self.path,
                missing.join(", ")
            )));
        }

        let rows = reader
            .into_deserialize::<CsvPlayRow>()
            .zip(1u64..)
            .map(|(result, row)| match result {
                Ok(parsed) => RawPlay::from(parsed)
                    .into_event()
                    .map_err(|reason| RecordError::Malformed { row, reason }),
                Err(err) => Err(convert_csv_error(row, err)),
            });
        Ok(Box::new(rows))
    }

    fn describe(&self) -> String {
        format!("csv table {:?}", self.path)
    }
}
