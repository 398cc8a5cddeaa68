use super::play_event::RawPlay;
use super::{MalformedReason, PlayEvent, RecordError, RecordIter, RecordSource};
use serde::de::{self, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, SyncSender};

/// How many decoded array elements may wait for the consumer.
const ARRAY_READ_AHEAD: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonLayout {
    /// A single top-level array of objects.
    Array,
    /// One object per line.
    Lines,
}

/// Play record as written by the enrichment export. Fields are kept as raw
/// JSON values since the export passes CSV strings through untouched, so
/// numbers may show up either quoted or not.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct JsonPlayRow {
    user_id: Option<Value>,
    song_id: Option<Value>,
    timestamp: Option<Value>,
    duration_ms: Option<Value>,
    title: Option<Value>,
    artist: Option<Value>,
}

fn as_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

impl From<JsonPlayRow> for RawPlay {
    fn from(row: JsonPlayRow) -> Self {
        RawPlay {
            user_id: as_text(row.user_id),
            song_id: as_text(row.song_id),
            timestamp: as_text(row.timestamp),
            duration_ms: as_text(row.duration_ms),
            title: as_text(row.title),
            artist: as_text(row.artist),
        }
    }
}

fn decode_value(row: u64, value: Value) -> Result<PlayEvent, RecordError> {
    let parsed: JsonPlayRow =
        serde_json::from_value(value).map_err(|err| RecordError::Malformed {
            row,
            reason: MalformedReason::Unparseable(err.to_string()),
        })?;
    RawPlay::from(parsed)
        .into_event()
        .map_err(|reason| RecordError::Malformed { row, reason })
}

/// Play table stored as JSON, either as one array or as JSON lines.
pub struct JsonRecordSource {
    path: PathBuf,
    layout: JsonLayout,
}

impl JsonRecordSource {
    pub fn new(path: &Path, layout: JsonLayout) -> Self {
        Self {
            path: path.to_owned(),
            layout,
        }
    }

    /// Lines are split on raw bytes so a line that is not valid UTF-8 is a
    /// malformed row rather than a read failure.
    fn scan_lines(&self) -> Result<RecordIter<'_>, RecordError> {
        let reader = BufReader::new(File::open(&self.path)?);
        let rows = reader
            .split(b'\n')
            .zip(1u64..)
            .filter(|(line, _)| match line {
                Ok(bytes) => !bytes.iter().all(u8::is_ascii_whitespace),
                Err(_) => true,
            })
            .map(|(line, row)| {
                let bytes = line?;
                let value: Value =
                    serde_json::from_slice(&bytes).map_err(|err| RecordError::Malformed {
                        row,
                        reason: MalformedReason::Unparseable(err.to_string()),
                    })?;
                decode_value(row, value)
            });
        Ok(Box::new(rows))
    }

    /// Streams the elements of a top-level array. A reader thread walks the
    /// array with a sequence visitor and hands elements over a bounded
    /// channel, so at most `ARRAY_READ_AHEAD` elements are held at once.
    /// Dropping the iterator stops the reader at its next send.
    fn scan_array(&self) -> Result<RecordIter<'_>, RecordError> {
        let file = File::open(&self.path)?;
        let (tx, rx) = sync_channel(ARRAY_READ_AHEAD);
        std::thread::Builder::new()
            .name("json-array-reader".to_string())
            .spawn(move || {
                let mut deserializer = serde_json::Deserializer::from_reader(BufReader::new(file));
                let visitor = ArrayVisitor { tx: &tx };
                let result = de::Deserializer::deserialize_seq(&mut deserializer, visitor)
                    .and_then(|_| deserializer.end());
                if let Err(err) = result {
                    if !err.to_string().contains(CONSUMER_GONE) {
                        let _ = tx.send(Err(RecordError::Format(err.to_string())));
                    }
                }
            })?;
        Ok(Box::new(rx.into_iter()))
    }
}

const CONSUMER_GONE: &str = "record consumer went away";

struct ArrayVisitor<'a> {
    tx: &'a SyncSender<Result<PlayEvent, RecordError>>,
}

impl<'de, 'a> Visitor<'de> for ArrayVisitor<'a> {
    type Value = ();

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("an array of play records")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut row = 0u64;
        while let Some(value) = seq.next_element::<Value>()? {
            row += 1;
            if self.tx.send(decode_value(row, value)).is_err() {
                return Err(de::Error::custom(CONSUMER_GONE));
            }
        }
        Ok(())
    }
}

impl RecordSource for JsonRecordSource {
    fn scan(&self) -> Result<RecordIter<'_>, RecordError> {
        match self.layout {
            JsonLayout::Array => self.scan_array(),
            JsonLayout::Lines => self.scan_lines(),
        }
    }

    fn describe(&self) -> String {
        match self.layout {
            JsonLayout::Array => format!("json table {:?}", self.path),
            JsonLayout::Lines => format!("json lines table {:?}", self.path),
        }
    }
}
