use super::models::EnrichedRecord;
use crate::catalog::SongMetadata;
use crate::engine::ScanError;
use crate::records::PlayEvent;
use chrono::SecondsFormat;
use std::collections::HashMap;
use std::io::{self, BufWriter, Write};

/// Writes joined events as a JSON array, one element per line.
pub(super) struct ExportSink<W: Write> {
    writer: BufWriter<W>,
    catalog: HashMap<String, SongMetadata>,
    written: u64,
    dropped: u64,
}

impl<W: Write> ExportSink<W> {
    pub fn new(writer: W, catalog: HashMap<String, SongMetadata>) -> Self {
        Self {
            writer: BufWriter::new(writer),
            catalog,
            written: 0,
            dropped: 0,
        }
    }

    /// Writes `event` joined with its metadata. Events of unknown songs are
    /// dropped.
    pub fn write(&mut self, event: PlayEvent) -> Result<(), ScanError> {
        let metadata = match event
            .metadata
            .as_ref()
            .or_else(|| self.catalog.get(&event.song_id))
        {
            Some(metadata) => metadata,
            None => {
                self.dropped += 1;
                return Ok(());
            }
        };

        let record = EnrichedRecord {
            user_id: &event.user_id,
            song_id: &event.song_id,
            timestamp: event
                .timestamp
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
            duration_ms: event.duration_ms,
            title: &metadata.title,
            artist: &metadata.artist,
        };

        let separator: &[u8] = if self.written == 0 { b"[\n  " } else { b",\n  " };
        self.writer.write_all(separator)?;
        serde_json::to_writer(&mut self.writer, &record).map_err(io::Error::from)?;
        self.written += 1;
        Ok(())
    }

    /// Closes the array and flushes. Returns `(written, dropped)`.
    pub fn finish(mut self) -> io::Result<(u64, u64)> {
        let closing: &[u8] = if self.written == 0 { b"[]\n" } else { b"\n]\n" };
        self.writer.write_all(closing)?;
        self.writer.flush()?;
        Ok((self.written, self.dropped))
    }
}
