use crate::catalog::SongMetadata;
use crate::records::{PlayEvent, RecordError, RecordSource};
use crate::resolver::ResolutionCache;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Source(#[from] RecordError),

    #[error("scan cancelled after {rows} rows")]
    Cancelled { rows: u64 },

    #[error("failed to write output: {0}")]
    Sink(#[from] std::io::Error),
}

/// Row accounting for one pass over a record source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub rows: u64,
    pub events: u64,
    pub skipped: u64,
}

/// Feeds every well-formed event of `source` to `visit`.
///
/// Malformed rows are counted and skipped. Fatal source errors, a failing
/// visitor and cancellation of `token` end the scan.
pub fn scan_events<F>(
    source: &dyn RecordSource,
    token: &CancellationToken,
    mut visit: F,
) -> Result<ScanStats, ScanError>
where
    F: FnMut(PlayEvent) -> Result<(), ScanError>,
{
    let mut stats = ScanStats::default();
    for item in source.scan()? {
        if token.is_cancelled() {
            return Err(ScanError::Cancelled { rows: stats.rows });
        }
        stats.rows += 1;
        match item {
            Ok(event) => {
                stats.events += 1;
                visit(event)?;
            }
            Err(err) if err.is_recoverable() => {
                debug!("Skipping record: {}", err);
                stats.skipped += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(stats)
}

/// Metadata carried by the events themselves, first occurrence per song.
#[derive(Debug, Clone, Default)]
pub struct InlineMetadata {
    songs: HashMap<String, SongMetadata>,
}

impl InlineMetadata {
    /// Takes the metadata out of `event`, if it has any.
    pub fn remember(&mut self, event: &mut PlayEvent) {
        if let Some(metadata) = event.metadata.take() {
            if !self.songs.contains_key(&event.song_id) {
                self.songs.insert(event.song_id.clone(), metadata);
            }
        }
    }

    pub fn seed_into(self, cache: &mut ResolutionCache) {
        for metadata in self.songs.into_values() {
            cache.seed(metadata);
        }
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{MemorySource, RecordIter};
    use chrono::{TimeZone, Utc};

    fn event(song_id: &str) -> PlayEvent {
        PlayEvent::new(
            "u1",
            song_id,
            Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap(),
            30_000,
        )
    }

    /// Yields a malformed row between good ones, then optionally a fatal error.
    struct FlakySource {
        fatal: bool,
    }

    impl RecordSource for FlakySource {
        fn scan(&self) -> Result<RecordIter<'_>, RecordError> {
            let mut items = vec![
                Ok(event("s1")),
                Err(RecordError::Malformed {
                    row: 2,
                    reason: crate::records::MalformedReason::MissingField("songId"),
                }),
                Ok(event("s2")),
            ];
            if self.fatal {
                items.push(Err(RecordError::Format("truncated".to_string())));
                items.push(Ok(event("s3")));
            }
            Ok(Box::new(items.into_iter()))
        }

        fn describe(&self) -> String {
            "flaky".to_string()
        }
    }

    #[test]
    fn malformed_rows_are_counted_and_skipped() {
        let mut seen = Vec::new();
        let stats = scan_events(
            &FlakySource { fatal: false },
            &CancellationToken::new(),
            |event| {
                seen.push(event.song_id);
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(seen, vec!["s1", "s2"]);
        assert_eq!(
            stats,
            ScanStats {
                rows: 3,
                events: 2,
                skipped: 1
            }
        );
    }

    #[test]
    fn fatal_errors_end_the_scan() {
        let result = scan_events(
            &FlakySource { fatal: true },
            &CancellationToken::new(),
            |_| Ok(()),
        );
        assert!(matches!(
            result,
            Err(ScanError::Source(RecordError::Format(_)))
        ));
    }

    #[test]
    fn cancelled_token_stops_the_scan() {
        let source = MemorySource::new(vec![event("s1"), event("s2")]);
        let token = CancellationToken::new();
        token.cancel();

        let mut visited = 0;
        let result = scan_events(&source, &token, |_| {
            visited += 1;
            Ok(())
        });

        assert!(matches!(result, Err(ScanError::Cancelled { rows: 0 })));
        assert_eq!(visited, 0);
    }

    #[test]
    fn visitor_errors_end_the_scan() {
        let source = MemorySource::new(vec![event("s1"), event("s2")]);
        let result = scan_events(&source, &CancellationToken::new(), |_| {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed").into())
        });
        assert!(matches!(result, Err(ScanError::Sink(_))));
    }

    #[test]
    fn inline_metadata_keeps_first_occurrence() {
        let mut inline = InlineMetadata::default();
        let mut first = event("s1").with_metadata("First", "A");
        let mut second = event("s1").with_metadata("Second", "B");
        let mut bare = event("s2");

        inline.remember(&mut first);
        inline.remember(&mut second);
        inline.remember(&mut bare);

        assert!(first.metadata.is_none());
        assert_eq!(inline.len(), 1);

        let mut cache =
            ResolutionCache::new(None, 1, crate::resolver::ResolverFailurePolicy::Skip);
        inline.seed_into(&mut cache);
        assert_eq!(cache.get("s1").unwrap().title, "First");
    }
}
