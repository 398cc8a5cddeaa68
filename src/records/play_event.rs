use super::timestamp::parse_timestamp;
use super::MalformedReason;
use crate::catalog::SongMetadata;
use chrono::{DateTime, Utc};

/// One recorded instance of a user playing a song.
///
/// Pre-joined tables carry the song's title and artist inline, in which case
/// `metadata` is set and no resolver lookup is needed for this event.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayEvent {
    pub user_id: String,
    pub song_id: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub metadata: Option<SongMetadata>,
}

impl PlayEvent {
    pub fn new(user_id: &str, song_id: &str, timestamp: DateTime<Utc>, duration_ms: u64) -> Self {
        Self {
            user_id: user_id.to_owned(),
            song_id: song_id.to_owned(),
            timestamp,
            duration_ms,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, title: &str, artist: &str) -> Self {
        self.metadata = Some(SongMetadata::new(&self.song_id, title, artist));
        self
    }
}

/// Textual fields of a row, before validation.
#[derive(Debug, Default)]
pub(super) struct RawPlay {
    pub user_id: Option<String>,
    pub song_id: Option<String>,
    pub timestamp: Option<String>,
    pub duration_ms: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, field: &'static str) -> Result<String, MalformedReason> {
    non_blank(value).ok_or(MalformedReason::MissingField(field))
}

impl RawPlay {
    pub fn into_event(self) -> Result<PlayEvent, MalformedReason> {
        let user_id = required(self.user_id, "userId")?;
        let song_id = required(self.song_id, "songId")?;
        let timestamp_text = required(self.timestamp, "timestamp")?;
        let duration_text = required(self.duration_ms, "durationMs")?;

        let timestamp = parse_timestamp(&timestamp_text)
            .ok_or(MalformedReason::BadTimestamp(timestamp_text))?;
        let duration_ms = duration_text
            .parse::<u64>()
            .map_err(|_| MalformedReason::BadDuration(duration_text))?;

        let metadata = match (non_blank(self.title), non_blank(self.artist)) {
            (Some(title), Some(artist)) => Some(SongMetadata {
                song_id: song_id.clone(),
                title,
                artist,
            }),
            _ => None,
        };

        Ok(PlayEvent {
            user_id,
            song_id,
            timestamp,
            duration_ms,
            metadata,
        })
    }
}
