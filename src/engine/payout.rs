use super::MetadataLookup;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const DEFAULT_MIN_PLAY_MS: u64 = 10_000;
pub const DEFAULT_RATE_PER_MINUTE: f64 = 0.001;

const MS_PER_MINUTE: f64 = 60_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoutPolicy {
    /// Plays must last strictly longer than this to be paid.
    pub min_play_ms: u64,
    pub rate_per_minute: f64,
}

impl Default for PayoutPolicy {
    fn default() -> Self {
        Self {
            min_play_ms: DEFAULT_MIN_PLAY_MS,
            rate_per_minute: DEFAULT_RATE_PER_MINUTE,
        }
    }
}

impl PayoutPolicy {
    pub fn qualifies(&self, duration_ms: u64) -> bool {
        duration_ms > self.min_play_ms
    }

    pub fn amount(&self, minutes: f64) -> PayoutAmount {
        PayoutAmount(minutes * self.rate_per_minute)
    }
}

/// Unrounded payout. Rounded to cents only when displayed.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
pub struct PayoutAmount(pub f64);

impl PayoutAmount {
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for PayoutAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ListeningTime {
    pub plays: u64,
    pub minutes: f64,
}

/// Listening time per song id.
#[derive(Debug, Clone, Default)]
pub struct DurationTally {
    songs: HashMap<String, ListeningTime>,
}

impl DurationTally {
    pub fn add(&mut self, song_id: &str, duration_ms: u64) {
        let minutes = duration_ms as f64 / MS_PER_MINUTE;
        match self.songs.get_mut(song_id) {
            Some(time) => {
                time.plays += 1;
                time.minutes += minutes;
            }
            None => {
                self.songs
                    .insert(song_id.to_owned(), ListeningTime { plays: 1, minutes });
            }
        }
    }

    pub fn song_ids(&self) -> impl Iterator<Item = &str> {
        self.songs.keys().map(String::as_str)
    }

    /// Listening time of every song attributed to `artist`.
    pub fn for_artist(&self, artist: &str, lookup: &dyn MetadataLookup) -> ListeningTime {
        // Summed in song id order so the float total does not depend on map order.
        let mut song_ids: Vec<&String> = self
            .songs
            .keys()
            .filter(|song_id| {
                lookup
                    .metadata(song_id)
                    .is_some_and(|metadata| metadata.artist == artist)
            })
            .collect();
        song_ids.sort_unstable();

        song_ids
            .into_iter()
            .fold(ListeningTime::default(), |mut total, song_id| {
                let time = self.songs[song_id];
                total.plays += time.plays;
                total.minutes += time.minutes;
                total
            })
    }
}
