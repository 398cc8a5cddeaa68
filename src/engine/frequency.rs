use crate::catalog::SongMetadata;
use std::collections::HashMap;

/// Occurrence counts per key.
///
/// Rankings are fully deterministic: higher counts first, equal counts in
/// ascending key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: HashMap<String, u64>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, key: &str) {
        self.add(key, 1);
    }

    pub fn add(&mut self, key: &str, count: u64) {
        match self.counts.get_mut(key) {
            Some(existing) => *existing += count,
            None => {
                self.counts.insert(key.to_owned(), count);
            }
        }
    }

    pub fn count(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    /// The `n` most frequent keys with their counts.
    pub fn top_n(&self, n: usize) -> Vec<(String, u64)> {
        if n == 0 {
            return Vec::new();
        }
        let mut entries: Vec<(&String, &u64)> = self.counts.iter().collect();
        entries.sort_unstable_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        entries.truncate(n);
        entries
            .into_iter()
            .map(|(key, count)| (key.clone(), *count))
            .collect()
    }

    /// The single most frequent key, if any.
    pub fn top(&self) -> Option<(String, u64)> {
        self.top_n(1).into_iter().next()
    }

    /// Folds this table into a new one keyed by `project(key)`. Counts of keys
    /// projecting to the same value are summed; keys projecting to `None` are
    /// dropped.
    pub fn rekey<F>(&self, mut project: F) -> FrequencyTable
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut out = FrequencyTable::new();
        for (key, count) in &self.counts {
            if let Some(projected) = project(key) {
                out.add(&projected, *count);
            }
        }
        out
    }
}

/// Access to the metadata known for a song during a query.
pub trait MetadataLookup {
    fn metadata(&self, song_id: &str) -> Option<&SongMetadata>;
}

impl MetadataLookup for HashMap<String, SongMetadata> {
    fn metadata(&self, song_id: &str) -> Option<&SongMetadata> {
        self.get(song_id)
    }
}

/// Keys a song-level count can be projected onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyProjection {
    SongId,
    Title,
    Artist,
    /// `"{artist}+{songId}"`
    ArtistSong,
}

impl KeyProjection {
    /// Key for `song_id`, or `None` when the projection needs metadata that
    /// is not available.
    pub fn key(&self, song_id: &str, metadata: Option<&SongMetadata>) -> Option<String> {
        match self {
            KeyProjection::SongId => Some(song_id.to_owned()),
            KeyProjection::Title => metadata.map(|m| m.title.clone()),
            KeyProjection::Artist => metadata.map(|m| m.artist.clone()),
            KeyProjection::ArtistSong => metadata.map(|m| format!("{}+{}", m.artist, song_id)),
        }
    }

    /// Re-keys a song-id keyed table.
    pub fn apply(&self, song_plays: &FrequencyTable, lookup: &dyn MetadataLookup) -> FrequencyTable {
        song_plays.rekey(|song_id| self.key(song_id, lookup.metadata(song_id)))
    }
}
