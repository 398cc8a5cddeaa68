use super::SongMetadata;
use crate::resolver::{ResolveError, SongResolver};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// On-disk layout of the catalog database file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    pub songs: Vec<SongMetadata>,
}

/// Read-only snapshot of the song catalog.
///
/// Built once (usually at startup) and never mutated afterwards, so it can be
/// shared behind an `Arc` without locking.
#[derive(Debug, Default)]
pub struct Catalog {
    songs: Vec<SongMetadata>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn from_songs(songs: Vec<SongMetadata>) -> Result<Catalog> {
        let mut index = HashMap::with_capacity(songs.len());
        for (position, song) in songs.iter().enumerate() {
            if song.song_id.is_empty() {
                bail!("Song at position {} has an empty songId", position);
            }
            if index.insert(song.song_id.clone(), position).is_some() {
                bail!("Duplicate songId \"{}\" in catalog", song.song_id);
            }
        }
        Ok(Catalog { songs, index })
    }

    pub fn load(path: &Path) -> Result<Catalog> {
        let file_text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {:?}", path))?;
        let parsed: CatalogFile = serde_json::from_str(&file_text)
            .with_context(|| format!("Failed to parse catalog file: {:?}", path))?;
        Catalog::from_songs(parsed.songs)
    }

    pub fn get_song(&self, song_id: &str) -> Option<&SongMetadata> {
        self.index.get(song_id).map(|position| &self.songs[*position])
    }

    pub fn songs(&self) -> &[SongMetadata] {
        &self.songs
    }

    pub fn get_songs_count(&self) -> usize {
        self.songs.len()
    }
}

#[async_trait]
impl SongResolver for Catalog {
    async fn resolve(&self, song_id: &str) -> Result<Option<SongMetadata>, ResolveError> {
        Ok(self.get_song(song_id).cloned())
    }
}
