use serde::{Deserialize, Serialize};

/// Descriptive metadata of a song, as served by the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongMetadata {
    pub song_id: String,
    pub title: String,
    pub artist: String,
}

impl SongMetadata {
    pub fn new(song_id: &str, title: &str, artist: &str) -> Self {
        Self {
            song_id: song_id.to_owned(),
            title: title.to_owned(),
            artist: artist.to_owned(),
        }
    }
}
