//! Test fixture creation for the catalog and play tables

use super::constants::*;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Creates a temporary catalog database file with 3 songs by 2 artists.
/// Returns (temp_dir, database_path)
pub fn create_test_catalog() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let path = dir.path().join("database.json");

    let database = json!({
        "songs": [
            { "songId": SONG_1_ID, "title": SONG_1_TITLE, "artist": ARTIST_1_NAME },
            { "songId": SONG_2_ID, "title": SONG_2_TITLE, "artist": ARTIST_1_NAME },
            { "songId": SONG_3_ID, "title": SONG_3_TITLE, "artist": ARTIST_2_NAME },
        ]
    });
    fs::write(&path, serde_json::to_string_pretty(&database)?)?;

    Ok((dir, path))
}

/// Creates a temporary CSV play table relative to [`REFERENCE_NOW`].
/// Returns (temp_dir, plays_path)
///
/// Plays per month:
/// - 2024-03: user-1 plays song-1 twice and song-3 once (5s), user-2 plays
///   song-3 once
/// - 2024-02: user-2 plays song-2, user-1 plays song-2
/// - 2024-01: user-1 plays the unknown song
pub fn create_test_plays() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let path = dir.path().join("plays.csv");

    let rows = [
        "userId,songId,timestamp,durationMs",
        "user-1,song-1,2024-03-01T10:00:00Z,180000",
        "user-1,song-1,2024-03-02T10:00:00Z,240000",
        "user-1,song-3,2024-03-03T10:00:00Z,5000",
        "user-2,song-3,2024-03-04T10:00:00Z,300000",
        "user-2,song-2,2024-02-10T10:00:00Z,120000",
        "user-1,song-2,2024-02-11T10:00:00Z,60000",
        "user-1,song-404,2024-01-20T10:00:00Z,60000",
        "user-2,song-1,not-a-date,60000",
        "user-2,song-1,2024-03-05T10:00:00Z,-1",
    ];
    fs::write(&path, rows.join("\n") + "\n")?;

    Ok((dir, path))
}

pub fn reference_now() -> DateTime<Utc> {
    REFERENCE_NOW
        .parse()
        .expect("Invalid reference time constant")
}
