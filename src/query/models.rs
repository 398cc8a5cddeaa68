use crate::catalog::SongMetadata;
use crate::engine::{PayoutAmount, ScanStats};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedSong {
    pub song_id: String,
    pub plays: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
}

impl RankedSong {
    pub fn new(song_id: String, plays: u64, metadata: Option<&SongMetadata>) -> Self {
        Self {
            song_id,
            plays,
            title: metadata.map(|m| m.title.clone()),
            artist: metadata.map(|m| m.artist.clone()),
        }
    }
}

/// Highlights of one calendar month for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    /// `"YYYY-MM"`
    pub month: String,
    pub top_song: Option<String>,
    pub top_artist: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutReport {
    pub artist: String,
    pub months: u32,
    pub qualifying_plays: u64,
    pub total_minutes: f64,
    pub amount: PayoutAmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichSummary {
    pub written: u64,
    pub dropped: u64,
    pub scan: ScanStats,
}

/// One element of the enrichment export.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct EnrichedRecord<'a> {
    pub user_id: &'a str,
    pub song_id: &'a str,
    pub timestamp: String,
    pub duration_ms: u64,
    pub title: &'a str,
    pub artist: &'a str,
}
