//! Shared constants for end-to-end tests
//!
//! When test data changes (catalog songs, play rows, etc.),
//! update only this file and the fixtures.
#![allow(dead_code)]

// ============================================================================
// Test Catalog
// ============================================================================

/// "Opening Track" by The Test Band
pub const SONG_1_ID: &str = "song-1";
pub const SONG_1_TITLE: &str = "Opening Track";

/// "Middle Track" by The Test Band
pub const SONG_2_ID: &str = "song-2";
pub const SONG_2_TITLE: &str = "Middle Track";

/// "Smooth Jazz" by Jazz Ensemble
pub const SONG_3_ID: &str = "song-3";
pub const SONG_3_TITLE: &str = "Smooth Jazz";

/// Played in the fixtures but missing from the catalog
pub const UNKNOWN_SONG_ID: &str = "song-404";

pub const ARTIST_1_NAME: &str = "The Test Band";
pub const ARTIST_2_NAME: &str = "Jazz Ensemble";

pub const CATALOG_SONGS_COUNT: usize = 3;

// ============================================================================
// Test Plays
// ============================================================================

pub const USER_1: &str = "user-1";
pub const USER_2: &str = "user-2";

/// Instant the timeline and payout tests are evaluated at
pub const REFERENCE_NOW: &str = "2024-03-15T12:00:00Z";

/// Well-formed rows in the plays fixture
pub const PLAYS_EVENTS_COUNT: u64 = 7;

/// Malformed rows in the plays fixture
pub const PLAYS_MALFORMED_COUNT: u64 = 2;

// ============================================================================
// Timeouts
// ============================================================================

pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;
pub const REQUEST_TIMEOUT_SECS: u64 = 5;
