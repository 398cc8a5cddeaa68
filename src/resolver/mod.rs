//! Song metadata resolution.
//!
//! A [`SongResolver`] maps a song id to its [`SongMetadata`]. A missing song
//! is a normal outcome (`Ok(None)`); errors are reserved for failures of the
//! lookup itself.

mod cache;
mod http;

pub use cache::ResolutionCache;
pub use http::HttpSongResolver;

use crate::catalog::SongMetadata;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("metadata service unreachable: {0}")]
    Transport(String),

    #[error("metadata service answered {status} for song {song_id}")]
    Status { song_id: String, status: u16 },

    #[error("invalid metadata for song {song_id}: {message}")]
    Decode { song_id: String, message: String },
}

#[async_trait]
pub trait SongResolver: Send + Sync {
    async fn resolve(&self, song_id: &str) -> Result<Option<SongMetadata>, ResolveError>;
}

/// What a query does when a lookup fails (as opposed to finding nothing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ResolverFailurePolicy {
    /// Treat the song as unattributed and keep going.
    #[default]
    Skip,
    /// Fail the whole query.
    Abort,
}
