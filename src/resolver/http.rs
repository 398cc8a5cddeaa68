//! HTTP client for the catalog lookup service.

use super::{ResolveError, SongResolver};
use crate::catalog::SongMetadata;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

/// Resolves songs through `GET {base_url}/songs/{songId}`.
pub struct HttpSongResolver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSongResolver {
    /// Create a new resolver.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the catalog service (e.g., "http://localhost:3000")
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(base_url: String, timeout_sec: u64) -> Result<Self, ResolveError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .map_err(|err| ResolveError::Transport(err.to_string()))?;

        // Ensure base_url doesn't have trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    /// Check if the catalog service is reachable.
    pub async fn health_check(&self) -> Result<(), ResolveError> {
        let url = format!("{}/", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| ResolveError::Transport(err.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ResolveError::Transport(format!(
                "health check failed with status: {}",
                response.status()
            )))
        }
    }

    /// Get the base URL of the catalog service.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl SongResolver for HttpSongResolver {
    async fn resolve(&self, song_id: &str) -> Result<Option<SongMetadata>, ResolveError> {
        let url = format!(
            "{}/songs/{}",
            self.base_url,
            urlencoding::encode(song_id)
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| ResolveError::Transport(err.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<SongMetadata>()
                .await
                .map(Some)
                .map_err(|err| ResolveError::Decode {
                    song_id: song_id.to_string(),
                    message: err.to_string(),
                }),
            status => Err(ResolveError::Status {
                song_id: song_id.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}
