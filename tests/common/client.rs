//! HTTP client for end-to-end tests
//!
//! This module wraps reqwest and provides methods for all catalog-server
//! endpoints. When API routes change, update only this file.

use super::constants::*;
use reqwest::Response;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// GET /
    pub async fn get_home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    /// GET /songs
    pub async fn get_songs(&self) -> Response {
        self.client
            .get(format!("{}/songs", self.base_url))
            .send()
            .await
            .expect("Songs request failed")
    }

    /// GET /songs/{id}
    pub async fn get_song(&self, id: &str) -> Response {
        self.client
            .get(format!("{}/songs/{}", self.base_url, id))
            .send()
            .await
            .expect("Song request failed")
    }
}
