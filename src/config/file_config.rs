use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Record table (can override CLI)
    pub records_path: Option<String>,
    pub records_format: Option<String>,

    // Metadata lookup
    pub catalog_url: Option<String>,
    pub catalog_file: Option<String>,
    pub resolver_timeout_sec: Option<u64>,
    pub resolver_concurrency: Option<usize>,
    pub resolver_failure_policy: Option<String>,

    pub query_timeout_sec: Option<u64>,

    pub payout: Option<PayoutConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PayoutConfig {
    pub min_play_ms: Option<u64>,
    pub rate_per_minute: Option<f64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
