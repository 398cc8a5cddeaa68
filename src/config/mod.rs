mod file_config;

pub use file_config::{FileConfig, PayoutConfig};

use crate::engine::{PayoutPolicy, DEFAULT_MIN_PLAY_MS, DEFAULT_RATE_PER_MINUTE};
use crate::query::{QuerySettings, DEFAULT_QUERY_TIMEOUT_SEC, DEFAULT_RESOLVER_CONCURRENCY};
use crate::records::RecordFormat;
use crate::resolver::ResolverFailurePolicy;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_RESOLVER_TIMEOUT_SEC: u64 = 10;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub records_path: Option<PathBuf>,
    pub records_format: Option<RecordFormat>,
    pub catalog_url: Option<String>,
    pub catalog_file: Option<PathBuf>,
    pub resolver_timeout_sec: u64,
    pub resolver_concurrency: usize,
    pub resolver_failure_policy: ResolverFailurePolicy,
    pub query_timeout_sec: u64,
    pub min_play_ms: u64,
    pub rate_per_minute: f64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            records_path: None,
            records_format: None,
            catalog_url: None,
            catalog_file: None,
            resolver_timeout_sec: DEFAULT_RESOLVER_TIMEOUT_SEC,
            resolver_concurrency: DEFAULT_RESOLVER_CONCURRENCY,
            resolver_failure_policy: ResolverFailurePolicy::default(),
            query_timeout_sec: DEFAULT_QUERY_TIMEOUT_SEC,
            min_play_ms: DEFAULT_MIN_PLAY_MS,
            rate_per_minute: DEFAULT_RATE_PER_MINUTE,
        }
    }
}

/// Where song metadata comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataSource {
    /// Events are used as they are; only inline metadata is known.
    None,
    /// A running catalog server.
    Service { url: String, timeout_sec: u64 },
    /// A local catalog file.
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub records_path: PathBuf,
    pub records_format: RecordFormat,
    pub metadata: MetadataSource,
    pub query: QuerySettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let records_path = file
            .records_path
            .map(PathBuf::from)
            .or_else(|| cli.records_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "records_path must be specified via --records or in config file"
                )
            })?;

        if !records_path.exists() {
            bail!("Records file does not exist: {:?}", records_path);
        }
        if !records_path.is_file() {
            bail!("records_path is not a file: {:?}", records_path);
        }

        let records_format = match file.records_format {
            Some(value) => parse_value::<RecordFormat>(&value, "records_format")?,
            None => match cli
                .records_format
                .or_else(|| RecordFormat::from_path(&records_path))
            {
                Some(format) => format,
                None => bail!(
                    "Cannot infer the format of {:?}, set records_format to csv, json or jsonl",
                    records_path
                ),
            },
        };

        let catalog_url = file.catalog_url.or_else(|| cli.catalog_url.clone());
        let catalog_file = file
            .catalog_file
            .map(PathBuf::from)
            .or_else(|| cli.catalog_file.clone());
        let resolver_timeout_sec = file
            .resolver_timeout_sec
            .unwrap_or(cli.resolver_timeout_sec);

        let metadata = match (catalog_url, catalog_file) {
            (Some(_), Some(_)) => {
                bail!("Only one of catalog_url and catalog_file can be specified")
            }
            (Some(url), None) => MetadataSource::Service {
                url,
                timeout_sec: resolver_timeout_sec,
            },
            (None, Some(path)) => {
                if !path.exists() {
                    bail!("Catalog file does not exist: {:?}", path);
                }
                MetadataSource::File(path)
            }
            (None, None) => MetadataSource::None,
        };

        let resolver_concurrency = file
            .resolver_concurrency
            .unwrap_or(cli.resolver_concurrency);
        if resolver_concurrency == 0 {
            bail!("resolver_concurrency must be at least 1");
        }

        let failure_policy = match file.resolver_failure_policy {
            Some(value) => parse_value::<ResolverFailurePolicy>(&value, "resolver_failure_policy")?,
            None => cli.resolver_failure_policy,
        };

        // 0 disables the timeout
        let query_timeout_sec = file.query_timeout_sec.unwrap_or(cli.query_timeout_sec);
        let timeout = (query_timeout_sec > 0).then(|| Duration::from_secs(query_timeout_sec));

        let payout_file = file.payout.unwrap_or_default();
        let payout = PayoutPolicy {
            min_play_ms: payout_file.min_play_ms.unwrap_or(cli.min_play_ms),
            rate_per_minute: payout_file.rate_per_minute.unwrap_or(cli.rate_per_minute),
        };
        if !payout.rate_per_minute.is_finite() || payout.rate_per_minute < 0.0 {
            bail!(
                "rate_per_minute must be a non-negative number, got {}",
                payout.rate_per_minute
            );
        }

        Ok(Self {
            records_path,
            records_format,
            metadata,
            query: QuerySettings {
                resolver_concurrency,
                failure_policy,
                timeout,
                payout,
            },
        })
    }
}

/// Parses a TOML string setting with the same names the CLI accepts.
fn parse_value<T: ValueEnum>(value: &str, setting: &str) -> Result<T> {
    match T::from_str(value, true) {
        Ok(parsed) => Ok(parsed),
        Err(_) => bail!("Invalid value {:?} for {}", value, setting),
    }
}
