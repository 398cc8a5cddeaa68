use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use pezzottify_analytics::config::{AppConfig, CliConfig, FileConfig, MetadataSource};
use pezzottify_analytics::query::{
    parse_boundary, parse_limit, parse_months, parse_window, AnalyticsService, Boundary,
    MonthlySummary, PayoutReport, RankedSong,
};
use pezzottify_analytics::records::{open_source, RecordFormat};
use pezzottify_analytics::resolver::{HttpSongResolver, ResolverFailurePolicy, SongResolver};
use pezzottify_analytics::Catalog;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(name = "analytics", about = "Listening analytics over play-event tables")]
struct CliArgs {
    /// Path to the play-event table (CSV, JSON array or JSON lines).
    #[clap(long, value_parser = parse_path)]
    pub records: Option<PathBuf>,

    /// Format of the play-event table. Inferred from the file extension when omitted.
    #[clap(long)]
    pub format: Option<RecordFormat>,

    /// URL of the catalog server used to look up song metadata.
    #[clap(long)]
    pub catalog_url: Option<String>,

    /// Path to a local catalog database file, used instead of a catalog server.
    #[clap(long, value_parser = parse_path)]
    pub catalog_file: Option<PathBuf>,

    /// Timeout in seconds for catalog server requests.
    #[clap(long, default_value_t = 10)]
    pub resolver_timeout_sec: u64,

    /// Maximum number of concurrent catalog lookups.
    #[clap(long, default_value_t = 8)]
    pub resolver_concurrency: usize,

    /// What to do when a catalog lookup fails.
    #[clap(long, default_value = "skip")]
    pub resolver_failure_policy: ResolverFailurePolicy,

    /// Maximum duration of a query in seconds. Set to 0 to disable.
    #[clap(long, default_value_t = 300)]
    pub query_timeout_sec: u64,

    /// Plays must last longer than this many milliseconds to be paid.
    #[clap(long, default_value_t = 10_000)]
    pub min_play_ms: u64,

    /// Payout per minute of qualifying plays.
    #[clap(long, default_value_t = 0.001)]
    pub rate_per_minute: f64,

    /// Path to a TOML config file. Its values override command line arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Reference time for timeline and payout. Defaults to the current time.
    #[clap(long)]
    pub now: Option<String>,

    /// Print results as JSON.
    #[clap(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Get top N songs by play count in a time window.
    TopSongs {
        start: String,
        end: String,
        #[arg(allow_hyphen_values = true)]
        n: String,
    },
    /// Get the top song and artist of a user for each of the last M months.
    Timeline {
        user_id: String,
        #[arg(allow_hyphen_values = true)]
        months: String,
    },
    /// Calculate the payout of an artist over the last M months.
    Payout {
        artist: String,
        #[arg(allow_hyphen_values = true)]
        months: String,
    },
    /// Write every play joined with its song metadata as a JSON array.
    Enrich {
        #[clap(value_parser = parse_path)]
        output: PathBuf,
    },
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            records_path: self.records.clone(),
            records_format: self.format,
            catalog_url: self.catalog_url.clone(),
            catalog_file: self.catalog_file.clone(),
            resolver_timeout_sec: self.resolver_timeout_sec,
            resolver_concurrency: self.resolver_concurrency,
            resolver_failure_policy: self.resolver_failure_policy,
            query_timeout_sec: self.query_timeout_sec,
            min_play_ms: self.min_play_ms,
            rate_per_minute: self.rate_per_minute,
        }
    }

    fn reference_time(&self) -> Result<DateTime<Utc>> {
        match &self.now {
            Some(value) => Ok(parse_boundary(value, Boundary::Start)?),
            None => Ok(Utc::now()),
        }
    }
}

async fn make_resolver(metadata: &MetadataSource) -> Result<Option<Arc<dyn SongResolver>>> {
    match metadata {
        MetadataSource::None => {
            info!("No catalog configured, only inline metadata will be used");
            Ok(None)
        }
        MetadataSource::Service { url, timeout_sec } => {
            let resolver = HttpSongResolver::new(url.clone(), *timeout_sec)?;
            if let Err(err) = resolver.health_check().await {
                warn!("Catalog server at {} is not healthy: {}", url, err);
            }
            info!("Looking up song metadata at {}", resolver.base_url());
            let resolver: Arc<dyn SongResolver> = Arc::new(resolver);
            Ok(Some(resolver))
        }
        MetadataSource::File(path) => {
            let catalog = Catalog::load(path)?;
            info!(
                "Loaded {} songs from catalog file {:?}",
                catalog.get_songs_count(),
                path
            );
            let resolver: Arc<dyn SongResolver> = Arc::new(catalog);
            Ok(Some(resolver))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_top_songs(start: &str, end: &str, n: &str, songs: &[RankedSong]) {
    println!("Top {} songs from {} to {}:", n, start, end);
    for song in songs {
        match (&song.title, &song.artist) {
            (Some(title), Some(artist)) => println!("{} by {} ({})", title, artist, song.song_id),
            _ => println!("{}", song.song_id),
        }
    }
}

fn print_timeline(user_id: &str, months: &str, timeline: &[MonthlySummary]) {
    println!("Timeline for user {} (last {} months):", user_id, months);
    for month in timeline {
        println!("\n{}:", month.month);
        if let Some(song) = &month.top_song {
            println!("Top Song: {}", song);
        }
        if let Some(artist) = &month.top_artist {
            println!("Top Artist: {}", artist);
        }
    }
}

fn print_payout(report: &PayoutReport) {
    println!(
        "Payout for {} (last {} months):",
        report.artist, report.months
    );
    println!("Total: {}", report.amount);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    let source = open_source(&config.records_path, Some(config.records_format))
        .with_context(|| format!("Failed to open records {:?}", config.records_path))?;
    let resolver = make_resolver(&config.metadata).await?;

    let shutdown_token = CancellationToken::new();
    let service = AnalyticsService::new(Arc::from(source), resolver, config.query.clone())
        .with_cancellation_token(shutdown_token.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling query");
            shutdown_token.cancel();
        }
    });

    match &cli_args.command {
        Command::TopSongs { start, end, n } => {
            let window = parse_window(start, end)?;
            let songs = service.top_songs(window, parse_limit(n)?).await?;
            if cli_args.json {
                print_json(&songs)?;
            } else {
                print_top_songs(start, end, n, &songs);
            }
        }
        Command::Timeline { user_id, months } => {
            let now = cli_args.reference_time()?;
            let timeline = service
                .timeline(user_id, parse_months(months)?, now)
                .await?;
            if cli_args.json {
                print_json(&timeline)?;
            } else {
                print_timeline(user_id, months, &timeline);
            }
        }
        Command::Payout { artist, months } => {
            let now = cli_args.reference_time()?;
            let report = service.payout(artist, parse_months(months)?, now).await?;
            if cli_args.json {
                print_json(&report)?;
            } else {
                print_payout(&report);
            }
        }
        Command::Enrich { output } => {
            let file = std::fs::File::create(output)
                .with_context(|| format!("Failed to create output file {:?}", output))?;
            let summary = service.enrich(file).await?;
            info!(
                "Wrote {} records to {:?}, dropped {}",
                summary.written, output, summary.dropped
            );
            if cli_args.json {
                print_json(&summary)?;
            }
        }
    }

    Ok(())
}
