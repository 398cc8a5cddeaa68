use anyhow::{Context, Result};
use clap::Parser;
use pezzottify_analytics::server::config::DEFAULT_PORT;
use pezzottify_analytics::{run_server, Catalog, RequestsLoggingLevel};
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "catalog-server", about = "Serves song metadata over HTTP")]
struct CliArgs {
    /// Path to the catalog database file ({"songs": [...]}).
    #[clap(default_value = "database.json")]
    pub database: PathBuf,

    /// The port to listen on.
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    info!("Loading catalog from {:?}...", cli_args.database);
    let catalog = Catalog::load(&cli_args.database)?;
    info!("Loaded {} songs", catalog.get_songs_count());

    run_server(catalog, cli_args.logging_level, cli_args.port).await
}
