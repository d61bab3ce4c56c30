use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use teamster::{
    config::{Config, default_config_file},
    peer_config::{PeerConfigSync, PeerSettings},
    services::CatalogService,
    web::WebServer,
};

#[derive(Parser)]
#[command(name = "teamster")]
#[command(version)]
#[command(about = "Custom background image service for Teams for Linux")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn load_config(&self, path: &Path) -> Result<Config> {
        let mut config = Config::load_from_file(path)?;
        if let Some(host) = &self.host {
            config.listen_address = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with specified level
    let log_filter = if cli.log_level == "trace" {
        format!("teamster={},tower_http=trace", cli.log_level)
    } else {
        format!("teamster={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting teamster v{}", env!("CARGO_PKG_VERSION"));

    let config_file = cli.config.clone().unwrap_or_else(default_config_file);
    let config = cli.load_config(&config_file)?;
    info!("Configuration loaded from: {}", config_file.display());

    for dir in [&config.image_dir, &config.thumbnail_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    info!(
        "Serving images from {} with thumbnails in {}",
        config.image_dir.display(),
        config.thumbnail_dir.display()
    );

    sync_peer_config(&config).await;

    let catalog = Arc::new(CatalogService::from_config(&config));
    if let Err(e) = catalog.initialize().await {
        warn!("Initial image scan failed, catalog starts empty: {}", e);
    }

    #[cfg(unix)]
    spawn_reload_handler(cli, config_file);

    let web_server = WebServer::new(config, catalog)?;
    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );
    web_server.serve().await?;

    Ok(())
}

/// Mirror settings into the Teams configuration when enabled; failures are only logged
async fn sync_peer_config(config: &Config) {
    if !config.update_teams_config {
        return;
    }
    let settings = PeerSettings::from_config(config);
    if let Err(e) = PeerConfigSync::sync(&settings, &config.teams_config_path).await {
        warn!("Teams config not updated: {}", e);
    }
}

/// Re-read the configuration on SIGHUP and resynchronize the Teams configuration
///
/// Image and thumbnail settings only take effect after a restart.
#[cfg(unix)]
fn spawn_reload_handler(cli: Cli, config_file: PathBuf) {
    use tokio::signal::unix::{SignalKind, signal};

    tokio::spawn(async move {
        let mut hangups = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Config reload on SIGHUP unavailable: {}", e);
                return;
            }
        };

        while hangups.recv().await.is_some() {
            info!("SIGHUP received, reloading {}", config_file.display());
            match cli.load_config(&config_file) {
                Ok(config) => sync_peer_config(&config).await,
                Err(e) => warn!("Config reload failed, keeping previous settings: {:#}", e),
            }
        }
    });
}
