//! promvec CLI
//!
//! Serves or prints the metrics declared in a configuration file.

use clap::{Args, Parser, Subcommand};
use promvec::http::{ListenAddr, MetricsServer, MetricsServerConfig, RequestMetrics};
use promvec::metrics::Registration;
use promvec::registry::process_collector;
use promvec::{FileConfig, Registry};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "promvec", version, about = "Prometheus metrics exposition")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the exposition endpoint until interrupted
    Serve {
        #[command(flatten)]
        source: ConfigSource,
        /// Listen address, overriding the config file
        #[arg(long)]
        addr: Option<ListenAddr>,
        /// Exposition path, overriding the config file
        #[arg(long)]
        path: Option<String>,
    },
    /// Print one exposition payload to stdout
    Render {
        #[command(flatten)]
        source: ConfigSource,
    },
}

#[derive(Debug, Args)]
struct ConfigSource {
    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,
}

impl ConfigSource {
    fn load(&self) -> Result<FileConfig, Box<dyn std::error::Error>> {
        match &self.config {
            Some(path) => Ok(FileConfig::from_file(path)?),
            None => Ok(FileConfig::default()),
        }
    }
}

/// Declares everything the config asks for into a fresh registry.
fn build_registry(config: &FileConfig) -> Result<(Registry, RequestMetrics), Box<dyn std::error::Error>> {
    let registry = Registry::new();
    let registration = Registration::detached().also(&registry);

    let declared = config.declare(&registration)?;
    info!(metrics = declared.len(), "declared configured metrics");

    if config.process.enabled {
        registry.register(process_collector()?);
    }
    let requests = RequestMetrics::new(&config.reporter, &registration)?;
    Ok((registry, requests))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Serve { source, addr, path } => {
            let config = source.load()?;
            let (registry, requests) = build_registry(&config)?;

            let server_config = MetricsServerConfig {
                addr: addr.unwrap_or(config.server.addr),
                path: path.unwrap_or(config.server.path),
            };
            info!("promvec v{}", promvec::VERSION);
            MetricsServer::new(server_config, registry)
                .track_requests(requests)
                .run(shutdown_signal())
                .await?;
        }
        Command::Render { source } => {
            let config = source.load()?;
            let (registry, _) = build_registry(&config)?;
            print!("{}", promvec::render(&registry).await?);
        }
    }
    Ok(())
}
