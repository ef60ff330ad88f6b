//! Sandcastle - agent sandbox orchestration runtime

use anyhow::Result;
use clap::{Parser, Subcommand};
use sandcastle::config::SandcastleConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sandcastle")]
#[command(version)]
#[command(about = "Agent sandbox orchestration runtime")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SANDCASTLE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the orchestration server
    Serve {
        /// Override the host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Override the port to listen on
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("sandcastle={},tower_http=debug", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = if let Some(config_path) = &cli.config {
        SandcastleConfig::load(config_path)?
    } else {
        SandcastleConfig::default()
    };

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = config;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            sandcastle::gateway::serve(config).await?;
        }
        Commands::Config { default } => {
            let shown = if default {
                SandcastleConfig::default()
            } else {
                config
            };
            println!("{}", toml::to_string_pretty(&shown)?);
        }
    }

    Ok(())
}
