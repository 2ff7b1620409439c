//! `follow` binary: serve the logging endpoints or log a single session.

mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::FollowConfig;
use follow_core::{render, SessionRecord};
use follow_drive::StoreClient;
use follow_gateway::GatewayServer;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "follow", about = "Log conversation sessions as Markdown into Google Drive")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "follow.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Log one session read from a JSON file ("-" for stdin)
    Log {
        file: PathBuf,
        /// Print the rendered Markdown instead of uploading it
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine. Loaded first so RUST_LOG may come from it.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = FollowConfig::load(&cli.config)
        .await
        .with_context(|| format!("Failed to load config '{}'", cli.config.display()))?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            // The server still starts without a logger so /health can report it.
            let logger = match StoreClient::authenticate(
                &config.credentials_path,
                config.credential_mode(),
                &config.drive,
            )
            .await
            {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    error!(error = %e, "Failed to initialize logger");
                    None
                }
            };

            let app = GatewayServer::build_with_timeout(
                logger,
                Duration::from_secs(config.server.request_timeout_secs),
            );

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!(addr = %addr, "follow listening");
            axum::serve(listener, app).await?;
        }
        Commands::Log { file, dry_run } => {
            let raw = if file.as_os_str() == "-" {
                tokio::task::spawn_blocking(|| std::io::read_to_string(std::io::stdin())).await??
            } else {
                tokio::fs::read_to_string(&file)
                    .await
                    .with_context(|| format!("Failed to read '{}'", file.display()))?
            };
            let session: SessionRecord = serde_json::from_str(&raw)?;

            if dry_run {
                print!("{}", render(&session));
                return Ok(());
            }

            let client = StoreClient::authenticate(
                &config.credentials_path,
                config.credential_mode(),
                &config.drive,
            )
            .await?;

            match client.log_session(&session).await? {
                Some(file_id) => println!("{file_id}"),
                None => {
                    warn!("Session was not logged");
                    anyhow::bail!("Failed to log session");
                }
            }
        }
    }

    Ok(())
}
