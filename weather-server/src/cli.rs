use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use weather_core::{Config, Relay};

use crate::routes;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-server", version, about = "Weather relay HTTP server")]
pub struct Cli {
    /// TOML config file. Defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Listen address, overrides the config file.
        #[arg(long)]
        host: Option<String>,

        /// Listen port, overrides the config file.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run one weather request and print the response envelope.
    Fetch {
        /// Address or location name.
        location: String,

        /// Day to look up (YYYY-MM-DD); if absent, means today (UTC).
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Also ask the AI provider for outfit advice.
        #[arg(long)]
        advice: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load(self.config.as_deref())?;

        match self.command {
            Command::Serve { host, port } => {
                if let Some(host) = host {
                    config.server.host = host;
                }
                if let Some(port) = port {
                    config.server.port = port;
                }
                serve(config).await
            }
            Command::Fetch {
                location,
                date,
                advice,
            } => fetch(config, location, date, advice).await,
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let relay = Arc::new(Relay::from_config(&config)?);
    let app = routes::router(relay);

    let address = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to address {address}"))?;

    info!("weather relay listening on {address}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("weather relay stopped");
    Ok(())
}

/// Push one request through the same pipeline the HTTP handlers use.
async fn fetch(
    config: Config,
    location: String,
    date: Option<NaiveDate>,
    advice: bool,
) -> anyhow::Result<()> {
    let relay = Relay::from_config(&config)?;
    let date = date.unwrap_or_else(|| Utc::now().date_naive());

    let body = serde_json::to_vec(&json!({
        "token": config.security_token,
        "requester_name": "weather-server",
        "location": location,
        "date": date.format("%Y-%m-%d").to_string(),
    }))?;

    let envelope = if advice {
        relay.get_weather_with_advice(&body).await?
    } else {
        relay.get_weather(&body).await?
    };

    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
