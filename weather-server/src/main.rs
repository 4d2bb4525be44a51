//! Binary crate for the weather relay.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Logging setup
//! - Mapping the HTTP surface onto `weather_core::Relay`

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,weather_core=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
