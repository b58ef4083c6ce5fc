//! pricewatch - live price synchronization and threshold alerts.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

/// Live market-price synchronization and threshold-alert server
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via PRICEWATCH_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the price synchronization server (default)
    Serve,
    /// Watch a running server's price stream from the terminal
    Watch {
        /// Server base URL
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        server: String,
        /// Client identity for the threshold configuration
        #[arg(long, default_value = "default")]
        client: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    pricewatch_telemetry::init_logging()?;
    info!("Starting pricewatch v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => pricewatch_app::AppConfig::from_file(path)?,
        None => pricewatch_app::AppConfig::load()?,
    };

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let app = pricewatch_app::Application::new(config)?;
            app.run().await?;
        }
        Command::Watch { server, client } => {
            pricewatch_app::watch::run_watch(server, client, config.client).await?;
        }
    }

    Ok(())
}
