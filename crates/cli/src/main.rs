//! Shipments CLI - schema bootstrap and log tailing.
//!
//! # Usage
//!
//! ```bash
//! # Create the shipments schema if it does not exist
//! shipments-cli migrate
//!
//! # Print log lines published by the API
//! shipments-cli logs
//! shipments-cli logs --redis-url redis://cache:6379 --channel logs
//! ```
//!
//! # Commands
//!
//! - `migrate` - Create tables and constraints (idempotent)
//! - `logs` - Subscribe to the log fan-out channel and print each line

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use shipments_api::config::DEFAULT_LOG_CHANNEL;

mod commands;

#[derive(Parser)]
#[command(name = "shipments-cli")]
#[command(author, version, about = "Shipments service CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema if it does not exist
    Migrate,
    /// Print log lines published to Redis
    Logs {
        /// Redis URL to subscribe on
        #[arg(long, env = "LOG_REDIS_URL", default_value = "redis://127.0.0.1:6379")]
        redis_url: String,

        /// Pub/sub channel to subscribe to
        #[arg(long, env = "LOG_CHANNEL", default_value = DEFAULT_LOG_CHANNEL)]
        channel: String,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Logs { redis_url, channel } => {
            commands::logs::tail(&redis_url, &channel).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_logs_arguments() {
        let cli = Cli::try_parse_from([
            "shipments-cli",
            "logs",
            "--redis-url",
            "redis://cache:6379",
            "--channel",
            "audit",
        ]);
        match cli.map(|c| c.command) {
            Ok(Commands::Logs { redis_url, channel }) => {
                assert_eq!(redis_url, "redis://cache:6379");
                assert_eq!(channel, "audit");
            }
            _ => panic!("expected logs command"),
        }
    }
}
