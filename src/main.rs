//! ragchat - terminal client for a retrieval-augmented Q&A service
//!
#![doc = "Main entry point for the ragchat application."]

use anyhow::Result;
use std::path::PathBuf;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ragchat::cli::{Cli, Commands};
use ragchat::commands;
use ragchat::config::{default_config_path, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load and validate configuration
    let config_path = cli
        .config
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    let config = Config::load(&config_path, &cli)?;

    // Execute command
    match cli.command {
        Commands::Chat { source } => {
            if let Some(s) = &source {
                tracing::debug!("Using source mode override: {}", s);
            }
            commands::chat::run_chat(config, source).await?;
            Ok(())
        }
        Commands::Ask { question, source } => {
            tracing::info!("Asking a single question");
            commands::ask::run_ask(config, &question, source).await?;
            Ok(())
        }
        Commands::History { command } => {
            tracing::info!("Starting history command");
            commands::history::handle_history(&config, command).await?;
            Ok(())
        }
        Commands::Mode { command } => {
            tracing::info!("Starting model mode command");
            commands::mode::handle_mode(&config, command).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so they never interleave with answers on stdout.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "ragchat=debug" } else { "ragchat=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
