//! Backend model mode commands

use crate::cli::ModeCommand;
use crate::commands::build_backend;
use crate::config::Config;
use crate::error::Result;
use colored::Colorize;

/// Handle model mode commands
pub async fn handle_mode(config: &Config, command: ModeCommand) -> Result<()> {
    let backend = build_backend(config)?;

    match command {
        ModeCommand::Get => {
            let mode = backend.model_mode().await?;
            println!("{}", mode);
        }
        ModeCommand::Set { mode } => {
            let mode = backend.set_model_mode(mode.trim()).await?;
            tracing::info!("Model mode set to {}", mode);
            println!("{}", format!("Model mode set to {}", mode).green());
        }
    }

    Ok(())
}
