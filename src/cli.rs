//! Command-line interface definition for ragchat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, one-shot questions, chat
//! history and backend model mode.

use clap::{Parser, Subcommand};

use crate::session::SourceMode;

/// ragchat - terminal client for a retrieval-augmented Q&A service
///
/// Ask questions, browse and delete past chats, and switch the backend's
/// model mode.
#[derive(Parser, Debug, Clone)]
#[command(name = "ragchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (defaults to the user config directory)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override the backend base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for ragchat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Source mode: rag, rag+internet or internet
        #[arg(short, long)]
        source: Option<SourceMode>,
    },

    /// Ask a single question in a new chat and print the answer
    Ask {
        /// Question text
        question: String,

        /// Source mode: rag, rag+internet or internet
        #[arg(short, long)]
        source: Option<SourceMode>,
    },

    /// Browse and manage stored chats
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Read or switch the backend model mode
    Mode {
        /// Mode subcommand
        #[command(subcommand)]
        command: ModeCommand,
    },
}

/// History management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List stored chats, most recent first
    List,

    /// Print every message of a chat
    Show {
        /// Chat id
        id: String,
    },

    /// Delete a chat
    Delete {
        /// Chat id
        id: String,
    },
}

/// Model mode subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ModeCommand {
    /// Print the current model mode
    Get,

    /// Switch the model mode
    Set {
        /// Mode name understood by the backend (e.g. ollama, openai)
        mode: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: None,
            verbose: false,
            json_logs: false,
            base_url: None,
            command: Commands::Chat { source: None },
        }
    }
}
