//! Configuration management for ragchat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{RagChatError, Result};
use crate::session::{SourceMode, DEFAULT_TITLE_MAX_CHARS, HISTORY_WINDOW};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for ragchat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Answer backend connection settings
    #[serde(default)]
    pub backend: BackendConfig,
    /// Chat session behavior
    #[serde(default)]
    pub session: SessionConfig,
}

/// Backend connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the answer service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds; unset means no timeout
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_user_agent() -> String {
    format!("ragchat/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: None,
            user_agent: default_user_agent(),
        }
    }
}

/// Chat session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Source mode selected when a session starts
    #[serde(default)]
    pub default_source_mode: SourceMode,

    /// Number of trailing messages sent as context; the backend expects 2
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Maximum chat title length in characters
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
}

fn default_history_window() -> usize {
    HISTORY_WINDOW
}

fn default_title_max_chars() -> usize {
    DEFAULT_TITLE_MAX_CHARS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_source_mode: SourceMode::default(),
            history_window: default_history_window(),
            title_max_chars: default_title_max_chars(),
        }
    }
}

/// Default configuration file location
///
/// `<config dir>/ragchat/config.yaml`, or `config/config.yaml` when the
/// platform has no home directory.
pub fn default_config_path() -> PathBuf {
    ProjectDirs::from("com", "ragchat", "ragchat")
        .map(|dirs| dirs.config_dir().join("config.yaml"))
        .unwrap_or_else(|| PathBuf::from("config/config.yaml"))
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded, merged and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, or if the merged
    /// configuration is invalid
    pub fn load(path: &Path, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);
        config.validate()?;

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RagChatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| RagChatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("RAGCHAT_BASE_URL") {
            tracing::debug!(base_url = %base_url, "Env override: RAGCHAT_BASE_URL");
            self.backend.base_url = base_url;
        }

        if let Ok(mode) = std::env::var("RAGCHAT_SOURCE_MODE") {
            match mode.parse::<SourceMode>() {
                Ok(v) => self.session.default_source_mode = v,
                Err(_) => tracing::warn!("Invalid RAGCHAT_SOURCE_MODE: {}", mode),
            }
        }

        if let Ok(timeout) = std::env::var("RAGCHAT_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.backend.timeout_seconds = Some(value);
            } else {
                tracing::warn!("Invalid RAGCHAT_TIMEOUT_SECONDS: {}", timeout);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(base_url) = &cli.base_url {
            self.backend.base_url = base_url.clone();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            return Err(RagChatError::Config("backend.base_url cannot be empty".to_string()).into());
        }

        if let Err(e) = url::Url::parse(&self.backend.base_url) {
            return Err(RagChatError::Config(format!(
                "Invalid backend.base_url {}: {}",
                self.backend.base_url, e
            ))
            .into());
        }

        if self.backend.timeout_seconds == Some(0) {
            return Err(RagChatError::Config(
                "backend.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.session.history_window != HISTORY_WINDOW {
            return Err(RagChatError::Config(format!(
                "session.history_window must be {}",
                HISTORY_WINDOW
            ))
            .into());
        }

        if self.session.title_max_chars == 0 {
            return Err(RagChatError::Config(
                "session.title_max_chars must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
