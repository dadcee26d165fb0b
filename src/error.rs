//! Error types for ragchat
//!
//! This module defines the error taxonomy used by the session controller
//! and the ambient layers, using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for ragchat operations
///
/// The first four variants form the taxonomy the request coordinator
/// classifies on: transport failures become a synthetic assistant message,
/// cancellations are dropped silently and not-found is handed back to the
/// caller with state left unchanged.
#[derive(Error, Debug)]
pub enum RagChatError {
    /// Network failure while talking to the backend
    #[error("{0}")]
    Transport(String),

    /// Backend answered with a non-success status
    #[error("Server error: {status}")]
    Status {
        /// HTTP status code returned by the backend
        status: u16,
    },

    /// The exchange was superseded or the session was torn down
    #[error("Request cancelled")]
    Cancelled,

    /// A chat id is unknown locally or remotely
    #[error("Chat not found: {0}")]
    NotFound(String),

    /// A question was empty after trimming
    #[error("Question cannot be empty")]
    EmptyQuestion,

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl RagChatError {
    /// Returns true for failures that the coordinator turns into an
    /// assistant-role error message.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            RagChatError::Transport(_) | RagChatError::Status { .. } | RagChatError::Http(_)
        )
    }
}

/// Result type alias for ragchat operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

/// Returns true if `err` wraps [`RagChatError::Cancelled`].
pub fn is_cancelled(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<RagChatError>(),
        Some(RagChatError::Cancelled)
    )
}

/// Returns true if `err` wraps [`RagChatError::NotFound`].
pub fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<RagChatError>(),
        Some(RagChatError::NotFound(_))
    )
}
