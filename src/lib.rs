//! ragchat - terminal client library for a retrieval-augmented Q&A service
//!
//! This library provides the chat session controller for a question-answering
//! backend that grounds its answers in a curated document corpus and,
//! optionally, the web.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Chat data model, session store and request coordinator
//! - `backend`: Backend trait, HTTP client and an in-memory fake
//! - `formatter`: Raw answer text to typed display blocks
//! - `classifier`: Source badges and citation display
//! - `presentation`: Per-message display data
//! - `render`: Terminal rendering
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ragchat::backend::HttpBackend;
//! use ragchat::session::{Coordinator, SourceMode};
//! use ragchat::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let backend = Arc::new(HttpBackend::new(&config.backend)?);
//!     let mut coordinator = Coordinator::new(backend, &config.session);
//!     coordinator.submit("What is zakat?", SourceMode::Rag).await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod classifier;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod formatter;
pub mod presentation;
pub mod render;
pub mod session;

// Re-export commonly used types
pub use backend::{ChatBackend, FakeBackend, HttpBackend};
pub use config::Config;
pub use error::{RagChatError, Result};
pub use presentation::RenderedMessage;
pub use session::{Coordinator, ExchangeOutcome, SessionStore, SourceMode};
