//! Backend collaborator abstraction
//!
//! This module defines the [`ChatBackend`] trait, the seam between the
//! session controller and the answer service, along with the HTTP
//! implementation and an in-process fake for tests.

pub mod fake;
pub mod http;
pub mod types;

pub use fake::FakeBackend;
pub use http::HttpBackend;
pub use types::{
    parse_timestamp, AskRequest, AskResponse, ChatSummary, CreatedChat, ModelMode, StoredMessage,
};

use async_trait::async_trait;

use crate::error::Result;

/// Remote answer and chat-persistence service
///
/// Implementations report network failures as
/// [`RagChatError::Transport`](crate::error::RagChatError::Transport),
/// non-success statuses as
/// [`RagChatError::Status`](crate::error::RagChatError::Status) and unknown
/// chats as [`RagChatError::NotFound`](crate::error::RagChatError::NotFound).
///
/// # Examples
///
/// ```
/// use ragchat::backend::{AskRequest, ChatBackend, FakeBackend};
/// use ragchat::session::SourceMode;
///
/// # #[tokio::main]
/// # async fn main() -> ragchat::Result<()> {
/// let backend = FakeBackend::new();
/// backend.push_answer("Wa alaykum as-salam");
/// let req = AskRequest::new("Salam", "chat-1", SourceMode::Rag, Vec::new());
/// let resp = backend.ask(&req).await?;
/// assert_eq!(resp.answer, "Wa alaykum as-salam");
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Asks a question (`POST /ask`)
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse>;

    /// Lists persisted chats, most recently updated first (`GET /chats`)
    async fn list_chats(&self) -> Result<Vec<ChatSummary>>;

    /// Legacy eager chat creation (`POST /chats`)
    async fn create_chat(&self) -> Result<CreatedChat>;

    /// Deletes a chat (`DELETE /chats/{id}`)
    async fn delete_chat(&self, chat_id: &str) -> Result<()>;

    /// Fetches the full message sequence of a chat (`GET /chats/{id}/messages`)
    async fn chat_messages(&self, chat_id: &str) -> Result<Vec<StoredMessage>>;

    /// Reads the backend's model mode (`GET /model/mode`)
    async fn model_mode(&self) -> Result<String>;

    /// Switches the backend's model mode (`POST /model/mode`)
    async fn set_model_mode(&self, mode: &str) -> Result<String>;
}
