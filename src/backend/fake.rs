//! In-process fake backend for unit and integration tests
//!
//! [`FakeBackend`] keeps chats and messages in memory and answers `ask`
//! calls from a queue of scripted replies. A reply can be held back with
//! [`FakeBackend::gate_next_answer`], which lets a test resolve exchanges
//! out of order and reproduce the stale-response race.
//!
//! Like the real service, a successful `ask` persists the chat on first use
//! and records the question and answer under it.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use super::types::{AskRequest, AskResponse, ChatSummary, CreatedChat, StoredMessage};
use super::ChatBackend;
use crate::error::{RagChatError, Result};
use crate::session::{AnswerMode, Citation, Role, DEFAULT_CHAT_TITLE};

/// Scripted reply to one `ask` call
#[derive(Debug)]
enum FakeReply {
    Ready(AskResponse),
    Status(u16),
    Transport(String),
    Gated(oneshot::Receiver<AskResponse>),
}

#[derive(Debug, Default)]
struct FakeState {
    chats: Vec<ChatSummary>,
    messages: HashMap<String, Vec<StoredMessage>>,
    replies: VecDeque<FakeReply>,
    requests: Vec<AskRequest>,
    mode: String,
    fail_listing: bool,
    fail_delete: bool,
    next_id: u64,
}

/// In-memory [`ChatBackend`]
///
/// Cloning shares the underlying state, so a test can keep a handle while
/// the session controller owns another.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    /// Creates an empty backend in `ollama` model mode
    pub fn new() -> Self {
        let backend = Self::default();
        backend.lock().mode = "ollama".to_string();
        backend
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        // A panicking test thread must not wedge the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queues a plain `rag` answer
    pub fn push_answer(&self, answer: impl Into<String>) {
        self.push_response(AskResponse::new(answer, Vec::new(), AnswerMode::Rag));
    }

    /// Queues a full response
    pub fn push_response(&self, response: AskResponse) {
        self.lock().replies.push_back(FakeReply::Ready(response));
    }

    /// Queues a non-success status
    pub fn push_status(&self, status: u16) {
        self.lock().replies.push_back(FakeReply::Status(status));
    }

    /// Queues a network failure
    pub fn push_transport_error(&self, message: impl Into<String>) {
        self.lock()
            .replies
            .push_back(FakeReply::Transport(message.into()));
    }

    /// Queues a reply that resolves only when the returned sender fires
    ///
    /// Dropping the sender without sending turns the reply into a transport
    /// failure.
    pub fn gate_next_answer(&self) -> oneshot::Sender<AskResponse> {
        let (tx, rx) = oneshot::channel();
        self.lock().replies.push_back(FakeReply::Gated(rx));
        tx
    }

    /// Makes `list_chats` fail with a transport error
    pub fn fail_listing(&self, fail: bool) {
        self.lock().fail_listing = fail;
    }

    /// Makes `delete_chat` fail with a transport error
    pub fn fail_delete(&self, fail: bool) {
        self.lock().fail_delete = fail;
    }

    /// Seeds a persisted chat with messages
    pub fn insert_chat(&self, id: &str, title: &str, updated_at: &str, messages: Vec<StoredMessage>) {
        let mut state = self.lock();
        state.chats.push(ChatSummary {
            id: id.to_string(),
            title: title.to_string(),
            created_at: Some(updated_at.to_string()),
            updated_at: Some(updated_at.to_string()),
        });
        state.messages.insert(id.to_string(), messages);
    }

    /// Requests received by `ask`, in arrival order
    pub fn requests(&self) -> Vec<AskRequest> {
        self.lock().requests.clone()
    }

    /// Ids of the chats the backend currently knows
    pub fn chat_ids(&self) -> Vec<String> {
        self.lock().chats.iter().map(|c| c.id.clone()).collect()
    }

    /// Messages the backend stored for a chat
    pub fn stored_messages(&self, chat_id: &str) -> Vec<StoredMessage> {
        self.lock()
            .messages
            .get(chat_id)
            .cloned()
            .unwrap_or_default()
    }

    fn record_exchange(&self, request: &AskRequest, response: &AskResponse) {
        let mut state = self.lock();
        if !state.chats.iter().any(|c| c.id == request.chat_id) {
            state.chats.insert(
                0,
                ChatSummary {
                    id: request.chat_id.clone(),
                    title: crate::session::truncate_title(&request.question, 40),
                    created_at: None,
                    updated_at: None,
                },
            );
        }
        let entry = state.messages.entry(request.chat_id.clone()).or_default();
        entry.push(StoredMessage {
            role: Role::User,
            content: request.question.clone(),
            citations: Vec::new(),
            is_fallback: false,
            mode: AnswerMode::Rag,
        });
        entry.push(StoredMessage {
            role: Role::Assistant,
            content: response.answer.clone(),
            citations: response.citations.clone(),
            is_fallback: response.mode == AnswerMode::Fallback,
            mode: response.mode,
        });
    }
}

/// Stored assistant message helper for seeding
pub fn stored_answer(content: &str, citations: Vec<Citation>, mode: AnswerMode) -> StoredMessage {
    StoredMessage {
        role: Role::Assistant,
        content: content.to_string(),
        citations,
        is_fallback: mode == AnswerMode::Fallback,
        mode,
    }
}

/// Stored user message helper for seeding
pub fn stored_question(content: &str) -> StoredMessage {
    StoredMessage {
        role: Role::User,
        content: content.to_string(),
        citations: Vec::new(),
        is_fallback: false,
        mode: AnswerMode::Rag,
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse> {
        let reply = {
            let mut state = self.lock();
            state.requests.push(request.clone());
            state.replies.pop_front()
        };

        let response = match reply {
            Some(FakeReply::Ready(response)) => response,
            Some(FakeReply::Status(status)) => {
                return Err(RagChatError::Status { status }.into())
            }
            Some(FakeReply::Transport(message)) => {
                return Err(RagChatError::Transport(message).into())
            }
            Some(FakeReply::Gated(rx)) => rx
                .await
                .map_err(|_| RagChatError::Transport("gate dropped".to_string()))?,
            None => {
                return Err(RagChatError::Transport("no scripted reply".to_string()).into())
            }
        };

        self.record_exchange(request, &response);
        Ok(response)
    }

    async fn list_chats(&self) -> Result<Vec<ChatSummary>> {
        let state = self.lock();
        if state.fail_listing {
            return Err(RagChatError::Transport("connection refused".to_string()).into());
        }
        Ok(state.chats.clone())
    }

    async fn create_chat(&self) -> Result<CreatedChat> {
        let mut state = self.lock();
        state.next_id += 1;
        let id = format!("server-{}", state.next_id);
        state.chats.insert(
            0,
            ChatSummary {
                id: id.clone(),
                title: DEFAULT_CHAT_TITLE.to_string(),
                created_at: None,
                updated_at: None,
            },
        );
        state.messages.insert(id.clone(), Vec::new());
        Ok(CreatedChat {
            id,
            title: DEFAULT_CHAT_TITLE.to_string(),
        })
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        let mut state = self.lock();
        if state.fail_delete {
            return Err(RagChatError::Transport("connection reset".to_string()).into());
        }
        let before = state.chats.len();
        state.chats.retain(|c| c.id != chat_id);
        if state.chats.len() == before {
            return Err(RagChatError::NotFound(chat_id.to_string()).into());
        }
        state.messages.remove(chat_id);
        Ok(())
    }

    async fn chat_messages(&self, chat_id: &str) -> Result<Vec<StoredMessage>> {
        let state = self.lock();
        state
            .messages
            .get(chat_id)
            .cloned()
            .ok_or_else(|| RagChatError::NotFound(chat_id.to_string()).into())
    }

    async fn model_mode(&self) -> Result<String> {
        Ok(self.lock().mode.clone())
    }

    async fn set_model_mode(&self, mode: &str) -> Result<String> {
        let mut state = self.lock();
        state.mode = mode.to_string();
        Ok(state.mode.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SourceMode;

    #[tokio::test]
    async fn test_ask_persists_chat_lazily() {
        let backend = FakeBackend::new();
        backend.push_answer("answer");
        let req = AskRequest::new("question", "c1", SourceMode::Rag, Vec::new());
        backend.ask(&req).await.unwrap();

        assert_eq!(backend.chat_ids(), vec!["c1".to_string()]);
        assert_eq!(backend.stored_messages("c1").len(), 2);
    }

    #[tokio::test]
    async fn test_failed_ask_does_not_persist() {
        let backend = FakeBackend::new();
        backend.push_status(500);
        let req = AskRequest::new("question", "c1", SourceMode::Rag, Vec::new());
        assert!(backend.ask(&req).await.is_err());
        assert!(backend.chat_ids().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let backend = FakeBackend::new();
        let err = backend.delete_chat("nope").await.unwrap_err();
        assert!(crate::error::is_not_found(&err));
    }

    #[tokio::test]
    async fn test_gated_answer_waits_for_release() {
        let backend = FakeBackend::new();
        let gate = backend.gate_next_answer();
        let req = AskRequest::new("q", "c1", SourceMode::Rag, Vec::new());

        let b = backend.clone();
        let handle = tokio::spawn(async move { b.ask(&req).await });
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        gate.send(AskResponse::new("late", Vec::new(), AnswerMode::Rag))
            .unwrap();
        let resp = handle.await.unwrap().unwrap();
        assert_eq!(resp.answer, "late");
    }
}
