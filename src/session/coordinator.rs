//! Request coordinator
//!
//! Serializes question/answer exchanges for one session. Every exchange is
//! stamped with a monotonically increasing generation; starting a new one
//! cancels the pending one and any result whose generation is no longer
//! current is discarded without touching the store.
//!
//! An exchange is split in three steps so the network call can run while the
//! caller keeps ownership of the coordinator:
//!
//! 1. [`Coordinator::begin`] appends the question and returns a
//!    [`PendingExchange`]
//! 2. [`PendingExchange::send`] performs the call and needs no borrow of the
//!    coordinator
//! 3. [`Coordinator::finish`] applies the result if it is still current
//!
//! [`Coordinator::submit`] chains the three for callers that do not need to
//! interleave anything.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::store::SessionStore;
use super::types::{Message, SourceMode};
use crate::backend::{AskRequest, AskResponse, ChatBackend};
use crate::config::SessionConfig;
use crate::error::{is_cancelled, RagChatError, Result};
use crate::presentation::RenderedMessage;

/// Whether an exchange is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// Nothing pending
    Idle,
    /// Waiting for the answer of the given generation
    Pending {
        /// Generation of the in-flight exchange
        generation: u64,
    },
}

/// How an exchange ended, from the caller's point of view
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    /// The answer arrived and was appended
    Resolved(RenderedMessage),
    /// The exchange was superseded or torn down; nothing was appended
    Cancelled,
    /// The call failed; a synthetic error message was appended
    Failed(RenderedMessage),
}

/// An exchange that has been started but not sent
pub struct PendingExchange {
    generation: u64,
    chat_id: String,
    request: AskRequest,
    backend: Arc<dyn ChatBackend>,
    token: CancellationToken,
}

impl std::fmt::Debug for PendingExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingExchange")
            .field("generation", &self.generation)
            .field("chat_id", &self.chat_id)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl PendingExchange {
    /// Generation stamp of this exchange
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Chat the exchange belongs to
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// Request that will be sent
    pub fn request(&self) -> &AskRequest {
        &self.request
    }

    /// Performs the backend call
    ///
    /// Resolves to `Cancelled` as soon as the exchange is superseded or the
    /// coordinator shuts down, dropping the in-flight call.
    pub async fn send(self) -> ExchangeResult {
        let response = tokio::select! {
            _ = self.token.cancelled() => Err(RagChatError::Cancelled.into()),
            response = self.backend.ask(&self.request) => response,
        };
        ExchangeResult {
            generation: self.generation,
            chat_id: self.chat_id,
            question: self.request.question,
            response,
        }
    }
}

/// Raw result of [`PendingExchange::send`], to be handed to
/// [`Coordinator::finish`]
#[derive(Debug)]
pub struct ExchangeResult {
    generation: u64,
    chat_id: String,
    question: String,
    response: Result<AskResponse>,
}

impl ExchangeResult {
    /// Generation stamp of the exchange that produced this result
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Serializes exchanges and writes their results into a [`SessionStore`]
pub struct Coordinator {
    store: SessionStore,
    backend: Arc<dyn ChatBackend>,
    generation: u64,
    state: ExchangeState,
    cancel: Option<CancellationToken>,
}

impl Coordinator {
    /// Creates a coordinator with an empty store
    pub fn new(backend: Arc<dyn ChatBackend>, config: &SessionConfig) -> Self {
        let store = SessionStore::new(Arc::clone(&backend))
            .with_title_max_chars(config.title_max_chars)
            .with_history_window(config.history_window);
        Self {
            store,
            backend,
            generation: 0,
            state: ExchangeState::Idle,
            cancel: None,
        }
    }

    /// Read access to the session store
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Write access to the session store
    pub fn store_mut(&mut self) -> &mut SessionStore {
        &mut self.store
    }

    /// Current exchange state
    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Current generation counter
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Starts an exchange
    ///
    /// Cancels any pending exchange, opens a new chat if none is open,
    /// snapshots the history window and only then appends the question, so
    /// the question never appears in its own context.
    ///
    /// Only a chat's first exchange may title it. An untitled chat that
    /// already holds messages keeps its current title from here on.
    ///
    /// # Errors
    ///
    /// Returns `EmptyQuestion` if `question` is blank after trimming.
    pub fn begin(&mut self, question: &str, source_mode: SourceMode) -> Result<PendingExchange> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagChatError::EmptyQuestion.into());
        }

        self.cancel_pending();

        let chat_id = match self.store.active_chat_id() {
            Some(id) => id.to_string(),
            None => self.store.create_chat(),
        };

        let has_history = self
            .store
            .chat(&chat_id)
            .is_some_and(|chat| !chat.messages.is_empty());
        if has_history {
            self.store.settle_title(&chat_id)?;
        }

        let history = self.store.history_window();
        self.store.append_message(&chat_id, Message::user(question))?;

        self.generation += 1;
        let token = CancellationToken::new();
        self.cancel = Some(token.clone());
        self.state = ExchangeState::Pending {
            generation: self.generation,
        };

        tracing::debug!(
            generation = self.generation,
            chat_id = %chat_id,
            source_mode = %source_mode,
            history = history.len(),
            "Starting exchange"
        );

        Ok(PendingExchange {
            generation: self.generation,
            request: AskRequest::new(question, chat_id.clone(), source_mode, history),
            chat_id,
            backend: Arc::clone(&self.backend),
            token,
        })
    }

    /// Applies the result of an exchange
    ///
    /// Results from a superseded generation are dropped and reported as
    /// `Cancelled`. Transport and status failures become an assistant-role
    /// error message in the chat.
    pub fn finish(&mut self, result: ExchangeResult) -> ExchangeOutcome {
        let current = ExchangeState::Pending {
            generation: result.generation,
        };
        if result.generation != self.generation || self.state != current {
            tracing::debug!(
                stale = result.generation,
                current = self.generation,
                "Discarding stale exchange result"
            );
            return ExchangeOutcome::Cancelled;
        }

        self.state = ExchangeState::Idle;
        self.cancel = None;

        let ExchangeResult {
            chat_id,
            question,
            response,
            ..
        } = result;

        let (message, resolved) = match response {
            Ok(response) => (response.into_message(), true),
            Err(e) if is_cancelled(&e) => {
                tracing::debug!(chat_id = %chat_id, "Exchange cancelled");
                return ExchangeOutcome::Cancelled;
            }
            Err(e) => {
                let transport = e
                    .downcast_ref::<RagChatError>()
                    .is_some_and(RagChatError::is_transport);
                if transport {
                    tracing::warn!(chat_id = %chat_id, "Exchange failed: {}", e);
                } else {
                    tracing::error!(chat_id = %chat_id, "Unexpected exchange error: {}", e);
                }
                (Message::error(&e), false)
            }
        };

        let rendered = RenderedMessage::from_message(&message);
        if let Err(e) = self.store.append_message(&chat_id, message) {
            // The chat was deleted while the answer was in flight.
            tracing::warn!(chat_id = %chat_id, "Dropping answer: {}", e);
            return ExchangeOutcome::Cancelled;
        }

        if !resolved {
            if let Err(e) = self.store.settle_title(&chat_id) {
                tracing::warn!(chat_id = %chat_id, "Failed to settle title: {}", e);
            }
            return ExchangeOutcome::Failed(rendered);
        }

        if let Err(e) = self.store.mark_persisted(&chat_id) {
            tracing::warn!(chat_id = %chat_id, "Failed to mark chat persisted: {}", e);
        }
        match self.store.rename_chat(&chat_id, &question) {
            Ok(true) => tracing::debug!(chat_id = %chat_id, "Titled chat"),
            Ok(false) => {}
            Err(e) => tracing::warn!(chat_id = %chat_id, "Failed to title chat: {}", e),
        }

        ExchangeOutcome::Resolved(rendered)
    }

    /// Runs a complete exchange
    ///
    /// # Errors
    ///
    /// Returns `EmptyQuestion` for a blank question; backend failures are
    /// reported through [`ExchangeOutcome::Failed`] instead.
    pub async fn submit(
        &mut self,
        question: &str,
        source_mode: SourceMode,
    ) -> Result<ExchangeOutcome> {
        let pending = self.begin(question, source_mode)?;
        let result = pending.send().await;
        Ok(self.finish(result))
    }

    /// Cancels the pending exchange, if any
    ///
    /// Returns whether something was cancelled.
    pub fn cancel_pending(&mut self) -> bool {
        match self.cancel.take() {
            Some(token) => {
                token.cancel();
                tracing::debug!(generation = self.generation, "Cancelled pending exchange");
                self.state = ExchangeState::Idle;
                true
            }
            None => false,
        }
    }

    /// Tears the session down, cancelling any pending exchange
    pub fn shutdown(&mut self) {
        if self.cancel_pending() {
            tracing::info!("Session shut down with an exchange in flight");
        }
    }

    /// Reads the backend's model mode
    pub async fn model_mode(&self) -> Result<String> {
        self.backend.model_mode().await
    }

    /// Switches the backend's model mode and returns the mode now in effect
    pub async fn set_model_mode(&self, mode: &str) -> Result<String> {
        let mode = self.backend.set_model_mode(mode).await?;
        tracing::info!("Model mode set to {}", mode);
        Ok(mode)
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FakeBackend;
    use crate::session::{AnswerMode, Citation, Role, DEFAULT_CHAT_TITLE};

    fn coordinator(backend: &FakeBackend) -> Coordinator {
        Coordinator::new(Arc::new(backend.clone()), &SessionConfig::default())
    }

    #[tokio::test]
    async fn test_submit_resolves_and_titles_chat() {
        let backend = FakeBackend::new();
        backend.push_response(AskResponse::new(
            "Five daily prayers.",
            vec![Citation::new("Quran 2:43", "Establish prayer")],
            AnswerMode::Rag,
        ));
        let mut coord = coordinator(&backend);

        let outcome = coord.submit("How many prayers?", SourceMode::Rag).await.unwrap();
        let ExchangeOutcome::Resolved(rendered) = outcome else {
            panic!("expected resolved outcome");
        };
        assert!(rendered.annotations.curated);
        assert_eq!(coord.state(), ExchangeState::Idle);

        let chat = coord.store().active_chat().unwrap();
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.title, "How many prayers?");
        assert!(chat.persisted);
    }

    #[tokio::test]
    async fn test_title_set_only_by_first_exchange() {
        let backend = FakeBackend::new();
        backend.push_answer("a1");
        backend.push_answer("a2");
        let mut coord = coordinator(&backend);

        coord.submit("first question", SourceMode::Rag).await.unwrap();
        coord.submit("second question", SourceMode::Rag).await.unwrap();
        assert_eq!(coord.store().active_chat().unwrap().title, "first question");
    }

    #[tokio::test]
    async fn test_failed_first_exchange_keeps_default_title() {
        let backend = FakeBackend::new();
        backend.push_transport_error("connection refused");
        backend.push_answer("a2");
        let mut coord = coordinator(&backend);

        let first = coord.submit("first question", SourceMode::Rag).await.unwrap();
        assert!(matches!(first, ExchangeOutcome::Failed(_)));
        assert_eq!(coord.store().active_chat().unwrap().title, DEFAULT_CHAT_TITLE);

        let second = coord.submit("second question", SourceMode::Rag).await.unwrap();
        assert!(matches!(second, ExchangeOutcome::Resolved(_)));

        let chat = coord.store().active_chat().unwrap();
        assert_eq!(chat.title, DEFAULT_CHAT_TITLE);
        assert!(chat.persisted);
        assert_eq!(chat.messages.len(), 4);
    }

    #[tokio::test]
    async fn test_cancelled_first_exchange_keeps_default_title() {
        let backend = FakeBackend::new();
        backend.push_answer("a2");
        let mut coord = coordinator(&backend);

        let stale = coord.begin("first question", SourceMode::Rag).unwrap();
        let outcome = coord.submit("second question", SourceMode::Rag).await.unwrap();
        assert!(matches!(outcome, ExchangeOutcome::Resolved(_)));
        drop(stale);

        assert_eq!(coord.store().active_chat().unwrap().title, DEFAULT_CHAT_TITLE);
    }

    #[tokio::test]
    async fn test_history_window_excludes_current_question() {
        let backend = FakeBackend::new();
        backend.push_answer("a1");
        backend.push_answer("a2");
        backend.push_answer("a3");
        let mut coord = coordinator(&backend);

        coord.submit("q1", SourceMode::Rag).await.unwrap();
        coord.submit("q2", SourceMode::Rag).await.unwrap();
        coord.submit("q3", SourceMode::Rag).await.unwrap();

        let requests = backend.requests();
        assert_eq!(requests[0].conversation_history, None);
        let history = requests[2].conversation_history.clone().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "q2");
        assert_eq!(history[1].content, "a2");
    }

    #[tokio::test]
    async fn test_transport_failure_appends_error_message() {
        let backend = FakeBackend::new();
        backend.push_transport_error("connection refused");
        let mut coord = coordinator(&backend);

        let outcome = coord.submit("q", SourceMode::Rag).await.unwrap();
        assert!(matches!(outcome, ExchangeOutcome::Failed(_)));

        let chat = coord.store().active_chat().unwrap();
        let last = chat.messages.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.text, "Error: connection refused");
        assert!(!chat.persisted);
    }

    #[tokio::test]
    async fn test_status_failure_message() {
        let backend = FakeBackend::new();
        backend.push_status(500);
        let mut coord = coordinator(&backend);

        coord.submit("q", SourceMode::Rag).await.unwrap();
        let chat = coord.store().active_chat().unwrap();
        assert_eq!(chat.messages.last().unwrap().text, "Error: Server error: 500");
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let backend = FakeBackend::new();
        let mut coord = coordinator(&backend);
        assert!(coord.submit("   ", SourceMode::Rag).await.is_err());
        assert!(backend.requests().is_empty());
        assert!(coord.store().chats().is_empty());
    }

    #[tokio::test]
    async fn test_superseded_exchange_is_discarded() {
        let backend = FakeBackend::new();
        let gate = backend.gate_next_answer();
        backend.push_answer("second answer");
        let mut coord = coordinator(&backend);

        let first = coord.begin("first", SourceMode::Rag).unwrap();
        let first_task = tokio::spawn(first.send());
        tokio::task::yield_now().await;

        let second = coord.begin("second", SourceMode::Rag).unwrap();
        assert_eq!(second.generation(), 2);
        let _ = gate.send(AskResponse::new("first answer", Vec::new(), AnswerMode::Rag));

        let first_result = first_task.await.unwrap();
        assert_eq!(coord.finish(first_result), ExchangeOutcome::Cancelled);

        let outcome = coord.finish(second.send().await);
        assert!(matches!(outcome, ExchangeOutcome::Resolved(_)));

        let texts: Vec<_> = coord
            .store()
            .active_chat()
            .unwrap()
            .messages
            .iter()
            .map(|m| m.text.clone())
            .collect();
        assert_eq!(texts, vec!["first", "second", "second answer"]);
    }

    #[tokio::test]
    async fn test_stale_success_never_appended() {
        let backend = FakeBackend::new();
        backend.push_answer("current");
        let mut coord = coordinator(&backend);

        let first = coord.begin("first", SourceMode::Rag).unwrap();
        let chat_id = first.chat_id().to_string();
        drop(first);
        let second = coord.begin("second", SourceMode::Rag).unwrap();

        let stale = ExchangeResult {
            generation: 1,
            chat_id,
            question: "first".to_string(),
            response: Ok(AskResponse::new("stale", Vec::new(), AnswerMode::Rag)),
        };
        assert_eq!(coord.finish(stale), ExchangeOutcome::Cancelled);
        assert_eq!(coord.state(), ExchangeState::Pending { generation: 2 });

        coord.finish(second.send().await);
        let chat = coord.store().active_chat().unwrap();
        assert!(chat.messages.iter().all(|m| m.text != "stale"));
        assert_eq!(chat.messages.last().unwrap().text, "current");
    }

    #[tokio::test]
    async fn test_shutdown_cancels_pending() {
        let backend = FakeBackend::new();
        let _gate = backend.gate_next_answer();
        let mut coord = coordinator(&backend);

        let pending = coord.begin("q", SourceMode::Rag).unwrap();
        coord.shutdown();
        assert_eq!(coord.state(), ExchangeState::Idle);

        let result = pending.send().await;
        assert_eq!(coord.finish(result), ExchangeOutcome::Cancelled);
        assert_eq!(coord.store().active_chat().unwrap().messages.len(), 1);
    }

    #[tokio::test]
    async fn test_answer_for_deleted_chat_is_dropped() {
        let backend = FakeBackend::new();
        backend.push_answer("late");
        let mut coord = coordinator(&backend);

        let pending = coord.begin("q", SourceMode::Rag).unwrap();
        let chat_id = pending.chat_id().to_string();
        coord.store_mut().delete_chat(&chat_id).await.unwrap();

        let result = pending.send().await;
        assert_eq!(coord.finish(result), ExchangeOutcome::Cancelled);
        assert!(coord.store().chats().is_empty());
    }

    #[tokio::test]
    async fn test_model_mode_roundtrip() {
        let backend = FakeBackend::new();
        let coord = coordinator(&backend);
        assert_eq!(coord.model_mode().await.unwrap(), "ollama");
        assert_eq!(coord.set_model_mode("openai").await.unwrap(), "openai");
        assert_eq!(coord.model_mode().await.unwrap(), "openai");
    }
}
