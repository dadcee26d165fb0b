//! Session store
//!
//! Owns the chat list, the active-chat pointer and the resident messages of
//! the open chat, and keeps them in step with the remote chat store.

use std::sync::Arc;

use chrono::Utc;

use super::types::{truncate_title, Chat, HistoryEntry, Message, DEFAULT_CHAT_TITLE};
use crate::backend::{parse_timestamp, ChatBackend, ChatSummary};
use crate::error::{RagChatError, Result};
use crate::presentation::RenderedMessage;

/// Number of trailing messages sent as conversation context
pub const HISTORY_WINDOW: usize = 2;

/// Default maximum title length in characters
pub const DEFAULT_TITLE_MAX_CHARS: usize = 40;

/// Chat list and message sequences for one session
///
/// All mutation goes through `&mut self`, so the store needs no locking as
/// long as a single task owns it.
pub struct SessionStore {
    backend: Arc<dyn ChatBackend>,
    chats: Vec<Chat>,
    active: Option<String>,
    title_max_chars: usize,
    history_window: usize,
}

impl SessionStore {
    /// Creates an empty store backed by `backend`
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            chats: Vec::new(),
            active: None,
            title_max_chars: DEFAULT_TITLE_MAX_CHARS,
            history_window: HISTORY_WINDOW,
        }
    }

    /// Overrides the title truncation length
    pub fn with_title_max_chars(mut self, max_chars: usize) -> Self {
        self.title_max_chars = max_chars;
        self
    }

    /// Overrides how many trailing messages go out as context
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Chats ordered most recently updated first
    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    /// Looks up a chat by id
    pub fn chat(&self, chat_id: &str) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == chat_id)
    }

    /// Id of the open chat
    pub fn active_chat_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// The open chat
    pub fn active_chat(&self) -> Option<&Chat> {
        self.active.as_deref().and_then(|id| self.chat(id))
    }

    fn chat_mut(&mut self, chat_id: &str) -> Result<&mut Chat> {
        self.chats
            .iter_mut()
            .find(|c| c.id == chat_id)
            .ok_or_else(|| RagChatError::NotFound(chat_id.to_string()).into())
    }

    fn position(&self, chat_id: &str) -> Result<usize> {
        self.chats
            .iter()
            .position(|c| c.id == chat_id)
            .ok_or_else(|| RagChatError::NotFound(chat_id.to_string()).into())
    }

    /// Refreshes the chat list from the backend
    ///
    /// Never fails: on a transport error the local list is left as it was
    /// and an empty slice is returned. Ephemeral chats and the resident
    /// messages of the open chat survive a refresh.
    pub async fn list_chats(&mut self) -> &[Chat] {
        let summaries = match self.backend.list_chats().await {
            Ok(summaries) => summaries,
            Err(e) => {
                tracing::warn!("Failed to load chat history: {}", e);
                return &[];
            }
        };

        tracing::debug!("Loaded {} chats from backend", summaries.len());

        let mut previous = std::mem::take(&mut self.chats);
        let mut merged: Vec<Chat> = summaries
            .into_iter()
            .map(|summary| {
                let resident = previous
                    .iter()
                    .position(|c| c.id == summary.id)
                    .map(|idx| previous.remove(idx).messages)
                    .unwrap_or_default();
                chat_from_summary(summary, resident)
            })
            .collect();

        let active = self.active.clone();
        merged.extend(
            previous
                .into_iter()
                .filter(|c| !c.persisted || active.as_deref() == Some(c.id.as_str())),
        );

        self.chats = merged;
        self.sort_by_recency();
        &self.chats
    }

    /// Opens a chat and fetches its full message sequence
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the chat is unknown locally or remotely; the
    /// active chat is left unchanged in that case.
    pub async fn load_messages(&mut self, chat_id: &str) -> Result<&[Message]> {
        let persisted = self
            .chat(chat_id)
            .ok_or_else(|| RagChatError::NotFound(chat_id.to_string()))?
            .persisted;

        let messages: Option<Vec<Message>> = if persisted {
            let stored = self.backend.chat_messages(chat_id).await?;
            Some(stored.into_iter().map(Message::from).collect())
        } else {
            None
        };

        self.set_active(chat_id)?;
        let chat = self.chat_mut(chat_id)?;
        if let Some(messages) = messages {
            chat.messages = messages;
        }
        tracing::debug!(chat_id, count = chat.messages.len(), "Opened chat");
        Ok(&chat.messages)
    }

    /// Makes `chat_id` the open chat
    ///
    /// Resident messages of the previously open chat are dropped if that
    /// chat is persisted; they can be fetched again on demand.
    pub fn set_active(&mut self, chat_id: &str) -> Result<()> {
        self.position(chat_id)?;
        if let Some(previous) = self.active.take() {
            if previous != chat_id {
                if let Some(chat) = self.chats.iter_mut().find(|c| c.id == previous) {
                    if chat.persisted {
                        chat.messages.clear();
                    }
                }
            }
        }
        self.active = Some(chat_id.to_string());
        Ok(())
    }

    /// Starts a new chat and opens it
    ///
    /// The chat stays client-side until its first exchange. An open chat
    /// that is still blank is reused instead of stacking empty chats.
    pub fn create_chat(&mut self) -> String {
        if let Some(chat) = self.active_chat() {
            if chat.is_blank() {
                return chat.id.clone();
            }
        }

        let chat = Chat::ephemeral();
        let id = chat.id.clone();
        tracing::debug!(chat_id = %id, "Created ephemeral chat");
        self.chats.push(chat);
        self.sort_by_recency();
        // The id was just inserted.
        let _ = self.set_active(&id);
        id
    }

    /// Creates a chat on the backend first (legacy `POST /chats`) and opens it
    pub async fn create_chat_eager(&mut self) -> Result<String> {
        let created = self.backend.create_chat().await?;
        let now = Utc::now();
        let id = created.id.clone();
        self.chats.push(Chat {
            id: created.id,
            titled: created.title != DEFAULT_CHAT_TITLE,
            title: created.title,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            persisted: true,
        });
        self.sort_by_recency();
        self.set_active(&id)?;
        tracing::info!(chat_id = %id, "Created chat on backend");
        Ok(id)
    }

    /// Deletes a chat locally and remotely
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is unknown locally or remotely, or the
    /// transport error; local state is unchanged on any error.
    pub async fn delete_chat(&mut self, chat_id: &str) -> Result<()> {
        let idx = self.position(chat_id)?;
        if self.chats[idx].persisted {
            self.backend.delete_chat(chat_id).await?;
        }

        self.chats.remove(idx);
        if self.active.as_deref() == Some(chat_id) {
            self.active = None;
        }
        tracing::info!(chat_id, "Deleted chat");
        Ok(())
    }

    /// Appends a message to a chat and re-sorts the list by recency
    pub fn append_message(&mut self, chat_id: &str, message: Message) -> Result<()> {
        let chat = self.chat_mut(chat_id)?;
        chat.messages.push(message);
        chat.updated_at = Utc::now();
        self.sort_by_recency();
        Ok(())
    }

    /// Sets a chat's title, truncated, unless it already has one
    ///
    /// Returns whether the title changed.
    pub fn rename_chat(&mut self, chat_id: &str, title: &str) -> Result<bool> {
        let max_chars = self.title_max_chars;
        let chat = self.chat_mut(chat_id)?;
        if chat.titled {
            tracing::debug!(chat_id, "Chat already titled, keeping {:?}", chat.title);
            return Ok(false);
        }
        chat.title = truncate_title(title, max_chars);
        chat.titled = true;
        Ok(true)
    }

    /// Freezes a chat's current title so later exchanges cannot rename it
    ///
    /// Returns whether the chat was still untitled.
    pub fn settle_title(&mut self, chat_id: &str) -> Result<bool> {
        let chat = self.chat_mut(chat_id)?;
        if chat.titled {
            return Ok(false);
        }
        chat.titled = true;
        tracing::debug!(chat_id, "Keeping title {:?}", chat.title);
        Ok(true)
    }

    /// Records that the backend now knows about a chat
    pub fn mark_persisted(&mut self, chat_id: &str) -> Result<()> {
        self.chat_mut(chat_id)?.persisted = true;
        Ok(())
    }

    /// Conversation context for the next question in the open chat
    ///
    /// The last [`HISTORY_WINDOW`] messages in their original order; empty
    /// when no chat is open or it has no messages.
    pub fn history_window(&self) -> Vec<HistoryEntry> {
        self.active_chat()
            .map(|chat| {
                let start = chat.messages.len().saturating_sub(self.history_window);
                chat.messages[start..].iter().map(HistoryEntry::from).collect()
            })
            .unwrap_or_default()
    }

    /// Presentation data for every message of the open chat
    pub fn render_active(&self) -> Vec<RenderedMessage> {
        self.active_chat()
            .map(|chat| chat.messages.iter().map(RenderedMessage::from_message).collect())
            .unwrap_or_default()
    }

    fn sort_by_recency(&mut self) {
        self.chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }
}

fn chat_from_summary(summary: ChatSummary, messages: Vec<Message>) -> Chat {
    let created_at = parse_timestamp(summary.created_at.as_deref());
    let updated_at = summary
        .updated_at
        .as_deref()
        .map(|raw| parse_timestamp(Some(raw)))
        .unwrap_or(created_at);
    Chat {
        id: summary.id,
        titled: summary.title != DEFAULT_CHAT_TITLE,
        title: summary.title,
        messages,
        created_at,
        updated_at,
        persisted: true,
    }
}
