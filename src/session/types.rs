//! Chat and message data model
//!
//! These types double as the wire schema for the parts of the backend
//! protocol that carry them (citations, history entries). Missing fields are
//! defaulted here, once, so nothing downstream has to null-check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::backend::types::null_as_default;
use crate::error::RagChatError;

/// Title given to a chat before its first exchange completes
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Role {
    /// The person asking questions
    User,
    /// The backend (or a synthetic error notice)
    Assistant,
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("user") {
            Role::User
        } else {
            Role::Assistant
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Which corpus the backend should answer from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SourceMode {
    /// Curated document corpus only
    #[default]
    #[serde(rename = "rag")]
    Rag,
    /// Corpus augmented with ephemeral web results
    #[serde(rename = "rag+internet")]
    RagInternet,
    /// Web results only
    #[serde(rename = "internet")]
    Internet,
}

impl SourceMode {
    /// Wire name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMode::Rag => "rag",
            SourceMode::RagInternet => "rag+internet",
            SourceMode::Internet => "internet",
        }
    }

    /// Whether the legacy `use_web` flag should be sent for this mode
    pub fn uses_web(&self) -> bool {
        matches!(self, SourceMode::RagInternet | SourceMode::Internet)
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceMode {
    type Err = RagChatError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rag" => Ok(SourceMode::Rag),
            "rag+internet" | "rag-internet" => Ok(SourceMode::RagInternet),
            "internet" | "web" => Ok(SourceMode::Internet),
            other => Err(RagChatError::Config(format!(
                "Invalid source mode: {}. Must be one of: rag, rag+internet, internet",
                other
            ))),
        }
    }
}

/// How the backend actually produced an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum AnswerMode {
    /// Grounded in the curated corpus
    #[default]
    #[serde(rename = "rag")]
    Rag,
    /// Corpus plus web results
    #[serde(rename = "rag-web")]
    RagWeb,
    /// Web results only
    #[serde(rename = "web")]
    Web,
    /// No documents retrieved; general knowledge only
    #[serde(rename = "fallback")]
    Fallback,
}

impl From<String> for AnswerMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "rag-web" => AnswerMode::RagWeb,
            "web" => AnswerMode::Web,
            "fallback" => AnswerMode::Fallback,
            "rag" => AnswerMode::Rag,
            other => {
                tracing::warn!("Unknown answer mode {:?}, treating as rag", other);
                AnswerMode::Rag
            }
        }
    }
}

/// A source backing part of an answer
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Citation {
    /// Human-readable source label (may itself be a URL)
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    /// Explicit locator for the source
    #[serde(default, alias = "reference", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Excerpt of the cited text
    #[serde(default, deserialize_with = "null_as_default")]
    pub snippet: String,
}

impl Citation {
    /// Create a citation without an explicit locator
    pub fn new(source: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            url: None,
            snippet: snippet.into(),
        }
    }

    /// Attach an explicit locator
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// One entry of a chat. Never edited after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author
    pub role: Role,
    /// Raw text, before any formatting
    pub text: String,
    /// Ordered citations, possibly empty
    pub citations: Vec<Citation>,
    /// Mode reported by the backend
    pub mode: AnswerMode,
    /// Set when the answer was produced without retrieved documents
    pub is_fallback: bool,
}

impl Message {
    /// Creates a user question
    ///
    /// # Examples
    ///
    /// ```
    /// use ragchat::session::{Message, Role};
    ///
    /// let msg = Message::user("What is zakat?");
    /// assert_eq!(msg.role, Role::User);
    /// assert!(msg.citations.is_empty());
    /// ```
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            citations: Vec::new(),
            mode: AnswerMode::Rag,
            is_fallback: false,
        }
    }

    /// Creates an assistant answer; the fallback flag follows the mode
    pub fn assistant(text: impl Into<String>, citations: Vec<Citation>, mode: AnswerMode) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            citations,
            mode,
            is_fallback: mode == AnswerMode::Fallback,
        }
    }

    /// Creates the synthetic assistant message for a failed exchange
    pub fn error(description: impl fmt::Display) -> Self {
        Self::assistant(format!("Error: {}", description), Vec::new(), AnswerMode::Rag)
    }
}

/// Derived `{role, content}` pair sent as conversation context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Author of the original message
    pub role: Role,
    /// Raw text of the original message
    pub content: String,
}

impl From<&Message> for HistoryEntry {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.text.clone(),
        }
    }
}

/// A conversation thread
#[derive(Debug, Clone, PartialEq)]
pub struct Chat {
    /// Opaque unique identifier
    pub id: String,
    /// Display title, set once from the first question
    pub title: String,
    /// Messages in insertion order; only resident for the open chat
    pub messages: Vec<Message>,
    /// When the chat was created
    pub created_at: DateTime<Utc>,
    /// When a message was last appended
    pub updated_at: DateTime<Utc>,
    /// Whether the backend knows about this chat
    pub persisted: bool,
    /// Whether the one-time title assignment already happened
    pub titled: bool,
}

impl Chat {
    /// Creates an ephemeral chat with a fresh id
    pub fn ephemeral() -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: DEFAULT_CHAT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            persisted: false,
            titled: false,
        }
    }

    /// True for a chat that never left the client and holds no messages
    pub fn is_blank(&self) -> bool {
        !self.persisted && self.messages.is_empty()
    }
}

/// Truncates a question to a chat title
///
/// Titles longer than `max_chars` characters are cut and suffixed with `...`.
///
/// # Examples
///
/// ```
/// use ragchat::session::truncate_title;
///
/// assert_eq!(truncate_title("Short question", 40), "Short question");
/// assert_eq!(truncate_title("abcdef", 3), "abc...");
/// ```
pub fn truncate_title(question: &str, max_chars: usize) -> String {
    if question.chars().count() > max_chars {
        let head: String = question.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        question.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_mode_parse() {
        assert_eq!("rag".parse::<SourceMode>().unwrap(), SourceMode::Rag);
        assert_eq!(
            "rag+internet".parse::<SourceMode>().unwrap(),
            SourceMode::RagInternet
        );
        assert_eq!(
            "Internet".parse::<SourceMode>().unwrap(),
            SourceMode::Internet
        );
        assert!("books".parse::<SourceMode>().is_err());
    }

    #[test]
    fn test_source_mode_uses_web() {
        assert!(!SourceMode::Rag.uses_web());
        assert!(SourceMode::RagInternet.uses_web());
        assert!(SourceMode::Internet.uses_web());
    }

    #[test]
    fn test_source_mode_serializes_wire_name() {
        let json = serde_json::to_string(&SourceMode::RagInternet).unwrap();
        assert_eq!(json, "\"rag+internet\"");
    }

    #[test]
    fn test_answer_mode_unknown_defaults_to_rag() {
        let mode: AnswerMode = serde_json::from_str("\"something-new\"").unwrap();
        assert_eq!(mode, AnswerMode::Rag);
        let mode: AnswerMode = serde_json::from_str("\"rag-web\"").unwrap();
        assert_eq!(mode, AnswerMode::RagWeb);
    }

    #[test]
    fn test_citation_defaults_and_reference_alias() {
        let c: Citation = serde_json::from_str(r#"{"source":"Quran 1:1"}"#).unwrap();
        assert_eq!(c.source, "Quran 1:1");
        assert_eq!(c.url, None);
        assert_eq!(c.snippet, "");

        let c: Citation =
            serde_json::from_str(r#"{"source":"x","reference":"https://a.b","snippet":"s"}"#)
                .unwrap();
        assert_eq!(c.url.as_deref(), Some("https://a.b"));
    }

    #[test]
    fn test_assistant_fallback_follows_mode() {
        assert!(Message::assistant("a", vec![], AnswerMode::Fallback).is_fallback);
        assert!(!Message::assistant("a", vec![], AnswerMode::Web).is_fallback);
    }

    #[test]
    fn test_error_message_text() {
        let msg = Message::error("Server error: 500");
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.text, "Error: Server error: 500");
        assert!(msg.citations.is_empty());
        assert!(!msg.is_fallback);
    }

    #[test]
    fn test_truncate_title_boundaries() {
        let exact = "a".repeat(40);
        assert_eq!(truncate_title(&exact, 40), exact);

        let long = "b".repeat(41);
        assert_eq!(truncate_title(&long, 40), format!("{}...", "b".repeat(40)));
    }

    #[test]
    fn test_truncate_title_counts_chars_not_bytes() {
        let arabic = "ب".repeat(41);
        let title = truncate_title(&arabic, 40);
        assert_eq!(title.chars().count(), 43);
    }

    #[test]
    fn test_ephemeral_chat_is_blank() {
        let chat = Chat::ephemeral();
        assert!(chat.is_blank());
        assert_eq!(chat.title, DEFAULT_CHAT_TITLE);
        assert_ne!(chat.id, Chat::ephemeral().id);
    }
}
