//! Wire schema for the answer backend
//!
//! Response types default every optional or absent field here so a partial
//! or slightly malformed payload never becomes an error further in: absent
//! citations are an empty list, an absent mode is `rag`, an absent answer is
//! empty text.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::session::{AnswerMode, Citation, HistoryEntry, Message, Role, SourceMode, DEFAULT_CHAT_TITLE};

/// Body of `POST /ask`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    /// Question text
    pub question: String,
    /// Chat the exchange belongs to
    pub chat_id: String,
    /// Selected source mode
    pub source_mode: SourceMode,
    /// Legacy web flag, only sent when the source mode uses the web
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_web: Option<bool>,
    /// Previous user/assistant pair, omitted when there is none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_history: Option<Vec<HistoryEntry>>,
}

impl AskRequest {
    /// Builds a request, deriving `use_web` and dropping an empty history
    ///
    /// # Examples
    ///
    /// ```
    /// use ragchat::backend::AskRequest;
    /// use ragchat::session::SourceMode;
    ///
    /// let req = AskRequest::new("What is wudu?", "chat-1", SourceMode::Rag, Vec::new());
    /// assert_eq!(req.use_web, None);
    /// assert_eq!(req.conversation_history, None);
    /// ```
    pub fn new(
        question: impl Into<String>,
        chat_id: impl Into<String>,
        source_mode: SourceMode,
        history: Vec<HistoryEntry>,
    ) -> Self {
        Self {
            question: question.into(),
            chat_id: chat_id.into(),
            source_mode,
            use_web: source_mode.uses_web().then_some(true),
            conversation_history: if history.is_empty() {
                None
            } else {
                Some(history)
            },
        }
    }
}

/// Body returned by `POST /ask`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskResponse {
    /// Raw answer text
    #[serde(default, deserialize_with = "null_as_default")]
    pub answer: String,
    /// Citations backing the answer
    #[serde(default, deserialize_with = "null_as_default")]
    pub citations: Vec<Citation>,
    /// How the answer was produced
    #[serde(default, deserialize_with = "null_as_default")]
    pub mode: AnswerMode,
}

impl AskResponse {
    /// Convenience constructor for tests and fakes
    pub fn new(answer: impl Into<String>, citations: Vec<Citation>, mode: AnswerMode) -> Self {
        Self {
            answer: answer.into(),
            citations,
            mode,
        }
    }

    /// Converts the response into an assistant message
    pub fn into_message(self) -> Message {
        Message::assistant(self.answer, self.citations, self.mode)
    }
}

/// Entry of `GET /chats`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    /// Chat id
    pub id: String,
    /// Chat title
    #[serde(default = "default_title", deserialize_with = "null_as_title")]
    pub title: String,
    /// Creation timestamp as sent by the server
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last update timestamp as sent by the server
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Body returned by the legacy `POST /chats`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedChat {
    /// Server-assigned chat id
    pub id: String,
    /// Initial title
    #[serde(default = "default_title", deserialize_with = "null_as_title")]
    pub title: String,
}

/// Entry of `GET /chats/{id}/messages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Author
    pub role: Role,
    /// Raw message text
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    /// Citations, stored as null when there were none
    #[serde(default, deserialize_with = "null_as_default")]
    pub citations: Vec<Citation>,
    /// Fallback flag; SQLite backends send it as 0/1
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_fallback: bool,
    /// Answer mode, absent on older rows
    #[serde(default, deserialize_with = "null_as_default")]
    pub mode: AnswerMode,
}

impl From<StoredMessage> for Message {
    fn from(stored: StoredMessage) -> Self {
        Message {
            role: stored.role,
            text: stored.content,
            citations: stored.citations,
            mode: stored.mode,
            is_fallback: stored.is_fallback,
        }
    }
}

/// Body of `GET/POST /model/mode`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMode {
    /// Opaque mode name
    #[serde(default)]
    pub mode: String,
}

/// Parses a server timestamp
///
/// Accepts RFC 3339 and the SQLite `YYYY-MM-DD HH:MM:SS` form (taken as
/// UTC). Missing or unparseable values fall back to the current time.
pub fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Utc::now();
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return naive.and_utc();
        }
    }

    tracing::debug!("Unparseable timestamp {:?}, using now", raw);
    Utc::now()
}

fn default_title() -> String {
    DEFAULT_CHAT_TITLE.to_string()
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_title<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|t| !t.is_empty())
        .unwrap_or_else(default_title))
}

fn lenient_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(b)) => b,
        Some(serde_json::Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(serde_json::Value::String(s)) => matches!(s.as_str(), "1" | "true" | "True"),
        _ => false,
    })
}
