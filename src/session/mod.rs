//! Chat session controller
//!
//! The [`SessionStore`] owns chats and their messages; the [`Coordinator`]
//! runs question/answer exchanges against a [`ChatBackend`](crate::backend::ChatBackend)
//! and makes sure only the latest one ever lands in the store.

pub mod coordinator;
pub mod store;
pub mod types;

pub use coordinator::{Coordinator, ExchangeOutcome, ExchangeResult, ExchangeState, PendingExchange};
pub use store::{SessionStore, DEFAULT_TITLE_MAX_CHARS, HISTORY_WINDOW};
pub use types::{
    truncate_title, AnswerMode, Chat, Citation, HistoryEntry, Message, Role, SourceMode,
    DEFAULT_CHAT_TITLE,
};
