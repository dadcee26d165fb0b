//! Presentation data handed to a rendering surface
//!
//! A [`RenderedMessage`] is everything a surface needs to paint one message:
//! formatted blocks, badges and citation views. It is derived from a stored
//! [`Message`] on demand and never persisted.

use serde::Serialize;

use crate::classifier::{citation_views, classify, Annotations, CitationView};
use crate::formatter::{format_message_text, Block};
use crate::session::{Message, Role};

/// Display form of one message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMessage {
    /// Author
    pub role: Role,
    /// Formatted body
    pub blocks: Vec<Block>,
    /// Badges and notices
    pub annotations: Annotations,
    /// Citation views in citation order
    pub citations: Vec<CitationView>,
}

impl RenderedMessage {
    /// Formats and classifies a message
    ///
    /// # Examples
    ///
    /// ```
    /// use ragchat::presentation::RenderedMessage;
    /// use ragchat::session::{AnswerMode, Message};
    ///
    /// let msg = Message::assistant("SUMMARY\n\nText", vec![], AnswerMode::Fallback);
    /// let rendered = RenderedMessage::from_message(&msg);
    /// assert_eq!(rendered.blocks.len(), 2);
    /// assert!(rendered.annotations.fallback);
    /// ```
    pub fn from_message(message: &Message) -> Self {
        Self {
            role: message.role,
            blocks: format_message_text(&message.text),
            annotations: classify(message.mode, &message.citations, message.is_fallback),
            citations: citation_views(&message.citations),
        }
    }
}
