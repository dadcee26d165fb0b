//! Message classifier
//!
//! Derives presentation annotations from answer metadata: whether the answer
//! came from the web, whether it is backed by curated scripture, and whether
//! it is a general-knowledge fallback. Also decides how each citation is
//! displayed.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::formatter::escape_markup;
use crate::session::{AnswerMode, Citation};

/// Badge shown for web-sourced answers
pub const WEB_SOURCE_NOTICE: &str = "Answer sourced from web (ephemeral)";

/// Badge shown for answers citing curated scripture
pub const CURATED_SOURCE_NOTICE: &str = "Answer uses curated authentic sources";

/// Notice shown when no documents were retrieved
pub const FALLBACK_NOTICE: &str = "No documents found in database. Answer based on general Islamic knowledge. Add more texts to improve accuracy!";

/// Presentation flags for one message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Annotations {
    /// Answer used web results
    pub web_sourced: bool,
    /// Answer cites Quran or Hadith from the curated corpus
    pub curated: bool,
    /// Answer was produced without retrieved documents
    pub fallback: bool,
}

impl Annotations {
    /// Notice texts to display, in display order
    pub fn notices(&self) -> Vec<&'static str> {
        let mut notices = Vec::new();
        if self.web_sourced {
            notices.push(WEB_SOURCE_NOTICE);
        }
        if self.curated {
            notices.push(CURATED_SOURCE_NOTICE);
        }
        if self.fallback {
            notices.push(FALLBACK_NOTICE);
        }
        notices
    }
}

/// Display form of a citation; every text field is escaped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationView {
    /// 1-based position in the citation list
    pub ordinal: usize,
    /// Source label
    pub label: String,
    /// Link target when the citation is linkable
    pub href: Option<String>,
    /// Cited excerpt
    pub snippet: String,
}

/// Classifies an answer
///
/// # Examples
///
/// ```
/// use ragchat::classifier::classify;
/// use ragchat::session::{AnswerMode, Citation};
///
/// let citations = vec![Citation::new("Quran 2:255", "Ayat al-Kursi")];
/// assert!(classify(AnswerMode::Rag, &citations, false).curated);
/// assert!(classify(AnswerMode::Web, &citations, false).web_sourced);
/// ```
pub fn classify(mode: AnswerMode, citations: &[Citation], is_fallback: bool) -> Annotations {
    Annotations {
        web_sourced: matches!(mode, AnswerMode::RagWeb | AnswerMode::Web),
        curated: mode == AnswerMode::Rag
            && citations
                .iter()
                .any(|c| curated_label().is_match(&c.source)),
        fallback: is_fallback,
    }
}

/// Builds display views for a citation list
pub fn citation_views(citations: &[Citation]) -> Vec<CitationView> {
    citations
        .iter()
        .enumerate()
        .map(|(idx, citation)| {
            let href = link_target(citation);
            let label = if citation.source.is_empty() {
                href.clone().unwrap_or_default()
            } else {
                citation.source.clone()
            };
            CitationView {
                ordinal: idx + 1,
                label: escape_markup(&label),
                href: href.as_deref().map(escape_markup),
                snippet: escape_markup(&citation.snippet),
            }
        })
        .collect()
}

/// Explicit locator, or the label itself when it is an http(s) URL
fn link_target(citation: &Citation) -> Option<String> {
    if let Some(url) = citation.url.as_deref().filter(|u| !u.trim().is_empty()) {
        return Some(url.to_string());
    }
    if is_http_url(&citation.source) {
        return Some(citation.source.clone());
    }
    None
}

fn is_http_url(text: &str) -> bool {
    http_prefix().is_match(text) && url::Url::parse(text).is_ok()
}

fn curated_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(quran|hadith)").expect("curated pattern is valid"))
}

fn http_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^https?://").expect("http pattern is valid"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quran_citation_curated_only_in_rag_mode() {
        let citations = vec![Citation::new("Quran 2:255", "Allah - there is no deity")];

        let rag = classify(AnswerMode::Rag, &citations, false);
        assert!(rag.curated);
        assert!(!rag.web_sourced);

        let web = classify(AnswerMode::Web, &citations, false);
        assert!(!web.curated);
        assert!(web.web_sourced);
    }

    #[test]
    fn test_hadith_label_is_case_insensitive() {
        let citations = vec![
            Citation::new("tafsir notes", "x"),
            Citation::new("HADITH Bukhari 1", "y"),
        ];
        assert!(classify(AnswerMode::Rag, &citations, false).curated);
    }

    #[test]
    fn test_label_must_lead_with_token() {
        let citations = vec![Citation::new("Commentary on Quran", "x")];
        assert!(!classify(AnswerMode::Rag, &citations, false).curated);
    }

    #[test]
    fn test_rag_web_is_web_sourced() {
        assert!(classify(AnswerMode::RagWeb, &[], false).web_sourced);
        assert!(!classify(AnswerMode::Fallback, &[], false).web_sourced);
    }

    #[test]
    fn test_fallback_follows_flag_only() {
        assert!(classify(AnswerMode::Rag, &[], true).fallback);
        assert!(!classify(AnswerMode::Fallback, &[], false).fallback);
    }

    #[test]
    fn test_notices_order() {
        let annotations = Annotations {
            web_sourced: true,
            curated: false,
            fallback: true,
        };
        assert_eq!(annotations.notices(), vec![WEB_SOURCE_NOTICE, FALLBACK_NOTICE]);
        assert!(Annotations::default().notices().is_empty());
    }

    #[test]
    fn test_citation_with_explicit_url_is_link() {
        let views = citation_views(&[Citation::new("Sunnah.com", "s").with_url("https://sunnah.com/x")]);
        assert_eq!(views[0].ordinal, 1);
        assert_eq!(views[0].label, "Sunnah.com");
        assert_eq!(views[0].href.as_deref(), Some("https://sunnah.com/x"));
    }

    #[test]
    fn test_url_label_is_link() {
        let views = citation_views(&[Citation::new("HTTPS://example.com/page", "s")]);
        assert_eq!(views[0].href.as_deref(), Some("HTTPS://example.com/page"));
    }

    #[test]
    fn test_malformed_url_label_is_plain() {
        let views = citation_views(&[
            Citation::new("https://", "s"),
            Citation::new("ftp://example.com", "s"),
        ]);
        assert!(views[0].href.is_none());
        assert!(views[1].href.is_none());
    }

    #[test]
    fn test_citation_fields_are_escaped() {
        let views = citation_views(&[
            Citation::new("Quran 1:1", "first"),
            Citation::new("<b>Book</b>", "a & b"),
        ]);
        assert_eq!(views[1].ordinal, 2);
        assert_eq!(views[1].label, "&lt;b&gt;Book&lt;/b&gt;");
        assert_eq!(views[1].snippet, "a &amp; b");
    }

    #[test]
    fn test_empty_label_falls_back_to_url() {
        let views = citation_views(&[Citation::new("", "s").with_url("https://a.example/?q=1&r=2")]);
        assert_eq!(views[0].label, "https://a.example/?q=1&amp;r=2");
        assert_eq!(views[0].href.as_deref(), Some("https://a.example/?q=1&amp;r=2"));
    }
}
