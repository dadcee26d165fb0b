//! Text formatter for assistant answers
//!
//! Turns raw answer text into an ordered sequence of typed blocks
//! (paragraphs, headings, ordered and unordered lists). Every text run is
//! escaped first and then receives inline marks for bold, italic and code.
//!
//! The formatter is stateless but not idempotent: feeding its markup back in
//! escapes it a second time. Apply it once per raw answer.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Longest candidate (in characters, exclusive) that may be a heading
const HEADING_MAX_CHARS: usize = 100;

/// A run of text with inline marks applied
///
/// `markup` is the escaped text with `<strong>`, `<em>` and `<code>` marks;
/// `plain` is the original text with no escaping or marks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineText {
    /// Escaped text carrying inline marks
    pub markup: String,
    /// Unescaped, unmarked source text
    pub plain: String,
}

impl InlineText {
    /// Escapes `raw` and applies inline marks
    ///
    /// # Examples
    ///
    /// ```
    /// use ragchat::formatter::InlineText;
    ///
    /// let text = InlineText::new("a **b** <c>");
    /// assert_eq!(text.markup, "a <strong>b</strong> &lt;c&gt;");
    /// assert_eq!(text.plain, "a **b** <c>");
    /// ```
    pub fn new(raw: &str) -> Self {
        Self {
            markup: apply_inline_marks(&escape_markup(raw)),
            plain: raw.to_string(),
        }
    }
}

/// A display block produced from one paragraph candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum Block {
    /// Plain paragraph
    Paragraph(InlineText),
    /// Short all-caps line or line ending with a colon
    Heading(InlineText),
    /// Items introduced by `1.`, `2.`, ...
    OrderedList(Vec<InlineText>),
    /// Items introduced by `-`, `•` or `*`
    UnorderedList(Vec<InlineText>),
}

impl Block {
    /// Text runs of this block in order
    pub fn items(&self) -> &[InlineText] {
        match self {
            Block::Paragraph(text) | Block::Heading(text) => std::slice::from_ref(text),
            Block::OrderedList(items) | Block::UnorderedList(items) => items,
        }
    }

    /// Plain content of the block, list items joined by newlines
    pub fn plain_text(&self) -> String {
        self.items()
            .iter()
            .map(|item| item.plain.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Formats raw answer text into display blocks
///
/// # Examples
///
/// ```
/// use ragchat::formatter::{format_message_text, Block};
///
/// let blocks = format_message_text("OVERVIEW\n\n1. First\n2. Second");
/// assert!(matches!(blocks[0], Block::Heading(_)));
/// assert_eq!(blocks[1].items().len(), 2);
/// ```
pub fn format_message_text(text: &str) -> Vec<Block> {
    paragraph_break()
        .split(text)
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .map(classify_candidate)
        .collect()
}

/// Neutralizes markup-significant characters
///
/// # Examples
///
/// ```
/// use ragchat::formatter::escape_markup;
///
/// assert_eq!(escape_markup("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
/// ```
pub fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Applies bold, then italic, then code marks to already-escaped text
///
/// The italic pass runs over the bold output, so a stray asterisk next to a
/// bold run can pair up across the `<strong>` boundary. Existing answers
/// render that way and the order is kept.
pub fn apply_inline_marks(escaped: &str) -> String {
    let bolded = bold_pattern().replace_all(escaped, "<strong>${1}</strong>");
    let italicized = italic_pattern().replace_all(&bolded, "<em>${1}</em>");
    code_pattern()
        .replace_all(&italicized, "<code>${1}</code>")
        .into_owned()
}

fn classify_candidate(candidate: &str) -> Block {
    if starts_with_ordered_marker(candidate) {
        return Block::OrderedList(list_items(candidate, ordered_marker_len));
    }

    if starts_with_bullet_marker(candidate) {
        return Block::UnorderedList(list_items(candidate, bullet_marker_len));
    }

    let text = InlineText::new(candidate);
    if is_heading(candidate) {
        Block::Heading(text)
    } else {
        Block::Paragraph(text)
    }
}

fn is_heading(candidate: &str) -> bool {
    candidate.chars().count() < HEADING_MAX_CHARS
        && (candidate.to_uppercase() == candidate || candidate.ends_with(':'))
}

/// Splits a list candidate before every line that opens with a marker and
/// strips the marker from each piece. Pieces left empty are dropped.
fn list_items(candidate: &str, marker_len: fn(&str) -> Option<usize>) -> Vec<InlineText> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in candidate.match_indices('\n') {
        if marker_len(&candidate[idx + 1..]).is_some() {
            pieces.push(&candidate[start..idx]);
            start = idx + 1;
        }
    }
    pieces.push(&candidate[start..]);

    pieces
        .into_iter()
        .filter_map(|piece| {
            let len = marker_len(piece)?;
            let body = piece[len..].trim();
            if body.is_empty() {
                None
            } else {
                Some(InlineText::new(body))
            }
        })
        .collect()
}

fn starts_with_ordered_marker(text: &str) -> bool {
    ordered_marker_len(text).is_some()
}

fn starts_with_bullet_marker(text: &str) -> bool {
    bullet_marker_len(text).is_some()
}

/// Byte length of a leading `\d+\.` marker
fn ordered_marker_len(text: &str) -> Option<usize> {
    let digits = text.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && text.as_bytes().get(digits) == Some(&b'.') {
        Some(digits + 1)
    } else {
        None
    }
}

/// Byte length of a leading `-`, `•` or `*` marker
fn bullet_marker_len(text: &str) -> Option<usize> {
    match text.chars().next() {
        Some(ch @ ('-' | '•' | '*')) => Some(ch.len_utf8()),
        _ => None,
    }
}

fn paragraph_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\n+").expect("paragraph pattern is valid"))
}

fn bold_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern is valid"))
}

fn italic_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*(.+?)\*").expect("italic pattern is valid"))
}

fn code_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`(.+?)`").expect("code pattern is valid"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plains(block: &Block) -> Vec<&str> {
        block.items().iter().map(|i| i.plain.as_str()).collect()
    }

    #[test]
    fn test_ordered_list_two_items() {
        let blocks = format_message_text("1. First\n2. Second");
        assert_eq!(blocks.len(), 1);
        assert!(matches!(blocks[0], Block::OrderedList(_)));
        assert_eq!(plains(&blocks[0]), vec!["First", "Second"]);
    }

    #[test]
    fn test_ordered_item_keeps_continuation_lines() {
        let blocks = format_message_text("1. First line\ncontinued\n2. Second");
        assert_eq!(plains(&blocks[0]), vec!["First line\ncontinued", "Second"]);
    }

    #[test]
    fn test_ordered_list_drops_empty_items() {
        let blocks = format_message_text("1.\n2. Only");
        assert_eq!(plains(&blocks[0]), vec!["Only"]);
    }

    #[test]
    fn test_unordered_list_mixed_bullets() {
        let blocks = format_message_text("- apples\n• dates\n* figs");
        assert!(matches!(blocks[0], Block::UnorderedList(_)));
        assert_eq!(plains(&blocks[0]), vec!["apples", "dates", "figs"]);
    }

    #[test]
    fn test_uppercase_line_is_heading() {
        let blocks = format_message_text("IMPORTANT NOTICE");
        assert!(matches!(blocks[0], Block::Heading(_)));
    }

    #[test]
    fn test_colon_line_is_heading() {
        let blocks = format_message_text("The conditions are:");
        assert!(matches!(blocks[0], Block::Heading(_)));
    }

    #[test]
    fn test_long_uppercase_is_paragraph() {
        let long = "A".repeat(100);
        let blocks = format_message_text(&long);
        assert!(matches!(blocks[0], Block::Paragraph(_)));
    }

    #[test]
    fn test_default_is_paragraph() {
        let blocks = format_message_text("Prayer is one of the five pillars.");
        assert!(matches!(blocks[0], Block::Paragraph(_)));
    }

    #[test]
    fn test_digits_without_dot_are_not_a_list() {
        let blocks = format_message_text("2024 was a leap year.");
        assert!(matches!(blocks[0], Block::Paragraph(_)));
    }

    #[test]
    fn test_split_on_runs_of_blank_lines() {
        let blocks = format_message_text("first para\n\n\n\nsecond para\n\n   \n\n");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].plain_text(), "first para");
        assert_eq!(blocks[1].plain_text(), "second para");
    }

    #[test]
    fn test_single_newline_stays_in_paragraph() {
        let blocks = format_message_text("line one\nline two");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].plain_text(), "line one\nline two");
    }

    #[test]
    fn test_empty_input_yields_no_blocks() {
        assert!(format_message_text("").is_empty());
        assert!(format_message_text("\n\n  \n\n").is_empty());
    }

    #[test]
    fn test_markup_is_escaped_in_every_block_kind() {
        let blocks = format_message_text("<b>hi</b> there\n\n- <i>x</i>\n\nNOTE <A>:");
        assert_eq!(
            blocks[0].items()[0].markup,
            "&lt;b&gt;hi&lt;/b&gt; there"
        );
        assert_eq!(blocks[1].items()[0].markup, "&lt;i&gt;x&lt;/i&gt;");
        assert_eq!(blocks[2].items()[0].markup, "NOTE &lt;A&gt;:");
    }

    #[test]
    fn test_inline_bold_italic_code() {
        let blocks = format_message_text("Use **strong** and *soft* and `code`.");
        assert_eq!(
            blocks[0].items()[0].markup,
            "Use <strong>strong</strong> and <em>soft</em> and <code>code</code>."
        );
    }

    #[test]
    fn test_inline_marks_inside_list_items() {
        let blocks = format_message_text("1. **Fajr** at dawn\n2. `Dhuhr`");
        let items = blocks[0].items();
        assert_eq!(items[0].markup, "<strong>Fajr</strong> at dawn");
        assert_eq!(items[1].markup, "<code>Dhuhr</code>");
    }

    #[test]
    fn test_bold_then_italic_miscapture_is_kept() {
        let blocks = format_message_text("Note **a*b** c*");
        assert_eq!(
            blocks[0].items()[0].markup,
            "Note <strong>a<em>b</strong> c</em>"
        );
    }

    #[test]
    fn test_inline_marks_do_not_cross_lines() {
        let blocks = format_message_text("one *two\nthree* four");
        assert_eq!(blocks[0].items()[0].markup, "one *two\nthree* four");
    }

    #[test]
    fn test_formatter_is_not_idempotent() {
        let once = format_message_text("a & b")[0].items()[0].markup.clone();
        let twice = format_message_text(&once)[0].items()[0].markup.clone();
        assert_eq!(once, "a &amp; b");
        assert_eq!(twice, "a &amp;amp; b");
    }

    #[test]
    fn test_plain_content_is_preserved() {
        let raw = "  Zakat is obligatory.\n\n\n\nIMPORTANT NOTICE\n\nIt has conditions:\n\nSee <the> books & \"notes\".  ";
        let blocks = format_message_text(raw);
        let rebuilt: String = blocks
            .iter()
            .map(Block::plain_text)
            .collect::<String>()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let original: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_mixed_blocks_in_order() {
        let blocks = format_message_text("TITLE\n\n- a\n- b\n\ntext");
        assert!(matches!(blocks[0], Block::Heading(_)));
        assert!(matches!(&blocks[1], Block::UnorderedList(items) if items.len() == 2));
        assert!(matches!(blocks[2], Block::Paragraph(_)));
    }

    #[test]
    fn test_escape_apostrophe() {
        assert_eq!(escape_markup("don't"), "don&#39;t");
    }
}
