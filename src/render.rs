//! Terminal rendering of formatted messages
//!
//! Maps the inline marks produced by the formatter onto ANSI styles and lays
//! out blocks, notices and citations for a terminal.

use colored::Colorize;
use regex::Regex;
use std::sync::OnceLock;

use crate::formatter::{Block, InlineText};
use crate::presentation::RenderedMessage;
use crate::session::Role;

fn mark_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<(/?)(strong|em|code)>").expect("mark tag pattern is valid"))
}

/// Reverses [`escape_markup`](crate::formatter::escape_markup)
pub fn unescape_markup(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[derive(Default)]
struct MarkDepth {
    strong: usize,
    em: usize,
    code: usize,
}

impl MarkDepth {
    fn apply(&mut self, tag: &str, closing: bool) {
        let depth = match tag {
            "strong" => &mut self.strong,
            "em" => &mut self.em,
            _ => &mut self.code,
        };
        if closing {
            *depth = depth.saturating_sub(1);
        } else {
            *depth += 1;
        }
    }

    fn style(&self, text: &str) -> String {
        let mut styled = text.normal();
        if self.strong > 0 {
            styled = styled.bold();
        }
        if self.em > 0 {
            styled = styled.italic();
        }
        if self.code > 0 {
            styled = styled.cyan();
        }
        styled.to_string()
    }
}

/// Converts marked-up text into a styled terminal string
///
/// Marks that overlap instead of nesting are honored segment by segment.
pub fn render_markup(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut depth = MarkDepth::default();
    let mut last = 0;

    for caps in mark_tag().captures_iter(markup) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            out.push_str(&depth.style(&unescape_markup(&markup[last..whole.start()])));
        }
        depth.apply(&caps[2], !caps[1].is_empty());
        last = whole.end();
    }
    if last < markup.len() {
        out.push_str(&depth.style(&unescape_markup(&markup[last..])));
    }
    out
}

fn render_inline(text: &InlineText) -> String {
    render_markup(&text.markup)
}

/// Lays out one block as terminal lines
pub fn render_block(block: &Block) -> String {
    match block {
        Block::Paragraph(text) => render_inline(text),
        Block::Heading(text) => unescape_markup(&strip_marks(&text.markup))
            .bold()
            .underline()
            .to_string(),
        Block::OrderedList(items) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| format!("  {}. {}", idx + 1, render_inline(item)))
            .collect::<Vec<_>>()
            .join("\n"),
        Block::UnorderedList(items) => items
            .iter()
            .map(|item| format!("  • {}", render_inline(item)))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn strip_marks(markup: &str) -> String {
    mark_tag().replace_all(markup, "").into_owned()
}

/// Lays out a full message: author, notices, body and sources
pub fn render_message(message: &RenderedMessage) -> String {
    let mut sections = Vec::new();

    sections.push(match message.role {
        Role::User => "You".green().bold().to_string(),
        Role::Assistant => "Assistant".blue().bold().to_string(),
    });

    for notice in message.annotations.notices() {
        sections.push(format!("[{}]", notice).yellow().to_string());
    }

    let body: Vec<String> = message.blocks.iter().map(render_block).collect();
    if !body.is_empty() {
        sections.push(body.join("\n\n"));
    }

    if !message.citations.is_empty() {
        let mut sources = vec!["Sources:".bold().to_string()];
        for citation in &message.citations {
            let label = unescape_markup(&citation.label);
            let mut line = format!("  [{}] {}", citation.ordinal, label.cyan());
            if let Some(href) = &citation.href {
                let href = unescape_markup(href);
                if href != label {
                    line.push_str(&format!(" <{}>", href.underline()));
                }
            }
            sources.push(line);
            if !citation.snippet.is_empty() {
                sources.push(format!("      {}", unescape_markup(&citation.snippet).dimmed()));
            }
        }
        sections.push(sources.join("\n"));
    }

    sections.join("\n")
}
