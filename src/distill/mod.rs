//! Content distillation - HTML to dense plain text
//!
//! Used for the human/LLM-facing excerpt of a capture. It works on a copy of
//! the page and never touches archived bytes or their hashes.

use crate::error::{Error, Result};
use regex::Regex;

/// Strips markup and boilerplate from HTML
pub struct ContentDistiller {
    noise_blocks: Vec<Regex>,
    comments: Regex,
    list_items: Regex,
    block_breaks: Regex,
    tags: Regex,
    blank_runs: Regex,
    inline_space: Regex,
}

impl ContentDistiller {
    pub fn new() -> Result<Self> {
        let noise_blocks = ["script", "style", "noscript"]
            .iter()
            .map(|tag| compile(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            noise_blocks,
            comments: compile(r"(?s)<!--.*?-->")?,
            list_items: compile(r"(?i)<li\b[^>]*>")?,
            block_breaks: compile(
                r"(?i)<br\s*/?>|</?(?:p|div|section|article|header|footer|h[1-6]|ul|ol|li|tr|table|blockquote|pre)\b[^>]*>",
            )?,
            tags: compile(r"(?s)<[^>]*>")?,
            blank_runs: compile(r"\n{3,}")?,
            inline_space: compile(r"[ \t\r\f]+")?,
        })
    }

    /// Convert HTML into plain text, one block per line.
    pub fn distill(&self, html: &str) -> String {
        if html.is_empty() {
            return String::new();
        }

        let mut text = html.to_string();
        for block in &self.noise_blocks {
            text = block.replace_all(&text, "").into_owned();
        }
        text = self.comments.replace_all(&text, "").into_owned();
        text = self.list_items.replace_all(&text, "\n- ").into_owned();
        text = self.block_breaks.replace_all(&text, "\n").into_owned();
        text = self.tags.replace_all(&text, "").into_owned();
        text = decode_entities(&text);

        let lines: Vec<String> = text
            .split('\n')
            .map(|line| self.inline_space.replace_all(line, " ").trim().to_string())
            .filter(|line| !is_cookie_notice(line))
            .collect();

        let joined = lines.join("\n");
        let collapsed = self.blank_runs.replace_all(&joined, "\n\n");
        collapsed.trim().to_string()
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| Error::Internal(format!("Invalid distiller pattern {}: {}", pattern, e)))
}

fn is_cookie_notice(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.contains("cookie") && lower.contains("accept")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
