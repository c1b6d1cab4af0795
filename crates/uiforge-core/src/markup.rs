// Text helpers for LLM output and generated documents

use regex::Regex;
use std::sync::LazyLock;

static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*[ \t]*\r?\n?").expect("valid regex"));
static CLOSING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n?```[ \t]*$").expect("valid regex"));
static DOCUMENT_WRAPPER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<!doctype[^>]*>|</?html[^>]*>|</?body[^>]*>").expect("valid regex")
});

/// Remove a surrounding markdown code fence (```json, ```html, bare ```)
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let without_open = OPENING_FENCE.replace(trimmed, "");
    CLOSING_FENCE.replace(&without_open, "").trim().to_string()
}

/// Strip fences and document wrappers from generated markup
pub fn sanitize_markup(text: &str) -> String {
    let unfenced = strip_code_fences(text);
    DOCUMENT_WRAPPER.replace_all(&unfenced, "").trim().to_string()
}

/// Escape text for inclusion in HTML
pub fn escape_html(text: &str) -> String {
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

/// Upper-case the first letter of every word
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// First `n` lines of a document
pub fn excerpt(text: &str, n: usize) -> String {
    text.lines().take(n).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n<div></div>\n```  "), "<div></div>");
        assert_eq!(strip_code_fences("<div></div>"), "<div></div>");
    }

    #[test]
    fn test_sanitize_markup_removes_wrappers() {
        let raw = "```html\n<!DOCTYPE html><html><body><div>x</div></body></html>\n```";
        assert_eq!(sanitize_markup(raw), "<div>x</div>");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<a href=\"x\">Tom & Jerry's</a>"),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_title_case_and_excerpt() {
        assert_eq!(title_case("build a  clinic portal"), "Build A Clinic Portal");
        assert_eq!(excerpt("a\nb\nc", 2), "a\nb");
    }
}
