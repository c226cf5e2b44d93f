use crate::references::static_regex;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const ELLIPSIS: &str = "...";
const SEGMENT_SEPARATOR: &str = " | ";

static MARKDOWN_IMAGE: Lazy<Regex> = Lazy::new(|| static_regex(r"!\[([^\]]*)\]\([^)]*\)"));
static BARE_URL: Lazy<Regex> = Lazy::new(|| static_regex(r"https?://[^\s<>\[\]]+"));
static HTML_TAG: Lazy<Regex> = Lazy::new(|| static_regex(r"<[^>]*>"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| static_regex(r"\s+"));

/// Preview budget `(max_lines, max_line_len)` for a node at `depth` hops from the focus.
#[must_use]
pub const fn preview_limits(depth: usize) -> (usize, usize) {
    match depth {
        0 => (8, 120),
        1 => (5, 100),
        2 => (4, 80),
        _ => (3, 60),
    }
}

/// Truncate to at most `max_chars` characters, ending in `...` when shortened.
#[must_use]
pub fn truncate_chars(line: &str, max_chars: usize) -> String {
    if line.chars().count() <= max_chars {
        return line.to_string();
    }
    if max_chars < ELLIPSIS.len() {
        return line.chars().take(max_chars).collect();
    }
    let mut out: String = line.chars().take(max_chars - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Redact and compress an issue body into a single-line preview.
///
/// Images become `[alt]`, URLs become `[link]`, HTML tags are dropped, blank lines skipped.
/// At most `max_lines` segments of at most `max_line_len` characters, joined with ` | `.
#[must_use]
pub fn sanitize_body_for_graph(body: &str, max_lines: usize, max_line_len: usize) -> String {
    if body.is_empty() || max_lines == 0 {
        return String::new();
    }

    let body = MARKDOWN_IMAGE.replace_all(body, |caps: &Captures<'_>| {
        let alt = caps[1].trim();
        if alt.is_empty() {
            "[image]".to_string()
        } else {
            format!("[{alt}]")
        }
    });
    let body = BARE_URL.replace_all(&body, "[link]");
    let body = HTML_TAG.replace_all(&body, "");

    let segments: Vec<String> = body
        .lines()
        .map(|line| WHITESPACE.replace_all(line, " ").trim().replace('|', "/"))
        .filter(|line| !line.is_empty())
        .take(max_lines)
        .map(|line| truncate_chars(&line, max_line_len))
        .collect();

    segments.join(SEGMENT_SEPARATOR)
}
