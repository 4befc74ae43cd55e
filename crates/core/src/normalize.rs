//! Citation and whitespace cleanup for extracted prose.
//!
//! Both parsers run every text fragment they extract through [`normalize`].
//! The function strips bracketed numeric citation markers along with the
//! punctuation debris they leave behind, then tidies whitespace. It is applied
//! until the text stops changing, so `normalize(normalize(x)) == normalize(x)`.
//!
//! # Example
//!
//! ```rust
//! use prism_core::normalize::normalize;
//!
//! assert_eq!(normalize("Results were significant [12]."), "Results were significant.");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

/// `[1]`, `[1, 2]`, `[1-3]`, `[1–3]`
static RE_BRACKET_CITATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\s*\d+(?:\s*[,\-–]\s*\d+)*\s*\]").unwrap());

/// Parentheses left holding only separators, e.g. `(, )` or `(–)`.
static RE_EMPTY_PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\(\s*[\-–,;]*\s*\)\s*").unwrap());

/// A lone dash between whitespace that is followed by punctuation, the end of
/// the text, or a wider gap.
static RE_DANGLING_DASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+[\-–](?:\s+([.,;:])|\s+$|\s{2,})").unwrap());

/// A lone comma or semicolon after whitespace, same trailing context as above.
static RE_DANGLING_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\s)[,;](?:\s+([.,;:])|\s+$|\s{2,})").unwrap());

static RE_STACKED_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"([.,;:])\s*[,;]\s*").unwrap());
static RE_MULTI_PERIOD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").unwrap());
static RE_SPACED_PERIODS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\s+\.").unwrap());
static RE_MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());
static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\n\s*\n\s*").unwrap());
static RE_SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([.,;:)])").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Removes citation markers and their leftovers, then tidies whitespace.
///
/// Blank-line paragraph breaks survive (runs of blank lines collapse to one),
/// single spaces are preserved, and the result is trimmed.
pub fn normalize(text: &str) -> String {
    let mut current = text.trim().to_string();
    loop {
        let next = normalize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// One application of every rewrite. Each rewrite either removes a
/// non-whitespace character or shortens the text, so repeating this reaches a
/// fixed point.
fn normalize_pass(text: &str) -> String {
    let text = RE_BRACKET_CITATION.replace_all(text, "");
    let text = RE_EMPTY_PARENS.replace_all(&text, " ");

    let text = RE_DANGLING_DASH.replace_all(&text, " ${1}");
    let text = RE_DANGLING_SEPARATOR.replace_all(&text, "${1} ${2}");

    let text = RE_STACKED_PUNCT.replace_all(&text, "${1} ");
    let text = RE_MULTI_PERIOD.replace_all(&text, ".");
    let text = RE_SPACED_PERIODS.replace_all(&text, ".");

    let text = RE_MULTI_SPACE.replace_all(&text, " ");
    let text = RE_BLANK_LINES.replace_all(&text, "\n\n");

    let text = RE_SPACE_BEFORE_PUNCT.replace_all(&text, "${1}");

    text.trim().to_string()
}

/// Collapses every whitespace run (newlines included) to one space and trims.
pub fn collapse_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Formats a hyperlink as a Markdown link.
///
/// An empty href or an in-page `#anchor` yields just the visible text. When the
/// visible text is blank the href is used in its place.
///
/// ```rust
/// use prism_core::normalize::link_to_markdown;
///
/// assert_eq!(link_to_markdown("https://example.org", "Example"), "[Example](https://example.org)");
/// assert_eq!(link_to_markdown("#sec2", "Section 2"), "Section 2");
/// ```
pub fn link_to_markdown(href: &str, text: &str) -> String {
    let href = href.trim();
    let text = match text.trim() {
        "" => href,
        t => t,
    };

    if href.is_empty() || href.starts_with('#') {
        return text.to_string();
    }

    format!("[{}]({})", text, href)
}
