use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static RE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static RE_HIDDEN_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(display\s*:\s*none|visibility\s*:\s*hidden)").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Configuration for HTML preprocessing
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Whether to remove script, style, noscript, iframe, template, svg and canvas elements
    pub remove_unwanted: bool,
    /// Whether to remove HTML comments
    pub remove_comments: bool,
    /// Whether to remove elements hidden with inline styles
    pub remove_hidden: bool,
    /// Base URL for resolving relative link targets
    pub base_url: Option<Url>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { remove_unwanted: true, remove_comments: true, remove_hidden: true, base_url: None }
    }
}

/// Elements whose content never contributes article text.
const UNWANTED_TAGS: &[&str] = &["script", "style", "noscript", "iframe", "template", "svg", "canvas"];

/// Preprocess a journal page before it is parsed into a DOM
pub fn preprocess_html(html: &str, config: &PreprocessConfig) -> String {
    let mut processed = html.to_string();

    if config.remove_comments {
        processed = remove_comments(&processed);
    }

    if config.remove_unwanted {
        processed = remove_unwanted_tags(&processed);
    }

    if config.remove_hidden {
        processed = remove_hidden_elements(&processed);
    }

    if let Some(base_url) = &config.base_url {
        processed = convert_relative_urls(&processed, base_url);
    }

    normalize_whitespace(&processed)
}

/// Remove elements that never carry article prose
fn remove_unwanted_tags(html: &str) -> String {
    let selector = UNWANTED_TAGS.join(", ");
    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!(selector, |el| {
                el.remove();
                Ok(())
            })],
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return html.to_string();
    }

    if output.is_empty() { html.to_string() } else { output }
}

/// Remove HTML comments from the document
fn remove_comments(html: &str) -> String {
    RE_COMMENT.replace_all(html, "").to_string()
}

/// Remove elements with display:none or visibility:hidden styles
fn remove_hidden_elements(html: &str) -> String {
    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!("[style]", |el| {
                if let Some(style) = el.get_attribute("style")
                    && RE_HIDDEN_STYLE.is_match(&style)
                {
                    el.remove();
                }
                Ok(())
            })],
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return html.to_string();
    }

    if output.is_empty() { html.to_string() } else { output }
}

/// Convert relative link targets to absolute URLs, leaving in-page anchors alone
pub fn convert_relative_urls(html: &str, base_url: &Url) -> String {
    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!("a[href]", |el| {
                if let Some(href) = el.get_attribute("href")
                    && !href.trim().is_empty()
                    && !href.starts_with('#')
                    && let Ok(absolute) = base_url.join(href.trim())
                {
                    el.set_attribute("href", absolute.as_str()).ok();
                }
                Ok(())
            })],
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return html.to_string();
    }

    if output.is_empty() { html.to_string() } else { output }
}

/// Normalize whitespace in HTML
fn normalize_whitespace(html: &str) -> String {
    RE_WHITESPACE.replace_all(html, " ").to_string()
}
