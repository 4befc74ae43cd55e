//! Article extraction from journal HTML pages.
//!
//! The parser targets one journal-platform template: article sections are
//! wrapped in elements carrying a `data-title` attribute, and headings and
//! content blocks use a fixed class vocabulary. That vocabulary lives in
//! [`HtmlConfig`] so a page family with different class names can be handled
//! without code changes.
//!
//! # Example
//!
//! ```rust
//! use prism_core::HtmlParser;
//!
//! let html = r#"
//!     <h1 class="c-article-title">Coral bleaching</h1>
//!     <section data-title="Results">
//!         <h2 class="c-article-section__title">Results</h2>
//!         <div class="c-article-section__content"><p>Bleaching rose [4].</p></div>
//!     </section>
//! "#;
//!
//! let article = HtmlParser::new().parse(html).unwrap();
//! assert_eq!(article.title, "Coral bleaching");
//! assert_eq!(article.sections[0].content, "Bleaching rose.");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Node, Selector};
use url::Url;

use crate::article::{Article, Figure, IdSequence, Section, Table, UNTITLED};
use crate::normalize::{collapse_whitespace, link_to_markdown, normalize};
use crate::parse::{Document, Element, compile_selector};
use crate::preprocess::PreprocessConfig;
use crate::reader::ArticleParser;
use crate::{PrismError, Result};

/// Attribute naming a section wrapper.
const DATA_TITLE: &str = "data-title";
const MAX_TEXT_DEPTH: usize = 256;

static FIGURE: Lazy<Selector> = Lazy::new(|| Selector::parse("figure").unwrap());
static FIGCAPTION: Lazy<Selector> = Lazy::new(|| Selector::parse("figcaption").unwrap());
static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").unwrap());
static THEAD: Lazy<Selector> = Lazy::new(|| Selector::parse("thead").unwrap());
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("th, td").unwrap());

static RE_CAPTION_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new("caption").unwrap());
static RE_LABEL_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new("label|figure-number").unwrap());

/// Elements that separate words when their text is flattened.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "blockquote", "li", "ul", "ol", "dl", "dt", "dd", "h1", "h2", "h3", "h4", "h5",
    "h6", "figcaption", "pre", "hr", "tr", "td", "th",
];

/// Configuration for the HTML article parser.
///
/// The defaults describe the journal template the parser was written for.
///
/// # Example
///
/// ```rust
/// use prism_core::HtmlConfig;
///
/// let config = HtmlConfig::builder()
///     .skip_title("Author information")
///     .end_title("Ethics declarations")
///     .build();
/// assert!(config.skip_titles.contains(&"References".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct HtmlConfig {
    /// Selector for the article title (default: `h1.c-article-title`).
    pub title_selector: String,

    /// `name` of the meta tag holding the DOI (default: `DOI`).
    pub doi_meta_name: String,

    /// Selector for section wrappers (default: `section[data-title]`).
    pub section_selector: String,

    /// Selector for a section's own heading (default: `h2.c-article-section__title`).
    pub section_heading_selector: String,

    /// Selector for a section's content block (default: `.c-article-section__content`).
    pub content_selector: String,

    /// Class of `h2` elements that open a level-2 block (default: `c-article__sub-heading`).
    pub sub_heading_class: String,

    /// `data-title` of the abstract section (default: `Abstract`).
    pub abstract_title: String,

    /// Section titles that are skipped entirely.
    pub skip_titles: Vec<String>,

    /// Section titles that end the section walk.
    pub end_titles: Vec<String>,

    /// Regex matched against link targets that point at reference entries.
    pub citation_href_pattern: String,

    /// Base URL for resolving relative links (default: none).
    pub base_url: Option<Url>,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            title_selector: "h1.c-article-title".to_string(),
            doi_meta_name: "DOI".to_string(),
            section_selector: "section[data-title]".to_string(),
            section_heading_selector: "h2.c-article-section__title".to_string(),
            content_selector: ".c-article-section__content".to_string(),
            sub_heading_class: "c-article__sub-heading".to_string(),
            abstract_title: "Abstract".to_string(),
            skip_titles: vec!["References".to_string(), "References ".to_string()],
            end_titles: vec!["Acknowledgements".to_string(), "Acknowledgments".to_string()],
            citation_href_pattern: r"(?i)#ref-|#cite".to_string(),
            base_url: None,
        }
    }
}

impl HtmlConfig {
    /// Creates a new builder for HtmlConfig.
    pub fn builder() -> HtmlConfigBuilder {
        HtmlConfigBuilder::new()
    }
}

/// Builder for HtmlConfig.
pub struct HtmlConfigBuilder {
    config: HtmlConfig,
}

impl HtmlConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: HtmlConfig::default() }
    }

    /// Sets the title selector.
    pub fn title_selector(mut self, value: impl Into<String>) -> Self {
        self.config.title_selector = value.into();
        self
    }

    /// Sets the DOI meta tag name.
    pub fn doi_meta_name(mut self, value: impl Into<String>) -> Self {
        self.config.doi_meta_name = value.into();
        self
    }

    /// Sets the section wrapper selector.
    pub fn section_selector(mut self, value: impl Into<String>) -> Self {
        self.config.section_selector = value.into();
        self
    }

    /// Sets the section heading selector.
    pub fn section_heading_selector(mut self, value: impl Into<String>) -> Self {
        self.config.section_heading_selector = value.into();
        self
    }

    /// Sets the content block selector.
    pub fn content_selector(mut self, value: impl Into<String>) -> Self {
        self.config.content_selector = value.into();
        self
    }

    /// Sets the sub-heading class.
    pub fn sub_heading_class(mut self, value: impl Into<String>) -> Self {
        self.config.sub_heading_class = value.into();
        self
    }

    /// Sets the abstract section title.
    pub fn abstract_title(mut self, value: impl Into<String>) -> Self {
        self.config.abstract_title = value.into();
        self
    }

    /// Adds a section title to skip.
    pub fn skip_title(mut self, value: impl Into<String>) -> Self {
        self.config.skip_titles.push(value.into());
        self
    }

    /// Adds a section title that ends the walk.
    pub fn end_title(mut self, value: impl Into<String>) -> Self {
        self.config.end_titles.push(value.into());
        self
    }

    /// Sets the citation link pattern.
    pub fn citation_href_pattern(mut self, value: impl Into<String>) -> Self {
        self.config.citation_href_pattern = value.into();
        self
    }

    /// Sets the base URL for resolving relative links.
    pub fn base_url(mut self, value: Option<Url>) -> Self {
        self.config.base_url = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> HtmlConfig {
        self.config
    }
}

impl Default for HtmlConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Compiled form of the configurable selectors and pattern.
struct Matchers {
    title: Selector,
    section: Selector,
    heading: Selector,
    content: Selector,
    citation: Regex,
}

impl Matchers {
    fn compile(config: &HtmlConfig) -> Result<Self> {
        Ok(Self {
            title: compile_selector(&config.title_selector)?,
            section: compile_selector(&config.section_selector)?,
            heading: compile_selector(&config.section_heading_selector)?,
            content: compile_selector(&config.content_selector)?,
            citation: Regex::new(&config.citation_href_pattern)
                .map_err(|e| PrismError::InvalidPattern(e.to_string()))?,
        })
    }
}

/// What a direct child of a content block contributes to the section walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentNode {
    /// Opens a new block at the given level.
    Heading(u8),
    /// Appends cleaned text to the open block.
    Paragraph,
    Other,
}

/// A flat run of prose under one heading.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Block {
    level: u8,
    title: String,
    content: String,
}

/// Running state of the section walk: the open block's level, title and
/// paragraphs, plus every block closed so far.
struct BlockCursor {
    level: u8,
    title: String,
    paragraphs: Vec<String>,
    blocks: Vec<Block>,
}

impl BlockCursor {
    fn new(title: String) -> Self {
        Self { level: 1, title, paragraphs: Vec::new(), blocks: Vec::new() }
    }

    fn open(&mut self, level: u8, title: String) {
        self.flush();
        self.level = level;
        self.title = title;
    }

    fn push(&mut self, paragraph: String) {
        if !paragraph.trim().is_empty() {
            self.paragraphs.push(paragraph);
        }
    }

    /// Closes the open block unless it has neither a title nor any text.
    fn flush(&mut self) {
        if self.title.is_empty() && self.paragraphs.is_empty() {
            return;
        }
        self.blocks.push(Block {
            level: self.level,
            title: std::mem::take(&mut self.title),
            content: std::mem::take(&mut self.paragraphs).join("\n\n"),
        });
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

/// Rebuilds the three-level tree from a flat block sequence.
///
/// A leading level-1 block supplies the section's own content. Level-2 blocks
/// become children and absorb the level-3 blocks that follow them. A level-3
/// block with no level-2 block before it is kept as a level-2 child, and its
/// level-3 followers stay its siblings.
fn assemble(title: String, blocks: Vec<Block>) -> Section {
    let mut section = Section::new(title, 1);
    let mut blocks = blocks.into_iter().peekable();

    if let Some(first) = blocks.next_if(|b| b.level == 1) {
        section.content = first.content;
    }

    // Whether the last child came from a real level-2 heading.
    let mut adopting = false;

    for block in blocks {
        match (block.level, section.sections.last_mut()) {
            (3, Some(parent)) if adopting => {
                parent.sections.push(Section::new(block.title, 3).with_content(block.content));
            }
            (1, _) => {
                if !block.content.is_empty() {
                    if !section.content.is_empty() {
                        section.content.push_str("\n\n");
                    }
                    section.content.push_str(&block.content);
                }
            }
            (level, _) => {
                adopting = level == 2;
                section.sections.push(Section::new(block.title, 2).with_content(block.content));
            }
        }
    }

    section
}

/// Parser for journal article HTML pages.
#[derive(Debug, Clone, Default)]
pub struct HtmlParser {
    config: HtmlConfig,
}

impl HtmlParser {
    /// Creates a parser for the default journal template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parser with a custom configuration.
    pub fn with_config(config: HtmlConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HtmlConfig {
        &self.config
    }

    /// Parses an HTML page into an [`Article`].
    ///
    /// Markup problems never fail the parse; missing pieces fall back to
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PrismError::HtmlParseError`] or [`PrismError::InvalidPattern`]
    /// when the configuration holds an invalid selector or pattern.
    pub fn parse(&self, html: &str) -> Result<Article> {
        let matchers = Matchers::compile(&self.config)?;
        let preprocess = PreprocessConfig { base_url: self.config.base_url.clone(), ..Default::default() };
        let doc = Document::parse_with_preprocessing(html, &preprocess)?;

        let article = Article {
            title: self.title(&doc, &matchers),
            doi: doc.meta_content(&self.config.doi_meta_name),
            abstract_text: self.abstract_text(&doc, &matchers),
            sections: self.sections(&doc, &matchers),
            figures: figures(&doc),
            tables: tables(&doc),
            supplementary: Vec::new(),
        };

        tracing::debug!(
            title = %article.title,
            sections = article.sections.len(),
            figures = article.figures.len(),
            tables = article.tables.len(),
            "parsed HTML article"
        );

        Ok(article)
    }

    fn title(&self, doc: &Document, m: &Matchers) -> String {
        let title = doc
            .select_with(&m.title)
            .first()
            .map(|el| collapse_whitespace(&el.text()))
            .unwrap_or_default();

        if title.is_empty() {
            tracing::warn!("no article title found in HTML, using \"{}\"", UNTITLED);
            return UNTITLED.to_string();
        }
        title
    }

    fn abstract_text(&self, doc: &Document, m: &Matchers) -> String {
        let Some(content) = doc
            .select_with(&m.section)
            .into_iter()
            .find(|s| s.attr(DATA_TITLE).map(str::trim) == Some(self.config.abstract_title.as_str()))
            .and_then(|s| s.select_first_with(&m.content))
        else {
            return String::new();
        };

        let paragraphs: Vec<String> = content
            .child_elements()
            .iter()
            .filter(|el| matches!(self.classify(el), ContentNode::Paragraph))
            .map(|el| clean_text(el.element_ref(), &m.citation))
            .filter(|text| !text.is_empty())
            .collect();

        if paragraphs.is_empty() { clean_text(content.element_ref(), &m.citation) } else { paragraphs.join("\n\n") }
    }

    fn sections(&self, doc: &Document, m: &Matchers) -> Vec<Section> {
        let mut sections = Vec::new();

        for section_el in doc.select_with(&m.section) {
            let key = section_el.attr(DATA_TITLE).unwrap_or_default().trim();

            if self.config.end_titles.iter().any(|t| t.trim() == key) {
                tracing::debug!(section = key, "reached end marker, stopping section walk");
                break;
            }
            if self.config.skip_titles.iter().any(|t| t.trim() == key) {
                continue;
            }

            let title = section_el
                .select_first_with(&m.heading)
                .map(|h| collapse_whitespace(&h.text()))
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| key.to_string());

            let Some(content) = section_el.select_first_with(&m.content) else {
                sections.push(Section::new(title, 1));
                continue;
            };

            let mut cursor = BlockCursor::new(title.clone());
            for node in content.child_elements() {
                match self.classify(&node) {
                    ContentNode::Heading(level) => cursor.open(level, collapse_whitespace(&node.text())),
                    ContentNode::Paragraph if !node.has_ancestor(&["figure", "table"]) => {
                        cursor.push(clean_text(node.element_ref(), &m.citation));
                    }
                    ContentNode::Paragraph | ContentNode::Other => {}
                }
            }

            sections.push(assemble(title, cursor.finish()));
        }

        sections
    }

    fn classify(&self, el: &Element<'_>) -> ContentNode {
        match el.tag_name().as_str() {
            "h2" if el.has_class(&self.config.sub_heading_class) => ContentNode::Heading(2),
            "h3" => ContentNode::Heading(2),
            "h4" => ContentNode::Heading(3),
            "p" | "div" => ContentNode::Paragraph,
            _ => ContentNode::Other,
        }
    }
}

impl ArticleParser for HtmlParser {
    fn parse(&self, input: &str) -> Result<Article> {
        HtmlParser::parse(self, input)
    }
}

/// Flattens an element to prose: citation superscripts and citation links are
/// dropped, other links become Markdown, figures and tables are skipped, then
/// whitespace is collapsed and the text normalized.
fn clean_text(el: ElementRef<'_>, citation: &Regex) -> String {
    let mut raw = String::new();
    push_clean_text(el, citation, &mut raw, 0);
    normalize(&collapse_whitespace(&raw))
}

fn push_clean_text(el: ElementRef<'_>, citation: &Regex, out: &mut String, depth: usize) {
    // Past this depth the subtree is taken as plain text.
    if depth >= MAX_TEXT_DEPTH {
        out.extend(el.text());
        return;
    }

    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = child.value().name();
                match name {
                    "sup" if has_citation_link(child, citation) => {}
                    "a" => push_link(child, citation, out, depth + 1),
                    "figure" | "table" | "script" | "style" => {}
                    "br" => out.push(' '),
                    _ if BLOCK_TAGS.contains(&name) => {
                        out.push(' ');
                        push_clean_text(child, citation, out, depth + 1);
                        out.push(' ');
                    }
                    _ => push_clean_text(child, citation, out, depth + 1),
                }
            }
            _ => {}
        }
    }
}

fn push_link(a: ElementRef<'_>, citation: &Regex, out: &mut String, depth: usize) {
    match a.value().attr("href") {
        Some(href) if citation.is_match(href) => {}
        Some(href) => {
            let text = collapse_whitespace(&a.text().collect::<String>());
            out.push_str(&link_to_markdown(href, &text));
        }
        None => push_clean_text(a, citation, out, depth),
    }
}

fn has_citation_link(el: ElementRef<'_>, citation: &Regex) -> bool {
    el.descendants()
        .filter_map(ElementRef::wrap)
        .filter(|d| d.value().name() == "a")
        .filter_map(|a| a.value().attr("href"))
        .any(|href| citation.is_match(href))
}

fn class_matches(el: &Element<'_>, pattern: &Regex) -> bool {
    el.element_ref().value().classes().any(|c| pattern.is_match(c))
}

fn element_text(el: &Element<'_>) -> String {
    collapse_whitespace(&el.text())
}

/// Figures with a caption or a label, ids from `id`/`data-id` or `F<n>`.
fn figures(doc: &Document) -> Vec<Figure> {
    let mut ids = IdSequence::figures();
    let mut figures = Vec::new();

    for fig in doc.select_with(&FIGURE) {
        let caption = fig
            .select_first_with(&FIGCAPTION)
            .or_else(|| fig.find_descendant(|el| class_matches(el, &RE_CAPTION_CLASS)))
            .map(|el| element_text(&el))
            .unwrap_or_default();
        let label = fig
            .find_descendant(|el| class_matches(el, &RE_LABEL_CLASS))
            .map(|el| element_text(&el))
            .unwrap_or_default();

        if label.is_empty() && caption.is_empty() {
            continue;
        }

        let explicit = fig.attr("id").filter(|id| !id.trim().is_empty()).or_else(|| fig.attr("data-id"));
        figures.push(Figure { id: ids.next(explicit), label, caption });
    }

    figures
}

/// Every table with at least one non-empty row, ids `T<n>`.
fn tables(doc: &Document) -> Vec<Table> {
    let mut ids = IdSequence::tables();
    let mut tables = Vec::new();

    for table in doc.select_with(&TABLE) {
        let mut rows: Vec<Vec<String>> = Vec::new();

        if let Some(thead) = table.select_first_with(&THEAD) {
            rows.extend(thead.select_with(&ROW).iter().map(row_cells));
        }
        for tbody in table.child_elements().iter().filter(|el| el.tag_name() == "tbody") {
            rows.extend(tbody.select_with(&ROW).iter().map(row_cells));
        }
        if rows.is_empty() {
            rows.extend(table.select_with(&ROW).iter().map(row_cells));
        }

        rows.retain(|row| !row.is_empty());
        if rows.is_empty() {
            continue;
        }

        tables.push(Table { id: ids.next(None), label: String::new(), caption: String::new(), data: rows });
    }

    tables
}

fn row_cells(tr: &Element<'_>) -> Vec<String> {
    tr.select_with(&CELL).iter().map(element_text).collect()
}
