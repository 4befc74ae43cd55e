//! HTML parsing and DOM navigation.
//!
//! This module provides the [`Document`] and [`Element`] types that the HTML
//! article parser uses to query a journal page with CSS selectors.
//!
//! # Example
//!
//! ```rust
//! use prism_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <head><meta name="DOI" content="10.1038/s41586-020-2649-2"></head>
//!         <body><h1 class="c-article-title">Array programming with NumPy</h1></body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html).unwrap();
//! assert_eq!(doc.meta_content("DOI").as_deref(), Some("10.1038/s41586-020-2649-2"));
//! let title = doc.select_first("h1.c-article-title").unwrap().unwrap();
//! assert_eq!(title.text(), "Array programming with NumPy");
//! ```

use scraper::{ElementRef, Html, Selector};

use crate::preprocess::{PreprocessConfig, preprocess_html};
use crate::{PrismError, Result};

/// Compiles a CSS selector, mapping failures to [`PrismError::HtmlParseError`].
pub fn compile_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| PrismError::HtmlParseError(format!("Invalid selector '{}': {}", selector, e)))
}

/// A parsed HTML document.
///
/// HTML parsing is lenient: tag soup is repaired rather than rejected, so
/// constructing a Document never fails on markup alone.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses HTML from a string without preprocessing.
    ///
    /// # Example
    ///
    /// ```rust
    /// use prism_core::parse::Document;
    ///
    /// let doc = Document::parse("<html><body><h1>Title</h1></body></html>").unwrap();
    /// assert!(doc.text_content().contains("Title"));
    /// ```
    pub fn parse(html: &str) -> Result<Self> {
        let html = Html::parse_document(html);
        Ok(Self { html })
    }

    /// Parses HTML after running the preprocessing pass.
    ///
    /// Scripts, styles, comments and hidden elements are removed first, and
    /// relative links are resolved when the config carries a base URL.
    pub fn parse_with_preprocessing(html: &str, config: &PreprocessConfig) -> Result<Self> {
        let cleaned = preprocess_html(html, config);
        let html = Html::parse_document(&cleaned);

        Ok(Self { html })
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`PrismError::HtmlParseError`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = compile_selector(selector)?;
        Ok(self.select_with(&sel))
    }

    /// Selects elements using a pre-compiled selector.
    pub fn select_with(&'_ self, selector: &Selector) -> Vec<Element<'_>> {
        self.html.select(selector).map(Element::from).collect()
    }

    /// Returns the first element matching the selector, if any.
    pub fn select_first(&'_ self, selector: &str) -> Result<Option<Element<'_>>> {
        let sel = compile_selector(selector)?;
        Ok(self.html.select(&sel).next().map(Element::from))
    }

    /// Gets the trimmed `content` of the first `<meta name="...">` tag with a
    /// non-blank value.
    pub fn meta_content(&self, name: &str) -> Option<String> {
        let selector = Selector::parse("meta[name]").ok()?;
        self.html
            .select(&selector)
            .filter(|el| el.value().attr("name") == Some(name))
            .filter_map(|el| el.value().attr("content"))
            .map(str::trim)
            .find(|content| !content.is_empty())
            .map(str::to_string)
    }

    /// Gets all text content from the document.
    pub fn text_content(&self) -> String {
        self.html.root_element().text().collect()
    }
}

/// A wrapper around scraper's ElementRef.
///
/// # Example
///
/// ```rust
/// use prism_core::parse::Document;
///
/// let html = r#"<a class="c-link" href="https://example.com">Link text</a>"#;
/// let doc = Document::parse(html).unwrap();
/// let link = &doc.select("a").unwrap()[0];
///
/// assert_eq!(link.text(), "Link text");
/// assert_eq!(link.attr("href"), Some("https://example.com"));
/// assert!(link.has_class("c-link"));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> From<ElementRef<'a>> for Element<'a> {
    fn from(element: ElementRef<'a>) -> Self {
        Self { element }
    }
}

impl<'a> Element<'a> {
    /// Gets the wrapped `scraper::ElementRef`.
    pub fn element_ref(&self) -> ElementRef<'a> {
        self.element
    }

    /// Gets the concatenation of all text nodes within this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Gets the lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Whether the element's class list contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.element.value().classes().any(|c| c == class)
    }

    /// Direct child elements in document order.
    pub fn child_elements(&self) -> Vec<Element<'a>> {
        self.element.children().filter_map(ElementRef::wrap).map(Element::from).collect()
    }

    /// Whether any ancestor has one of the given tag names.
    pub fn has_ancestor(&self, names: &[&str]) -> bool {
        self.element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|el| names.contains(&el.value().name()))
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`PrismError::HtmlParseError`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = compile_selector(selector)?;
        Ok(self.select_with(&sel))
    }

    /// Selects descendant elements using a pre-compiled selector.
    pub fn select_with(&self, selector: &Selector) -> Vec<Element<'a>> {
        self.element.select(selector).map(Element::from).collect()
    }

    /// First descendant matching the pre-compiled selector.
    pub fn select_first_with(&self, selector: &Selector) -> Option<Element<'a>> {
        self.element.select(selector).next().map(Element::from)
    }

    /// First descendant (document order) satisfying the predicate.
    pub fn find_descendant(&self, pred: impl Fn(&Element<'a>) -> bool) -> Option<Element<'a>> {
        self.element
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .map(Element::from)
            .find(|el| pred(el))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    const SAMPLE_HTML: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <meta name="DOI" content=" 10.1000/test ">
            <meta name="citation_title" content="">
            <title>Test Page</title>
        </head>
        <body>
            <h1 class="c-article-title">Heading</h1>
            <figure><p class="content">Inside figure</p></figure>
            <p class="content">Paragraph 1</p>
            <p class="content lead">Paragraph 2</p>
            <a href="https://example.com">Link</a>
        </body>
        </html>
    "#;

    #[test]
    fn test_select_elements() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let elements = doc.select("p.content").unwrap();

        assert_eq!(elements.len(), 3);
        assert_eq!(elements[1].text(), "Paragraph 1");
        assert_eq!(elements[2].text(), "Paragraph 2");
    }

    #[test]
    fn test_meta_content() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        assert_eq!(doc.meta_content("DOI"), Some("10.1000/test".to_string()));
        assert_eq!(doc.meta_content("citation_title"), None);
        assert_eq!(doc.meta_content("missing"), None);
    }

    #[test]
    fn test_element_helpers() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let paragraphs = doc.select("p").unwrap();

        assert!(paragraphs[0].has_ancestor(&["figure", "table"]));
        assert!(!paragraphs[1].has_ancestor(&["figure", "table"]));
        assert!(paragraphs[2].has_class("lead"));
        assert_eq!(paragraphs[2].tag_name(), "p");
    }

    #[test]
    fn test_child_elements_and_find() {
        let doc = Document::parse("<div><span>a</span>text<em class=\"x\">b</em></div>").unwrap();
        let div = doc.select_first("div").unwrap().unwrap();
        let children = div.child_elements();

        assert_eq!(children.len(), 2);
        assert_eq!(children[1].tag_name(), "em");
        assert_eq!(div.find_descendant(|el| el.has_class("x")).unwrap().text(), "b");
        assert!(div.find_descendant(|el| el.has_class("y")).is_none());
    }

    #[test]
    fn test_invalid_selector() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let result = doc.select("[[invalid");

        assert!(matches!(result, Err(PrismError::HtmlParseError(_))));
    }

    #[test]
    fn test_parse_with_preprocessing_resolves_links() {
        let config = PreprocessConfig {
            base_url: Some(Url::parse("https://www.nature.com/articles/").unwrap()),
            ..Default::default()
        };
        let doc = Document::parse_with_preprocessing(
            r##"<p><a href="s41586">Next</a><a href="#Sec2">Methods</a></p><script>x()</script>"##,
            &config,
        )
        .unwrap();

        let links = doc.select("a").unwrap();
        assert_eq!(links[0].attr("href"), Some("https://www.nature.com/articles/s41586"));
        assert_eq!(links[1].attr("href"), Some("#Sec2"));
        assert!(doc.select("script").unwrap().is_empty());
    }
}
