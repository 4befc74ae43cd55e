//! Parser selection and the main conversion API.
//!
//! [`Reader`] owns one parser per input format and dispatches on
//! [`InputFormat`]. The free functions [`parse_html`], [`parse_xml`] and
//! [`parse`] cover the common one-liner cases with default configuration.
//!
//! # Example
//!
//! ```rust
//! use prism_core::{InputFormat, Reader};
//!
//! let xml = "<article><front><article-meta><title-group>\
//!            <article-title>Kelp forests</article-title>\
//!            </title-group></article-meta></front></article>";
//!
//! let article = Reader::new().parse(xml, InputFormat::Xml).unwrap();
//! assert_eq!(article.title, "Kelp forests");
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::article::Article;
use crate::html::{HtmlConfig, HtmlParser};
use crate::input::read_file;
use crate::jats::JatsParser;
use crate::{PrismError, Result};

/// A parser that turns raw document text into an [`Article`].
///
/// Implementations are stateless between calls, so one instance can be
/// shared across threads.
pub trait ArticleParser: Send + Sync {
    fn parse(&self, input: &str) -> Result<Article>;
}

/// Source document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputFormat {
    /// Journal article HTML page.
    Html,
    /// JATS XML record.
    Xml,
}

impl InputFormat {
    /// Detects the format from a file extension (`.html`/`.htm` or
    /// `.xml`/`.nxml`, any case).
    ///
    /// # Errors
    ///
    /// Returns [`PrismError::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "html" | "htm" => Ok(InputFormat::Html),
            "xml" | "nxml" => Ok(InputFormat::Xml),
            _ => Err(PrismError::UnsupportedFormat(format!(
                "cannot detect input format of '{}'",
                path.display()
            ))),
        }
    }

    /// Whether the path has an extension this crate can read.
    pub fn is_supported(path: impl AsRef<Path>) -> bool {
        Self::from_path(path).is_ok()
    }
}

impl FromStr for InputFormat {
    type Err = PrismError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" | "htm" => Ok(InputFormat::Html),
            "xml" | "jats" => Ok(InputFormat::Xml),
            other => Err(PrismError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::Html => write!(f, "html"),
            InputFormat::Xml => write!(f, "xml"),
        }
    }
}

/// Dispatches documents to the parser for their format.
///
/// # Example
///
/// ```rust
/// use prism_core::{HtmlConfig, Reader};
///
/// let config = HtmlConfig::builder().end_title("Author information").build();
/// let reader = Reader::with_html_config(config);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Reader {
    html: HtmlParser,
    jats: JatsParser,
}

impl Reader {
    /// Creates a reader with default parser configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reader whose HTML parser uses `config`.
    pub fn with_html_config(config: HtmlConfig) -> Self {
        Self { html: HtmlParser::with_config(config), jats: JatsParser::new() }
    }

    /// The parser used for `format`.
    pub fn parser(&self, format: InputFormat) -> &dyn ArticleParser {
        match format {
            InputFormat::Html => &self.html,
            InputFormat::Xml => &self.jats,
        }
    }

    /// Parses `input` as `format`.
    ///
    /// # Errors
    ///
    /// Returns [`PrismError::MalformedDocument`] for XML that is not
    /// well-formed, and configuration errors from the HTML parser.
    pub fn parse(&self, input: &str, format: InputFormat) -> Result<Article> {
        self.parser(format).parse(input)
    }

    /// Reads a file and parses it with the format detected from its
    /// extension.
    ///
    /// # Errors
    ///
    /// Returns [`PrismError::UnsupportedFormat`] for an unknown extension,
    /// [`PrismError::FileNotFound`] or [`PrismError::Io`] when the file
    /// cannot be read, and any parse error.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Article> {
        let path = path.as_ref();
        let format = InputFormat::from_path(path)?;
        let input = read_file(path)?;
        self.parse(&input, format)
    }
}

/// Parses a journal HTML page with the default configuration.
///
/// # Example
///
/// ```rust
/// use prism_core::parse_html;
///
/// let article = parse_html("<h1 class=\"c-article-title\">Plankton</h1>").unwrap();
/// assert_eq!(article.title, "Plankton");
/// ```
pub fn parse_html(html: &str) -> Result<Article> {
    HtmlParser::new().parse(html)
}

/// Parses a JATS XML record.
///
/// # Errors
///
/// Returns [`PrismError::MalformedDocument`] when the XML is not well-formed.
pub fn parse_xml(xml: &str) -> Result<Article> {
    JatsParser::new().parse(xml)
}

/// Parses `input` as `format` with default configuration.
pub fn parse(input: &str, format: InputFormat) -> Result<Article> {
    Reader::new().parse(input, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[rstest]
    #[case("paper.html", InputFormat::Html)]
    #[case("paper.HTM", InputFormat::Html)]
    #[case("dir/PMC123.nxml", InputFormat::Xml)]
    #[case("record.XML", InputFormat::Xml)]
    fn test_format_from_path(#[case] path: &str, #[case] expected: InputFormat) {
        assert_eq!(InputFormat::from_path(path).unwrap(), expected);
        assert!(InputFormat::is_supported(path));
    }

    #[rstest]
    #[case("paper.pdf")]
    #[case("README")]
    #[case("archive.xml.gz")]
    fn test_format_from_path_unsupported(#[case] path: &str) {
        assert!(matches!(InputFormat::from_path(path), Err(PrismError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("HTML".parse::<InputFormat>().unwrap(), InputFormat::Html);
        assert_eq!("xml".parse::<InputFormat>().unwrap(), InputFormat::Xml);
        assert!("pdf".parse::<InputFormat>().is_err());
        assert_eq!(InputFormat::Xml.to_string(), "xml");
    }

    #[test]
    fn test_reader_dispatch() {
        let reader = Reader::new();

        let html = reader
            .parse(r#"<h1 class="c-article-title">From HTML</h1>"#, InputFormat::Html)
            .unwrap();
        assert_eq!(html.title, "From HTML");

        let xml = reader.parse("<article/>", InputFormat::Xml).unwrap();
        assert_eq!(xml.title, crate::article::UNTITLED);

        assert!(reader.parse("<article>", InputFormat::Xml).is_err());
        assert!(reader.parse("<article>", InputFormat::Html).is_ok());
    }

    #[test]
    fn test_parse_file_detects_format() {
        let mut file = NamedTempFile::with_suffix(".nxml").unwrap();
        write!(
            file,
            "<article><front><article-meta><title-group><article-title>On disk</article-title></title-group></article-meta></front></article>"
        )
        .unwrap();

        let article = Reader::new().parse_file(file.path()).unwrap();
        assert_eq!(article.title, "On disk");
    }

    #[test]
    fn test_parse_file_rejects_unknown_extension() {
        let file = NamedTempFile::with_suffix(".pdf").unwrap();
        let result = Reader::new().parse_file(file.path());
        assert!(matches!(result, Err(PrismError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_parsers_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Reader>();
        assert_send_sync::<HtmlParser>();
        assert_send_sync::<JatsParser>();
    }
}
