pub mod article;
pub mod error;
pub mod formatters;
pub mod html;
pub mod input;
pub mod jats;
pub mod mathml;
pub mod normalize;
pub mod parse;
pub mod preprocess;
pub mod reader;
pub mod xml_tree;

pub use article::{Article, Figure, IdSequence, OutputFormat, Section, Supplementary, Table, UNTITLED};
pub use error::{PrismError, Result};
pub use formatters::{JsonConfig, JsonFormatter, MarkdownConfig, MarkdownFormatter};
pub use formatters::{convert_to_json, convert_to_markdown};
pub use html::{HtmlConfig, HtmlConfigBuilder, HtmlParser};
pub use input::{collect_input_files, read_file, read_stdin};
pub use jats::JatsParser;
pub use mathml::mathml_to_latex;
pub use normalize::normalize;
pub use parse::Document;
#[doc(hidden)]
pub use preprocess::PreprocessConfig;
pub use preprocess::preprocess_html;
pub use reader::{ArticleParser, InputFormat, Reader, parse, parse_html, parse_xml};
