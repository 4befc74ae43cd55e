use serde::Serialize;

use crate::Result;
use crate::article::{Article, Section, Supplementary, Table};

/// Configuration for JSON output
#[derive(Debug, Clone)]
pub struct JsonConfig {
    /// Pretty print JSON output
    pub pretty: bool,
    /// Include the `figures` array
    pub include_figures: bool,
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self { pretty: true, include_figures: true }
    }
}

/// Article fields in output order, without figures.
#[derive(Serialize)]
struct WithoutFigures<'a> {
    title: &'a str,
    doi: Option<&'a str>,
    #[serde(rename = "abstract")]
    abstract_text: &'a str,
    sections: &'a [Section],
    tables: &'a [Table],
    supplementary: &'a [Supplementary],
}

impl<'a> From<&'a Article> for WithoutFigures<'a> {
    fn from(article: &'a Article) -> Self {
        Self {
            title: &article.title,
            doi: article.doi.as_deref(),
            abstract_text: &article.abstract_text,
            sections: &article.sections,
            tables: &article.tables,
            supplementary: &article.supplementary,
        }
    }
}

fn to_string<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    if pretty { Ok(serde_json::to_string_pretty(value)?) } else { Ok(serde_json::to_string(value)?) }
}

/// Convert an article to JSON
pub fn convert_to_json(article: &Article, config: &JsonConfig) -> Result<String> {
    if config.include_figures {
        to_string(article, config.pretty)
    } else {
        to_string(&WithoutFigures::from(article), config.pretty)
    }
}

/// JSON formatter with configurable options
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    config: JsonConfig,
}

impl JsonFormatter {
    pub fn new(config: JsonConfig) -> Self {
        Self { config }
    }

    pub fn format(&self, article: &Article) -> Result<String> {
        convert_to_json(article, &self.config)
    }
}
