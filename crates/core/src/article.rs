//! Article data model shared by every parser and formatter.
//!
//! This module defines the [`Article`] tree which both the HTML and the JATS
//! parsers populate and both formatters consume. The tree holds plain data
//! only: no back-references and no parser state, so values compare
//! structurally and can be moved across threads freely.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::formatters::json::{JsonConfig, convert_to_json};
use crate::formatters::markdown::{MarkdownConfig, convert_to_markdown};
use crate::{PrismError, Result};

/// Title used when the source document carries none.
pub const UNTITLED: &str = "Untitled";

/// Deepest section level an [`Article`] may contain.
pub const MAX_SECTION_LEVEL: u8 = 3;

/// Output format options for an [`Article`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (structured data).
    Json,
    /// Markdown format.
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = PrismError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(PrismError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl OutputFormat {
    /// File extension used when writing this format to disk.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Markdown => "md",
        }
    }
}

/// The structured result of parsing one scholarly article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Article title, never empty after a parse ([`UNTITLED`] when missing).
    pub title: String,

    /// DOI string, if the source declares one.
    pub doi: Option<String>,

    /// Plain-text abstract; paragraphs are separated by a blank line.
    #[serde(rename = "abstract")]
    pub abstract_text: String,

    /// Top-level sections in document order.
    pub sections: Vec<Section>,

    /// Figures in document order.
    pub figures: Vec<Figure>,

    /// Tables in document order.
    pub tables: Vec<Table>,

    /// Supplementary material entries.
    pub supplementary: Vec<Supplementary>,
}

impl Default for Article {
    fn default() -> Self {
        Self {
            title: UNTITLED.to_string(),
            doi: None,
            abstract_text: String::new(),
            sections: Vec::new(),
            figures: Vec::new(),
            tables: Vec::new(),
            supplementary: Vec::new(),
        }
    }
}

impl Article {
    /// Creates an empty article with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), ..Default::default() }
    }

    /// Returns true when every root section is level 1 and the whole tree
    /// respects the level rules of [`Section::is_well_formed`].
    pub fn is_well_formed(&self) -> bool {
        self.sections.iter().all(|s| s.level == 1 && s.is_well_formed())
    }

    /// Iterates over every section in the tree, depth first.
    pub fn all_sections(&self) -> Vec<&Section> {
        let mut out = Vec::new();
        let mut stack: Vec<&Section> = self.sections.iter().rev().collect();
        while let Some(section) = stack.pop() {
            out.push(section);
            stack.extend(section.sections.iter().rev());
        }
        out
    }

    /// Converts the article to the specified format.
    pub fn to_format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => convert_to_json(self, &JsonConfig::default()),
            OutputFormat::Markdown => self.to_markdown(),
        }
    }

    /// Renders the article as Markdown with the default configuration.
    pub fn to_markdown(&self) -> Result<String> {
        convert_to_markdown(self, &MarkdownConfig::default())
    }

    /// Renders the article as Markdown with a custom configuration.
    pub fn to_markdown_with_config(&self, config: &MarkdownConfig) -> Result<String> {
        convert_to_markdown(self, config)
    }

    /// Gets the article as structured JSON.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// A section of the article body.
///
/// Children are always exactly one level deeper than their parent and no
/// section deeper than [`MAX_SECTION_LEVEL`] has children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Section heading, possibly empty.
    pub title: String,
    /// Nesting level, 1 through 3.
    pub level: u8,
    /// Normalized prose, paragraphs joined by a blank line.
    pub content: String,
    /// Nested subsections in document order.
    pub sections: Vec<Section>,
}

impl Section {
    pub fn new(title: impl Into<String>, level: u8) -> Self {
        Self { title: title.into(), level, content: String::new(), sections: Vec::new() }
    }

    /// Sets the content, returning the section for chaining.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Checks the level rules for this section and everything below it.
    pub fn is_well_formed(&self) -> bool {
        if self.level == 0 || self.level > MAX_SECTION_LEVEL {
            return false;
        }
        if self.level == MAX_SECTION_LEVEL && !self.sections.is_empty() {
            return false;
        }
        self.sections
            .iter()
            .all(|child| child.level == self.level + 1 && child.is_well_formed())
    }
}

/// Figure metadata. Image data is never retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Figure {
    pub id: String,
    pub label: String,
    pub caption: String,
}

/// A table with its caption and cell text.
///
/// Rows are not required to have the same number of cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: String,
    pub label: String,
    pub caption: String,
    pub data: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplementary {
    pub label: String,
    pub description: String,
}

/// Sequential id generator scoped to a single parse.
///
/// Every recorded item advances the counter, whether or not the source gave
/// it an explicit id, so synthesized ids reflect the item's position.
#[derive(Debug, Clone)]
pub struct IdSequence {
    prefix: &'static str,
    count: usize,
}

impl IdSequence {
    pub fn new(prefix: &'static str) -> Self {
        Self { prefix, count: 0 }
    }

    /// Sequence for figure ids (`F1`, `F2`, ...).
    pub fn figures() -> Self {
        Self::new("F")
    }

    /// Sequence for table ids (`T1`, `T2`, ...).
    pub fn tables() -> Self {
        Self::new("T")
    }

    /// Advances the sequence and returns the explicit id when it is present
    /// and non-blank, otherwise the synthesized `<prefix><n>` id.
    pub fn next(&mut self, explicit: Option<&str>) -> String {
        self.count += 1;
        match explicit.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("{}{}", self.prefix, self.count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_article() -> Article {
        let mut results = Section::new("Results", 1).with_content("We observed growth.");
        results
            .sections
            .push(Section::new("Growth rates", 2).with_content("Rates doubled."));

        Article {
            title: "Cell growth".to_string(),
            doi: Some("10.1000/xyz".to_string()),
            abstract_text: "Short abstract.".to_string(),
            sections: vec![results],
            figures: vec![Figure { id: "F1".into(), label: "Figure 1".into(), caption: "Growth curve.".into() }],
            tables: Vec::new(),
            supplementary: Vec::new(),
        }
    }

    #[test]
    fn test_default_article_is_untitled() {
        let article = Article::default();
        assert_eq!(article.title, UNTITLED);
        assert!(article.doi.is_none());
        assert!(article.sections.is_empty());
        assert!(article.is_well_formed());
    }

    #[test]
    fn test_well_formed_tree() {
        assert!(sample_article().is_well_formed());
    }

    #[test]
    fn test_level_three_with_children_is_rejected() {
        let mut deep = Section::new("Deep", 3);
        deep.sections.push(Section::new("Deeper", 4));
        let mut mid = Section::new("Mid", 2);
        mid.sections.push(deep);
        let mut top = Section::new("Top", 1);
        top.sections.push(mid);

        assert!(!top.is_well_formed());
    }

    #[test]
    fn test_skipped_level_is_rejected() {
        let mut top = Section::new("Top", 1);
        top.sections.push(Section::new("Skipped", 3));
        assert!(!top.is_well_formed());

        let article = Article { sections: vec![Section::new("Sub", 2)], ..Default::default() };
        assert!(!article.is_well_formed());
    }

    #[test]
    fn test_all_sections_depth_first() {
        let article = sample_article();
        let titles: Vec<&str> = article.all_sections().iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Results", "Growth rates"]);
    }

    #[test]
    fn test_id_sequence_synthesizes_in_order() {
        let mut ids = IdSequence::figures();
        assert_eq!(ids.next(None), "F1");
        assert_eq!(ids.next(Some("fig-custom")), "fig-custom");
        assert_eq!(ids.next(Some("  ")), "F3");

        let mut tables = IdSequence::tables();
        assert_eq!(tables.next(None), "T1");
        assert_eq!(tables.next(None), "T2");
    }

    #[test]
    fn test_abstract_serialized_name() {
        let json = sample_article().to_json().unwrap();
        assert_eq!(json["abstract"], "Short abstract.");
        assert!(json.get("abstract_text").is_none());
        assert_eq!(json["doi"], "10.1000/xyz");
    }

    #[test]
    fn test_missing_doi_serializes_as_null() {
        let json = Article::default().to_json().unwrap();
        assert!(json["doi"].is_null());
    }

    #[test]
    fn test_serde_round_trip() {
        let article = sample_article();
        let json = serde_json::to_string(&article).unwrap();
        let back: Article = serde_json::from_str(&json).unwrap();
        assert_eq!(back, article);
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("Markdown".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!(matches!(
            "pdf".parse::<OutputFormat>(),
            Err(PrismError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_to_format_markdown() {
        let markdown = sample_article().to_format(OutputFormat::Markdown).unwrap();
        assert!(markdown.starts_with("# Cell growth\n"));
        assert!(markdown.contains("## Results"));
        assert!(markdown.contains("### Growth rates"));
    }

    #[test]
    fn test_to_format_json() {
        let json = sample_article().to_format(OutputFormat::Json).unwrap();
        assert!(json.contains(r#""title": "Cell growth""#));
    }
}
