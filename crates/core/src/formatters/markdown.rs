use crate::Result;
use crate::article::{Article, Section, Table};

/// Heading depth of a level-1 section.
const SECTION_HEADING_BASE: usize = 2;

/// Configuration for Markdown conversion
#[derive(Debug, Clone, Default)]
pub struct MarkdownConfig {
    /// Include TOML frontmatter with title and DOI
    pub include_frontmatter: bool,
}

/// Convert an article to Markdown with optional frontmatter
pub fn convert_to_markdown(article: &Article, config: &MarkdownConfig) -> Result<String> {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("# {}", article.title));
    lines.push(String::new());

    if let Some(doi) = &article.doi {
        lines.push(format!("DOI: {}", doi));
        lines.push(String::new());
    }

    if !article.abstract_text.trim().is_empty() {
        lines.push("## Abstract".to_string());
        lines.push(String::new());
        lines.push(article.abstract_text.trim().to_string());
        lines.push(String::new());
    }

    for section in &article.sections {
        push_section(section, &mut lines);
    }

    if !article.figures.is_empty() {
        lines.push("---".to_string());
        lines.push(String::new());
        for figure in &article.figures {
            lines.push(format!("**{}**: {}", label_or_id(&figure.label, &figure.id), figure.caption));
            lines.push(String::new());
        }
    }

    if !article.tables.is_empty() {
        lines.push("---".to_string());
        lines.push(String::new());
        for table in &article.tables {
            lines.push(format!("**{}**: {}", label_or_id(&table.label, &table.id), table.caption));
            lines.push(String::new());
            lines.push(pipe_table(table));
            lines.push(String::new());
        }
    }

    if !article.supplementary.is_empty() {
        lines.push("## Supplementary Materials".to_string());
        lines.push(String::new());
        for item in &article.supplementary {
            lines.push(format!("- **{}**: {}", item.label, item.description));
        }
        lines.push(String::new());
    }

    let mut output = String::new();
    if config.include_frontmatter {
        output.push_str(&generate_frontmatter(article));
        output.push('\n');
    }
    output.push_str(lines.join("\n").trim());
    output.push('\n');

    Ok(output)
}

fn push_section(section: &Section, lines: &mut Vec<String>) {
    let depth = (SECTION_HEADING_BASE + usize::from(section.level)).saturating_sub(1).min(6);

    if !section.title.is_empty() {
        lines.push(format!("{} {}", "#".repeat(depth), section.title));
        lines.push(String::new());
    }

    if !section.content.trim().is_empty() {
        lines.push(section.content.trim().to_string());
        lines.push(String::new());
    }

    for child in &section.sections {
        push_section(child, lines);
    }
}

fn label_or_id<'a>(label: &'a str, id: &'a str) -> &'a str {
    if label.is_empty() { id } else { label }
}

/// Render table rows as a pipe table; the first row is the header and the
/// other rows are padded or truncated to its width.
fn pipe_table(table: &Table) -> String {
    let Some((header, rows)) = table.data.split_first() else {
        return String::new();
    };

    let width = header.len();
    let mut out = Vec::with_capacity(table.data.len() + 1);

    out.push(format!("| {} |", header.iter().map(|c| escape_pipe(c)).collect::<Vec<_>>().join(" | ")));
    out.push(format!("|{}|", vec!["---"; width].join("|")));

    for row in rows {
        let cells: Vec<String> = (0..width)
            .map(|i| row.get(i).map(|c| escape_pipe(c)).unwrap_or_default())
            .collect();
        out.push(format!("| {} |", cells.join(" | ")));
    }

    out.join("\n")
}

/// Generate TOML frontmatter from the article
fn generate_frontmatter(article: &Article) -> String {
    let mut frontmatter = String::from("+++");

    frontmatter.push_str(&format!("\ntitle = {}", toml_escape_string(&article.title)));

    if let Some(doi) = &article.doi {
        frontmatter.push_str(&format!("\ndoi = {}", toml_escape_string(doi)));
    }

    frontmatter.push_str("\n+++\n");

    frontmatter
}

/// Escape a string for TOML format
fn toml_escape_string(s: &str) -> String {
    let needs_escape = s.contains('"') || s.contains('\\') || s.contains('\n');
    if needs_escape {
        format!(
            "\"{}\"",
            s.replace('\\', "\\\\").replace('\"', "\\\"").replace('\n', "\\n")
        )
    } else {
        format!("\"{}\"", s)
    }
}

/// Escape pipe characters for Markdown tables
fn escape_pipe(s: &str) -> String {
    s.replace('|', "\\|")
}

/// Markdown formatter with configurable options
#[derive(Debug, Clone, Default)]
pub struct MarkdownFormatter {
    config: MarkdownConfig,
}

impl MarkdownFormatter {
    pub fn new(config: MarkdownConfig) -> Self {
        Self { config }
    }

    pub fn format(&self, article: &Article) -> Result<String> {
        convert_to_markdown(article, &self.config)
    }
}
