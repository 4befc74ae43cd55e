//! Article extraction from JATS XML records.
//!
//! JATS is schema-driven, so unlike the HTML parser this walker follows the
//! element vocabulary directly: `front/article-meta` for metadata, `body/sec`
//! for the section tree, and `fig`/`table-wrap` anywhere in the article.
//! Formulas are converted to LaTeX through [`crate::mathml`].
//!
//! # Example
//!
//! ```rust
//! use prism_core::JatsParser;
//!
//! let xml = r#"<article><front><article-meta>
//!     <title-group><article-title>Tidal mixing</article-title></title-group>
//! </article-meta></front>
//! <body><sec><title>Intro</title><p>Mixing is strong<xref ref-type="bibr" rid="B1">1</xref>.</p></sec></body>
//! </article>"#;
//!
//! let article = JatsParser::new().parse(xml).unwrap();
//! assert_eq!(article.title, "Tidal mixing");
//! assert_eq!(article.sections[0].content, "Mixing is strong.");
//! ```

use crate::article::{Article, Figure, IdSequence, MAX_SECTION_LEVEL, Section, Table, UNTITLED};
use crate::mathml::element_to_latex;
use crate::normalize::{collapse_whitespace, link_to_markdown, normalize};
use crate::reader::ArticleParser;
use crate::xml_tree::{XmlElement, XmlNode, parse_tree};
use crate::Result;

/// Delimiters around a math placeholder while prose is normalized.
const MATH_OPEN: char = '\u{E000}';
const MATH_CLOSE: char = '\u{E001}';

/// JATS elements the walker dispatches on, keyed by local name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JatsTag {
    Title,
    Sec,
    P,
    List,
    ListItem,
    Fig,
    TableWrap,
    DispFormula,
    InlineFormula,
    Xref,
    ExtLink,
    Uri,
    Other,
}

impl From<&str> for JatsTag {
    fn from(name: &str) -> Self {
        match name {
            "title" => JatsTag::Title,
            "sec" => JatsTag::Sec,
            "p" => JatsTag::P,
            "list" => JatsTag::List,
            "list-item" => JatsTag::ListItem,
            "fig" => JatsTag::Fig,
            "table-wrap" => JatsTag::TableWrap,
            "disp-formula" => JatsTag::DispFormula,
            "inline-formula" => JatsTag::InlineFormula,
            "xref" => JatsTag::Xref,
            "ext-link" => JatsTag::ExtLink,
            "uri" => JatsTag::Uri,
            _ => JatsTag::Other,
        }
    }
}

fn tag(el: &XmlElement) -> JatsTag {
    JatsTag::from(el.local_name())
}

/// Parser for JATS (PubMed Central style) XML articles.
#[derive(Debug, Clone, Copy, Default)]
pub struct JatsParser;

impl JatsParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses a JATS document into an [`Article`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::PrismError::MalformedDocument`] when the input is not
    /// well-formed XML. Missing metadata never fails the parse.
    pub fn parse(&self, xml: &str) -> Result<Article> {
        let root = parse_tree(xml)?;
        let article_el = if root.is("article") { &root } else { root.find("article").unwrap_or(&root) };

        let meta = article_el.child("front").and_then(|front| front.child("article-meta"));

        let article = Article {
            title: title(meta),
            doi: doi(meta.unwrap_or(article_el)),
            abstract_text: meta.map(abstract_text).unwrap_or_default(),
            sections: article_el.child("body").map(body_sections).unwrap_or_default(),
            figures: figures(article_el),
            tables: tables(article_el),
            supplementary: Vec::new(),
        };

        let supplementary = article_el.descendants_named("supplementary-material").len();
        if supplementary > 0 {
            tracing::debug!(count = supplementary, "not loading supplementary material");
        }

        tracing::debug!(
            title = %article.title,
            sections = article.sections.len(),
            figures = article.figures.len(),
            tables = article.tables.len(),
            "parsed JATS article"
        );

        Ok(article)
    }
}

impl ArticleParser for JatsParser {
    fn parse(&self, input: &str) -> Result<Article> {
        JatsParser::parse(self, input)
    }
}

fn title(meta: Option<&XmlElement>) -> String {
    let title = meta
        .and_then(|m| m.child_or_find("title-group"))
        .and_then(|group| group.child_or_find("article-title"))
        .map(|el| collapse_whitespace(&el.text()))
        .unwrap_or_default();

    if title.is_empty() {
        tracing::warn!("no article title found in XML, using \"{}\"", UNTITLED);
        return UNTITLED.to_string();
    }
    title
}

fn doi(scope: &XmlElement) -> Option<String> {
    scope
        .descendants_named("article-id")
        .into_iter()
        .filter(|id| id.attr("pub-id-type") == Some("doi"))
        .map(|id| id.text().trim().to_string())
        .find(|doi| !doi.is_empty())
}

fn abstract_text(meta: &XmlElement) -> String {
    let Some(abstract_el) = meta
        .children_named("abstract")
        .find(|a| a.attr("abstract-type").is_none())
        .or_else(|| meta.child("abstract"))
    else {
        return String::new();
    };

    let mut parts = Vec::new();
    for child in abstract_el.elements() {
        match tag(child) {
            JatsTag::P => parts.push(paragraph(child)),
            JatsTag::Sec => {
                parts.extend(child.child("title").map(|t| collapse_whitespace(&t.text())));
                parts.extend(child.children_named("p").map(paragraph));
            }
            _ => {}
        }
    }

    join_blocks(parts)
}

fn body_sections(body: &XmlElement) -> Vec<Section> {
    body.children_named("sec")
        .filter(|sec| match sec.attr("disp-level").map(str::trim) {
            Some(level) if !level.is_empty() && level.bytes().all(|b| b.is_ascii_digit()) => level == "1",
            _ => true,
        })
        .map(|sec| parse_sec(sec, 1))
        .collect()
}

/// Builds a Section from a `sec` element. Nested `sec` elements become
/// children one level down; at the deepest level they are folded into the
/// content instead.
fn parse_sec(sec: &XmlElement, level: u8) -> Section {
    let title = sec.child("title").map(|t| collapse_whitespace(&t.text())).unwrap_or_default();
    let mut parts = Vec::new();
    let mut children = Vec::new();

    for child in sec.elements() {
        match tag(child) {
            JatsTag::Sec if level < MAX_SECTION_LEVEL => children.push(parse_sec(child, level + 1)),
            JatsTag::Sec => {
                let folded = parse_sec(child, level);
                parts.push(join_blocks(vec![folded.title, folded.content]));
            }
            JatsTag::P => parts.push(paragraph(child)),
            JatsTag::List => parts.push(list(child)),
            JatsTag::DispFormula => parts.extend(formula_latex(child).map(|latex| format!("$${latex}$$"))),
            JatsTag::InlineFormula => parts.extend(formula_latex(child).map(|latex| format!("${latex}$"))),
            // figures and tables are collected over the whole article
            JatsTag::Fig | JatsTag::TableWrap | JatsTag::Title => {}
            _ => {}
        }
    }

    Section { title, level, content: join_blocks(parts), sections: children }
}

fn list(list_el: &XmlElement) -> String {
    list_el
        .children_named("list-item")
        .map(paragraph)
        .filter(|item| !item.is_empty())
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prose with math spans set aside so normalization cannot touch them.
#[derive(Default)]
struct Prose {
    text: String,
    math: Vec<String>,
}

impl Prose {
    fn push_math(&mut self, span: String) {
        self.text.push(MATH_OPEN);
        self.text.push_str(&self.math.len().to_string());
        self.text.push(MATH_CLOSE);
        self.math.push(span);
    }

    fn finish(self) -> String {
        let mut text = normalize(&collapse_whitespace(&self.text));
        for (i, span) in self.math.iter().enumerate() {
            text = text.replace(&format!("{MATH_OPEN}{i}{MATH_CLOSE}"), span);
        }
        text
    }
}

/// Flattens a paragraph-like element: bibliography cross-references are
/// dropped, links become Markdown and formulas become LaTeX spans.
fn paragraph(el: &XmlElement) -> String {
    let mut prose = Prose::default();
    push_prose(el, &mut prose);
    prose.finish()
}

fn push_prose(el: &XmlElement, prose: &mut Prose) {
    for node in &el.children {
        let child = match node {
            XmlNode::Text(text) => {
                prose.text.push_str(text);
                continue;
            }
            XmlNode::Element(child) => child,
        };

        match tag(child) {
            JatsTag::Xref if child.attr("ref-type") == Some("bibr") => {}
            JatsTag::ExtLink | JatsTag::Uri => {
                let text = collapse_whitespace(&child.text());
                let href = match child.attr("href") {
                    Some(href) => href,
                    None if tag(child) == JatsTag::Uri => text.as_str(),
                    None => "",
                };
                prose.text.push_str(&link_to_markdown(href, &text));
            }
            JatsTag::InlineFormula => {
                if let Some(latex) = formula_latex(child) {
                    prose.push_math(format!("${latex}$"));
                }
            }
            JatsTag::DispFormula => {
                if let Some(latex) = formula_latex(child) {
                    prose.push_math(format!("$${latex}$$"));
                }
            }
            JatsTag::P | JatsTag::ListItem => {
                prose.text.push(' ');
                push_prose(child, prose);
                prose.text.push(' ');
            }
            _ => push_prose(child, prose),
        }
    }
}

/// LaTeX for a formula element, from MathML when present and otherwise from
/// a `tex-math` alternative.
fn formula_latex(formula: &XmlElement) -> Option<String> {
    formula
        .find("math")
        .map(element_to_latex)
        .filter(|latex| !latex.is_empty())
        .or_else(|| formula.find("tex-math").map(|tex| strip_tex_wrapper(&tex.text())))
        .filter(|latex| !latex.is_empty())
}

/// Strips a LaTeX document wrapper and surrounding `$` from `tex-math` text.
fn strip_tex_wrapper(tex: &str) -> String {
    let body = match tex.split_once("\\begin{document}") {
        Some((_, rest)) => rest.split_once("\\end{document}").map_or(rest, |(inner, _)| inner),
        None => tex,
    };
    body.trim().trim_matches('$').trim().to_string()
}

fn caption_text(caption: &XmlElement) -> String {
    let mut parts: Vec<String> = caption.child("title").map(|t| collapse_whitespace(&t.text())).into_iter().collect();
    parts.extend(caption.children_named("p").map(paragraph));
    join_blocks(parts)
}

fn label_text(el: &XmlElement) -> String {
    el.child("label").map(|l| collapse_whitespace(&l.text())).unwrap_or_default()
}

fn figures(article: &XmlElement) -> Vec<Figure> {
    let mut ids = IdSequence::figures();

    article
        .descendants_named("fig")
        .into_iter()
        .filter_map(|fig| {
            let label = label_text(fig);
            let caption = fig.child("caption").map(caption_text).unwrap_or_default();
            if label.is_empty() && caption.is_empty() {
                return None;
            }
            Some(Figure { id: ids.next(fig.attr("id")), label, caption })
        })
        .collect()
}

fn tables(article: &XmlElement) -> Vec<Table> {
    let mut ids = IdSequence::tables();

    article
        .descendants_named("table-wrap")
        .into_iter()
        .map(|wrap| {
            let data = wrap
                .child_or_find("table")
                .map(|table| {
                    table
                        .descendants_named("tr")
                        .into_iter()
                        .map(|tr| {
                            tr.elements()
                                .filter(|cell| cell.is("th") || cell.is("td"))
                                .map(|cell| collapse_whitespace(&cell.text()))
                                .collect::<Vec<_>>()
                        })
                        .filter(|row| !row.is_empty())
                        .collect()
                })
                .unwrap_or_default();

            Table {
                id: ids.next(wrap.attr("id")),
                label: label_text(wrap),
                caption: wrap.child("caption").map(caption_text).unwrap_or_default(),
                data,
            }
        })
        .collect()
}

/// Joins non-blank blocks with a blank line.
fn join_blocks(parts: Vec<String>) -> String {
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect::<Vec<_>>().join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PrismError;

    fn article(front: &str, body: &str, back: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE article PUBLIC "-//NLM//DTD JATS (Z39.96) Journal Archiving and Interchange DTD v1.2 20190208//EN" "JATS-archivearticle1.dtd">
<article xmlns:mml="http://www.w3.org/1998/Math/MathML" xmlns:xlink="http://www.w3.org/1999/xlink" article-type="research-article">
<front><article-meta>{front}</article-meta></front>
<body>{body}</body>
<back>{back}</back>
</article>"#
        )
    }

    fn parse_body(body: &str) -> Article {
        JatsParser::new().parse(&article("", body, "")).unwrap()
    }

    #[test]
    fn test_metadata() {
        let front = r#"
            <article-id pub-id-type="pmid">12345</article-id>
            <article-id pub-id-type="doi"> 10.1371/journal.pone.0001 </article-id>
            <title-group><article-title>Ocean <italic>heat</italic>
                content</article-title></title-group>
            <abstract abstract-type="graphical"><p>Graphical.</p></abstract>
            <abstract><p>First finding [1].</p><p>Second finding.</p></abstract>
        "#;

        let parsed = JatsParser::new().parse(&article(front, "", "")).unwrap();
        assert_eq!(parsed.title, "Ocean heat content");
        assert_eq!(parsed.doi.as_deref(), Some("10.1371/journal.pone.0001"));
        assert_eq!(parsed.abstract_text, "First finding.\n\nSecond finding.");
    }

    #[test]
    fn test_structured_abstract() {
        let front = r#"<abstract>
            <sec><title>Background</title><p>Why.</p></sec>
            <sec><title>Results</title><p>What.</p></sec>
        </abstract>"#;

        let parsed = JatsParser::new().parse(&article(front, "", "")).unwrap();
        assert_eq!(parsed.abstract_text, "Background\n\nWhy.\n\nResults\n\nWhat.");
    }

    #[test]
    fn test_missing_metadata_defaults() {
        let parsed = JatsParser::new().parse("<article><body/></article>").unwrap();
        assert_eq!(parsed.title, UNTITLED);
        assert!(parsed.doi.is_none());
        assert_eq!(parsed.abstract_text, "");
        assert!(parsed.sections.is_empty());
    }

    #[test]
    fn test_bibr_xref_removed_period_kept() {
        let parsed = parse_body(
            r#"<sec><title>Introduction</title>
               <p>Warming is accelerating <xref ref-type="bibr" rid="B1">1</xref>.</p></sec>"#,
        );
        assert_eq!(parsed.sections[0].content, "Warming is accelerating.");
    }

    #[test]
    fn test_non_bibliography_xref_keeps_text() {
        let parsed = parse_body(r#"<sec><p>As shown in <xref ref-type="fig" rid="F1">Fig. 1</xref>.</p></sec>"#);
        assert_eq!(parsed.sections[0].content, "As shown in Fig. 1.");
    }

    #[test]
    fn test_links() {
        let parsed = parse_body(
            r##"<sec><p>Code at <ext-link ext-link-type="uri" xlink:href="https://github.com/x/y">the repository</ext-link>,
               data at <uri>https://zenodo.org/1</uri> and <ext-link xlink:href="#S2">Methods</ext-link>.</p></sec>"##,
        );
        assert_eq!(
            parsed.sections[0].content,
            "Code at [the repository](https://github.com/x/y), data at [https://zenodo.org/1](https://zenodo.org/1) and Methods."
        );
    }

    #[test]
    fn test_ext_link_without_href_keeps_text() {
        let parsed = parse_body(
            r#"<sec><p>See <ext-link ext-link-type="uri">Supplementary data</ext-link> and <uri>https://zenodo.org/2</uri>.</p></sec>"#,
        );
        assert_eq!(
            parsed.sections[0].content,
            "See Supplementary data and [https://zenodo.org/2](https://zenodo.org/2)."
        );
    }

    #[test]
    fn test_section_nesting_and_levels() {
        let parsed = parse_body(
            r#"<sec id="s1"><title>Methods</title><p>Overview.</p>
                 <sec><title>Sampling</title><p>Weekly.</p>
                   <sec><title>Sites</title><p>Three sites.</p>
                     <sec><title>Site A</title><p>Shallow.</p></sec>
                   </sec>
                 </sec>
               </sec>
               <sec disp-level="2"><title>Stray</title></sec>
               <sec disp-level="x"><title>Results</title></sec>"#,
        );

        let titles: Vec<&str> = parsed.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Methods", "Results"]);

        let sites = &parsed.sections[0].sections[0].sections[0];
        assert_eq!(sites.level, 3);
        assert!(sites.sections.is_empty());
        assert_eq!(sites.content, "Three sites.\n\nSite A\n\nShallow.");
        assert!(parsed.is_well_formed());
    }

    #[test]
    fn test_formulas_and_lists() {
        let parsed = parse_body(
            r#"<sec><title>Model</title>
               <p>Energy <inline-formula><mml:math><mml:msup><mml:mi>x</mml:mi><mml:mn>2</mml:mn></mml:msup></mml:math></inline-formula> grows [2].</p>
               <disp-formula id="E1"><mml:math display="block"><mml:mfrac><mml:mn>1</mml:mn><mml:mn>2</mml:mn></mml:mfrac></mml:math></disp-formula>
               <disp-formula><tex-math><![CDATA[\documentclass{article}\begin{document}$\alpha$\end{document}]]></tex-math></disp-formula>
               <disp-formula><mml:math><broken/></mml:math></disp-formula>
               <list list-type="bullet"><list-item><p>First</p></list-item><list-item><p>Second [3]</p></list-item></list>
               </sec>"#,
        );

        assert_eq!(
            parsed.sections[0].content,
            "Energy ${x}^{2}$ grows.\n\n$$\\frac{1}{2}$$\n\n$$\\alpha$$\n\n- First\n- Second"
        );
    }

    #[test]
    fn test_math_span_survives_normalization() {
        let parsed = parse_body(
            r#"<sec><p>Bracket <inline-formula><math><mo>[</mo><mn>1</mn><mo>]</mo></math></inline-formula> holds [5].</p></sec>"#,
        );
        assert_eq!(parsed.sections[0].content, "Bracket $[1]$ holds.");
    }

    #[test]
    fn test_figures_and_tables() {
        let body = r#"<sec><title>Results</title>
            <fig id="fig1"><label>Figure 1</label><caption><title>Growth.</title><p>Rates by site [4].</p></caption></fig>
            <fig><graphic xlink:href="x.tif"/></fig>
            <fig><caption><p>Unlabelled.</p></caption></fig>
            <table-wrap id="tab1"><label>Table 1</label><caption><p>Sites.</p></caption>
              <table><thead><tr><th>Site</th><th>Depth</th></tr></thead>
              <tbody><tr><td>A</td><td>10</td></tr><tr/></tbody></table></table-wrap>
            <table-wrap><table><tr><td>only</td></tr></table></table-wrap>
        </sec>"#;

        let parsed = parse_body(body);
        assert_eq!(parsed.figures.len(), 2);
        assert_eq!(parsed.figures[0].id, "fig1");
        assert_eq!(parsed.figures[0].label, "Figure 1");
        assert_eq!(parsed.figures[0].caption, "Growth.\n\nRates by site.");
        assert_eq!(parsed.figures[1].id, "F2");

        assert_eq!(parsed.tables.len(), 2);
        assert_eq!(parsed.tables[0].id, "tab1");
        assert_eq!(parsed.tables[0].caption, "Sites.");
        assert_eq!(parsed.tables[0].data, vec![vec!["Site", "Depth"], vec!["A", "10"]]);
        assert_eq!(parsed.tables[1].id, "T2");
        assert_eq!(parsed.tables[1].data, vec![vec!["only"]]);

        assert!(!parsed.sections[0].content.contains("Growth"));
    }

    #[test]
    fn test_supplementary_always_empty() {
        let back = r#"<sec><supplementary-material id="S1"><label>S1 File</label></supplementary-material></sec>"#;
        let parsed = JatsParser::new().parse(&article("", "", back)).unwrap();
        assert!(parsed.supplementary.is_empty());
    }

    #[test]
    fn test_wrapped_article_root() {
        let xml = r#"<pmc-articleset><article><front><article-meta><title-group>
            <article-title>Nested</article-title></title-group></article-meta></front></article></pmc-articleset>"#;
        assert_eq!(JatsParser::new().parse(xml).unwrap().title, "Nested");
    }

    #[test]
    fn test_malformed_xml() {
        let result = JatsParser::new().parse("<article><front><article-meta></front></article>");
        assert!(matches!(result, Err(PrismError::MalformedDocument(_))));

        let result = JatsParser::new().parse("not xml at all");
        assert!(matches!(result, Err(PrismError::MalformedDocument(_))));
    }

    #[test]
    fn test_deeply_nested_markup_is_malformed() {
        let body = format!(
            "<sec><title>Deep</title><p>{}x{}</p></sec>",
            "<italic>".repeat(10_000),
            "</italic>".repeat(10_000)
        );
        let result = JatsParser::new().parse(&article("", &body, ""));
        assert!(matches!(result, Err(PrismError::MalformedDocument(_))));
    }

    #[test]
    fn test_strip_tex_wrapper() {
        assert_eq!(strip_tex_wrapper("$x+1$"), "x+1");
        assert_eq!(strip_tex_wrapper("\\begin{document}$$y$$\\end{document}"), "y");
        assert_eq!(strip_tex_wrapper("  "), "");
    }
}
