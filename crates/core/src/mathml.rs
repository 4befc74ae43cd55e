//! MathML to LaTeX conversion.
//!
//! A recursive transducer over the element tree from [`crate::xml_tree`].
//! Element names are matched on their local part, so namespace prefixes such
//! as `mml:` make no difference. Elements outside the supported set are
//! transparent: they render as the concatenation of their children.
//!
//! Conversion never fails. [`mathml_to_latex`] returns an empty string for
//! input that does not parse, so one bad formula cannot sink a document.
//!
//! # Example
//!
//! ```rust
//! use prism_core::mathml::mathml_to_latex;
//!
//! let latex = mathml_to_latex("<math><mfrac><mn>1</mn><mn>2</mn></mfrac></math>");
//! assert_eq!(latex, r"\frac{1}{2}");
//! ```

use crate::xml_tree::{XmlElement, parse_tree};

/// MathML elements with dedicated productions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MathTag {
    Math,
    Mrow,
    Mi,
    Mn,
    Mo,
    Msup,
    Msub,
    Msubsup,
    Mfrac,
    Msqrt,
    Mroot,
    Mover,
    Munder,
    Munderover,
    Mtable,
    Mtr,
    Mtd,
    Mfenced,
    Mtext,
    Mspace,
    Annotation,
    Other,
}

impl From<&str> for MathTag {
    fn from(name: &str) -> Self {
        match name {
            "math" => MathTag::Math,
            "mrow" => MathTag::Mrow,
            "mi" => MathTag::Mi,
            "mn" => MathTag::Mn,
            "mo" => MathTag::Mo,
            "msup" => MathTag::Msup,
            "msub" => MathTag::Msub,
            "msubsup" => MathTag::Msubsup,
            "mfrac" => MathTag::Mfrac,
            "msqrt" => MathTag::Msqrt,
            "mroot" => MathTag::Mroot,
            "mover" => MathTag::Mover,
            "munder" => MathTag::Munder,
            "munderover" => MathTag::Munderover,
            "mtable" => MathTag::Mtable,
            "mtr" => MathTag::Mtr,
            "mtd" => MathTag::Mtd,
            "mfenced" => MathTag::Mfenced,
            "mtext" => MathTag::Mtext,
            "mspace" => MathTag::Mspace,
            "annotation" | "annotation-xml" => MathTag::Annotation,
            _ => MathTag::Other,
        }
    }
}

/// Parses MathML source and converts it to LaTeX.
///
/// Returns an empty string when the source is blank or not well-formed XML.
pub fn mathml_to_latex(source: &str) -> String {
    if source.trim().is_empty() {
        return String::new();
    }

    match parse_tree(source) {
        Ok(root) => element_to_latex(&root),
        Err(e) => {
            tracing::debug!(error = %e, "dropping unparseable MathML");
            String::new()
        }
    }
}

/// Converts an already-parsed MathML element to trimmed LaTeX.
pub fn element_to_latex(el: &XmlElement) -> String {
    convert(el).trim().to_string()
}

fn convert(el: &XmlElement) -> String {
    let children: Vec<&XmlElement> = el.elements().collect();
    let arg = |i: usize| children.get(i).map(|c| convert(c)).unwrap_or_default();

    match MathTag::from(el.local_name()) {
        MathTag::Math => concat(&children).trim().to_string(),
        MathTag::Mrow | MathTag::Mtr | MathTag::Mtd => concat(&children),
        MathTag::Mi => identifier(el.text().trim()),
        MathTag::Mn => el.text().trim().to_string(),
        MathTag::Mo => operator(el.text().trim()),
        MathTag::Msup => format!("{{{}}}^{{{}}}", arg(0), arg(1)),
        MathTag::Msub => format!("{{{}}}_{{{}}}", arg(0), arg(1)),
        MathTag::Msubsup => format!("{{{}}}_{{{}}}^{{{}}}", arg(0), arg(1), arg(2)),
        MathTag::Mfrac => format!("\\frac{{{}}}{{{}}}", arg(0), arg(1)),
        MathTag::Msqrt => format!("\\sqrt{{{}}}", concat(&children)),
        MathTag::Mroot => {
            let index = children.get(1).map(|c| convert(c)).unwrap_or_else(|| "2".to_string());
            format!("\\sqrt[{}]{{{}}}", index, arg(0))
        }
        MathTag::Mover => {
            let (base, accent) = (arg(0), arg(1));
            if matches!(accent.as_str(), "-" | "\u{af}" | "\u{203e}") {
                format!("\\overline{{{}}}", base)
            } else {
                format!("\\overset{{{}}}{{{}}}", accent, base)
            }
        }
        MathTag::Munder => format!("\\underset{{{}}}{{{}}}", arg(1), arg(0)),
        MathTag::Munderover => {
            format!("\\underset{{{}}}{{\\overset{{{}}}{{{}}}}}", arg(1), arg(2), arg(0))
        }
        MathTag::Mtable => table(el),
        MathTag::Mfenced => {
            let open = el.attr("open").unwrap_or("(");
            let close = el.attr("close").unwrap_or(")");
            let body: Vec<String> = children.iter().map(|c| convert(c)).collect();
            format!("{}{}{}", open, body.join(","), close)
        }
        MathTag::Mtext => match el.text().trim() {
            "" => String::new(),
            text => format!("\\text{{{}}}", text),
        },
        MathTag::Mspace => space(el.attr("width").unwrap_or_default()).to_string(),
        MathTag::Annotation => String::new(),
        MathTag::Other => concat(&children),
    }
}

fn concat(children: &[&XmlElement]) -> String {
    children.iter().map(|c| convert(c)).collect()
}

fn identifier(name: &str) -> String {
    match name.chars().count() {
        0 => String::new(),
        1 => name.to_string(),
        _ => format!("\\{} ", name),
    }
}

fn operator(op: &str) -> String {
    let mapped = match op {
        "\u{2212}" => "-",
        "×" => "\\times ",
        "÷" => "\\div ",
        "≤" | "⩽" => "\\leq ",
        "≥" | "⩾" => "\\geq ",
        "≠" => "\\neq ",
        "±" => "\\pm ",
        "∓" => "\\mp ",
        "∈" => "\\in ",
        "∉" => "\\notin ",
        "⊂" => "\\subset ",
        "⊃" => "\\supset ",
        "⊆" => "\\subseteq ",
        "⊇" => "\\supseteq ",
        "∪" => "\\cup ",
        "∩" => "\\cap ",
        "∞" => "\\infty ",
        "∑" => "\\sum ",
        "∏" => "\\prod ",
        "∫" => "\\int ",
        "→" => "\\rightarrow ",
        "←" => "\\leftarrow ",
        "↔" => "\\leftrightarrow ",
        "⇒" => "\\Rightarrow ",
        "⇐" => "\\Leftarrow ",
        "⇔" => "\\Leftrightarrow ",
        "⋅" | "·" => "\\cdot ",
        "≈" => "\\approx ",
        "∼" => "\\sim ",
        "≡" => "\\equiv ",
        "∝" => "\\propto ",
        "∂" => "\\partial ",
        "∇" => "\\nabla ",
        // ASCII operators and unmapped symbols pass through
        other => other,
    };
    mapped.to_string()
}

fn table(el: &XmlElement) -> String {
    let mut rows: Vec<&XmlElement> = el.children_named("mtr").collect();
    if rows.is_empty() {
        rows = el.descendants_named("mtr");
    }

    let rendered: Vec<String> = rows
        .iter()
        .filter_map(|row| {
            let cells: Vec<String> = row.children_named("mtd").map(convert).collect();
            if cells.is_empty() { None } else { Some(cells.join(" & ")) }
        })
        .collect();

    if rendered.is_empty() {
        return "[table]".to_string();
    }

    format!("\\begin{{matrix}}{}\\end{{matrix}}", rendered.join(" \\\\ "))
}

fn space(width: &str) -> &'static str {
    if width.contains("thin") || matches!(width, "0.167em" | "3pt") {
        "\\,"
    } else if width.contains("medium") || matches!(width, "0.222em" | "4pt") {
        "\\:"
    } else if width.contains("thick") || matches!(width, "0.278em" | "5pt") {
        "\\;"
    } else if width.contains("1em") {
        "\\quad "
    } else if width.contains("2em") {
        "\\qquad "
    } else {
        " "
    }
}
