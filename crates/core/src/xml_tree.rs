//! Owned XML element tree built from `quick-xml` events.
//!
//! The JATS parser and the MathML converter both walk XML as a tree, looking
//! elements up by namespace-stripped local name so that `mml:mfrac` and
//! `mfrac` are treated alike. [`parse_tree`] builds that tree in one pass and
//! reports syntax problems as [`PrismError::MalformedDocument`].

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::{PrismError, Result};

/// Deepest element nesting [`parse_tree`] accepts.
pub const MAX_DEPTH: usize = 256;

/// A node in the element tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An XML element with its qualified name, attributes, and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified name as written in the source (e.g. `mml:math`).
    pub name: String,
    /// Attributes in source order, values unescaped.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), attributes: Vec::new(), children: Vec::new() }
    }

    /// Name with any namespace prefix removed.
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Whether this element's local name equals `name`.
    pub fn is(&self, name: &str) -> bool {
        self.local_name() == name
    }

    /// Looks up an attribute by exact name, falling back to a match on the
    /// local part so `href` finds `xlink:href`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .or_else(|| self.attributes.iter().find(|(key, _)| local_name(key) == name))
            .map(|(_, value)| value.as_str())
    }

    /// Direct child elements, skipping text nodes.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    /// First direct child element with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.is(name))
    }

    /// Direct child elements with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |el| el.is(name))
    }

    /// First descendant (not counting `self`) with the given local name, in
    /// document order.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        for el in self.elements() {
            if el.is(name) {
                return Some(el);
            }
            if let Some(found) = el.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// Direct child with the given name, else the first such descendant.
    pub fn child_or_find(&self, name: &str) -> Option<&XmlElement> {
        self.child(name).or_else(|| self.find(name))
    }

    /// Every descendant with the given local name, in document order.
    pub fn descendants_named(&self, name: &str) -> Vec<&XmlElement> {
        let mut out = Vec::new();
        self.collect_named(name, &mut out);
        out
    }

    fn collect_named<'a>(&'a self, name: &str, out: &mut Vec<&'a XmlElement>) {
        for el in self.elements() {
            if el.is(name) {
                out.push(el);
            }
            el.collect_named(name, out);
        }
    }

    /// Concatenation of every descendant text node.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(el) => el.push_text(out),
            }
        }
    }

    fn append_text(&mut self, text: &str) {
        if let Some(XmlNode::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(XmlNode::Text(text.to_string()));
        }
    }
}

/// Extract local name from a qualified XML name (e.g. `mml:mi` -> `mi`).
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}

/// Parses XML text into its root element.
///
/// Comments, processing instructions and the DOCTYPE declaration are
/// dropped. Entity references are resolved for the predefined XML entities,
/// numeric character references and a few common typographic names; other
/// references are dropped.
///
/// # Errors
///
/// Returns [`PrismError::MalformedDocument`] for syntax errors, mismatched or
/// unclosed elements, text or elements outside the root, elements nested
/// deeper than [`MAX_DEPTH`], and input with no root element at all.
pub fn parse_tree(xml: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                ensure_single_root(&root)?;
                ensure_depth(&stack)?;
                stack.push(element_from_start(&e));
            }
            Ok(Event::Empty(e)) => {
                ensure_single_root(&root)?;
                ensure_depth(&stack)?;
                attach(element_from_start(&e), &mut stack, &mut root);
            }
            Ok(Event::End(_)) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| PrismError::MalformedDocument("unexpected closing tag".to_string()))?;
                attach(el, &mut stack, &mut root);
            }
            Ok(Event::Text(e)) => {
                let text = String::from_utf8_lossy(e.as_ref());
                push_text(&mut stack, &text)?;
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e);
                push_text(&mut stack, &text)?;
            }
            Ok(Event::GeneralRef(e)) => {
                let entity = String::from_utf8_lossy(e.as_ref());
                match resolve_entity(&entity) {
                    Some(resolved) => push_text(&mut stack, &resolved)?,
                    None => tracing::debug!(entity = %entity, "dropping unknown entity reference"),
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(PrismError::MalformedDocument(e.to_string())),
        }
    }

    if let Some(open) = stack.last() {
        return Err(PrismError::MalformedDocument(format!("unclosed element <{}>", open.name)));
    }

    root.ok_or_else(|| PrismError::MalformedDocument("no root element".to_string()))
}

fn ensure_single_root(root: &Option<XmlElement>) -> Result<()> {
    match root {
        Some(existing) => Err(PrismError::MalformedDocument(format!(
            "content after root element <{}>",
            existing.name
        ))),
        None => Ok(()),
    }
}

fn ensure_depth(stack: &[XmlElement]) -> Result<()> {
    if stack.len() >= MAX_DEPTH {
        return Err(PrismError::MalformedDocument(format!(
            "elements nested deeper than {} levels",
            MAX_DEPTH
        )));
    }
    Ok(())
}

fn attach(el: XmlElement, stack: &mut [XmlElement], root: &mut Option<XmlElement>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(el)),
        None => *root = Some(el),
    }
}

fn push_text(stack: &mut [XmlElement], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.append_text(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(PrismError::MalformedDocument("text outside the root element".to_string())),
    }
}

fn element_from_start(e: &BytesStart<'_>) -> XmlElement {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let attributes = e
        .attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let raw = String::from_utf8_lossy(&attr.value).into_owned();
            let value = match quick_xml::escape::unescape(&raw) {
                Ok(unescaped) => unescaped.into_owned(),
                Err(_) => raw,
            };
            (key, value)
        })
        .collect();

    XmlElement { name, attributes, children: Vec::new() }
}

/// Resolve XML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    let named = match entity {
        "apos" => Some('\''),
        "quot" => Some('"'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "nbsp" => Some('\u{a0}'),
        "ndash" => Some('\u{2013}'),
        "mdash" => Some('\u{2014}'),
        "hellip" => Some('\u{2026}'),
        "minus" => Some('\u{2212}'),
        "times" => Some('\u{d7}'),
        _ => None,
    };
    if let Some(c) = named {
        return Some(c.to_string());
    }

    let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()?
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok()?
    } else {
        return None;
    };

    char::from_u32(code).map(|c| c.to_string())
}
