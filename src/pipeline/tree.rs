//! Parse-tree decoding: the wiki's XML preprocessor tree → [`Element`].
//!
//! MediaWiki's `prop=parsetree` output is a small XML dialect:
//!
//! ```text
//! <root>
//!   <template>
//!     <title>Probability distribution</title>
//!     <part><name>support</name>=<value>[0,1]</value></part>
//!     <part><name>mean</name>=<value><ext><name>math</name><attr/>
//!       <inner>\mu</inner><close>&lt;/math&gt;</close></ext></value></part>
//!   </template>
//!   …
//! </root>
//! ```
//!
//! Only structure the extractor needs is kept: elements and text. Adjacent
//! character data and entity references are merged into a single
//! [`Node::Text`] run, so every maximal run of text between two elements is
//! exactly one node. Entity references are resolved here, once, against the
//! HTML5 table; entities that survive as text (`&amp;mu;` → `&mu;`) are left
//! for the inline normaliser.

use crate::pipeline::inline::decode_entity;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// Name of the synthetic element wrapping documents with several top-level nodes.
const SYNTHETIC_ROOT: &str = "root";

/// A node of the parse tree: either a text run or a nested element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Element(Element),
}

/// An element with its ordered children. Attributes are not retained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("malformed XML at byte {position}: {detail}")]
    Malformed { position: u64, detail: String },
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Builder-style helper used by tests and fixtures.
    pub fn with_child(mut self, node: Node) -> Self {
        self.children.push(node);
        self
    }

    /// Builder-style helper appending a text run.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(Node::Text(text.into()))
    }

    /// Direct child elements, in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Direct child elements with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.name == name)
    }

    pub fn first_child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Concatenated text of all descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Top-level templates of a `<root>` element, in document order.
    pub fn templates(&self) -> impl Iterator<Item = &Element> {
        self.children_named("template")
    }

    /// For an `<ext>` element: the trimmed extension name (`math`, `ref`, …).
    pub fn ext_name(&self) -> Option<String> {
        self.first_child("name").map(|n| n.text().trim().to_string())
    }

    /// For an `<ext>` element: the raw body between the opening and closing tag.
    pub fn ext_inner(&self) -> String {
        self.first_child("inner").map(Element::text).unwrap_or_default()
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(e, out),
        }
    }
}

/// Decode a parse tree.
///
/// Returns the single top-level element (normally `<root>`). When the input
/// has no or several top-level nodes they are wrapped in a synthetic `root`.
/// Elements left open at end of input are closed implicitly; mismatched end
/// tags simply close the innermost open element.
pub fn parse_tree(xml: &str) -> Result<Element, TreeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    reader.config_mut().enable_all_checks(false);

    // stack[0] is the document container; everything else is an open element.
    let mut stack: Vec<Element> = vec![Element::new(SYNTHETIC_ROOT)];
    let malformed = |reader: &Reader<&[u8]>, detail: String| TreeError::Malformed {
        position: reader.error_position() as u64,
        detail,
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                stack.push(Element::new(name));
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                current(&mut stack)
                    .children
                    .push(Node::Element(Element::new(name)));
            }
            Ok(Event::End(_)) => {
                if stack.len() > 1 {
                    close_innermost(&mut stack);
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .decode()
                    .map_err(|err| malformed(&reader, err.to_string()))?;
                current(&mut stack).push_text(&text);
            }
            Ok(Event::CData(e)) => {
                let text = e
                    .decode()
                    .map_err(|err| malformed(&reader, err.to_string()))?;
                current(&mut stack).push_text(&text);
            }
            Ok(Event::GeneralRef(e)) => {
                let name = e
                    .decode()
                    .map_err(|err| malformed(&reader, err.to_string()))?;
                let entity = format!("&{};", name);
                // Unknown entities are kept verbatim rather than failing the page.
                match decode_entity(&entity) {
                    Some(resolved) => current(&mut stack).push_text(&resolved),
                    None => current(&mut stack).push_text(&entity),
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(malformed(&reader, e.to_string())),
        }
    }

    while stack.len() > 1 {
        close_innermost(&mut stack);
    }
    let mut document = stack.pop().unwrap_or_default();

    let only_element = document.children.len() == 1
        && matches!(document.children.first(), Some(Node::Element(_)));
    if only_element {
        if let Some(Node::Element(root)) = document.children.pop() {
            return Ok(root);
        }
    }
    Ok(document)
}

fn current(stack: &mut [Element]) -> &mut Element {
    // The document container is never popped, so the stack is never empty.
    let last = stack.len() - 1;
    &mut stack[last]
}

fn close_innermost(stack: &mut Vec<Element>) {
    if let Some(done) = stack.pop() {
        current(stack).children.push(Node::Element(done));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BETA: &str = "<root>Intro <template><title>Probability distribution\n</title>\
        <part><name> support </name>=<value>[0,1]\n</value></part>\
        <part><name>mean</name>=<value><ext><name>math</name><attr/><inner>\\frac{\\alpha}{\\alpha+\\beta}</inner>\
        <close>&lt;/math&gt;</close></ext>\n</value></part></template></root>";

    #[test]
    fn parses_root_and_templates() {
        let root = parse_tree(BETA).expect("well-formed");
        assert_eq!(root.name, "root");
        let templates: Vec<_> = root.templates().collect();
        assert_eq!(templates.len(), 1);
        let title = templates[0].first_child("title").unwrap().text();
        assert_eq!(title.trim(), "Probability distribution");
        assert_eq!(templates[0].children_named("part").count(), 2);
    }

    #[test]
    fn ext_accessors() {
        let root = parse_tree(BETA).unwrap();
        let template = root.templates().next().unwrap();
        let mean = template.children_named("part").nth(1).unwrap();
        let value = mean.first_child("value").unwrap();
        let ext = value.first_child("ext").unwrap();
        assert_eq!(ext.ext_name().as_deref(), Some("math"));
        assert_eq!(ext.ext_inner(), "\\frac{\\alpha}{\\alpha+\\beta}");
    }

    #[test]
    fn entity_refs_merge_into_one_text_run() {
        let root = parse_tree("<value>a &lt;sub&gt;1&lt;/sub&gt; &amp;mu; b</value>").unwrap();
        assert_eq!(root.children, vec![Node::Text("a <sub>1</sub> &mu; b".into())]);
    }

    #[test]
    fn empty_elements_are_kept() {
        let root = parse_tree("<ext><name>math</name><attr/><inner>x</inner></ext>").unwrap();
        let names: Vec<_> = root.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["name", "attr", "inner"]);
    }

    #[test]
    fn unclosed_elements_close_at_eof() {
        let root = parse_tree("<root><template><title>T</title>").unwrap();
        let template = root.templates().next().expect("template kept");
        assert_eq!(template.first_child("title").unwrap().text(), "T");
    }

    #[test]
    fn multiple_top_level_nodes_get_wrapped() {
        let root = parse_tree("text<template/>").unwrap();
        assert_eq!(root.name, "root");
        assert_eq!(root.children.len(), 2);
    }

    #[test]
    fn unknown_entity_is_kept_verbatim() {
        let root = parse_tree("<v>&bogusentity;</v>").unwrap();
        assert_eq!(root.text(), "&bogusentity;");
    }

    #[test]
    fn character_and_greek_refs_resolve() {
        let root = parse_tree("<v>&#947; &#x3C3; &alpha; &Gamma;</v>").unwrap();
        assert_eq!(root.text(), "γ σ α Γ");
    }
}
