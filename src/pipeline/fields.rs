//! Field extraction: one template's `<part>` list → name/value map.
//!
//! Each part's value is a sequence of text runs and `<ext>` elements. Text
//! runs go through the inline normaliser, then image resolution, then
//! link-tag stripping; `<ext>` elements named `math` become delimited
//! equations. Every other element (comments, nested templates, `<ref>`
//! extensions) is skipped.
//!
//! ## Image short-circuit
//!
//! The first text run that resolves to an image ends the part: its value is
//! that [`ImageReference`] and whatever text was gathered before it, or would
//! follow it, is discarded.

use crate::output::ImageReference;
use crate::pipeline::image::resolve_image;
use crate::pipeline::inline::normalize;
use crate::pipeline::links::strip_link_tags;
use crate::pipeline::tree::{Element, Node};
use std::collections::HashMap;
use tracing::debug;

/// Environments that open display math on their own and must not be wrapped.
const DISPLAY_ENVIRONMENTS: &[&str] = &[
    r"\begin{align}",
    r"\begin{align*}",
    r"\begin{gather}",
    r"\begin{gather*}",
    r"\begin{multline}",
    r"\begin{eqnarray}",
];

/// Value of one template field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Image(ImageReference),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Image(_) => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageReference> {
        match self {
            FieldValue::Image(img) => Some(img),
            FieldValue::Text(_) => None,
        }
    }
}

/// Field name → value for one template.
pub type FieldMap = HashMap<String, FieldValue>;

/// Extract every named part of `template`.
///
/// Parts with an empty value are skipped. A repeated field name overwrites
/// the earlier value.
pub fn extract_fields(template: &Element) -> FieldMap {
    let mut fields = FieldMap::new();

    for part in template.children_named("part") {
        let name = part
            .first_child("name")
            .map(|n| n.text().trim().to_string())
            .unwrap_or_default();
        let Some(value) = part.first_child("value") else {
            continue;
        };
        if value.children.is_empty() {
            continue;
        }
        if name == "pdf_image" {
            debug!("Value for pdf_image: {}", value.text());
        }

        fields.insert(name, extract_value(&value.children));
    }

    fields
}

/// Fold one part's content nodes into its final value.
fn extract_value(nodes: &[Node]) -> FieldValue {
    let mut acc = String::new();

    for node in nodes {
        match node {
            Node::Text(raw) => {
                let text = normalize(raw.trim());
                if let Some(img) = resolve_image(&text) {
                    return FieldValue::Image(img);
                }
                acc.push_str(&strip_link_tags(&text));
            }
            Node::Element(el) => {
                if el.name != "ext" || el.ext_name().as_deref() != Some("math") {
                    continue;
                }
                acc.push_str(&format_math(&el.ext_inner()));
            }
        }
        acc.push(' ');
    }

    FieldValue::Text(acc.trim().to_string())
}

/// Delimit the body of a `<math>` extension for LaTeX.
///
/// * multi-line → display math `$$…$$`, blank lines dropped
/// * already a display environment → unchanged
/// * otherwise → inline math `$…$` (empty stays empty)
pub fn format_math(inner: &str) -> String {
    if inner.contains('\n') {
        format!("$${}$$", strip_blank_lines(inner).trim())
    } else if DISPLAY_ENVIRONMENTS.iter().any(|env| inner.contains(env)) {
        inner.to_string()
    } else if !inner.is_empty() {
        format!("${}$", inner)
    } else {
        String::new()
    }
}

fn strip_blank_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn math(inner: &str) -> Node {
        Node::Element(
            Element::new("ext")
                .with_child(Node::Element(Element::new("name").with_text("math")))
                .with_child(Node::Element(Element::new("attr")))
                .with_child(Node::Element(Element::new("inner").with_text(inner)))
                .with_child(Node::Element(Element::new("close").with_text("</math>"))),
        )
    }

    fn part(name: &str, value: Vec<Node>) -> Node {
        let mut v = Element::new("value");
        v.children = value;
        Node::Element(
            Element::new("part")
                .with_child(Node::Element(Element::new("name").with_text(name)))
                .with_text("=")
                .with_child(Node::Element(v)),
        )
    }

    fn template(parts: Vec<Node>) -> Element {
        let mut t = Element::new("template")
            .with_child(Node::Element(Element::new("title").with_text("Probability distribution")));
        t.children.extend(parts);
        t
    }

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    #[test]
    fn test_format_math_inline() {
        assert_eq!(format_math("x^2"), "$x^2$");
    }

    #[test]
    fn test_format_math_multiline() {
        assert_eq!(format_math("x^2\ny"), "$$x^2\ny$$");
        assert_eq!(format_math("\n  x^2\n\n   \ny\n"), "$$x^2\ny$$");
    }

    #[test]
    fn test_format_math_align_passthrough() {
        let body = r"\begin{align} a &= b \end{align}";
        assert_eq!(format_math(body), body);
    }

    #[test]
    fn test_format_math_empty() {
        assert_eq!(format_math(""), "");
    }

    #[test]
    fn text_and_math_are_joined_with_spaces() {
        let t = template(vec![part(
            "mean",
            vec![text(" ''a'' "), math(r"\frac{1}{2}"), text(" for [[Beta function|B]]\n")],
        )]);
        let fields = extract_fields(&t);
        assert_eq!(
            fields["mean"],
            FieldValue::Text(r"\textit{a} $\frac{1}{2}$ for B".into())
        );
    }

    #[test]
    fn image_short_circuits_part() {
        let t = template(vec![part(
            "pdf_image",
            vec![
                text("leading text"),
                text("[[File:beta.svg|Density]]"),
                math("ignored"),
            ],
        )]);
        let fields = extract_fields(&t);
        assert_eq!(
            fields["pdf_image"],
            FieldValue::Image(ImageReference::new("beta.svg", "Density"))
        );
    }

    #[test]
    fn non_math_elements_are_skipped() {
        let ext_ref = Node::Element(
            Element::new("ext")
                .with_child(Node::Element(Element::new("name").with_text("ref")))
                .with_child(Node::Element(Element::new("inner").with_text("citation"))),
        );
        let comment = Node::Element(Element::new("comment").with_text("<!-- note -->"));
        let t = template(vec![part("support", vec![text("[0,1]"), ext_ref, comment])]);
        assert_eq!(extract_fields(&t)["support"], FieldValue::Text("[0,1]".into()));
    }

    #[test]
    fn empty_values_are_skipped() {
        let t = template(vec![part("cdf", vec![]), part("mean", vec![text("0")])]);
        let fields = extract_fields(&t);
        assert!(!fields.contains_key("cdf"));
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn whitespace_only_value_is_empty_string() {
        let t = template(vec![part("variance", vec![text("\n")])]);
        assert_eq!(extract_fields(&t)["variance"], FieldValue::Text(String::new()));
    }

    #[test]
    fn last_write_wins() {
        let t = template(vec![part("mean", vec![text("1")]), part("mean", vec![text("2")])]);
        assert_eq!(extract_fields(&t)["mean"], FieldValue::Text("2".into()));
    }

    #[test]
    fn field_names_are_trimmed() {
        let t = template(vec![part("  support\n", vec![text("x")])]);
        assert!(extract_fields(&t).contains_key("support"));
    }

    #[test]
    fn accessors() {
        let img = FieldValue::Image(ImageReference::new("a.png", ""));
        assert!(img.as_text().is_none());
        assert_eq!(img.as_image().unwrap().filename, "a.png");
        assert_eq!(FieldValue::Text("x".into()).as_text(), Some("x"));
    }
}
