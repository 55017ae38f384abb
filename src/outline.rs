//! Outline of the cheat sheet: which pages go under which section.
//!
//! The outline is either discovered from the wiki's list page (a navigation
//! table whose header carries the `Probability_distributions_(List)` anchor)
//! or loaded from a hand-written JSON file of the same shape.
//!
//! ## Table layout
//!
//! ```text
//! <table>
//!   <tr><th><div id="Probability_distributions_(List)">…</div></th></tr>   ← skipped
//!   <tr><th>Discrete univariate…</th><td><a href="/wiki/Bernoulli_distribution">…</a> …</td></tr>
//!   <tr><th>Continuous univariate…</th><td>
//!         <dl><dt><span>Supported on a bounded interval</span></dt>
//!             <dd><a href="/wiki/Beta_distribution">…</a></dd> …</dl></td></tr>
//! </table>
//! ```

use crate::error::SheetError;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

const TABLE_ANCHOR: &str = "Probability_distributions_(List)";

/// One heading of the sheet with its page identifiers and nested headings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub subsections: Vec<Section>,
}

/// Every section of the sheet in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    pub sections: Vec<Section>,
}

/// A section flattened for scheduling: where it sits and what it lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkGroup {
    /// Child indices from the top level down to this section.
    pub path: Vec<usize>,
    pub title: String,
    /// 1 for top-level sections, +1 per nesting level.
    pub depth: usize,
    pub identifiers: Vec<String>,
}

impl Outline {
    /// Flatten to pre-order groups: each section before its subsections.
    pub fn groups(&self) -> Vec<LinkGroup> {
        fn walk(sections: &[Section], prefix: &[usize], out: &mut Vec<LinkGroup>) {
            for (i, section) in sections.iter().enumerate() {
                let mut path = prefix.to_vec();
                path.push(i);
                out.push(LinkGroup {
                    path: path.clone(),
                    title: section.title.clone(),
                    depth: path.len(),
                    identifiers: section.links.clone(),
                });
                walk(&section.subsections, &path, out);
            }
        }

        let mut out = Vec::new();
        walk(&self.sections, &[], &mut out);
        out
    }

    /// Number of identifiers across all sections.
    pub fn link_count(&self) -> usize {
        self.groups().iter().map(|g| g.identifiers.len()).sum()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a JSON outline from disk.
    pub fn from_file(path: &Path) -> Result<Self, SheetError> {
        let invalid = |reason: String| SheetError::OutlineFileInvalid {
            path: path.to_path_buf(),
            reason,
        };
        let json = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        Self::from_json(&json).map_err(|e| invalid(e.to_string()))
    }
}

/// Discover the outline from the rendered HTML of the list page.
///
/// Fails with [`SheetError::OutlineUnavailable`] when no table carries the
/// list anchor.
pub fn discover(html: &str) -> Result<Outline, SheetError> {
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| SheetError::OutlineUnavailable {
            reason: format!("list page HTML unreadable: {}", e),
        })?;

    let tables: Vec<Handle> = find_all(&dom.document, "table")
        .into_iter()
        .filter(is_list_table)
        .collect();
    // Navboxes nest their body table inside a frame table; keep the innermost.
    let tables: Vec<&Handle> = tables
        .iter()
        .filter(|t| !find_all(t, "table").iter().any(is_list_table))
        .collect();

    if tables.is_empty() {
        return Err(SheetError::OutlineUnavailable {
            reason: format!("no table anchored at '{}'", TABLE_ANCHOR),
        });
    }

    let mut sections = Vec::new();
    for table in tables {
        info!("Found distribution table");
        for row in find_all(table, "tr").into_iter().skip(1) {
            sections.push(parse_row(&row));
        }
    }

    Ok(Outline { sections })
}

fn is_list_table(table: &Handle) -> bool {
    find_all(table, "th").iter().any(|th| {
        find_all(th, "div")
            .iter()
            .any(|div| attr(div, "id").as_deref() == Some(TABLE_ANCHOR))
    })
}

fn parse_row(row: &Handle) -> Section {
    let title = element_children(row)
        .first()
        .map(|cell| restore_univariate(text_content(cell).trim()))
        .unwrap_or_default();
    info!("Found section: {}", title);

    let mut section = Section {
        title,
        ..Default::default()
    };

    if let Some(dl) = find_all(row, "dl").into_iter().next() {
        debug!("Section '{}' has subsections", section.title);
        let mut current: Option<Section> = None;
        for child in element_children(&dl) {
            match element_name(&child).as_deref() {
                Some("dt") => {
                    if let Some(done) = current.take() {
                        section.subsections.push(done);
                    }
                    let title: String = find_all(&child, "span")
                        .iter()
                        .map(text_content)
                        .collect();
                    current = Some(Section {
                        title: title.trim().to_string(),
                        ..Default::default()
                    });
                }
                Some("dd") => {
                    let Some(link) = find_all(&child, "a").iter().find_map(link_identifier) else {
                        continue;
                    };
                    info!("Found link: {}", link);
                    current.get_or_insert_with(Section::default).links.push(link);
                }
                _ => {}
            }
        }
        if let Some(done) = current {
            section.subsections.push(done);
        }
    } else {
        for cell in find_all(row, "td") {
            section
                .links
                .extend(find_all(&cell, "a").iter().filter_map(link_identifier));
        }
    }

    section
}

/// Row headers render "univariate" glued to the next word; split it once.
fn restore_univariate(title: &str) -> String {
    const WORD: &str = "univariate";
    match title.find(WORD) {
        Some(at) => {
            let end = at + WORD.len();
            match title[end..].chars().next() {
                Some(c) if !c.is_whitespace() => {
                    format!("{} {}", &title[..end], &title[end..])
                }
                _ => title.to_string(),
            }
        }
        None => title.to_string(),
    }
}

/// Page identifier from a link: the decoded last path segment of its `href`.
fn link_identifier(anchor: &Handle) -> Option<String> {
    let href = attr(anchor, "href")?;
    let path = href.split(&['#', '?'][..]).next().unwrap_or_default();
    let base = path.trim_end_matches('/').rsplit('/').next()?;
    if base.is_empty() {
        return None;
    }
    Some(
        urlencoding::decode(base)
            .map(std::borrow::Cow::into_owned)
            .unwrap_or_else(|_| base.to_string()),
    )
}

// ── DOM helpers ──────────────────────────────────────────────────────────

fn element_name(node: &Handle) -> Option<String> {
    match node.data {
        NodeData::Element { ref name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

fn attr(node: &Handle, key: &str) -> Option<String> {
    match node.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == key)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn element_children(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|c| matches!(c.data, NodeData::Element { .. }))
        .cloned()
        .collect()
}

/// Descendant elements named `tag`, in document order.
fn find_all(node: &Handle, tag: &str) -> Vec<Handle> {
    fn walk(node: &Handle, tag: &str, out: &mut Vec<Handle>) {
        for child in node.children.borrow().iter() {
            if element_name(child).as_deref() == Some(tag) {
                out.push(child.clone());
            }
            walk(child, tag, out);
        }
    }

    let mut out = Vec::new();
    walk(node, tag, &mut out);
    out
}

fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    fn walk(node: &Handle, out: &mut String) {
        if let NodeData::Text { ref contents } = node.data {
            out.push_str(&contents.borrow());
        }
        for child in node.children.borrow().iter() {
            walk(child, out);
        }
    }
    walk(node, &mut out);
    out
}
