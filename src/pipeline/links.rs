//! Link tags: the `[[TYPE:TARGET|OPTIONS]]` reference syntax.
//!
//! ```text
//! [[Normal distribution]]                  plain wiki-link
//! [[Normal distribution|normal]]           link with display text
//! [[File:Beta pdf.svg|325px|Density]]      typed link with options
//! ```
//!
//! `TYPE` is a bare word followed by `:`, `TARGET` runs up to the first `|`
//! or `]`, and any number of `|`-separated option segments may follow. A tag
//! that never reaches its closing `]]` is not a tag; the text is left alone.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static RE_LINK_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\[\[(?:(?P<type>[A-Za-z0-9_]+):)?(?P<target>[^|\]]*)(?P<options>(?:\|[^|\]]*)*)\]\]",
    )
    .unwrap()
});

/// One parsed `[[…]]` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTag {
    /// `Image`, `File`, `Category`, … or `None` for a plain wiki-link.
    pub kind: Option<String>,
    pub target: String,
    /// Everything after the first `|`, undivided. `None` when there is no `|`.
    pub options: Option<String>,
}

impl LinkTag {
    /// The first option segment, which the wiki uses as display text.
    pub fn caption(&self) -> Option<&str> {
        self.options
            .as_deref()
            .map(|o| o.split('|').next().unwrap_or(o))
    }

    /// Text that replaces the tag in running prose: the caption when the
    /// author gave a non-empty one, otherwise the bare target.
    pub fn display_text(&self) -> &str {
        match self.caption() {
            Some(c) if !c.is_empty() => c,
            _ => &self.target,
        }
    }

    /// True for `Image:` and `File:` tags (case-sensitive).
    pub fn is_image(&self) -> bool {
        matches!(self.kind.as_deref(), Some("Image") | Some("File"))
    }
}

/// A matched tag with its byte span in the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMatch {
    pub span: Range<usize>,
    pub tag: LinkTag,
}

/// All well-formed tags in `text`, left to right, non-overlapping.
pub fn find_link_matches(text: &str) -> Vec<LinkMatch> {
    RE_LINK_TAG
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let options = caps
                .name("options")
                .map(|m| m.as_str())
                .filter(|o| !o.is_empty())
                .map(|o| o[1..].to_string());
            Some(LinkMatch {
                span: whole.range(),
                tag: LinkTag {
                    kind: caps.name("type").map(|m| m.as_str().to_string()),
                    target: caps
                        .name("target")
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_default(),
                    options,
                },
            })
        })
        .collect()
}

/// All well-formed tags in `text`, left to right.
pub fn find_link_tags(text: &str) -> Vec<LinkTag> {
    find_link_matches(text).into_iter().map(|m| m.tag).collect()
}

/// Replace every tag with its display text, copying everything between tags
/// through unchanged.
pub fn strip_link_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for m in find_link_matches(text) {
        out.push_str(&text[cursor..m.span.start]);
        out.push_str(m.tag.display_text());
        cursor = m.span.end;
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_link() {
        let tags = find_link_tags("see [[Beta distribution]]");
        assert_eq!(
            tags,
            vec![LinkTag {
                kind: None,
                target: "Beta distribution".into(),
                options: None,
            }]
        );
    }

    #[test]
    fn typed_link_with_options() {
        let tags = find_link_tags("[[File:Beta pdf.svg|325px|Density]]");
        assert_eq!(tags.len(), 1);
        let tag = &tags[0];
        assert_eq!(tag.kind.as_deref(), Some("File"));
        assert_eq!(tag.target, "Beta pdf.svg");
        assert_eq!(tag.options.as_deref(), Some("325px|Density"));
        assert_eq!(tag.caption(), Some("325px"));
        assert!(tag.is_image());
    }

    #[test]
    fn image_type_is_case_sensitive() {
        let tags = find_link_tags("[[image:x.png]] [[FILE:y.png]]");
        assert_eq!(tags.len(), 2);
        assert!(tags.iter().all(|t| !t.is_image()));
    }

    #[test]
    fn unclosed_tag_is_ignored() {
        assert!(find_link_tags("[[Normal distribution").is_empty());
        assert_eq!(
            strip_link_tags("see [[Normal distribution|normal"),
            "see [[Normal distribution|normal"
        );
    }

    #[test]
    fn strip_uses_caption_or_target() {
        assert_eq!(
            strip_link_tags("See [[Normal distribution|normal]] case"),
            "See normal case"
        );
        assert_eq!(
            strip_link_tags("See [[Normal distribution]] case"),
            "See Normal distribution case"
        );
    }

    #[test]
    fn strip_empty_caption_falls_back_to_target() {
        assert_eq!(strip_link_tags("[[Gamma function|]]"), "Gamma function");
    }

    #[test]
    fn strip_multiple_tags_left_to_right() {
        assert_eq!(
            strip_link_tags("[[a|A]], [[b]] and [[Category:c|C|x]]!"),
            "A, b and C!"
        );
    }

    #[test]
    fn strip_is_idempotent() {
        for s in [
            "See [[Normal distribution|normal]] case",
            "[[x]][[y|z]]",
            "no tags at all",
            "[[half open",
            "]] stray [[",
        ] {
            let once = strip_link_tags(s);
            assert_eq!(strip_link_tags(&once), once, "input: {s:?}");
        }
    }

    #[test]
    fn match_spans_are_byte_ranges() {
        let text = "μ [[x|y]]";
        let matches = find_link_matches(text);
        assert_eq!(matches.len(), 1);
        assert_eq!(&text[matches[0].span.clone()], "[[x|y]]");
    }

    #[test]
    fn colon_without_word_is_part_of_target() {
        let tags = find_link_tags("[[:Category:Continuous]]");
        assert_eq!(tags[0].kind, None);
        assert_eq!(tags[0].target, ":Category:Continuous");
    }
}
