//! Image reference resolution: does a text run embed an image?
//!
//! Only the first `Image:`/`File:` tag counts: one image per field.

use crate::output::ImageReference;
use crate::pipeline::links::find_link_tags;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Layout options of an image tag: sizes, frames, alignment and `key=value`
/// parameters. None of them is text a reader should see.
static RE_LAYOUT_OPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)^(?:
            \d+px | \d*x\d+px
          | thumb | thumbnail | frame | framed | frameless | border
          | upright.*
          | left | right | center | centre | none
          | baseline | middle | sub | super | top | text-top | bottom | text-bottom
          | (?:alt|link|page|class|lang)=.*
        )$",
    )
    .unwrap()
});

/// Return the first image-typed link tag in `text` as an [`ImageReference`].
///
/// The caption is the tag's first option segment, taken verbatim; later
/// segments are kept as `options`.
pub fn resolve_image(text: &str) -> Option<ImageReference> {
    let tag = find_link_tags(text).into_iter().find(|t| t.is_image())?;
    debug!("Parsed image: {}", tag.target);
    let caption = tag.caption().unwrap_or_default().to_string();
    let rest: Vec<String> = tag
        .options
        .as_deref()
        .map(|o| o.split('|').skip(1).map(str::to_string).collect())
        .unwrap_or_default();
    Some(ImageReference::new(tag.target, caption).with_options(rest))
}

/// True for size, frame and alignment options such as `340px` or `thumb`.
pub fn is_layout_option(segment: &str) -> bool {
    RE_LAYOUT_OPTION.is_match(segment.trim())
}

/// Text to print under the figure: the first option segment, starting with
/// the caption, that is neither empty nor a layout option.
pub fn display_caption(image: &ImageReference) -> Option<&str> {
    std::iter::once(image.caption.as_str())
        .chain(image.options.iter().map(String::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty() && !is_layout_option(s))
}
