//! Output types: extracted records, the section hierarchy and run statistics.
//!
//! Everything here is plain data with `serde` derives so a whole run can be
//! dumped as JSON (`distsheet --json`) and diffed between runs.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// An illustrative image attached to a distribution, taken from the
/// infobox's `pdf_image` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    /// File name on the wiki, e.g. `Normal_Distribution_PDF.svg`.
    ///
    /// Rewritten once when a vector image is rasterised (`.svg` → `.png`).
    pub filename: String,
    /// Caption text as written in the link tag: its first option segment.
    pub caption: String,
    /// Option segments following the caption, in tag order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl ImageReference {
    pub fn new(filename: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            caption: caption.into(),
            options: Vec::new(),
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Lower-cased file extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }

    /// True when the image must be rasterised before typesetting.
    pub fn is_vector(&self) -> bool {
        matches!(self.extension().as_deref(), Some("svg"))
    }
}

/// Structured facts about one distribution.
///
/// Every text field is already typeset-ready (inline markup normalised,
/// equations delimited) and may be empty when the infobox omits it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionRecord {
    /// Page title. Assigned by the caller, not by the extractor.
    pub name: String,
    pub parameters: String,
    pub support: String,
    pub pdf: String,
    pub cdf: String,
    pub mean: String,
    pub variance: String,
    pub notation: String,
    pub image: Option<ImageReference>,
    /// Outline depth of the section the distribution was listed under.
    pub depth: usize,
}

impl DistributionRecord {
    /// Labelled, non-empty text fields in display order.
    pub fn labelled_fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("Notation", self.notation.as_str()),
            ("Parameters", self.parameters.as_str()),
            ("Support", self.support.as_str()),
            ("PDF", self.pdf.as_str()),
            ("CDF", self.cdf.as_str()),
            ("Mean", self.mean.as_str()),
            ("Variance", self.variance.as_str()),
        ]
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .collect()
    }
}

/// One section of the assembled sheet with its records and nested sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionOutput {
    pub title: String,
    /// 1 for top-level sections, 2 for their subsections, …
    pub depth: usize,
    pub records: Vec<DistributionRecord>,
    pub subsections: Vec<SectionOutput>,
}

impl SectionOutput {
    /// Number of records in this section and all nested sections.
    pub fn record_count(&self) -> usize {
        self.records.len()
            + self
                .subsections
                .iter()
                .map(SectionOutput::record_count)
                .sum::<usize>()
    }
}

/// Outcome of extracting a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// Wiki page identifier, e.g. `Beta_distribution`.
    pub identifier: String,
    /// Position of the page in outline order.
    pub position: usize,
    /// The extracted record, absent on failure or missing infobox.
    pub record: Option<DistributionRecord>,
    /// Wall-clock time spent on this page (fetch + extract + image).
    pub duration_ms: u64,
    /// Set when no record was produced.
    pub error: Option<PageError>,
}

/// Aggregate statistics for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetStats {
    /// Identifiers found in the outline.
    pub total_pages: usize,
    /// Pages that produced a record.
    pub extracted_pages: usize,
    /// Pages whose fetch or parse tree failed.
    pub failed_pages: usize,
    /// Pages fetched fine but lacking the expected template.
    pub skipped_pages: usize,
    /// Records that ended up with a usable image on disk.
    pub images_downloaded: usize,
    pub total_duration_ms: u64,
    pub extract_duration_ms: u64,
}

/// Everything a run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetOutput {
    /// The complete LaTeX document.
    pub latex: String,
    pub sections: Vec<SectionOutput>,
    /// Per-page outcomes in outline order.
    pub pages: Vec<PageResult>,
    pub stats: SheetStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn svg_is_vector_png_is_not() {
        assert!(ImageReference::new("Beta_pdf.SVG", "").is_vector());
        assert!(!ImageReference::new("beta.png", "pdf").is_vector());
        assert!(!ImageReference::new("no_extension", "").is_vector());
    }

    #[test]
    fn labelled_fields_skip_empty() {
        let record = DistributionRecord {
            support: "[0,1]".into(),
            mean: "$\\mu$".into(),
            ..Default::default()
        };
        let fields = record.labelled_fields();
        assert_eq!(fields, vec![("Support", "[0,1]"), ("Mean", "$\\mu$")]);
    }

    #[test]
    fn record_count_includes_subsections() {
        let section = SectionOutput {
            title: "Continuous".into(),
            depth: 1,
            records: vec![DistributionRecord::default()],
            subsections: vec![SectionOutput {
                title: "Bounded".into(),
                depth: 2,
                records: vec![DistributionRecord::default(), DistributionRecord::default()],
                subsections: vec![],
            }],
        };
        assert_eq!(section.record_count(), 3);
    }
}
