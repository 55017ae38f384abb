//! Error types for the distsheet library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`SheetError`]: **Fatal**: the run cannot produce a sheet at all
//!   (outline unavailable, nothing extracted, output not writable). Returned
//!   as `Err(SheetError)` from the top-level `build_sheet*` functions.
//!
//! * [`PageError`]: **Non-fatal**: a single distribution page could not be
//!   turned into a record (fetch failed, infobox missing). Stored inside
//!   [`crate::output::PageResult`] so one bad page never aborts a run.
//!
//! * [`FetchError`]: what a [`crate::wiki::PageSource`] reports. Callers
//!   fold it into a `PageError` (per page) or a `SheetError` (outline).
//!
//! [`ImageError`] covers the optional image step. It is only ever logged:
//! a record whose figure could not be fetched is still a record.
//!
//! Malformed markup inside a page is not an error at all: the extraction
//! pipeline resolves it to empty fields or an absent record.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the distsheet library.
#[derive(Debug, Error)]
pub enum SheetError {
    // ── Outline errors ────────────────────────────────────────────────────
    /// The list page could not be fetched or contained no distribution table.
    #[error("Distribution outline unavailable: {reason}")]
    OutlineUnavailable { reason: String },

    /// A user-supplied outline file could not be read or parsed.
    #[error("Invalid outline file '{path}': {reason}")]
    OutlineFileInvalid { path: PathBuf, reason: String },

    /// Every page failed or none carried the expected infobox.
    #[error("No distributions extracted from {attempted} pages.\nFirst error: {first_error}")]
    NoDistributions {
        attempted: usize,
        first_error: String,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output LaTeX file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external typesetting engine could not be run or reported failure.
    #[error("Typesetting '{path}' with {engine} failed: {detail}")]
    TypesetFailed {
        path: PathBuf,
        engine: String,
        detail: String,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure reported by a page or image source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The wiki has no page with this identifier.
    #[error("Page '{page}' does not exist")]
    NotFound { page: String },

    /// The request never produced a response.
    #[error("Request for '{page}' failed: {reason}")]
    Network { page: String, reason: String },

    /// The server answered with a non-success status.
    #[error("Request for '{page}' returned HTTP {status}")]
    Http { page: String, status: u16 },

    /// The response body was not the expected JSON shape.
    #[error("Could not decode response for '{page}': {reason}")]
    Decode { page: String, reason: String },

    /// The request exceeded the configured timeout.
    #[error("Request for '{page}' timed out after {secs}s")]
    Timeout { page: String, secs: u64 },
}

/// A non-fatal error for a single distribution page.
///
/// Stored alongside [`crate::output::PageResult`] when a page yields no
/// record. The run continues regardless.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The page (or its parse tree) could not be retrieved.
    #[error("{page}: fetch failed: {detail}")]
    FetchFailed { page: String, detail: String },

    /// The parse tree was not well-formed XML.
    #[error("{page}: unreadable parse tree: {detail}")]
    TreeInvalid { page: String, detail: String },

    /// The page has no template with the expected title.
    #[error("{page}: no '{template}' template on page")]
    TemplateMissing { page: String, template: String },
}

impl PageError {
    /// Build the page-level error for a failed fetch.
    pub fn from_fetch(page: &str, err: &FetchError) -> Self {
        PageError::FetchFailed {
            page: page.to_string(),
            detail: err.to_string(),
        }
    }
}

/// Failure while downloading or converting a record's image.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to write image '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Converter '{program}' failed on '{input}': {detail}")]
    Convert {
        program: String,
        input: PathBuf,
        detail: String,
    },
}
