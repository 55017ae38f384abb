//! # distsheet
//!
//! Turn a wiki's probability-distribution pages into a LaTeX cheat sheet.
//!
//! Each distribution article on Wikipedia carries a "Probability
//! distribution" infobox listing its parameters, support, PDF, CDF, mean,
//! variance and a plot. This crate fetches those pages, pulls the infobox
//! fields out of the page's parse tree, rewrites the wiki markup into LaTeX
//! and arranges the results under the section headings of the wiki's list of
//! distributions.
//!
//! ## Pipeline Overview
//!
//! ```text
//! list page / outline.json
//!  │
//!  ├─ 1. Outline  sections → page identifiers (html5ever)
//!  ├─ 2. Fetch    parse tree per page, concurrently (reqwest)
//!  ├─ 3. Decode   XML parse tree → text/element nodes (quick-xml)
//!  ├─ 4. Extract  infobox template → typed record (regex rewriting)
//!  ├─ 5. Images   download plot, convert SVG → PNG (external command)
//!  └─ 6. Render   sections + records → .tex (optionally pdflatex)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use distsheet::{build_sheet, SheetConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SheetConfig::builder().concurrency(4).build()?;
//!     let output = build_sheet(&config).await?;
//!     std::fs::write("sheet.tex", &output.latex)?;
//!     eprintln!("{} of {} pages extracted",
//!         output.stats.extracted_pages,
//!         output.stats.total_pages);
//!     Ok(())
//! }
//! ```
//!
//! The extraction steps are plain functions and work without any network:
//!
//! ```rust
//! use distsheet::pipeline::{record::build_record, tree::parse_tree};
//!
//! let tree = parse_tree(
//!     "<root><template><title>Probability distribution</title>\
//!      <part><name>mean</name>=<value>'''μ'''</value></part></template></root>",
//! ).unwrap();
//! let record = build_record(&tree, "Probability distribution").unwrap();
//! assert_eq!(record.mean, r"\textbf{μ}");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `distsheet` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! distsheet = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod images;
pub mod outline;
pub mod output;
pub mod pipeline;
pub mod preamble;
pub mod progress;
pub mod stream;
pub mod wiki;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{SheetConfig, SheetConfigBuilder};
pub use convert::{build_sheet, build_sheet_sync, build_sheet_to_file, inspect_page, write_output};
pub use error::{FetchError, ImageError, PageError, SheetError};
pub use images::ConverterCommand;
pub use outline::{Outline, Section};
pub use output::{
    DistributionRecord, ImageReference, PageResult, SectionOutput, SheetOutput, SheetStats,
};
pub use pipeline::render::{impose, imposed_path, typeset};
pub use progress::{NoopProgressCallback, ProgressCallback, SheetProgressCallback};
pub use stream::{extract_stream, PageStream};
pub use wiki::{MediaWikiClient, PageSource, ParsedPage};
