//! Eager (whole-sheet) entry points.
//!
//! This module waits for every page, then assembles the sheet. Use
//! [`crate::stream::extract_stream`] instead to receive records as they are
//! extracted.

use crate::config::SheetConfig;
use crate::error::{PageError, SheetError};
use crate::images;
use crate::outline::{self, Outline};
use crate::output::{PageResult, SectionOutput, SheetOutput, SheetStats};
use crate::pipeline::record::build_record;
use crate::pipeline::render::render_document;
use crate::pipeline::tree::parse_tree;
use crate::preamble::DEFAULT_PREAMBLE;
use crate::wiki::{MediaWikiClient, PageSource};
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One page scheduled for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PageJob {
    pub identifier: String,
    /// 0-based index in outline order.
    pub position: usize,
    /// Depth of the section listing the page.
    pub depth: usize,
    /// Path of that section inside the outline.
    pub section_path: Vec<usize>,
}

/// Build the whole sheet.
///
/// # Returns
/// `Ok(SheetOutput)` as soon as one page produced a record, even if others
/// failed (check `output.stats.failed_pages`).
///
/// # Errors
/// Returns `Err(SheetError)` only for fatal errors:
/// - outline unavailable or outline file invalid
/// - no page produced a record
pub async fn build_sheet(config: &SheetConfig) -> Result<SheetOutput, SheetError> {
    let total_start = Instant::now();

    // ── Step 1: Page source ──────────────────────────────────────────────
    let source = resolve_source(config)?;

    // ── Step 2: Outline ──────────────────────────────────────────────────
    let outline = resolve_outline(config, source.as_ref()).await?;
    let jobs = plan(&outline);
    info!(
        "Outline has {} sections and {} pages",
        outline.groups().len(),
        jobs.len()
    );
    if jobs.is_empty() {
        return Err(SheetError::NoDistributions {
            attempted: 0,
            first_error: "outline lists no pages".into(),
        });
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(jobs.len());
    }

    // ── Step 3: Fan out, then wait for every page ────────────────────────
    let extract_start = Instant::now();
    let results = if config.sequential {
        process_sequential(&source, &jobs, config).await
    } else {
        process_concurrent(&source, &jobs, config).await
    };
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;

    let images_downloaded = results.iter().filter(|(_, downloaded)| *downloaded).count();
    let mut pages: Vec<PageResult> = results.into_iter().map(|(page, _)| page).collect();
    pages.sort_by_key(|p| p.position);

    // ── Step 4: Stats ────────────────────────────────────────────────────
    let extracted = pages.iter().filter(|p| p.record.is_some()).count();
    // A page without the infobox is skipped, not failed.
    let failed = pages
        .iter()
        .filter(|p| {
            matches!(
                p.error,
                Some(PageError::FetchFailed { .. }) | Some(PageError::TreeInvalid { .. })
            )
        })
        .count();
    let skipped = pages.len() - extracted - failed;

    if extracted == 0 {
        let first_error = pages
            .iter()
            .find_map(|p| p.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(SheetError::NoDistributions {
            attempted: pages.len(),
            first_error,
        });
    }

    // ── Step 5: Assemble and render ──────────────────────────────────────
    let sections = assemble_sections(&outline, &jobs, &pages);
    let preamble = config.preamble.as_deref().unwrap_or(DEFAULT_PREAMBLE);
    let latex = render_document(&sections, preamble, &config.image_dir.to_string_lossy());

    let stats = SheetStats {
        total_pages: pages.len(),
        extracted_pages: extracted,
        failed_pages: failed,
        skipped_pages: skipped,
        images_downloaded,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        extract_duration_ms,
    };

    info!(
        "Sheet complete: {}/{} pages, {} images, {}ms total",
        extracted, stats.total_pages, images_downloaded, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(pages.len(), extracted);
    }

    Ok(SheetOutput {
        latex,
        sections,
        pages,
        stats,
    })
}

/// Build the sheet and write the LaTeX to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn build_sheet_to_file(
    output_path: impl AsRef<Path>,
    config: &SheetConfig,
) -> Result<SheetStats, SheetError> {
    let output = build_sheet(config).await?;
    write_output(output_path.as_ref(), &output.latex).await?;
    Ok(output.stats)
}

/// Write `contents` to `path` atomically, creating parent directories.
pub async fn write_output(path: &Path, contents: &str) -> Result<(), SheetError> {
    let fail = |e: std::io::Error| SheetError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(fail)?;
        }
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);
    tokio::fs::write(&tmp_path, contents).await.map_err(fail)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(fail)?;
    Ok(())
}

/// Synchronous wrapper around [`build_sheet`].
///
/// Creates a temporary tokio runtime internally.
pub fn build_sheet_sync(config: &SheetConfig) -> Result<SheetOutput, SheetError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SheetError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(build_sheet(config))
}

/// Fetch and extract a single page, without images.
///
/// Useful for checking how one page's infobox comes out. The page is
/// treated as a top-level entry (depth 1).
pub async fn inspect_page(identifier: &str, config: &SheetConfig) -> Result<PageResult, SheetError> {
    let source = resolve_source(config)?;
    Ok(extract_page(source.as_ref(), identifier, 0, 1, &config.template_title).await)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// The configured page source, or a MediaWiki client built from the config.
pub(crate) fn resolve_source(config: &SheetConfig) -> Result<Arc<dyn PageSource>, SheetError> {
    if let Some(ref source) = config.page_source {
        return Ok(Arc::clone(source));
    }
    Ok(Arc::new(MediaWikiClient::from_config(config)?))
}

/// Load the outline file, or discover the outline from the list page.
pub(crate) async fn resolve_outline(
    config: &SheetConfig,
    source: &dyn PageSource,
) -> Result<Outline, SheetError> {
    if let Some(ref path) = config.outline_file {
        info!("Loading outline from {}", path.display());
        return Outline::from_file(path);
    }

    let html = source
        .fetch_list_html(&config.list_page)
        .await
        .map_err(|e| SheetError::OutlineUnavailable {
            reason: e.to_string(),
        })?;
    outline::discover(&html)
}

/// Flatten the outline into jobs numbered in outline order.
pub(crate) fn plan(outline: &Outline) -> Vec<PageJob> {
    let mut jobs = Vec::new();
    for group in outline.groups() {
        for identifier in group.identifiers {
            jobs.push(PageJob {
                identifier,
                position: jobs.len(),
                depth: group.depth,
                section_path: group.path.clone(),
            });
        }
    }
    jobs
}

/// Fetch one page and run it through the extraction pipeline.
///
/// Never fails: problems are recorded in the returned [`PageResult`].
pub(crate) async fn extract_page(
    source: &dyn PageSource,
    identifier: &str,
    position: usize,
    depth: usize,
    template_title: &str,
) -> PageResult {
    let start = Instant::now();
    let outcome = async {
        let page = source
            .fetch_parse_tree(identifier)
            .await
            .map_err(|e| PageError::from_fetch(identifier, &e))?;
        let tree = parse_tree(&page.parse_tree).map_err(|e| PageError::TreeInvalid {
            page: identifier.to_string(),
            detail: e.to_string(),
        })?;
        let mut record =
            build_record(&tree, template_title).ok_or_else(|| PageError::TemplateMissing {
                page: identifier.to_string(),
                template: template_title.to_string(),
            })?;
        record.name = page.title;
        record.depth = depth;
        Ok::<_, PageError>(record)
    }
    .await;

    let duration_ms = start.elapsed().as_millis() as u64;
    match outcome {
        Ok(record) => {
            debug!("Extracted '{}' in {}ms", record.name, duration_ms);
            PageResult {
                identifier: identifier.to_string(),
                position,
                record: Some(record),
                duration_ms,
                error: None,
            }
        }
        Err(e) => {
            warn!("{}", e);
            PageResult {
                identifier: identifier.to_string(),
                position,
                record: None,
                duration_ms,
                error: Some(e),
            }
        }
    }
}

/// Extract one job, download its figure, report progress.
///
/// The flag is true when a figure was downloaded.
pub(crate) async fn run_job(
    source: &dyn PageSource,
    job: &PageJob,
    config: &SheetConfig,
    total: usize,
) -> (PageResult, bool) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_page_start(&job.identifier, job.position, total);
    }

    let mut result = extract_page(
        source,
        &job.identifier,
        job.position,
        job.depth,
        &config.template_title,
    )
    .await;

    let mut downloaded = false;
    if config.download_images {
        if let Some(image) = result.record.as_mut().and_then(|r| r.image.as_mut()) {
            match images::download(source, image, &config.image_dir, &config.svg_converter).await {
                Ok(()) => downloaded = true,
                Err(e) => warn!("Image for '{}' not downloaded: {}", job.identifier, e),
            }
        }
    }

    if let Some(ref cb) = config.progress_callback {
        match &result.error {
            None => cb.on_page_complete(&job.identifier, job.position, total),
            Some(e) => cb.on_page_error(&job.identifier, job.position, total, &e.to_string()),
        }
    }
    (result, downloaded)
}

async fn process_concurrent(
    source: &Arc<dyn PageSource>,
    jobs: &[PageJob],
    config: &SheetConfig,
) -> Vec<(PageResult, bool)> {
    let total = jobs.len();
    stream::iter(
        jobs.iter()
            .map(|job| run_job(source.as_ref(), job, config, total)),
    )
    .buffer_unordered(config.effective_concurrency())
    .collect()
    .await
}

async fn process_sequential(
    source: &Arc<dyn PageSource>,
    jobs: &[PageJob],
    config: &SheetConfig,
) -> Vec<(PageResult, bool)> {
    let total = jobs.len();
    let mut results = Vec::with_capacity(total);
    for job in jobs {
        results.push(run_job(source.as_ref(), job, config, total).await);
    }
    results
}

/// Mirror the outline as output sections and file each record under the
/// section that listed it, in outline order.
pub(crate) fn assemble_sections(
    outline: &Outline,
    jobs: &[PageJob],
    pages: &[PageResult],
) -> Vec<SectionOutput> {
    fn mirror(sections: &[outline::Section], depth: usize) -> Vec<SectionOutput> {
        sections
            .iter()
            .map(|s| SectionOutput {
                title: s.title.clone(),
                depth,
                records: Vec::new(),
                subsections: mirror(&s.subsections, depth + 1),
            })
            .collect()
    }

    fn section_at<'a>(
        sections: &'a mut [SectionOutput],
        path: &[usize],
    ) -> Option<&'a mut SectionOutput> {
        let (first, rest) = path.split_first()?;
        let section = sections.get_mut(*first)?;
        if rest.is_empty() {
            Some(section)
        } else {
            section_at(&mut section.subsections, rest)
        }
    }

    let mut out = mirror(&outline.sections, 1);
    for page in pages {
        let Some(ref record) = page.record else {
            continue;
        };
        let Some(job) = jobs.get(page.position) else {
            continue;
        };
        if let Some(section) = section_at(&mut out, &job.section_path) {
            section.records.push(record.clone());
        }
    }
    out
}
