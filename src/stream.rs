//! Streaming API: emit pages as their records are extracted.
//!
//! Unlike the eager [`crate::convert::build_sheet`], which returns only after
//! every page finished and the sheet is rendered, [`extract_stream`] yields
//! one item per page as soon as it completes. With concurrency above 1 pages
//! arrive out of order; sort by `position` if order matters.

use crate::config::SheetConfig;
use crate::convert::{plan, resolve_outline, resolve_source, run_job};
use crate::error::{PageError, SheetError};
use crate::output::PageResult;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of page results.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<PageResult, PageError>> + Send>>;

/// Resolve the outline, then stream one result per listed page.
///
/// Images are downloaded as part of each page when enabled. The stream does
/// not render a document.
///
/// # Returns
/// - `Ok(PageStream)`: `Ok(PageResult)` for pages with a record, `Err(PageError)`
///   for the rest
/// - `Err(SheetError)`: the outline could not be obtained
///
/// # Example
/// ```rust,no_run
/// use distsheet::{extract_stream, SheetConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SheetConfig::builder().download_images(false).build()?;
/// let mut pages = extract_stream(&config).await?;
/// while let Some(page) = pages.next().await {
///     match page {
///         Ok(p) => println!("{}", p.record.map(|r| r.name).unwrap_or_default()),
///         Err(e) => eprintln!("Error: {e}"),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub async fn extract_stream(config: &SheetConfig) -> Result<PageStream, SheetError> {
    let source = resolve_source(config)?;
    let outline = resolve_outline(config, source.as_ref()).await?;
    let jobs = plan(&outline);
    let total = jobs.len();
    info!("Streaming {} pages", total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total);
    }

    let width = config.effective_concurrency();
    let config = config.clone();
    let s = stream::iter(jobs.into_iter().map(move |job| {
        let source = Arc::clone(&source);
        let cfg = config.clone();
        async move {
            let (mut result, _) = run_job(source.as_ref(), &job, &cfg, total).await;
            match result.error.take() {
                None => Ok(result),
                Some(err) => Err(err),
            }
        }
    }))
    .buffer_unordered(width);

    Ok(Box::pin(s))
}
