//! Configuration types for building a distribution sheet.
//!
//! All run behaviour is controlled through [`SheetConfig`], built via its
//! [`SheetConfigBuilder`].

use crate::error::SheetError;
use crate::images::ConverterCommand;
use crate::pipeline::record::DEFAULT_TEMPLATE_TITLE;
use crate::progress::SheetProgressCallback;
use crate::wiki::PageSource;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default MediaWiki endpoint.
pub const DEFAULT_API_URL: &str = "https://en.wikipedia.org/w/api.php";

/// Page whose navigation table lists every distribution.
pub const DEFAULT_LIST_PAGE: &str = "List_of_probability_distributions";

/// Wikimedia rejects requests without a descriptive agent.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "distsheet/",
    env!("CARGO_PKG_VERSION"),
    " (https://crates.io/crates/distsheet)"
);

/// Configuration for one sheet-building run.
///
/// Built via [`SheetConfig::builder()`] or using [`SheetConfig::default()`].
///
/// # Example
/// ```rust
/// use distsheet::SheetConfig;
///
/// let config = SheetConfig::builder()
///     .concurrency(4)
///     .download_images(false)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SheetConfig {
    /// `api.php` endpoint of the wiki. Default: English Wikipedia.
    pub api_url: String,

    /// Page carrying the distribution table. Ignored when `outline_file` is set.
    pub list_page: String,

    /// Title of the infobox template to extract. Default: "Probability distribution".
    pub template_title: String,

    /// Number of pages fetched at once. Default: 8.
    ///
    /// Wikipedia asks API clients to keep parallel requests modest; raise this
    /// only against a private wiki.
    pub concurrency: usize,

    /// Fetch pages one at a time. Default: false.
    pub sequential: bool,

    /// Per-request timeout in seconds. Default: 30.
    pub request_timeout_secs: u64,

    /// `User-Agent` sent with every request.
    pub user_agent: String,

    /// Directory receiving downloaded figures. Default: "images".
    pub image_dir: PathBuf,

    /// Download and convert infobox figures. Default: true.
    pub download_images: bool,

    /// Command converting SVG figures to PNG.
    pub svg_converter: ConverterCommand,

    /// JSON outline replacing discovery from `list_page`.
    pub outline_file: Option<PathBuf>,

    /// Pre-constructed page source. Takes precedence over `api_url`.
    pub page_source: Option<Arc<dyn PageSource>>,

    /// Optional progress callback receiving per-page events.
    pub progress_callback: Option<Arc<dyn SheetProgressCallback>>,

    /// Custom LaTeX preamble. If None, uses the built-in default.
    pub preamble: Option<String>,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            list_page: DEFAULT_LIST_PAGE.into(),
            template_title: DEFAULT_TEMPLATE_TITLE.into(),
            concurrency: 8,
            sequential: false,
            request_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.into(),
            image_dir: PathBuf::from("images"),
            download_images: true,
            svg_converter: ConverterCommand::default(),
            outline_file: None,
            page_source: None,
            progress_callback: None,
            preamble: None,
        }
    }
}

impl fmt::Debug for SheetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetConfig")
            .field("api_url", &self.api_url)
            .field("list_page", &self.list_page)
            .field("template_title", &self.template_title)
            .field("concurrency", &self.concurrency)
            .field("sequential", &self.sequential)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("image_dir", &self.image_dir)
            .field("download_images", &self.download_images)
            .field("svg_converter", &self.svg_converter.to_string())
            .field("outline_file", &self.outline_file)
            .field("page_source", &self.page_source.as_ref().map(|_| "<dyn PageSource>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn SheetProgressCallback>"),
            )
            .field("preamble", &self.preamble.as_ref().map(|p| p.len()))
            .finish()
    }
}

impl SheetConfig {
    /// Create a new builder for `SheetConfig`.
    pub fn builder() -> SheetConfigBuilder {
        SheetConfigBuilder {
            config: Self::default(),
        }
    }

    /// Effective concurrency: 1 in sequential mode.
    pub fn effective_concurrency(&self) -> usize {
        if self.sequential {
            1
        } else {
            self.concurrency.max(1)
        }
    }
}

/// Builder for [`SheetConfig`].
pub struct SheetConfigBuilder {
    config: SheetConfig,
}

impl fmt::Debug for SheetConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl SheetConfigBuilder {
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    pub fn list_page(mut self, page: impl Into<String>) -> Self {
        self.config.list_page = page.into();
        self
    }

    pub fn template_title(mut self, title: impl Into<String>) -> Self {
        self.config.template_title = title.into();
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.clamp(1, 64);
        self
    }

    pub fn sequential(mut self, v: bool) -> Self {
        self.config.sequential = v;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.image_dir = dir.into();
        self
    }

    pub fn download_images(mut self, v: bool) -> Self {
        self.config.download_images = v;
        self
    }

    pub fn svg_converter(mut self, cmd: ConverterCommand) -> Self {
        self.config.svg_converter = cmd;
        self
    }

    pub fn outline_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.outline_file = Some(path.into());
        self
    }

    pub fn page_source(mut self, source: Arc<dyn PageSource>) -> Self {
        self.config.page_source = Some(source);
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn SheetProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn preamble(mut self, preamble: impl Into<String>) -> Self {
        self.config.preamble = Some(preamble.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SheetConfig, SheetError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(SheetError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.template_title.trim().is_empty() {
            return Err(SheetError::InvalidConfig(
                "Template title must not be empty".into(),
            ));
        }
        if c.page_source.is_none() && !c.api_url.starts_with("http") {
            return Err(SheetError::InvalidConfig(format!(
                "API URL must be http(s), got '{}'",
                c.api_url
            )));
        }
        if c.outline_file.is_none() && c.list_page.trim().is_empty() {
            return Err(SheetError::InvalidConfig(
                "Either a list page or an outline file is required".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = SheetConfig::default();
        assert_eq!(c.api_url, DEFAULT_API_URL);
        assert_eq!(c.list_page, "List_of_probability_distributions");
        assert_eq!(c.template_title, "Probability distribution");
        assert_eq!(c.concurrency, 8);
        assert_eq!(c.request_timeout_secs, 30);
        assert_eq!(c.image_dir, PathBuf::from("images"));
        assert!(c.download_images);
        assert!(c.user_agent.starts_with("distsheet/"));
    }

    #[test]
    fn builder_clamps() {
        let c = SheetConfig::builder()
            .concurrency(0)
            .request_timeout_secs(0)
            .build()
            .unwrap();
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.request_timeout_secs, 1);

        let c = SheetConfig::builder().concurrency(1000).build().unwrap();
        assert_eq!(c.concurrency, 64);
    }

    #[test]
    fn sequential_forces_single_worker() {
        let c = SheetConfig::builder()
            .concurrency(16)
            .sequential(true)
            .build()
            .unwrap();
        assert_eq!(c.effective_concurrency(), 1);
    }

    #[test]
    fn build_rejects_bad_values() {
        assert!(matches!(
            SheetConfig::builder().template_title("  ").build(),
            Err(SheetError::InvalidConfig(_))
        ));
        assert!(matches!(
            SheetConfig::builder().api_url("ftp://wiki").build(),
            Err(SheetError::InvalidConfig(_))
        ));
        assert!(matches!(
            SheetConfig::builder().list_page("").build(),
            Err(SheetError::InvalidConfig(_))
        ));
        assert!(SheetConfig::builder()
            .list_page("")
            .outline_file("outline.json")
            .build()
            .is_ok());
    }

    #[test]
    fn debug_hides_collaborators() {
        let s = format!("{:?}", SheetConfig::default());
        assert!(s.contains("SheetConfig"));
        assert!(s.contains("page_source: None"));
    }
}
