//! CLI binary for distsheet.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `SheetConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use distsheet::{
    build_sheet, impose, imposed_path, inspect_page, typeset, write_output, ConverterCommand,
    ProgressCallback, SheetConfig, SheetProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per page. Pages complete out of
/// order in concurrent mode, so start times are keyed by position.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_run_start` reports the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading distribution outline…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, position: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&position))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl SheetProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Fetching {total_pages} distribution pages…"))
        ));
    }

    fn on_page_start(&self, identifier: &str, position: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(position, Instant::now());
        }
        self.bar.set_message(identifier.to_string());
    }

    fn on_page_complete(&self, identifier: &str, position: usize, total: usize) {
        let secs = self.elapsed_secs(position);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            position + 1,
            total,
            identifier,
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, identifier: &str, position: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(position);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            red("✗"),
            position + 1,
            total,
            identifier,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_pages: usize, success_count: usize) {
        let missing = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if missing == 0 {
            eprintln!(
                "{} {} distributions extracted",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} distributions extracted  ({} without record)",
                if missing == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                yellow(&missing.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Whole sheet to stdout
  distsheet

  # Write the sheet and typeset it
  distsheet -o sheet.tex --compile

  # Typeset, then lay four pages on one landscape sheet (sheet-4up.pdf)
  distsheet -o sheet.tex --compile --impose

  # Check a single page's infobox
  distsheet --inspect Beta_distribution

  # Hand-written outline, no images, JSON output
  distsheet --outline outline.json --no-images --json > sheet.json

OUTLINE FILE FORMAT:
  {"sections": [
     {"title": "Continuous", "links": ["Normal_distribution"],
      "subsections": [{"title": "Bounded", "links": ["Beta_distribution"]}]}
  ]}

EXTERNAL TOOLS:
  svgexport   converts SVG plots to PNG (override with --svg-converter)
  pdflatex    typesets the sheet with --compile (override with --engine)
  pdfjam      imposes the typeset PDF 4-up with --impose (override with --impose-command)

ENVIRONMENT VARIABLES:
  Every flag can also be set as DISTSHEET_<FLAG>, e.g. DISTSHEET_CONCURRENCY=4.
  RUST_LOG overrides the log filter.
"#;

/// Build a LaTeX cheat sheet of probability distributions from Wikipedia infoboxes.
#[derive(Parser, Debug)]
#[command(
    name = "distsheet",
    version,
    about = "Build a LaTeX cheat sheet of probability distributions from Wikipedia infoboxes",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Write LaTeX to this file instead of stdout.
    #[arg(short, long, env = "DISTSHEET_OUTPUT")]
    output: Option<PathBuf>,

    /// Output structured JSON (SheetOutput) instead of LaTeX.
    #[arg(long, env = "DISTSHEET_JSON")]
    json: bool,

    /// Fetch and extract one page, print its record, and exit.
    #[arg(long, value_name = "PAGE")]
    inspect: Option<String>,

    /// JSON outline file replacing discovery from the list page.
    #[arg(long, env = "DISTSHEET_OUTLINE")]
    outline: Option<PathBuf>,

    /// Wiki page carrying the distribution table.
    #[arg(long, env = "DISTSHEET_LIST_PAGE", default_value = distsheet::config::DEFAULT_LIST_PAGE)]
    list_page: String,

    /// Number of pages fetched at once.
    #[arg(short, long, env = "DISTSHEET_CONCURRENCY", default_value_t = 8)]
    concurrency: usize,

    /// Fetch pages one at a time.
    #[arg(long, env = "DISTSHEET_SEQUENTIAL")]
    sequential: bool,

    /// Skip downloading infobox plots.
    #[arg(long, env = "DISTSHEET_NO_IMAGES")]
    no_images: bool,

    /// Directory receiving downloaded plots.
    #[arg(long, env = "DISTSHEET_IMAGE_DIR", default_value = "images")]
    image_dir: PathBuf,

    /// SVG→PNG command with {input} and {output} placeholders.
    #[arg(long, env = "DISTSHEET_SVG_CONVERTER", default_value = "svgexport {input} {output} 1x")]
    svg_converter: ConverterCommand,

    /// Infobox template title to extract.
    #[arg(long, env = "DISTSHEET_TEMPLATE", default_value = distsheet::pipeline::record::DEFAULT_TEMPLATE_TITLE)]
    template: String,

    /// MediaWiki api.php endpoint.
    #[arg(long, env = "DISTSHEET_API_URL", default_value = distsheet::config::DEFAULT_API_URL)]
    api_url: String,

    /// Per-request timeout in seconds.
    #[arg(long, env = "DISTSHEET_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// File with a custom LaTeX preamble.
    #[arg(long, env = "DISTSHEET_PREAMBLE")]
    preamble: Option<PathBuf>,

    /// Typeset the written sheet (requires --output).
    #[arg(long, env = "DISTSHEET_COMPILE", requires = "output")]
    compile: bool,

    /// Typesetting engine used by --compile.
    #[arg(long, env = "DISTSHEET_ENGINE", default_value = "pdflatex")]
    engine: String,

    /// After --compile, lay the PDF out four pages per landscape sheet.
    #[arg(long, env = "DISTSHEET_IMPOSE", requires = "compile")]
    impose: bool,

    /// Imposition command with {input} and {output} placeholders.
    #[arg(long, env = "DISTSHEET_IMPOSE_COMMAND", default_value = distsheet::pipeline::render::DEFAULT_IMPOSE_COMMAND)]
    impose_command: ConverterCommand,

    /// Imposed PDF path (default: <output stem>-4up.pdf).
    #[arg(long, env = "DISTSHEET_IMPOSE_OUTPUT", requires = "impose")]
    impose_output: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long, env = "DISTSHEET_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DISTSHEET_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DISTSHEET_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && cli.inspect.is_none();
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn SheetProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Inspect mode ─────────────────────────────────────────────────────
    if let Some(ref page) = cli.inspect {
        let result = inspect_page(page, &config)
            .await
            .context("Failed to inspect page")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&result).context("Failed to serialise record")?
            );
        } else if let Some(ref record) = result.record {
            println!("Name:         {}", record.name);
            for (label, value) in record.labelled_fields() {
                println!("{:<13} {}", format!("{label}:"), value);
            }
            if let Some(ref img) = record.image {
                println!("Image:        {} ({})", img.filename, img.caption);
            }
        } else if let Some(ref e) = result.error {
            anyhow::bail!("{e}");
        }
        return Ok(());
    }

    // ── Build the sheet ──────────────────────────────────────────────────
    let output = build_sheet(&config).await.context("Building the sheet failed")?;

    if let Some(ref path) = cli.output {
        let contents = if cli.json {
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        } else {
            output.latex.clone()
        };
        write_output(path, &contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        if cli.compile {
            typeset(path, &cli.engine)
                .await
                .context("Typesetting failed")?;

            if cli.impose {
                let imposed = cli
                    .impose_output
                    .clone()
                    .unwrap_or_else(|| imposed_path(path));
                impose(&path.with_extension("pdf"), &imposed, &cli.impose_command)
                    .await
                    .context("Imposition failed")?;
                if !cli.quiet {
                    eprintln!("{}  imposed  →  {}", green("✔"), bold(&imposed.display().to_string()));
                }
            }
        }

        if !cli.quiet {
            eprintln!(
                "{}  {}/{} pages  {} images  {}ms  →  {}",
                if output.stats.failed_pages == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                output.stats.extracted_pages,
                output.stats.total_pages,
                output.stats.images_downloaded,
                output.stats.total_duration_ms,
                bold(&path.display().to_string()),
            );
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        if cli.json {
            let json =
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            writeln!(handle, "{json}").context("Failed to write to stdout")?;
        } else {
            handle
                .write_all(output.latex.as_bytes())
                .context("Failed to write to stdout")?;
        }

        if !cli.quiet && !show_progress {
            eprintln!(
                "Extracted {}/{} pages in {}ms",
                output.stats.extracted_pages,
                output.stats.total_pages,
                output.stats.total_duration_ms
            );
            if output.stats.failed_pages > 0 {
                eprintln!("  {} pages failed", output.stats.failed_pages);
            }
        }
    }

    Ok(())
}

/// Map CLI args to `SheetConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SheetConfig> {
    let mut builder = SheetConfig::builder()
        .api_url(&cli.api_url)
        .list_page(&cli.list_page)
        .template_title(&cli.template)
        .concurrency(cli.concurrency)
        .sequential(cli.sequential)
        .request_timeout_secs(cli.timeout)
        .image_dir(&cli.image_dir)
        .download_images(!cli.no_images && cli.inspect.is_none())
        .svg_converter(cli.svg_converter.clone());

    if let Some(ref path) = cli.outline {
        builder = builder.outline_file(path);
    }

    if let Some(ref path) = cli.preamble {
        let preamble = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read preamble from {:?}", path))?;
        builder = builder.preamble(preamble);
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
