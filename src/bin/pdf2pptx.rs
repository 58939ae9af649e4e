//! CLI binary for edgequake-pdf2pptx.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and writes the deck.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2pptx::{
    convert, inspect_document, BlockOrder, ConversionConfig, ConversionOutput,
    ConversionProgressCallback, PageError, PageSelection, ProgressCallback, SlideMode,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

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

/// Terminal progress callback: a live progress bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the page currently being processed.
    page_started: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
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
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
    }

    fn page_elapsed(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting conversion of {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut t) = self.page_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, slides: usize) {
        let elapsed = self.page_elapsed();

        let mark = if slides == 0 { dim("·") } else { green("✓") };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<10}  {}",
            mark,
            page_num,
            total,
            dim(&format!("{slides:>3} slides")),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let elapsed = self.page_elapsed();
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, slides: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} slides from {} pages",
                green("✔"),
                bold(&slides.to_string()),
                total_pages
            );
        } else {
            eprintln!(
                "{} {} slides from {}/{} pages  ({} failed)",
                cyan("⚠"),
                bold(&slides.to_string()),
                total_pages - failed,
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One slide per "Section ..." heading, written to report.pptx
  pdf2pptx report.pdf

  # Choose the output path
  pdf2pptx report.pdf -o slides/q3.pptx

  # Whole pages instead of sections
  pdf2pptx --mode pages report.pdf

  # Sections where there are headings, whole pages elsewhere
  pdf2pptx --mode auto report.pdf

  # Headings like "3.2 Results" instead of "Section 3"
  pdf2pptx --heading-pattern '^\d+(\.\d+)* [A-Z]' report.pdf

  # Only pages 3 to 8, sharper images
  pdf2pptx --pages 3-8 --dpi 200 report.pdf

  # Where would the cuts go? (no rendering)
  pdf2pptx --inspect-only report.pdf

  # Convert from URL, print the report as JSON
  pdf2pptx --json https://example.com/report.pdf > report.json

  # Deck to stdout
  pdf2pptx report.pdf -o - > report.pptx

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium (same as --pdfium-lib)
  RUST_LOG          Override log filtering (e.g. RUST_LOG=edgequake_pdf2pptx=debug)
  PDF2PPTX_*        Every flag has a PDF2PPTX_<FLAG> equivalent

SETUP:
  Rendering needs the pdfium shared library. Download a build for your
  platform from https://github.com/bblanchon/pdfium-binaries and either put
  it next to the pdf2pptx binary or point PDFIUM_LIB_PATH at it.
"#;

/// Turn PDF reports into slide decks, one section or page per slide.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2pptx",
    version,
    about = "Turn PDF reports into slide decks, one section or page per slide",
    long_about = "Convert a PDF (local file or URL) into a PowerPoint deck. Each page is split \
at headings starting with \"Section \" (configurable) and every slice becomes one picture \
slide, scaled to fit and centred. Whole pages can be used instead.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the deck here. Default: the input name with a .pptx extension,
    /// in the current directory. Use "-" for stdout.
    #[arg(short, long, env = "PDF2PPTX_OUTPUT")]
    output: Option<PathBuf>,

    /// What becomes a slide: sections, pages, or auto.
    #[arg(long, env = "PDF2PPTX_MODE", value_enum, default_value = "sections")]
    mode: ModeArg,

    /// Rendering DPI (72–400).
    #[arg(long, env = "PDF2PPTX_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Points of padding kept above each heading.
    #[arg(long, env = "PDF2PPTX_TOP_BUFFER", default_value_t = 20.0)]
    top_buffer: f64,

    /// Text that starts a heading block.
    #[arg(long, env = "PDF2PPTX_HEADING_PREFIX", default_value = "Section ",
          conflicts_with = "heading_pattern")]
    heading_prefix: String,

    /// Regular expression a heading block must match (instead of the prefix).
    #[arg(long, env = "PDF2PPTX_HEADING_PATTERN")]
    heading_pattern: Option<String>,

    /// Block scan order: sorted (top-to-bottom) or extracted (as the PDF lists them).
    #[arg(long, env = "PDF2PPTX_BLOCK_ORDER", value_enum, default_value = "sorted")]
    block_order: BlockOrderArg,

    /// Do not add the empty caption box under section images.
    #[arg(long, env = "PDF2PPTX_NO_CAPTION")]
    no_caption: bool,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2PPTX_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2PPTX_PASSWORD")]
    password: Option<String>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDF2PPTX_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Print the conversion report (or inspection result) as JSON on stdout.
    #[arg(long, env = "PDF2PPTX_JSON")]
    json: bool,

    /// Print metadata and detected sections only, no rendering.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2PPTX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2PPTX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2PPTX_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2PPTX_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ModeArg {
    Sections,
    Pages,
    Auto,
}

impl From<ModeArg> for SlideMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Sections => SlideMode::Sections,
            ModeArg::Pages => SlideMode::WholePage,
            ModeArg::Auto => SlideMode::Auto,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum BlockOrderArg {
    Sorted,
    Extracted,
}

impl From<BlockOrderArg> for BlockOrder {
    fn from(v: BlockOrderArg) -> Self {
        match v {
            BlockOrderArg::Sorted => BlockOrder::TopToBottom,
            BlockOrderArg::Extracted => BlockOrder::AsExtracted,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let to_stdout = cli.output.as_deref().is_some_and(|p| p.as_os_str() == "-");

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; verbose mode shows everything.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
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
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        return run_inspect(&cli, &config).await;
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert(&cli.input, &config)
        .await
        .context("Conversion failed")?;

    if to_stdout {
        io::stdout()
            .lock()
            .write_all(&output.pptx)
            .context("Failed to write deck to stdout")?;
    } else {
        let path = cli
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&output.filename));
        output
            .write_to(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        if !cli.quiet && !cli.json {
            print_summary(&output, &path, show_progress);
        }
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise report")?;
        if to_stdout {
            eprintln!("{json}");
        } else {
            println!("{json}");
        }
    }

    Ok(())
}

async fn run_inspect(cli: &Cli, config: &ConversionConfig) -> Result<()> {
    let inspection = inspect_document(&cli.input, config)
        .await
        .context("Failed to inspect PDF")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&inspection).context("Failed to serialize inspection")?
        );
        return Ok(());
    }
    let (meta, pages) = (&inspection.metadata, &inspection.pages);

    println!("File:         {}", cli.input);
    if let Some(ref t) = meta.title {
        println!("Title:        {}", t);
    }
    if let Some(ref a) = meta.author {
        println!("Author:       {}", a);
    }
    if let Some(ref s) = meta.subject {
        println!("Subject:      {}", s);
    }
    println!("Pages:        {}", meta.page_count);
    println!("PDF Version:  {}", meta.pdf_version);
    if let Some(ref p) = meta.producer {
        println!("Producer:     {}", p);
    }
    if let Some(ref c) = meta.creator {
        println!("Creator:      {}", c);
    }
    println!("Headings:     {}", config.heading);
    println!();

    let total: usize = pages.iter().map(|p| p.sections.len()).sum();
    for page in pages {
        println!(
            "{} {:.0}x{:.0} pt, {} section(s)",
            bold(&format!("Page {:>3}", page.page_num)),
            page.size.width,
            page.size.height,
            page.sections.len()
        );
        for (i, s) in page.sections.iter().enumerate() {
            let clip = s.clip();
            println!(
                "    {:>2}. y {:>7.1} → {:>7.1}  {}",
                i + 1,
                clip.y0,
                clip.y1,
                dim(&format!("({:.1} pt)", clip.height()))
            );
        }
        for e in &page.errors {
            println!("    {} {}", yellow("!"), e);
        }
    }
    println!();
    println!("{} section(s) would become slides", bold(&total.to_string()));
    Ok(())
}

fn print_summary(output: &ConversionOutput, path: &std::path::Path, show_progress: bool) {
    let stats = &output.stats;
    // The progress callback already printed the slide count.
    if !show_progress {
        eprintln!(
            "Converted {}/{} pages into {} slides in {}ms",
            stats.processed_pages, stats.selected_pages, stats.slide_count, stats.total_duration_ms
        );
    }

    let skipped: Vec<&PageError> = output.errors().filter(|e| e.drops_content()).collect();
    for e in skipped.iter().take(10) {
        eprintln!("  {} {}", yellow("!"), e);
    }
    if skipped.len() > 10 {
        eprintln!("  {} and {} more", yellow("!"), skipped.len() - 10);
    }
    if stats.skipped_blocks > 0 {
        eprintln!(
            "  {}",
            dim(&format!("{} malformed text block(s) ignored", stats.skipped_blocks))
        );
    }
    if stats.empty_pages > 0 {
        eprintln!(
            "  {}",
            dim(&format!("{} page(s) added no slides", stats.empty_pages))
        );
    }

    eprintln!(
        "{}  {} slides  {}  →  {}",
        if skipped.is_empty() { green("✔") } else { cyan("⚠") },
        stats.slide_count,
        dim(&format!("{} KB", stats.deck_bytes / 1024)),
        bold(&path.display().to_string()),
    );
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut builder = ConversionConfig::builder()
        .dpi(cli.dpi)
        .top_buffer(cli.top_buffer)
        .mode(cli.mode.clone().into())
        .block_order(cli.block_order.clone().into())
        .caption_placeholder(!cli.no_caption)
        .pages(pages)
        .download_timeout_secs(cli.download_timeout);

    builder = match cli.heading_pattern {
        Some(ref pattern) => builder
            .heading_pattern(pattern)
            .context("Invalid --heading-pattern")?,
        None => builder.heading_prefix(cli.heading_prefix.clone()),
    };
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_parse() {
        assert_eq!(parse_pages("all").unwrap(), PageSelection::All);
        assert_eq!(parse_pages(" ALL ").unwrap(), PageSelection::All);
        assert_eq!(parse_pages("4").unwrap(), PageSelection::Single(4));
        assert_eq!(parse_pages("3-15").unwrap(), PageSelection::Range(3, 15));
        assert_eq!(parse_pages("1, 3,5").unwrap(), PageSelection::Set(vec![1, 3, 5]));
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("5-2").is_err());
        assert!(parse_pages("1,x").is_err());
    }

    #[test]
    fn heading_pattern_replaces_prefix() {
        let cli = Cli::parse_from(["pdf2pptx", "--heading-pattern", r"^\d+\. ", "r.pdf"]);
        let config = build_config(&cli, None).unwrap();
        assert!(config.heading.is_heading("2. Results"));
        assert!(!config.heading.is_heading("Section 2"));
    }

    #[test]
    fn flags_map_onto_config() {
        let cli = Cli::parse_from([
            "pdf2pptx",
            "--mode",
            "pages",
            "--block-order",
            "extracted",
            "--no-caption",
            "--top-buffer",
            "5",
            "r.pdf",
        ]);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.mode, SlideMode::WholePage);
        assert_eq!(config.block_order, BlockOrder::AsExtracted);
        assert!(!config.caption_placeholder);
        assert_eq!(config.top_buffer, 5.0);
    }
}
