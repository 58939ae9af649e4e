//! Configuration types for PDF-to-PPTX conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. One struct holds every knob so two
//! runs can be diffed by comparing their configs.

use crate::error::Pdf2PptxError;
use crate::progress::ProgressCallback;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Prefix that marks a heading block unless configured otherwise.
pub const DEFAULT_HEADING_PREFIX: &str = "Section ";

/// Configuration for a PDF-to-PPTX conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2pptx::{ConversionConfig, SlideMode};
///
/// let config = ConversionConfig::builder()
///     .dpi(150)
///     .top_buffer(20.0)
///     .mode(SlideMode::Auto)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Rendering DPI used when rasterising pages and sections. Range: 72–400. Default: 150.
    ///
    /// Bitmaps come out at `points * dpi / 72` pixels per side. 150 DPI keeps
    /// body text legible on a projected slide without bloating the deck.
    pub dpi: u32,

    /// Padding in points added above each detected heading. Default: 20.
    ///
    /// Catches a divider rule or spacing drawn just above the heading text.
    /// The buffered start is clamped to the page top.
    pub top_buffer: f64,

    /// What becomes a slide. Default: [`SlideMode::Sections`].
    pub mode: SlideMode,

    /// Rule deciding whether a text block is a heading. Default: prefix `"Section "`.
    pub heading: HeadingMatcher,

    /// Order in which text blocks are scanned. Default: [`BlockOrder::TopToBottom`].
    pub block_order: BlockOrder,

    /// Add an empty 14pt text box under each fitted image for speaker
    /// annotations. Default: true.
    pub caption_placeholder: bool,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Explicit path to the pdfium shared library.
    ///
    /// When `None`, `PDFIUM_LIB_PATH`, the working directory and the system
    /// library paths are tried in that order.
    pub pdfium_library: Option<PathBuf>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            top_buffer: 20.0,
            mode: SlideMode::default(),
            heading: HeadingMatcher::default(),
            block_order: BlockOrder::default(),
            caption_placeholder: true,
            pages: PageSelection::default(),
            password: None,
            pdfium_library: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("top_buffer", &self.top_buffer)
            .field("mode", &self.mode)
            .field("heading", &self.heading)
            .field("block_order", &self.block_order)
            .field("caption_placeholder", &self.caption_placeholder)
            .field("pages", &self.pages)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_library", &self.pdfium_library)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn top_buffer(mut self, points: f64) -> Self {
        self.config.top_buffer = points;
        self
    }

    pub fn mode(mut self, mode: SlideMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn heading(mut self, heading: HeadingMatcher) -> Self {
        self.config.heading = heading;
        self
    }

    /// Match headings by literal prefix of the trimmed block text.
    pub fn heading_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.heading = HeadingMatcher::Prefix(prefix.into());
        self
    }

    /// Match headings with a regular expression. Invalid patterns surface
    /// from [`build`](Self::build).
    pub fn heading_pattern(self, pattern: &str) -> Result<Self, Pdf2PptxError> {
        let heading = HeadingMatcher::pattern(pattern)?;
        Ok(self.heading(heading))
    }

    pub fn block_order(mut self, order: BlockOrder) -> Self {
        self.config.block_order = order;
        self
    }

    pub fn caption_placeholder(mut self, v: bool) -> Self {
        self.config.caption_placeholder = v;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2PptxError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(Pdf2PptxError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if !c.top_buffer.is_finite() || c.top_buffer < 0.0 {
            return Err(Pdf2PptxError::InvalidConfig(format!(
                "Top buffer must be a non-negative number of points, got {}",
                c.top_buffer
            )));
        }
        if let HeadingMatcher::Prefix(ref p) = c.heading {
            if p.trim().is_empty() {
                return Err(Pdf2PptxError::InvalidConfig(
                    "Heading prefix must contain a visible character".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// What a page turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlideMode {
    /// One fitted, centred slide per detected section. Pages without a
    /// heading contribute nothing. (default)
    #[default]
    Sections,
    /// One slide per page, stretched to fill the slide.
    WholePage,
    /// Sections where the page has headings, a whole-page slide otherwise.
    Auto,
}

/// Decides whether a block's text marks the start of a section.
#[derive(Clone)]
pub enum HeadingMatcher {
    /// The trimmed text starts with this literal prefix.
    Prefix(String),
    /// The trimmed text matches this regular expression.
    Pattern(Regex),
}

impl Default for HeadingMatcher {
    fn default() -> Self {
        HeadingMatcher::Prefix(DEFAULT_HEADING_PREFIX.to_string())
    }
}

impl fmt::Debug for HeadingMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeadingMatcher::Prefix(p) => f.debug_tuple("Prefix").field(p).finish(),
            HeadingMatcher::Pattern(r) => f.debug_tuple("Pattern").field(&r.as_str()).finish(),
        }
    }
}

impl fmt::Display for HeadingMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeadingMatcher::Prefix(p) => write!(f, "prefix {p:?}"),
            HeadingMatcher::Pattern(r) => write!(f, "pattern /{}/", r.as_str()),
        }
    }
}

impl HeadingMatcher {
    /// Compile a regex matcher.
    pub fn pattern(pattern: &str) -> Result<Self, Pdf2PptxError> {
        Regex::new(pattern)
            .map(HeadingMatcher::Pattern)
            .map_err(|e| Pdf2PptxError::InvalidConfig(format!("Invalid heading pattern: {e}")))
    }

    /// Whether `text` is a heading. Surrounding whitespace is ignored.
    pub fn is_heading(&self, text: &str) -> bool {
        let text = text.trim();
        match self {
            HeadingMatcher::Prefix(p) => text.starts_with(p.as_str()),
            HeadingMatcher::Pattern(r) => r.is_match(text),
        }
    }
}

/// Order in which a page's text blocks are scanned for headings.
///
/// Text extraction usually yields blocks top-to-bottom, but multi-column
/// producers interleave columns. Sorting by `y0` keeps every section's end
/// below its start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlockOrder {
    /// Stable sort by top edge before scanning. (default)
    #[default]
    TopToBottom,
    /// Scan exactly as extracted.
    AsExtracted,
}

/// Specifies which pages of the PDF to convert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page (1-indexed).
    Single(usize),
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    ///
    /// Pages outside `1..=total_pages` are dropped silently.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let in_range = |p: usize| p >= 1 && p <= total_pages;
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => in_range(*p).then(|| p - 1).into_iter().collect(),
            PageSelection::Range(start, end) => ((*start).max(1) - 1..(*end).min(total_pages)).collect(),
            PageSelection::Set(pages) => pages.iter().copied().filter(|&p| in_range(p)).map(|p| p - 1).collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
