//! # edgequake-pdf2pptx
//!
//! Turn a PDF report into a slide deck, one picture per slide.
//!
//! Reports written as a run of numbered sections ("Section 1 Overview",
//! "Section 2 Results", …) present well when each section becomes its own
//! slide. This crate finds those headings in each page's text layout, cuts
//! the page into horizontal slices at them, rasterises every slice and
//! places it, scaled and centred, on a 10in × 7.5in slide. Pages can also
//! go onto slides whole.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     read a local file or download from URL, into memory
//!  ├─ 2. Document  open with pdfium; text blocks + page size per page
//!  ├─ 3. Sections  headings → vertical slices (explicit fold per page)
//!  ├─ 4. Render    one bitmap per page, one crop per section
//!  ├─ 5. Deck      fit/fill each image onto its own slide
//!  └─ 6. Package   OOXML .pptx bytes + per-page report
//! ```
//!
//! Nothing is written to disk until the caller asks for it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2pptx::{convert, ConversionConfig, SlideMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .mode(SlideMode::Auto)
//!         .build()?;
//!     let output = convert("report.pdf", &config).await?;
//!     output.write_to(&output.filename)?;
//!     eprintln!("{} slides, {} pages skipped",
//!         output.stats.slide_count,
//!         output.stats.failed_pages);
//!     Ok(())
//! }
//! ```
//!
//! Section detection works without pdfium:
//!
//! ```rust
//! use edgequake_pdf2pptx::{detect_sections, RawBlock};
//!
//! let blocks = vec![
//!     RawBlock::new([72.0, 100.0, 300.0, 114.0], "Section 1 Overview"),
//!     RawBlock::new([72.0, 130.0, 500.0, 380.0], "Body text"),
//!     RawBlock::new([72.0, 400.0, 300.0, 414.0], "Section 2 Results"),
//! ];
//! let sections = detect_sections(&blocks, 612.0, 600.0, 20.0);
//! assert_eq!(sections.len(), 2);
//! assert_eq!(sections[0].start.y0, 80.0);
//! assert_eq!(sections[0].end.y1, 400.0);
//! assert_eq!(sections[1].end.y1, 600.0);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2pptx` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-pdf2pptx = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BlockOrder, ConversionConfig, ConversionConfigBuilder, HeadingMatcher, PageSelection, SlideMode};
pub use convert::{
    convert, convert_bytes, convert_document, convert_from_bytes, convert_input, convert_sync, convert_to_file,
    document_inspection, document_sections, inspect, inspect_document, inspect_sections,
};
pub use error::{PageError, Pdf2PptxError};
pub use output::{ConversionOutput, ConversionStats, DocumentMetadata, Inspection, PageReport, PageSections};
pub use pipeline::deck::{build_deck, pptx_filename, DeckBuilder, DeckOptions, Placement};
pub use pipeline::document::PageSource;
pub use pipeline::render::RenderedImage;
pub use pipeline::sections::{detect_sections, PageSize, RawBlock, Rect, Section};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
