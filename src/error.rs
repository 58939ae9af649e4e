//! Error types for the edgequake-pdf2pptx library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2PptxError`] — **Fatal**: the conversion cannot proceed at all
//!   (bad input file, unreadable PDF, the deck could not be serialised).
//!   Returned as `Err(Pdf2PptxError)` from the top-level `convert*` functions.
//!
//! * [`PageError`] — **Non-fatal**: a single page, text block or section
//!   failed but the rest of the document is fine. Collected into
//!   [`crate::output::PageReport`] so callers can inspect partial success
//!   instead of losing the whole deck to one bad page.
//!
//! The caller decides the tolerance: [`crate::output::ConversionOutput::into_result`]
//! turns any recorded page failure into an error for strict callers.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2pptx library.
#[derive(Debug, Error)]
pub enum Pdf2PptxError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they are not a PDF.
    #[error("'{name}' is not a PDF\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: Vec<u8> },

    // ── Document errors ───────────────────────────────────────────────────
    /// The PDF could not be opened or parsed.
    #[error("Could not open PDF '{name}': {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    DocumentOpen { name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{name}'")]
    WrongPassword { name: String },

    /// The page selection matched no page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// Every page was attempted but not a single slide came out of it.
    #[error(
        "No slides produced from {pages} page(s) ({failed} failed, {skipped_sections} section(s) skipped).\n{cause}\n{hint}"
    )]
    NothingToConvert {
        pages: usize,
        failed: usize,
        skipped_sections: usize,
        cause: String,
        hint: String,
    },

    /// Some slides were produced but at least one page, block or section failed.
    ///
    /// Returned by [`crate::output::ConversionOutput::into_result`] when
    /// the caller wants to treat any recorded failure as an error.
    #[error("{failed} of {total} pages reported errors during conversion")]
    PartialFailure { failed: usize, total: usize },

    // ── Deck errors ───────────────────────────────────────────────────────
    /// The presentation package could not be assembled or written to memory.
    #[error("Failed to serialise the presentation: {detail}")]
    DeckSerialization { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output .pptx file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Rendering needs a pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or pass --pdfium-lib).\n\
  • Place libpdfium next to the binary or in the working directory.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error scoped to one page, block or section.
///
/// Page numbers are 1-indexed, block and section indices 0-indexed within
/// their page. Messages number sections from 1, matching slide alt text and
/// `--inspect-only`.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The page could not be loaded or its text could not be extracted.
    /// The page is skipped.
    #[error("Page {page}: could not be read: {detail}")]
    PageRead { page: usize, detail: String },

    /// One text block carried unusable coordinates. Only that block is skipped.
    #[error("Page {page}: block {block} skipped: {detail}")]
    BlockParse {
        page: usize,
        block: usize,
        detail: String,
    },

    /// A page or section could not be rasterised, encoded or placed on a
    /// slide. That slide is omitted from the deck.
    #[error("Page {page}{}: image skipped: {detail}", .section.map(|s| format!(", section {}", s + 1)).unwrap_or_default())]
    ImageRender {
        page: usize,
        section: Option<usize>,
        detail: String,
    },
}

impl PageError {
    /// The 1-indexed page this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::PageRead { page, .. }
            | PageError::BlockParse { page, .. }
            | PageError::ImageRender { page, .. } => *page,
        }
    }

    /// Whether the error cost the deck at least one slide.
    ///
    /// A skipped block only narrows detection; the page still renders.
    pub fn drops_content(&self) -> bool {
        !matches!(self, PageError::BlockParse { .. })
    }
}
