//! Conversion results: the deck bytes plus a per-page report.
//!
//! Everything except the deck itself serialises to JSON, which is what
//! `pdf2pptx --json` prints.

use crate::error::{PageError, Pdf2PptxError};
use crate::pipeline::deck::SlideSummary;
use crate::pipeline::sections::{PageSize, Section};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Descriptive metadata read from the PDF.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// What one selected page contributed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Sections the detector found on this page.
    pub sections_detected: usize,
    /// Slides this page added to the deck.
    pub slides: usize,
    /// The page had no heading and became one whole-page slide.
    pub whole_page_fallback: bool,
    /// The page was lost entirely.
    pub failed: bool,
    /// Every recovered failure on this page, in the order it happened.
    pub errors: Vec<PageError>,
}

impl PageReport {
    /// Sections or images that were detected but did not make it into the deck.
    pub fn skipped_images(&self) -> usize {
        self.errors
            .iter()
            .filter(|e| matches!(e, PageError::ImageRender { .. }))
            .count()
    }

    pub fn skipped_blocks(&self) -> usize {
        self.errors
            .iter()
            .filter(|e| matches!(e, PageError::BlockParse { .. }))
            .count()
    }
}

/// Aggregate counters for a conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages the selection picked.
    pub selected_pages: usize,
    /// Selected pages that were read (with or without slides).
    pub processed_pages: usize,
    /// Selected pages that could not be read or rendered at all.
    pub failed_pages: usize,
    /// Selected pages that produced no slide.
    pub empty_pages: usize,
    pub slide_count: usize,
    pub skipped_images: usize,
    pub skipped_blocks: usize,
    pub deck_bytes: usize,
    pub total_duration_ms: u64,
    pub render_duration_ms: u64,
    pub deck_duration_ms: u64,
}

/// A finished conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The `.pptx` package.
    #[serde(skip)]
    pub pptx: Vec<u8>,
    /// Suggested output name: the input name with a `.pptx` extension.
    pub filename: String,
    pub metadata: DocumentMetadata,
    pub pages: Vec<PageReport>,
    pub slides: Vec<SlideSummary>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Treat any recorded page failure as an error.
    pub fn into_result(self) -> Result<Self, Pdf2PptxError> {
        let failed = self.pages.iter().filter(|p| !p.errors.is_empty()).count();
        if failed > 0 {
            Err(Pdf2PptxError::PartialFailure {
                failed,
                total: self.pages.len(),
            })
        } else {
            Ok(self)
        }
    }

    /// Every recovered failure, in page order.
    pub fn errors(&self) -> impl Iterator<Item = &PageError> {
        self.pages.iter().flat_map(|p| p.errors.iter())
    }

    /// Write the deck to `path` atomically: `<path>.tmp`, then rename.
    ///
    /// Parent directories are created as needed.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), Pdf2PptxError> {
        write_atomic(path.as_ref(), &self.pptx)
    }
}

pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Pdf2PptxError> {
    let fail = |source: std::io::Error| Pdf2PptxError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(fail)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    std::fs::write(&tmp, bytes).map_err(fail)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(fail(e));
    }
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Dry-run result for one page: where the slides would be cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSections {
    pub page_num: usize,
    pub size: PageSize,
    pub sections: Vec<Section>,
    pub errors: Vec<PageError>,
}

/// Everything `--inspect-only` reports: document metadata and the dry-run
/// sections of each selected page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    pub metadata: DocumentMetadata,
    pub pages: Vec<PageSections>,
}
