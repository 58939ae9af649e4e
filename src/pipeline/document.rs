//! The document contract the pipeline consumes, and its pdfium implementation.
//!
//! The conversion loop never talks to pdfium directly. It asks a
//! [`PageSource`] for page sizes, positioned text and page bitmaps, which
//! keeps section detection and deck building testable with an in-memory
//! document and lets another rendering backend slot in later.
//!
//! pdfium reports coordinates with the origin at the bottom-left of the
//! page. [`PdfiumDocument`] flips them so everything downstream works with
//! a top-left origin.

use crate::error::{PageError, Pdf2PptxError};
use crate::output::DocumentMetadata;
use crate::pipeline::sections::{PageSize, RawBlock};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What the pipeline needs from an opened document.
///
/// Page indices are 0-based. Errors are page-scoped: a failing page never
/// poisons the others.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Descriptive metadata. Cheap; called once per conversion.
    fn metadata(&self) -> DocumentMetadata;

    /// Page dimensions in points.
    fn page_size(&self, index: usize) -> Result<PageSize, PageError>;

    /// Positioned text blocks in extraction order, origin top-left.
    fn text_blocks(&self, index: usize) -> Result<Vec<RawBlock>, PageError>;

    /// Rasterise the whole page at `dpi`.
    ///
    /// The bitmap must measure `page_size * dpi / 72` pixels per side
    /// (rounded), so clip rectangles scale onto it linearly.
    fn render_page(&self, index: usize, dpi: u32) -> Result<DynamicImage, PageError>;
}

// ── pdfium binding ───────────────────────────────────────────────────────

/// Bind to a pdfium shared library.
///
/// Tried in order: `explicit`, `PDFIUM_LIB_PATH`, the working directory,
/// the directory of the running executable, then the system library paths.
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, Pdf2PptxError> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(p) = explicit {
        candidates.push(p.to_path_buf());
    }
    if let Ok(p) = std::env::var("PDFIUM_LIB_PATH") {
        if !p.is_empty() {
            candidates.push(PathBuf::from(p));
        }
    }
    candidates.push(PathBuf::from(Pdfium::pdfium_platform_library_name_at_path("./")));
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|e| e.parent().map(|d| d.to_string_lossy().to_string()))
    {
        candidates.push(PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(
            dir.as_str(),
        )));
    }

    let mut failures = Vec::new();
    for path in &candidates {
        match Pdfium::bind_to_library(path) {
            Ok(bindings) => {
                debug!("Bound pdfium from {}", path.display());
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => failures.push(format!("{}: {:?}", path.display(), e)),
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| {
            failures.push(format!("system library: {:?}", e));
            Pdf2PptxError::PdfiumBindingFailed(failures.join("; "))
        })
}

// ── pdfium-backed PageSource ─────────────────────────────────────────────

/// An opened PDF, borrowed from a bound [`Pdfium`].
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumDocument<'a> {
    /// Open a PDF held in memory.
    ///
    /// `name` only labels errors. pdfium does not say why a load failed in
    /// a structured way, so password problems are recognised from the
    /// error text.
    pub fn open(
        pdfium: &'a Pdfium,
        bytes: &'a [u8],
        name: &str,
        password: Option<&'a str>,
    ) -> Result<Self, Pdf2PptxError> {
        let document = pdfium.load_pdf_from_byte_slice(bytes, password).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    Pdf2PptxError::WrongPassword { name: name.to_string() }
                } else {
                    Pdf2PptxError::PasswordRequired { name: name.to_string() }
                }
            } else {
                Pdf2PptxError::DocumentOpen {
                    name: name.to_string(),
                    detail: err_str,
                }
            }
        })?;

        info!("PDF loaded: {} pages", document.pages().len());
        Ok(Self { document })
    }

    fn page(&self, index: usize) -> Result<PdfPage<'_>, PageError> {
        self.document
            .pages()
            .get(index as PdfPageIndex)
            .map_err(|e| PageError::PageRead {
                page: index + 1,
                detail: format!("{:?}", e),
            })
    }
}

impl PageSource for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn metadata(&self) -> DocumentMetadata {
        let metadata = self.document.metadata();
        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata
                .get(tag)
                .map(|t| t.value().trim().to_string())
                .filter(|v| !v.is_empty())
        };

        DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            page_count: self.page_count(),
            pdf_version: format!("{:?}", self.document.version()),
        }
    }

    fn page_size(&self, index: usize) -> Result<PageSize, PageError> {
        let page = self.page(index)?;
        Ok(PageSize::new(page.width().value as f64, page.height().value as f64))
    }

    fn text_blocks(&self, index: usize) -> Result<Vec<RawBlock>, PageError> {
        let page = self.page(index)?;
        let page_height = page.height().value as f64;
        let text = page.text().map_err(|e| PageError::PageRead {
            page: index + 1,
            detail: format!("text extraction failed: {:?}", e),
        })?;

        let segments: Vec<RawBlock> = text
            .segments()
            .iter()
            .map(|segment| {
                let b = segment.bounds();
                RawBlock::new(
                    [
                        b.left().value as f64,
                        page_height - b.top().value as f64,
                        b.right().value as f64,
                        page_height - b.bottom().value as f64,
                    ],
                    segment.text(),
                )
            })
            .collect();

        let blocks = merge_line_segments(segments);
        debug!("Page {}: {} text blocks", index + 1, blocks.len());
        Ok(blocks)
    }

    fn render_page(&self, index: usize, dpi: u32) -> Result<DynamicImage, PageError> {
        let page = self.page(index)?;
        let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| PageError::ImageRender {
                page: index + 1,
                section: None,
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

/// Horizontal gap, as a fraction of line height, that separates two words.
const WORD_GAP: f64 = 0.15;

/// Join pdfium text segments that sit on the same line into one block.
///
/// pdfium splits a line wherever the font or size changes, so a bold
/// `"Section"` followed by a regular `"3 Results"` arrives as two segments.
/// Consecutive segments whose vertical extents overlap by at least half the
/// shorter one are merged. A space is inserted only across a visible gap:
/// a style change inside a word (a drop cap, a coloured first letter)
/// leaves the pieces touching, and they are joined directly.
pub(crate) fn merge_line_segments(segments: Vec<RawBlock>) -> Vec<RawBlock> {
    let mut blocks: Vec<RawBlock> = Vec::with_capacity(segments.len());
    for seg in segments {
        if let Some(last) = blocks.last_mut() {
            if same_line(&last.bbox, &seg.bbox) {
                let [x0, y0, x1, y1] = last.bbox;
                let line_height = (y1 - y0).max(seg.bbox[3] - seg.bbox[1]);
                let gap = seg.bbox[0] - x1;
                last.bbox = [
                    x0.min(seg.bbox[0]),
                    y0.min(seg.bbox[1]),
                    x1.max(seg.bbox[2]),
                    y1.max(seg.bbox[3]),
                ];
                let has_space = last.text.ends_with(char::is_whitespace)
                    || seg.text.starts_with(char::is_whitespace);
                if gap > WORD_GAP * line_height && !has_space && !last.text.is_empty() {
                    last.text.push(' ');
                }
                last.text.push_str(&seg.text);
                continue;
            }
        }
        blocks.push(seg);
    }
    blocks
}

fn same_line(a: &[f64; 4], b: &[f64; 4]) -> bool {
    let overlap = a[3].min(b[3]) - a[1].max(b[1]);
    let shorter = (a[3] - a[1]).min(b[3] - b[1]);
    shorter > 0.0 && overlap >= shorter / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_on_one_line_merge() {
        let segs = vec![
            RawBlock::new([72.0, 100.0, 120.0, 114.0], "Section"),
            RawBlock::new([124.0, 101.0, 200.0, 113.0], "3 Results"),
            RawBlock::new([72.0, 130.0, 300.0, 142.0], "Body text"),
        ];
        let blocks = merge_line_segments(segs);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "Section 3 Results");
        assert_eq!(blocks[0].bbox, [72.0, 100.0, 200.0, 114.0]);
        assert_eq!(blocks[1].text, "Body text");
    }

    #[test]
    fn existing_whitespace_is_not_doubled() {
        let segs = vec![
            RawBlock::new([0.0, 10.0, 50.0, 20.0], "Section "),
            RawBlock::new([50.0, 10.0, 60.0, 20.0], "1"),
        ];
        assert_eq!(merge_line_segments(segs)[0].text, "Section 1");
    }

    #[test]
    fn degenerate_segments_do_not_merge() {
        let segs = vec![
            RawBlock::new([0.0, 10.0, 50.0, 10.0], "a"),
            RawBlock::new([0.0, 10.0, 50.0, 10.0], "b"),
        ];
        assert_eq!(merge_line_segments(segs).len(), 2);
    }

    #[test]
    fn letter_split_by_style_joins_without_space() {
        let segs = vec![
            RawBlock::new([72.0, 100.0, 84.0, 116.0], "S"),
            RawBlock::new([84.0, 100.0, 160.0, 116.0], "ection 2 Results"),
        ];
        let blocks = merge_line_segments(segs);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "Section 2 Results");
        assert_eq!(blocks[0].bbox, [72.0, 100.0, 160.0, 116.0]);
    }

    #[test]
    fn kerned_overlap_is_not_a_word_break() {
        let segs = vec![
            RawBlock::new([72.0, 100.0, 84.5, 114.0], "Sec"),
            RawBlock::new([84.0, 100.0, 120.0, 114.0], "tion 4"),
        ];
        assert_eq!(merge_line_segments(segs)[0].text, "Section 4");
    }
}
