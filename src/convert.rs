//! Conversion entry points and the per-page driver loop.
//!
//! [`convert_document`] is the core: it walks the selected pages of any
//! [`PageSource`] one at a time, turns each into slide images and feeds
//! them to a [`DeckBuilder`] straight away, so at most one page's bitmaps
//! are alive at once. Everything else here resolves input, binds pdfium and
//! moves the blocking work off the async runtime.

use crate::config::{ConversionConfig, PageSelection, SlideMode};
use crate::error::{PageError, Pdf2PptxError};
use crate::output::{
    ConversionOutput, ConversionStats, DocumentMetadata, Inspection, PageReport, PageSections,
};
use crate::pipeline::deck::{pptx_filename, DeckBuilder, DeckOptions};
use crate::pipeline::document::{bind_pdfium, PageSource, PdfiumDocument};
use crate::pipeline::input::{self, InputDocument};
use crate::pipeline::render::render_page;
use crate::pipeline::sections::Detector;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert a PDF file or URL to a slide deck.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(ConversionOutput)` as soon as at least one slide was produced, even
/// if some pages, blocks or sections were skipped (see
/// [`ConversionOutput::pages`]).
///
/// # Errors
/// Only fatal problems: unreadable input, a PDF pdfium cannot open, a
/// selection with no pages, a deck with no slides, or a failure to
/// serialise the deck.
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2PptxError> {
    let input_str = input_str.as_ref();
    info!("Starting conversion: {}", input_str);
    let document = input::resolve_input(input_str, config.download_timeout_secs).await?;
    convert_input(document, config).await
}

/// Convert PDF bytes already in memory.
///
/// `filename` names the output (`report.pdf` → `report.pptx`) and titles
/// the deck when the PDF has no title of its own.
pub async fn convert_from_bytes(
    bytes: Vec<u8>,
    filename: impl Into<String>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2PptxError> {
    let document = InputDocument::from_bytes(bytes, filename)?;
    convert_input(document, config).await
}

/// Convert a resolved document on the blocking thread pool.
///
/// pdfium is a synchronous C library; it never runs on a runtime worker.
pub async fn convert_input(
    document: InputDocument,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2PptxError> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || convert_bytes(&document.bytes, &document.filename, &config))
        .await
        .map_err(|e| Pdf2PptxError::Internal(format!("Conversion task panicked: {}", e)))?
}

/// Convert a PDF and write the deck directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2PptxError> {
    let output = convert(input_str, config).await?;
    output.write_to(output_path.as_ref())?;
    Ok(output)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2PptxError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2PptxError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Bind pdfium, open `bytes` and convert. Blocking.
pub fn convert_bytes(
    bytes: &[u8],
    filename: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2PptxError> {
    let pdfium = bind_pdfium(config.pdfium_library.as_deref())?;
    let document = PdfiumDocument::open(&pdfium, bytes, filename, config.password.as_deref())?;
    convert_document(&document, filename, config)
}

/// Extract PDF metadata without converting content.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<DocumentMetadata, Pdf2PptxError> {
    with_document(input_str.as_ref(), config, |pdf, _| Ok(pdf.metadata())).await
}

/// Dry run: where each selected page would be cut, without rasterising.
pub async fn inspect_sections(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<Vec<PageSections>, Pdf2PptxError> {
    with_document(input_str.as_ref(), config, |pdf, config| {
        document_sections(pdf, config)
    })
    .await
}

/// Metadata and dry-run sections together, from a single read of the input.
pub async fn inspect_document(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<Inspection, Pdf2PptxError> {
    with_document(input_str.as_ref(), config, |pdf, config| {
        document_inspection(pdf, config)
    })
    .await
}

/// Resolve the input once, open it with pdfium off the async runtime and
/// hand the document to `f`.
async fn with_document<T, F>(input_str: &str, config: &ConversionConfig, f: F) -> Result<T, Pdf2PptxError>
where
    T: Send + 'static,
    F: for<'a> FnOnce(&PdfiumDocument<'a>, &ConversionConfig) -> Result<T, Pdf2PptxError> + Send + 'static,
{
    let document = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let config = config.clone();
    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium(config.pdfium_library.as_deref())?;
        let pdf = PdfiumDocument::open(
            &pdfium,
            &document.bytes,
            &document.filename,
            config.password.as_deref(),
        )?;
        f(&pdf, &config)
    })
    .await
    .map_err(|e| Pdf2PptxError::Internal(format!("Inspection task panicked: {}", e)))?
}

/// Metadata plus [`document_sections`] for an opened document.
pub fn document_inspection<S: PageSource + ?Sized>(
    source: &S,
    config: &ConversionConfig,
) -> Result<Inspection, Pdf2PptxError> {
    Ok(Inspection {
        metadata: source.metadata(),
        pages: document_sections(source, config)?,
    })
}

/// Section boundaries for every selected page of `source`.
///
/// A page that cannot be read is reported with its error and no sections.
pub fn document_sections<S: PageSource + ?Sized>(
    source: &S,
    config: &ConversionConfig,
) -> Result<Vec<PageSections>, Pdf2PptxError> {
    let indices = select_pages(source.page_count(), &config.pages)?;
    let detector = Detector::from_config(config);

    Ok(indices
        .into_iter()
        .map(|idx| {
            let page_num = idx + 1;
            let scanned = source
                .page_size(idx)
                .and_then(|size| Ok((size, source.text_blocks(idx)?)));
            match scanned {
                Ok((size, blocks)) => {
                    let scan = detector.detect(&blocks, size);
                    PageSections {
                        page_num,
                        size,
                        sections: scan.sections,
                        errors: scan
                            .invalid_blocks
                            .into_iter()
                            .map(|b| PageError::BlockParse {
                                page: page_num,
                                block: b.index,
                                detail: b.reason,
                            })
                            .collect(),
                    }
                }
                Err(e) => {
                    warn!("{}", e);
                    PageSections {
                        page_num,
                        size: Default::default(),
                        sections: Vec::new(),
                        errors: vec![e],
                    }
                }
            }
        })
        .collect())
}

/// Convert an opened document. Blocking.
///
/// Pages are processed in order, one at a time. A page that cannot be
/// read or rendered is recorded and skipped; a section or slide that fails
/// is recorded and skipped. The run fails only when no slide at all came
/// out, or when the finished deck cannot be serialised.
pub fn convert_document<S: PageSource + ?Sized>(
    source: &S,
    filename: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2PptxError> {
    let total_start = Instant::now();
    let metadata = source.metadata();
    let total_pages = source.page_count();
    info!("PDF has {} pages", total_pages);

    let page_indices = select_pages(total_pages, &config.pages)?;
    let selected = page_indices.len();
    debug!("Selected {} pages for conversion", selected);

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(selected);
    }

    let detector = Detector::from_config(config);
    let title = metadata.title.clone().unwrap_or_else(|| file_stem(filename));
    let mut deck = DeckBuilder::new(DeckOptions {
        title,
        caption_placeholder: config.caption_placeholder,
        ..DeckOptions::default()
    });

    let mut reports = Vec::with_capacity(selected);
    let mut render_ms = 0u64;
    let mut deck_ms = 0u64;

    for idx in page_indices {
        let page_num = idx + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page_num, selected);
        }

        let render_start = Instant::now();
        let rendered = render_page(source, idx, config, &detector);
        render_ms += render_start.elapsed().as_millis() as u64;

        let mut report = PageReport {
            page_num,
            ..PageReport::default()
        };

        match rendered {
            Ok(page) => {
                report.sections_detected = page.sections_detected;
                report.whole_page_fallback = page.whole_page_fallback;
                report.errors = page.errors;

                let deck_start = Instant::now();
                for image in &page.images {
                    match deck.add_image(image) {
                        Ok(_) => report.slides += 1,
                        Err(e) => {
                            warn!("{}", e);
                            report.errors.push(e);
                        }
                    }
                }
                deck_ms += deck_start.elapsed().as_millis() as u64;

                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_complete(page_num, selected, report.slides);
                }
            }
            Err(e) => {
                warn!("Skipping page {}: {}", page_num, e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_error(page_num, selected, &e.to_string());
                }
                report.failed = true;
                report.errors.push(e);
            }
        }
        reports.push(report);
    }

    let failed_pages = reports.iter().filter(|r| r.failed).count();
    let skipped_images: usize = reports.iter().map(PageReport::skipped_images).sum();

    if deck.is_empty() {
        return Err(nothing_to_convert(&reports, config, skipped_images));
    }

    let finish_start = Instant::now();
    let finished = deck.finish()?;
    deck_ms += finish_start.elapsed().as_millis() as u64;

    let stats = ConversionStats {
        total_pages,
        selected_pages: selected,
        processed_pages: selected - failed_pages,
        failed_pages,
        empty_pages: reports.iter().filter(|r| !r.failed && r.slides == 0).count(),
        slide_count: finished.slides.len(),
        skipped_images,
        skipped_blocks: reports.iter().map(PageReport::skipped_blocks).sum(),
        deck_bytes: finished.bytes.len(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms: render_ms,
        deck_duration_ms: deck_ms,
    };

    info!(
        "Conversion complete: {} slides from {}/{} pages, {}ms total",
        stats.slide_count, stats.processed_pages, selected, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(selected, stats.slide_count);
    }

    Ok(ConversionOutput {
        pptx: finished.bytes,
        filename: pptx_filename(filename),
        metadata,
        pages: reports,
        slides: finished.slides,
        stats,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn select_pages(total_pages: usize, selection: &PageSelection) -> Result<Vec<usize>, Pdf2PptxError> {
    let indices = selection.to_indices(total_pages);
    if indices.is_empty() {
        let page = match selection {
            PageSelection::All => 0,
            PageSelection::Single(p) | PageSelection::Range(p, _) => *p,
            PageSelection::Set(pages) => pages.first().copied().unwrap_or(0),
        };
        return Err(Pdf2PptxError::PageOutOfRange {
            page,
            total: total_pages,
        });
    }
    Ok(indices)
}

fn file_stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Presentation".to_string())
}

fn nothing_to_convert(reports: &[PageReport], config: &ConversionConfig, skipped_images: usize) -> Pdf2PptxError {
    let failed = reports.iter().filter(|r| r.failed).count();
    let first_error = reports
        .iter()
        .flat_map(|r| r.errors.iter())
        .find(|e| e.drops_content())
        .map(|e| e.to_string());

    let (cause, hint) = match first_error {
        Some(err) => (
            format!("First error: {err}"),
            "Check that the PDF renders in a viewer, or try a lower --dpi.".to_string(),
        ),
        None if config.mode == SlideMode::Sections => (
            format!("No page contains a heading matching {}.", config.heading),
            "Try --mode auto to fall back to whole pages, or adjust --heading-prefix / --heading-pattern."
                .to_string(),
        ),
        None => (
            "No page produced an image.".to_string(),
            "Try --mode pages.".to_string(),
        ),
    };

    Pdf2PptxError::NothingToConvert {
        pages: reports.len(),
        failed,
        skipped_sections: skipped_images,
        cause,
        hint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_selection_names_the_requested_page() {
        match select_pages(3, &PageSelection::Single(7)) {
            Err(Pdf2PptxError::PageOutOfRange { page, total }) => assert_eq!((page, total), (7, 3)),
            other => panic!("unexpected: {other:?}"),
        }
        match select_pages(3, &PageSelection::Set(vec![9, 4])) {
            Err(Pdf2PptxError::PageOutOfRange { page, .. }) => assert_eq!(page, 9),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(select_pages(3, &PageSelection::Range(2, 9)).unwrap(), vec![1, 2]);
    }

    #[test]
    fn deck_title_falls_back_to_stem() {
        assert_eq!(file_stem("Q3 Report.pdf"), "Q3 Report");
        assert_eq!(file_stem("notes"), "notes");
        assert_eq!(file_stem(""), "Presentation");
    }

    #[test]
    fn headingless_document_suggests_auto_mode() {
        let reports = vec![PageReport {
            page_num: 1,
            ..Default::default()
        }];
        let err = nothing_to_convert(&reports, &ConversionConfig::default(), 0).to_string();
        assert!(err.contains("prefix \"Section \""), "{err}");
        assert!(err.contains("--mode auto"), "{err}");
    }

    #[test]
    fn first_lost_content_is_the_cause() {
        let reports = vec![PageReport {
            page_num: 2,
            failed: true,
            errors: vec![PageError::PageRead {
                page: 2,
                detail: "bad xref".into(),
            }],
            ..Default::default()
        }];
        match nothing_to_convert(&reports, &ConversionConfig::default(), 0) {
            Pdf2PptxError::NothingToConvert { failed, cause, .. } => {
                assert_eq!(failed, 1);
                assert!(cause.contains("bad xref"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
