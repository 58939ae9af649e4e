//! Page rasterisation: turn one page into the images that become slides.
//!
//! A page is rendered once at the configured DPI and each section is cropped
//! out of that bitmap, so a page with five sections costs one pdfium render,
//! not five. Nothing touches the filesystem; bitmaps go straight to the deck
//! builder.

use crate::config::{ConversionConfig, SlideMode};
use crate::error::PageError;
use crate::pipeline::deck::Placement;
use crate::pipeline::document::PageSource;
use crate::pipeline::sections::{Detector, PageSize, Rect};
use image::DynamicImage;
use tracing::{debug, warn};

/// A bitmap bound for one slide, tagged with where it came from.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub image: DynamicImage,
    pub placement: Placement,
    /// 1-indexed page number.
    pub page: usize,
    /// 0-indexed section within the page; `None` for whole-page images.
    pub section: Option<usize>,
}

/// Everything one page produced.
#[derive(Debug, Default)]
pub struct PageRender {
    /// Images in top-to-bottom order.
    pub images: Vec<RenderedImage>,
    /// Sections the detector found, including any that failed to render.
    pub sections_detected: usize,
    /// Recovered failures: skipped blocks and sections.
    pub errors: Vec<PageError>,
    /// The page had no heading and was rendered whole instead.
    pub whole_page_fallback: bool,
}

/// Produce the slide images for page `index` (0-based).
///
/// Returns `Err` only when the whole page is lost: it cannot be read, its
/// text cannot be extracted, or its bitmap cannot be rendered. A bad block
/// or a bad section is recorded in [`PageRender::errors`] and skipped.
pub fn render_page<S: PageSource + ?Sized>(
    source: &S,
    index: usize,
    config: &ConversionConfig,
    detector: &Detector,
) -> Result<PageRender, PageError> {
    let page_num = index + 1;
    let size = source.page_size(index)?;

    if config.mode == SlideMode::WholePage {
        return render_whole_page(source, index, config.dpi);
    }

    let blocks = source.text_blocks(index)?;
    let scan = detector.detect(&blocks, size);

    let mut errors: Vec<PageError> = scan
        .invalid_blocks
        .iter()
        .map(|b| {
            warn!("Skipping block {} on page {}: {}", b.index, page_num, b.reason);
            PageError::BlockParse {
                page: page_num,
                block: b.index,
                detail: b.reason.clone(),
            }
        })
        .collect();
    if scan.collapsed_sections > 0 {
        warn!(
            "Page {}: dropped {} section(s) ending above their own start",
            page_num, scan.collapsed_sections
        );
    }

    if scan.sections.is_empty() {
        if config.mode == SlideMode::Auto {
            debug!("Page {}: no heading, falling back to whole page", page_num);
            let mut render = render_whole_page(source, index, config.dpi)?;
            render.errors = errors;
            render.whole_page_fallback = true;
            return Ok(render);
        }
        debug!("Page {}: no heading, contributes no slides", page_num);
        return Ok(PageRender {
            errors,
            ..PageRender::default()
        });
    }

    let page_image = source.render_page(index, config.dpi)?;

    let mut images = Vec::with_capacity(scan.sections.len());
    for (i, section) in scan.sections.iter().enumerate() {
        match crop_clip(&page_image, section.clip(), size) {
            Ok(image) => {
                debug!(
                    "Page {} section {}: clip {} → {}x{} px",
                    page_num,
                    i + 1,
                    section.clip(),
                    image.width(),
                    image.height()
                );
                images.push(RenderedImage {
                    image,
                    placement: Placement::Fit,
                    page: page_num,
                    section: Some(i),
                });
            }
            Err(detail) => {
                warn!("Failed to render section {} on page {}: {}", i + 1, page_num, detail);
                errors.push(PageError::ImageRender {
                    page: page_num,
                    section: Some(i),
                    detail,
                });
            }
        }
    }

    Ok(PageRender {
        images,
        sections_detected: scan.sections.len(),
        errors,
        whole_page_fallback: false,
    })
}

fn render_whole_page<S: PageSource + ?Sized>(
    source: &S,
    index: usize,
    dpi: u32,
) -> Result<PageRender, PageError> {
    let image = source.render_page(index, dpi)?;
    Ok(PageRender {
        images: vec![RenderedImage {
            image,
            placement: Placement::Fill,
            page: index + 1,
            section: None,
        }],
        ..PageRender::default()
    })
}

/// Cut `clip` (page points) out of a full-page bitmap.
///
/// The point-to-pixel scale is taken from the bitmap itself, so rounding in
/// the renderer never shifts a boundary by more than a pixel. Edges are
/// widened outward to whole pixels and clamped to the bitmap.
pub fn crop_clip(page_image: &DynamicImage, clip: Rect, page: PageSize) -> Result<DynamicImage, String> {
    if page.width <= 0.0 || page.height <= 0.0 {
        return Err(format!("page has no area ({} x {} pt)", page.width, page.height));
    }
    let (w, h) = (page_image.width(), page_image.height());
    let sx = w as f64 / page.width;
    let sy = h as f64 / page.height;

    let to_px = |v: f64, limit: u32| -> u32 { v.clamp(0.0, limit as f64) as u32 };
    let left = to_px((clip.x0 * sx).floor(), w);
    let top = to_px((clip.y0 * sy).floor(), h);
    let right = to_px((clip.x1 * sx).ceil(), w);
    let bottom = to_px((clip.y1 * sy).ceil(), h);

    if right <= left || bottom <= top {
        return Err(format!("clip {clip} covers no pixels"));
    }
    Ok(page_image.crop_imm(left, top, right - left, bottom - top))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn crop_scales_points_to_pixels() {
        // 100x200 pt page at 150 dpi.
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(208, 417, Rgb([255, 255, 255])));
        let page = PageSize::new(100.0, 200.0);
        let out = crop_clip(&img, Rect::new(0.0, 50.0, 100.0, 200.0), page).unwrap();
        assert_eq!(out.width(), 208);
        // 50pt * 417/200 = 104.25 → floor 104, bottom is the full height.
        assert_eq!(out.height(), 417 - 104);
    }

    #[test]
    fn crop_clamps_to_bitmap() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(100, 100));
        let page = PageSize::new(100.0, 100.0);
        let out = crop_clip(&img, Rect::new(-10.0, 90.0, 500.0, 140.0), page).unwrap();
        assert_eq!((out.width(), out.height()), (100, 10));
    }

    #[test]
    fn empty_clip_is_an_error() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(100, 100));
        let page = PageSize::new(100.0, 100.0);
        assert!(crop_clip(&img, Rect::new(0.0, 100.0, 100.0, 100.0), page).is_err());
        assert!(crop_clip(&img, Rect::new(0.0, 0.0, 10.0, 10.0), PageSize::new(0.0, 10.0)).is_err());
    }
}
