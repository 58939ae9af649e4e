//! Deck building: place each rendered image on its own slide.
//!
//! Sizes are English Metric Units (EMU), the integer unit OOXML uses for
//! every length: 914 400 EMU per inch, 12 700 per point. The slide canvas
//! is fixed at 10in × 7.5in.
//!
//! ## Placement
//!
//! * [`Placement::Fit`] scales the image to touch the slide on one axis,
//!   keeps its aspect ratio and centres it. Used for section images, which
//!   are usually much wider than tall.
//! * [`Placement::Fill`] stretches the image over the whole slide. Used for
//!   whole pages, which are close to the slide's aspect ratio already.
//!
//! Slides keep the order images were added in, which is page order, then
//! section order within a page.

use crate::error::{PageError, Pdf2PptxError};
use crate::pipeline::encode::encode_png;
use crate::pipeline::pptx::{self, PackageSlide, PresentationInfo};
use crate::pipeline::render::RenderedImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// EMU per inch.
pub const EMU_PER_INCH: i64 = 914_400;
/// EMU per typographic point.
pub const EMU_PER_POINT: i64 = 12_700;

/// Slide canvas: 10in × 7.5in.
pub const SLIDE_SIZE: SlideSize = SlideSize {
    width: 10 * EMU_PER_INCH,
    height: 15 * EMU_PER_INCH / 2,
};

/// How an image is laid onto its slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    /// Preserve aspect ratio, touch the slide on one axis, centre.
    Fit,
    /// Stretch to cover the slide exactly.
    Fill,
}

/// Slide dimensions in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideSize {
    pub width: i64,
    pub height: i64,
}

impl SlideSize {
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Position and size of a shape on a slide, in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// Scale `image_width × image_height` pixels into `slide`, keeping the aspect
/// ratio, and centre it.
///
/// An image wider than the slide gets the full slide width; a narrower one
/// the full slide height. An image with exactly the slide's aspect ratio
/// fills the slide.
///
/// Returns `None` for an image with no pixels.
pub fn fit_frame(image_width: u32, image_height: u32, slide: SlideSize) -> Option<Frame> {
    if image_width == 0 || image_height == 0 {
        return None;
    }
    let aspect = image_width as f64 / image_height as f64;
    let (width, height) = if aspect > slide.aspect() {
        (slide.width, (slide.width as f64 / aspect).round() as i64)
    } else {
        ((slide.height as f64 * aspect).round() as i64, slide.height)
    };
    Some(Frame {
        x: (slide.width - width) / 2,
        y: (slide.height - height) / 2,
        width,
        height,
    })
}

/// Cover the whole slide, ignoring the image's aspect ratio.
pub fn fill_frame(slide: SlideSize) -> Frame {
    Frame {
        x: 0,
        y: 0,
        width: slide.width,
        height: slide.height,
    }
}

/// The empty annotation box under a fitted image: 1in from the left and
/// bottom edges, 1in tall, spanning the slide minus 1in on each side.
pub fn caption_frame(slide: SlideSize) -> Frame {
    Frame {
        x: EMU_PER_INCH,
        y: slide.height - EMU_PER_INCH,
        width: slide.width - 2 * EMU_PER_INCH,
        height: EMU_PER_INCH,
    }
}

/// One slide of the finished deck, for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideSummary {
    /// 1-indexed slide number.
    pub slide_num: usize,
    /// 1-indexed source page.
    pub page: usize,
    /// 0-indexed section within the page; `None` for whole-page slides.
    pub section: Option<usize>,
    pub placement: Placement,
    pub frame: Frame,
    pub image_width: u32,
    pub image_height: u32,
}

/// Options for the finished presentation.
#[derive(Debug, Clone)]
pub struct DeckOptions {
    /// Document title written to the package properties.
    pub title: String,
    /// Add the empty caption box under fitted images.
    pub caption_placeholder: bool,
    pub slide_size: SlideSize,
}

impl Default for DeckOptions {
    fn default() -> Self {
        Self {
            title: "Presentation".to_string(),
            caption_placeholder: true,
            slide_size: SLIDE_SIZE,
        }
    }
}

/// A serialised presentation.
#[derive(Debug, Clone)]
pub struct Deck {
    /// The `.pptx` package.
    pub bytes: Vec<u8>,
    pub slides: Vec<SlideSummary>,
}

/// Collects slides one image at a time, then writes the package.
#[derive(Debug)]
pub struct DeckBuilder {
    options: DeckOptions,
    slides: Vec<PackageSlide>,
    summaries: Vec<SlideSummary>,
}

impl DeckBuilder {
    pub fn new(options: DeckOptions) -> Self {
        Self {
            options,
            slides: Vec::new(),
            summaries: Vec::new(),
        }
    }

    /// Number of slides added so far.
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Add `image` as the next slide.
    ///
    /// On failure nothing is added and the deck stays valid; the caller
    /// decides whether to carry on.
    pub fn add_image(&mut self, image: &RenderedImage) -> Result<&SlideSummary, PageError> {
        let fail = |detail: String| PageError::ImageRender {
            page: image.page,
            section: image.section,
            detail,
        };

        let (w, h) = (image.image.width(), image.image.height());
        let slide = self.options.slide_size;
        let frame = match image.placement {
            Placement::Fit => fit_frame(w, h, slide),
            Placement::Fill => (w > 0 && h > 0).then(|| fill_frame(slide)),
        }
        .ok_or_else(|| fail(format!("image has no pixels ({w}x{h})")))?;

        let png = encode_png(&image.image).map_err(|e| fail(format!("PNG encoding failed: {e}")))?;

        let caption = (self.options.caption_placeholder && image.placement == Placement::Fit)
            .then(|| caption_frame(slide));

        let slide_num = self.slides.len() + 1;
        let descr = match image.section {
            Some(s) => format!("Page {} section {}", image.page, s + 1),
            None => format!("Page {}", image.page),
        };
        debug!(
            "Slide {}: {} at ({}, {}) {}x{} EMU",
            slide_num, descr, frame.x, frame.y, frame.width, frame.height
        );

        self.slides.push(PackageSlide {
            png,
            picture: frame,
            description: descr,
            caption,
        });
        self.summaries.push(SlideSummary {
            slide_num,
            page: image.page,
            section: image.section,
            placement: image.placement,
            frame,
            image_width: w,
            image_height: h,
        });
        Ok(&self.summaries[slide_num - 1])
    }

    /// Serialise the presentation.
    ///
    /// Any failure here loses the whole deck; no partial package is returned.
    pub fn finish(self) -> Result<Deck, Pdf2PptxError> {
        let info = PresentationInfo {
            title: &self.options.title,
            slide_size: self.options.slide_size,
        };
        let bytes = pptx::write_package(&info, &self.slides)
            .map_err(|e| Pdf2PptxError::DeckSerialization { detail: e.to_string() })?;
        info!("Deck written: {} slides, {} bytes", self.slides.len(), bytes.len());
        Ok(Deck {
            bytes,
            slides: self.summaries,
        })
    }
}

/// Build a deck from images in order, skipping any image that cannot be
/// placed.
///
/// Returns the deck and the errors for skipped images.
pub fn build_deck<'a, I>(images: I, options: DeckOptions) -> Result<(Deck, Vec<PageError>), Pdf2PptxError>
where
    I: IntoIterator<Item = &'a RenderedImage>,
{
    let mut builder = DeckBuilder::new(options);
    let mut skipped = Vec::new();
    for image in images {
        if let Err(e) = builder.add_image(image) {
            warn!("{}", e);
            skipped.push(e);
        }
    }
    Ok((builder.finish()?, skipped))
}

/// Output filename for an input document: same name, `.pptx` extension.
///
/// `"q3/report.pdf"` → `"q3/report.pptx"`, `"notes"` → `"notes.pptx"`.
pub fn pptx_filename(input_name: &str) -> String {
    std::path::Path::new(input_name)
        .with_extension("pptx")
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn rendered(w: u32, h: u32, placement: Placement, page: usize, section: Option<usize>) -> RenderedImage {
        RenderedImage {
            image: DynamicImage::ImageRgb8(RgbImage::new(w, h)),
            placement,
            page,
            section,
        }
    }

    #[test]
    fn slide_is_ten_by_seven_and_a_half_inches() {
        assert_eq!(SLIDE_SIZE.width, 9_144_000);
        assert_eq!(SLIDE_SIZE.height, 6_858_000);
    }

    #[test]
    fn wide_image_is_width_constrained() {
        let f = fit_frame(2000, 500, SLIDE_SIZE).unwrap();
        assert_eq!(f.width, SLIDE_SIZE.width);
        assert!(f.height < SLIDE_SIZE.height);
        assert_eq!(f.height, 2_286_000);
        assert_eq!(f.x, 0);
        assert_eq!(f.y, (SLIDE_SIZE.height - f.height) / 2);
    }

    #[test]
    fn tall_image_is_height_constrained() {
        let f = fit_frame(500, 1000, SLIDE_SIZE).unwrap();
        assert_eq!(f.height, SLIDE_SIZE.height);
        assert!(f.width < SLIDE_SIZE.width);
        assert_eq!(f.width, 3_429_000);
        assert_eq!(f.y, 0);
        assert_eq!(f.x, (SLIDE_SIZE.width - f.width) / 2);
    }

    #[test]
    fn slide_shaped_image_fills_exactly() {
        let f = fit_frame(1500, 1125, SLIDE_SIZE).unwrap();
        assert_eq!(f, fill_frame(SLIDE_SIZE));
    }

    #[test]
    fn empty_image_has_no_frame() {
        assert!(fit_frame(0, 10, SLIDE_SIZE).is_none());
        assert!(fit_frame(10, 0, SLIDE_SIZE).is_none());
    }

    #[test]
    fn caption_sits_one_inch_above_bottom() {
        let c = caption_frame(SLIDE_SIZE);
        assert_eq!(c.x, 914_400);
        assert_eq!(c.y, 6_858_000 - 914_400);
        assert_eq!(c.width, 9_144_000 - 2 * 914_400);
        assert_eq!(c.height, 914_400);
    }

    #[test]
    fn bad_image_is_skipped_and_order_kept() {
        let images = vec![
            rendered(1200, 300, Placement::Fit, 1, Some(0)),
            rendered(0, 0, Placement::Fit, 1, Some(1)),
            rendered(850, 1100, Placement::Fill, 2, None),
        ];
        let (deck, skipped) = build_deck(&images, DeckOptions::default()).unwrap();
        assert_eq!(deck.slides.len(), 2);
        assert_eq!(skipped.len(), 1);
        assert_eq!(
            skipped[0],
            PageError::ImageRender {
                page: 1,
                section: Some(1),
                detail: "image has no pixels (0x0)".into()
            }
        );
        assert_eq!(deck.slides[0].slide_num, 1);
        assert_eq!(deck.slides[0].section, Some(0));
        assert_eq!(deck.slides[1].page, 2);
        assert_eq!(deck.slides[1].frame, fill_frame(SLIDE_SIZE));
        assert_eq!(&deck.bytes[..2], b"PK");
    }

    #[test]
    fn output_filename_swaps_extension() {
        assert_eq!(pptx_filename("report.pdf"), "report.pptx");
        assert_eq!(pptx_filename("Q3 Report.PDF"), "Q3 Report.pptx");
        assert_eq!(pptx_filename("archive.v2.pdf"), "archive.v2.pptx");
        assert_eq!(pptx_filename("notes"), "notes.pptx");
        assert_eq!(pptx_filename("dir/report.pdf"), "dir/report.pptx");
    }
}
