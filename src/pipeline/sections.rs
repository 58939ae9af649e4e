//! Section detection: slice a page into vertical bands, one per heading.
//!
//! A page's text blocks are scanned for headings. Each heading opens a
//! section that runs, full page width, down to the top of the next heading
//! or to the page bottom. Text above the first heading belongs to no section.
//!
//! The scan is a fold over the blocks with two states, *no pending section*
//! and *pending section*, and two events, *heading found* and *end of
//! blocks*. Closing a section happens only on those transitions, so the
//! boundary logic is testable without rendering anything.
//!
//! Coordinates are PDF points with the origin at the top-left corner of the
//! page, `y` growing downwards.

use crate::config::{BlockOrder, ConversionConfig, HeadingMatcher};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// An axis-aligned rectangle in page points, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub const fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1}, {:.1})", self.x0, self.y0, self.x1, self.y1)
    }
}

/// Page dimensions in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// The whole page as a clip rectangle.
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// A text block as handed over by text extraction.
///
/// `bbox` is `[x0, y0, x1, y1]`. Nothing about it has been checked yet;
/// [`TextBlock::try_from`] does that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBlock {
    pub bbox: [f64; 4],
    pub text: String,
}

impl RawBlock {
    pub fn new(bbox: [f64; 4], text: impl Into<String>) -> Self {
        Self {
            bbox,
            text: text.into(),
        }
    }
}

/// A text block with validated coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub rect: Rect,
    pub text: String,
}

impl TryFrom<&RawBlock> for TextBlock {
    type Error = String;

    fn try_from(raw: &RawBlock) -> Result<Self, Self::Error> {
        let [x0, y0, x1, y1] = raw.bbox;
        if let Some(bad) = raw.bbox.iter().find(|v| !v.is_finite()) {
            return Err(format!("coordinate {bad} is not a number"));
        }
        if x1 < x0 || y1 < y0 {
            return Err(format!("inverted bounds ({x0}, {y0}, {x1}, {y1})"));
        }
        Ok(TextBlock {
            rect: Rect::new(x0, y0, x1, y1),
            text: raw.text.clone(),
        })
    }
}

/// One vertical slice of a page.
///
/// `start` is the heading's bounds shifted up by the top buffer; `end` spans
/// the page width and its `y1` is where the section stops.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub start: Rect,
    pub end: Rect,
}

impl Section {
    /// The rectangle to rasterise: full page width, from the buffered
    /// heading top to the section end.
    pub fn clip(&self) -> Rect {
        Rect::new(self.end.x0, self.start.y0, self.end.x1, self.end.y1)
    }
}

/// A block that could not be used, with its index in the extracted order.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidBlock {
    pub index: usize,
    pub reason: String,
}

/// Everything detection learned about one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageScan {
    /// Sections in top-to-bottom order.
    pub sections: Vec<Section>,
    /// Blocks skipped because of malformed coordinates.
    pub invalid_blocks: Vec<InvalidBlock>,
    /// Sections dropped because they ended above their own start.
    pub collapsed_sections: usize,
}

// ── The fold ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScanState {
    NoPendingSection,
    PendingSection(Rect),
}

#[derive(Debug, Clone, Copy)]
enum ScanEvent<'a> {
    HeadingFound(&'a Rect),
    EndOfBlocks,
}

#[derive(Debug)]
struct Scan {
    page: PageSize,
    top_buffer: f64,
    state: ScanState,
    sections: Vec<Section>,
}

impl Scan {
    fn new(page: PageSize, top_buffer: f64) -> Self {
        Self {
            page,
            top_buffer,
            state: ScanState::NoPendingSection,
            sections: Vec::new(),
        }
    }

    fn step(mut self, event: ScanEvent<'_>) -> Self {
        let PageSize { width, height } = self.page;
        if let ScanState::PendingSection(start) = self.state {
            let end = match event {
                ScanEvent::HeadingFound(h) => Rect::new(0.0, start.y0, width, h.y0),
                ScanEvent::EndOfBlocks => Rect::new(0.0, height, width, height),
            };
            self.sections.push(Section { start, end });
        }
        self.state = match event {
            ScanEvent::HeadingFound(h) => ScanState::PendingSection(Rect::new(
                h.x0,
                (h.y0 - self.top_buffer).max(0.0),
                h.x1,
                h.y1,
            )),
            ScanEvent::EndOfBlocks => ScanState::NoPendingSection,
        };
        self
    }
}

/// Find the sections of a page from blocks whose coordinates are already valid.
///
/// Pure: the same blocks always yield the same sections. Blocks are scanned
/// in the order given.
pub fn sections_from_blocks(
    blocks: &[TextBlock],
    page: PageSize,
    top_buffer: f64,
    heading: &HeadingMatcher,
) -> Vec<Section> {
    blocks
        .iter()
        .filter(|b| heading.is_heading(&b.text))
        .fold(Scan::new(page, top_buffer), |scan, b| {
            scan.step(ScanEvent::HeadingFound(&b.rect))
        })
        .step(ScanEvent::EndOfBlocks)
        .sections
}

/// Section detection settings, usually derived from a [`ConversionConfig`].
#[derive(Debug, Clone)]
pub struct Detector {
    pub heading: HeadingMatcher,
    pub top_buffer: f64,
    pub order: BlockOrder,
}

impl Default for Detector {
    fn default() -> Self {
        Self::from_config(&ConversionConfig::default())
    }
}

impl Detector {
    pub fn from_config(config: &ConversionConfig) -> Self {
        Self {
            heading: config.heading.clone(),
            top_buffer: config.top_buffer,
            order: config.block_order,
        }
    }

    /// Validate, order and scan a page's raw blocks.
    ///
    /// Malformed blocks are skipped and reported in
    /// [`PageScan::invalid_blocks`]; they never abort the page.
    pub fn detect(&self, blocks: &[RawBlock], page: PageSize) -> PageScan {
        let mut invalid_blocks = Vec::new();
        let mut valid: Vec<TextBlock> = blocks
            .iter()
            .enumerate()
            .filter_map(|(index, raw)| match TextBlock::try_from(raw) {
                Ok(block) => Some(block),
                Err(reason) => {
                    invalid_blocks.push(InvalidBlock { index, reason });
                    None
                }
            })
            .collect();

        if self.order == BlockOrder::TopToBottom {
            valid.sort_by(|a, b| a.rect.y0.total_cmp(&b.rect.y0));
        }

        let all = sections_from_blocks(&valid, page, self.top_buffer, &self.heading);
        let found = all.len();
        let sections: Vec<Section> = all.into_iter().filter(|s| s.clip().height() >= 0.0).collect();

        PageScan {
            collapsed_sections: found - sections.len(),
            sections,
            invalid_blocks,
        }
    }
}

/// Detect sections with the default `"Section "` heading prefix.
///
/// Convenience over [`Detector::detect`] for callers that only need the
/// sections; malformed blocks are logged and skipped.
pub fn detect_sections(
    blocks: &[RawBlock],
    page_width: f64,
    page_height: f64,
    top_buffer: f64,
) -> Vec<Section> {
    let detector = Detector {
        top_buffer,
        ..Detector::default()
    };
    let scan = detector.detect(blocks, PageSize::new(page_width, page_height));
    for b in &scan.invalid_blocks {
        warn!("Skipping block {}: {}", b.index, b.reason);
    }
    scan.sections
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: PageSize = PageSize::new(612.0, 792.0);

    fn block(y0: f64, text: &str) -> RawBlock {
        RawBlock::new([72.0, y0, 300.0, y0 + 14.0], text)
    }

    #[test]
    fn no_heading_no_sections() {
        let blocks = vec![block(50.0, "Quarterly report"), block(90.0, "Revenue grew")];
        assert!(detect_sections(&blocks, PAGE.width, PAGE.height, 20.0).is_empty());
        assert!(detect_sections(&[], PAGE.width, PAGE.height, 20.0).is_empty());
    }

    #[test]
    fn single_heading_runs_to_page_bottom() {
        let blocks = vec![block(40.0, "Intro text"), block(200.0, "Section A"), block(230.0, "body")];
        let sections = detect_sections(&blocks, PAGE.width, PAGE.height, 20.0);
        assert_eq!(sections.len(), 1);
        let s = sections[0];
        assert_eq!(s.start, Rect::new(72.0, 180.0, 300.0, 214.0));
        assert_eq!(s.end, Rect::new(0.0, 792.0, 612.0, 792.0));
        assert_eq!(s.clip(), Rect::new(0.0, 180.0, 612.0, 792.0));
    }

    #[test]
    fn each_section_ends_at_next_heading_top() {
        let ys = [100.0, 250.0, 260.0, 700.0];
        let blocks: Vec<RawBlock> = ys
            .iter()
            .enumerate()
            .flat_map(|(i, &y)| vec![block(y, &format!("Section {i}")), block(y + 5.0, "text")])
            .collect();
        let sections = detect_sections(&blocks, PAGE.width, PAGE.height, 20.0);
        assert_eq!(sections.len(), ys.len());
        for i in 0..ys.len() - 1 {
            assert_eq!(sections[i].end.y1, ys[i + 1]);
            assert_eq!(sections[i].end.y0, sections[i].start.y0);
            assert_eq!(sections[i].end.x0, 0.0);
            assert_eq!(sections[i].end.x1, PAGE.width);
        }
        assert_eq!(sections[ys.len() - 1].end.y1, PAGE.height);
    }

    #[test]
    fn top_buffer_clamps_at_page_top() {
        let sections = detect_sections(&[block(5.0, "Section 1")], PAGE.width, PAGE.height, 20.0);
        assert_eq!(sections[0].start.y0, 0.0);
    }

    #[test]
    fn back_to_back_headings_still_make_a_section() {
        let blocks = vec![block(100.0, "Section 1"), block(114.0, "Section 2")];
        let sections = detect_sections(&blocks, PAGE.width, PAGE.height, 0.0);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].clip().height(), 14.0);
    }

    #[test]
    fn heading_on_first_block_leaves_no_leftover() {
        let blocks = vec![block(0.0, "Section 1"), block(30.0, "body")];
        let sections = detect_sections(&blocks, PAGE.width, PAGE.height, 20.0);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].clip(), PAGE.rect());
    }

    #[test]
    fn detection_is_pure() {
        let blocks = vec![block(100.0, "Section 1"), block(400.0, "Section 2")];
        let d = Detector::default();
        assert_eq!(d.detect(&blocks, PAGE), d.detect(&blocks, PAGE));
    }

    #[test]
    fn malformed_blocks_are_skipped_not_fatal() {
        let blocks = vec![
            block(100.0, "Section 1"),
            RawBlock::new([f64::NAN, 150.0, 10.0, 160.0], "Section ghost"),
            RawBlock::new([0.0, 300.0, 10.0, 290.0], "inverted"),
            block(400.0, "Section 2"),
        ];
        let scan = Detector::default().detect(&blocks, PAGE);
        assert_eq!(scan.sections.len(), 2);
        assert_eq!(scan.sections[0].end.y1, 400.0);
        let skipped: Vec<usize> = scan.invalid_blocks.iter().map(|b| b.index).collect();
        assert_eq!(skipped, vec![1, 2]);
        assert!(scan.invalid_blocks[0].reason.contains("not a number"));
    }

    #[test]
    fn out_of_order_blocks_are_sorted_by_default() {
        let blocks = vec![block(400.0, "Section 2"), block(100.0, "Section 1")];
        let scan = Detector::default().detect(&blocks, PAGE);
        assert_eq!(scan.sections.len(), 2);
        assert_eq!(scan.sections[0].start.y0, 80.0);
        assert_eq!(scan.sections[0].end.y1, 400.0);
        assert_eq!(scan.collapsed_sections, 0);
    }

    #[test]
    fn as_extracted_order_drops_inverted_sections() {
        let blocks = vec![block(400.0, "Section 2"), block(100.0, "Section 1")];
        let detector = Detector {
            order: BlockOrder::AsExtracted,
            ..Detector::default()
        };
        let scan = detector.detect(&blocks, PAGE);
        // "Section 2" would end at y=100, above its own start.
        assert_eq!(scan.collapsed_sections, 1);
        assert_eq!(scan.sections.len(), 1);
        assert_eq!(scan.sections[0].start.y0, 80.0);
        assert_eq!(scan.sections[0].end.y1, PAGE.height);
    }

    #[test]
    fn custom_heading_pattern() {
        let detector = Detector {
            heading: HeadingMatcher::pattern(r"^\d+\.\s").unwrap(),
            ..Detector::default()
        };
        let blocks = vec![block(100.0, "1. Scope"), block(300.0, "Section 9"), block(500.0, "2. Method")];
        let scan = detector.detect(&blocks, PAGE);
        assert_eq!(scan.sections.len(), 2);
        assert_eq!(scan.sections[0].end.y1, 500.0);
    }

    #[test]
    fn headings_side_by_side_keep_both_sections() {
        let blocks = vec![
            RawBlock::new([72.0, 100.0, 200.0, 114.0], "Section A"),
            RawBlock::new([320.0, 100.0, 450.0, 114.0], "Section B"),
        ];
        let sections = detect_sections(&blocks, PAGE.width, PAGE.height, 0.0);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].clip().height(), 0.0);
        assert_eq!(sections[1].start.x0, 320.0);
        assert_eq!(sections[1].end.y1, PAGE.height);
    }
}
