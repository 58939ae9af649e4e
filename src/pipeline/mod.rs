//! Pipeline stages for PDF-to-PPTX conversion.
//!
//! Each submodule implements one transformation step and is testable on its
//! own; only [`document`] and [`input`] touch pdfium or the network.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ document ──▶ sections ──▶ render ──▶ deck ──▶ pptx
//! (URL/path) (pdfium)    (headings)   (crop)     (place)  (zip)
//! ```
//!
//! 1. [`input`]    — load the user-supplied path or URL into memory
//! 2. [`document`] — the [`document::PageSource`] contract and its pdfium
//!    implementation: page sizes, positioned text, bitmaps
//! 3. [`sections`] — split a page's text blocks into heading-started sections
//! 4. [`render`]   — rasterise a page once and crop one image per section
//! 5. [`encode`]   — PNG-encode each image
//! 6. [`deck`]     — place each image on its own slide
//! 7. [`pptx`]     — serialise the slides as an OOXML package

pub mod deck;
pub mod document;
pub mod encode;
pub mod input;
pub mod pptx;
pub mod render;
pub mod sections;
