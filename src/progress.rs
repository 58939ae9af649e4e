//! Progress-callback trait for per-page conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline walks the document. Pages are processed one at a
//! time, in page order, so events arrive in order too.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2pptx::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct SlideCounter {
//!     slides: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for SlideCounter {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, slides: usize) {
//!         let so_far = self.slides.fetch_add(slides, Ordering::SeqCst) + slides;
//!         eprintln!("Page {}/{}: {} slides ({} so far)", page_num, total_pages, slides, so_far);
//!     }
//! }
//!
//! let counter = Arc::new(SlideCounter { slides: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `Send + Sync` lets the callback travel into the
/// blocking render thread.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first page is read.
    ///
    /// # Arguments
    /// * `total_pages` — number of selected pages
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page's text is read.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page has been turned into slides.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — number of selected pages
    /// * `slides`      — slides this page added to the deck (may be 0)
    fn on_page_complete(&self, page_num: usize, total_pages: usize, slides: usize) {
        let _ = (page_num, total_pages, slides);
    }

    /// Called when a page could not be read or rendered at all.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after the deck has been serialised.
    ///
    /// # Arguments
    /// * `total_pages` — number of selected pages
    /// * `slides`      — slides in the finished deck
    fn on_conversion_complete(&self, total_pages: usize, slides: usize) {
        let _ = (total_pages, slides);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
