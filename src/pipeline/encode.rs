//! Image encoding: `DynamicImage` → PNG bytes for the presentation package.
//!
//! PNG is lossless, so rendered text stays crisp when the slide is
//! projected or zoomed. Alpha is dropped: pdfium renders onto an opaque
//! white background anyway, and RGB PNGs are a quarter smaller.

use image::{DynamicImage, ImageError};
use std::io::Cursor;
use tracing::debug;

/// Encode a rendered page or section as PNG.
///
/// Zero-sized images are rejected by the encoder and surface as an error.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, ImageError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} image → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}
