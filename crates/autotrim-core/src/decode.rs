//! Image decoding.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the
//! RGBA8 buffer every later stage works on. Whatever the source pixel
//! format, edge strength is always measured on 8-bit RGBA.

use crate::types::{RgbaImage, TrimError};

/// Decode raw image bytes into RGBA8.
///
/// # Errors
///
/// Returns [`TrimError::EmptyInput`] if `bytes` is empty.
/// Returns [`TrimError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, TrimError> {
    if bytes.is_empty() {
        return Err(TrimError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    tracing::debug!(
        width = img.width(),
        height = img.height(),
        color = ?img.color(),
        "decoded image"
    );
    Ok(img.to_rgba8())
}

/// Encode an RGBA image as PNG bytes.
///
/// # Errors
///
/// Returns [`TrimError::ImageDecode`] if the encoder rejects the buffer.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, TrimError> {
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(buf)
}
