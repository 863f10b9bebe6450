//! autotrim-core: content bounding-box detection and crop (sans-IO).
//!
//! Finds the rectangle that holds an image's content by measuring
//! directional edge strength at every pixel, keeping the maximum per
//! row and per column, and thresholding those maxima from each side.
//! The rectangle can then be grown by a margin and cropped out, with
//! any area past the source filled by a padding color.
//!
//! decode -> edge scan -> margin scan -> crop/pad
//!
//! This crate has **no I/O dependencies**: it works on in-memory byte
//! slices and buffers. Filesystem access lives in `autotrim-cli`.

pub mod aggregate;
pub mod crop;
pub mod decode;
pub mod diagnostics;
pub mod edge;
pub mod margin;
pub mod overlay;
pub mod pipeline;
pub mod rect;
pub mod types;

pub use aggregate::{EdgeMaxValues, EdgeStrength};
pub use crop::{crop_expand, crop_expand_raw};
pub use edge::{EdgeDetector, detect_edges, edge_strength_image};
pub use margin::{apply_margin, find_margins};
pub use pipeline::{Pipeline, PipelineStage};
pub use rect::Rectangle;
pub use types::{
    ComputeBackend, Dimensions, EdgeMode, RgbaImage, RgbaView, TrimConfig, TrimError, TrimResult,
    parse_color,
};

/// Decode `image_bytes` and trim it.
///
/// # Errors
///
/// Returns [`TrimError::EmptyInput`] or [`TrimError::ImageDecode`] if
/// the bytes cannot be decoded, plus everything [`trim_image`] returns.
pub fn trim(image_bytes: &[u8], config: &TrimConfig) -> Result<TrimResult, TrimError> {
    let image = decode::decode(image_bytes)?;
    trim_image(&image, config)
}

/// Detect the content rectangle of `image`, grow it by
/// `config.margin` and crop.
///
/// # Errors
///
/// Returns [`TrimError::UnsupportedComputeBackend`] if the configured
/// backend cannot run, [`TrimError::InvalidConfig`] if the margin
/// overflows the rectangle, [`TrimError::NoContent`] if the grown
/// rectangle is empty, and [`TrimError::UnknownSourceDimensions`] for
/// a zero-sized image.
pub fn trim_image(image: &RgbaImage, config: &TrimConfig) -> Result<TrimResult, TrimError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(TrimError::UnknownSourceDimensions);
    }

    let mut detector = EdgeDetector::new(config.mode).with_backend(config.backend);
    let values = detector.detect(image)?;

    let detected = find_margins(values, config.limit);
    let crop = apply_margin(detected, config.margin)?;
    tracing::debug!(?detected, ?crop, margin = config.margin, "content rectangle");
    if crop.is_empty() {
        return Err(TrimError::NoContent);
    }

    let output = crop_expand(image, crop, config.padding_color())?;
    Ok(TrimResult {
        detected,
        crop,
        output,
        dimensions: Dimensions {
            width: image.width(),
            height: image.height(),
        },
    })
}
