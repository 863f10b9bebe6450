//! Incremental trim: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! [`crate::trim`] runs everything in one call. [`Pipeline`] lets the
//! caller drive execution one step at a time:
//!
//! ```rust
//! # use autotrim_core::{Pipeline, TrimConfig, TrimError};
//! # fn run(png: Vec<u8>) -> Result<(), TrimError> {
//! let result = Pipeline::new(png, TrimConfig::default())
//!     .decode()?
//!     .detect_edges()?
//!     .find_margins()?
//!     .crop()?
//!     .into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state (or a
//! `Result` for fallible stages), carrying the decoded source along so
//! later stages can be inspected against it.

use crate::aggregate::EdgeMaxValues;
use crate::diagnostics::StageMetrics;
use crate::edge::EdgeDetector;
use crate::rect::Rectangle;
use crate::types::{Dimensions, RgbaImage, TrimConfig, TrimError, TrimResult};

/// Entry point for the staged API.
pub struct Pipeline;

impl Pipeline {
    /// Start a pipeline over encoded image bytes.
    pub const fn new(source: Vec<u8>, config: TrimConfig) -> Pending {
        Pending {
            config,
            source,
            keep_edge_map: false,
        }
    }

    /// Start a pipeline over an already-decoded image, skipping
    /// [`Pending::decode`].
    pub const fn from_image(original: RgbaImage, config: TrimConfig) -> Decoded {
        Decoded {
            config,
            original,
            source_len: 0,
            keep_edge_map: false,
        }
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing: call .decode() to continue"]
pub struct Pending {
    config: TrimConfig,
    source: Vec<u8>,
    keep_edge_map: bool,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Retain the per-pixel edge map during detection.
    pub const fn keep_edge_map(mut self, keep: bool) -> Self {
        self.keep_edge_map = keep;
        self
    }

    /// Decode the source image and advance to [`Decoded`].
    ///
    /// # Errors
    ///
    /// Returns [`TrimError::EmptyInput`] if the source bytes are empty
    /// and [`TrimError::ImageDecode`] if they cannot be decoded.
    pub fn decode(self) -> Result<Decoded, TrimError> {
        let original = crate::decode::decode(&self.source)?;
        Ok(Decoded {
            config: self.config,
            original,
            source_len: self.source.len(),
            keep_edge_map: self.keep_edge_map,
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding the source image to RGBA8.
#[must_use = "pipeline stages are consumed by advancing: call .detect_edges() to continue"]
pub struct Decoded {
    config: TrimConfig,
    original: RgbaImage,
    source_len: usize,
    keep_edge_map: bool,
}

impl Decoded {
    /// The decoded RGBA image.
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// Retain the per-pixel edge map during detection.
    pub const fn keep_edge_map(mut self, keep: bool) -> Self {
        self.keep_edge_map = keep;
        self
    }

    /// Scan for edges and advance to [`EdgesDetected`].
    ///
    /// # Errors
    ///
    /// Returns [`TrimError::UnsupportedComputeBackend`] if the configured
    /// backend cannot run here.
    pub fn detect_edges(self) -> Result<EdgesDetected, TrimError> {
        let mut detector = EdgeDetector::new(self.config.mode)
            .with_backend(self.config.backend)
            .keep_edge_map(self.keep_edge_map);
        detector.detect(&self.original)?;
        let (values, edge_map) = detector.into_parts();
        Ok(EdgesDetected {
            config: self.config,
            original: self.original,
            values,
            edge_map,
        })
    }
}

// ───────────────────────── Stage 2: EdgesDetected ────────────────────

/// Pipeline state after the edge scan.
#[must_use = "pipeline stages are consumed by advancing: call .find_margins() to continue"]
pub struct EdgesDetected {
    config: TrimConfig,
    original: RgbaImage,
    values: EdgeMaxValues,
    edge_map: Option<RgbaImage>,
}

impl EdgesDetected {
    /// The decoded RGBA image.
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// Row and column maxima.
    #[must_use]
    pub const fn values(&self) -> &EdgeMaxValues {
        &self.values
    }

    /// Per-pixel edge map, if it was retained.
    #[must_use]
    pub const fn edge_map(&self) -> Option<&RgbaImage> {
        self.edge_map.as_ref()
    }

    /// Threshold the maxima, apply the margin and advance to
    /// [`MarginsFound`].
    ///
    /// # Errors
    ///
    /// Returns [`TrimError::InvalidConfig`] if the margin pushes a side
    /// out of the `i32` range.
    pub fn find_margins(self) -> Result<MarginsFound, TrimError> {
        let detected = crate::margin::find_margins(&self.values, self.config.limit);
        let crop = crate::margin::apply_margin(detected, self.config.margin)?;
        Ok(MarginsFound {
            config: self.config,
            original: self.original,
            values: self.values,
            edge_map: self.edge_map,
            detected,
            crop,
        })
    }
}

// ───────────────────────── Stage 3: MarginsFound ─────────────────────

/// Pipeline state after locating the content rectangle.
#[must_use = "pipeline stages are consumed by advancing: call .crop() to continue"]
pub struct MarginsFound {
    config: TrimConfig,
    original: RgbaImage,
    values: EdgeMaxValues,
    edge_map: Option<RgbaImage>,
    detected: Rectangle,
    crop: Rectangle,
}

impl MarginsFound {
    /// The decoded RGBA image.
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// Row and column maxima.
    #[must_use]
    pub const fn values(&self) -> &EdgeMaxValues {
        &self.values
    }

    /// Per-pixel edge map, if it was retained.
    #[must_use]
    pub const fn edge_map(&self) -> Option<&RgbaImage> {
        self.edge_map.as_ref()
    }

    /// Content rectangle as found by the threshold scan.
    #[must_use]
    pub const fn detected(&self) -> Rectangle {
        self.detected
    }

    /// Rectangle that will be cropped (`detected` grown by the margin).
    #[must_use]
    pub const fn crop_rect(&self) -> Rectangle {
        self.crop
    }

    /// Crop and pad the source and advance to [`Cropped`].
    ///
    /// # Errors
    ///
    /// Returns [`TrimError::NoContent`] if the crop rectangle is empty.
    pub fn crop(self) -> Result<Cropped, TrimError> {
        if self.crop.is_empty() {
            tracing::debug!(detected = ?self.detected, crop = ?self.crop, "nothing to crop");
            return Err(TrimError::NoContent);
        }
        let output =
            crate::crop::crop_expand(&self.original, self.crop, self.config.padding_color())?;
        Ok(Cropped {
            original: self.original,
            values: self.values,
            edge_map: self.edge_map,
            detected: self.detected,
            crop: self.crop,
            output,
        })
    }
}

// ───────────────────────── Stage 4: Cropped ──────────────────────────

/// Final pipeline state.
#[must_use = "call .into_result() to obtain the trim result"]
pub struct Cropped {
    original: RgbaImage,
    values: EdgeMaxValues,
    edge_map: Option<RgbaImage>,
    detected: Rectangle,
    crop: Rectangle,
    output: RgbaImage,
}

impl Cropped {
    /// The decoded RGBA image.
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// Row and column maxima.
    #[must_use]
    pub const fn values(&self) -> &EdgeMaxValues {
        &self.values
    }

    /// Per-pixel edge map, if it was retained.
    #[must_use]
    pub const fn edge_map(&self) -> Option<&RgbaImage> {
        self.edge_map.as_ref()
    }

    /// Content rectangle as found by the threshold scan.
    #[must_use]
    pub const fn detected(&self) -> Rectangle {
        self.detected
    }

    /// Rectangle that was cropped.
    #[must_use]
    pub const fn crop_rect(&self) -> Rectangle {
        self.crop
    }

    /// The cropped output.
    #[must_use]
    pub const fn output(&self) -> &RgbaImage {
        &self.output
    }

    /// Consume the pipeline.
    pub fn into_result(self) -> TrimResult {
        TrimResult {
            detected: self.detected,
            crop: self.crop,
            dimensions: Dimensions {
                width: self.original.width(),
                height: self.original.height(),
            },
            output: self.output,
        }
    }
}

// ───────────────────────── Stage metadata ────────────────────────────

/// Common view over every pipeline state.
pub trait PipelineStage {
    /// Human-readable name of this stage.
    const NAME: &str;

    /// Zero-based position of this stage.
    const INDEX: usize;

    /// Stage-specific metrics for diagnostics. `None` before decoding.
    fn metrics(&self) -> Option<StageMetrics>;
}

impl PipelineStage for Pending {
    const NAME: &str = "source";
    const INDEX: usize = 0;

    fn metrics(&self) -> Option<StageMetrics> {
        None
    }
}

impl PipelineStage for Decoded {
    const NAME: &str = "decode";
    const INDEX: usize = 1;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Decode {
            input_bytes: self.source_len,
            width: self.original.width(),
            height: self.original.height(),
            pixel_count: u64::from(self.original.width()) * u64::from(self.original.height()),
        })
    }
}

impl PipelineStage for EdgesDetected {
    const NAME: &str = "edges";
    const INDEX: usize = 2;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::EdgeDetection {
            mode: self.config.mode.to_string(),
            backend: self.config.backend.to_string(),
            peak: self.values.peak(),
        })
    }
}

impl PipelineStage for MarginsFound {
    const NAME: &str = "margins";
    const INDEX: usize = 3;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Margins {
            limit: self.config.limit,
            margin: self.config.margin,
            detected: self.detected,
            crop: self.crop,
        })
    }
}

impl PipelineStage for Cropped {
    const NAME: &str = "crop";
    const INDEX: usize = 4;

    fn metrics(&self) -> Option<StageMetrics> {
        let covered = self
            .crop
            .intersection(&Rectangle::from_size(
                self.original.width(),
                self.original.height(),
            ))
            .area();
        Some(StageMetrics::Crop {
            width: self.output.width(),
            height: self.output.height(),
            padded_pixels: self.crop.area().saturating_sub(covered),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Rgba;

    use super::*;
    use crate::types::EdgeMode;

    const GRAY: Rgba<u8> = Rgba([128, 128, 128, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn square_image() -> RgbaImage {
        let mut img = RgbaImage::from_pixel(100, 100, GRAY);
        for y in 40..60 {
            for x in 40..60 {
                img.put_pixel(x, y, BLACK);
            }
        }
        img
    }

    fn square_png() -> Vec<u8> {
        crate::decode::encode_png(&square_image()).unwrap()
    }

    #[test]
    fn full_pipeline_finds_square() {
        let result = Pipeline::new(square_png(), TrimConfig::default())
            .decode()
            .unwrap()
            .detect_edges()
            .unwrap()
            .find_margins()
            .unwrap()
            .crop()
            .unwrap()
            .into_result();
        assert_eq!(result.detected, Rectangle::new(40, 40, 60, 60));
        assert_eq!(result.crop, result.detected);
        assert_eq!(result.output.dimensions(), (20, 20));
        assert!(result.output.pixels().all(|p| *p == BLACK));
        assert_eq!(
            result.dimensions,
            Dimensions {
                width: 100,
                height: 100
            }
        );
    }

    #[test]
    fn margin_grows_crop_but_not_detection() {
        let config = TrimConfig {
            margin: 5,
            ..TrimConfig::default()
        };
        let margins = Pipeline::from_image(square_image(), config)
            .detect_edges()
            .unwrap()
            .find_margins()
            .unwrap();
        assert_eq!(margins.detected(), Rectangle::new(40, 40, 60, 60));
        assert_eq!(margins.crop_rect(), Rectangle::new(35, 35, 65, 65));
        let cropped = margins.crop().unwrap();
        assert_eq!(cropped.output().dimensions(), (30, 30));
        assert_eq!(*cropped.output().get_pixel(0, 0), GRAY);
        assert_eq!(*cropped.output().get_pixel(5, 5), BLACK);
    }

    #[test]
    fn edge_map_only_when_requested() {
        let detected = Pipeline::from_image(square_image(), TrimConfig::default())
            .detect_edges()
            .unwrap();
        assert!(detected.edge_map().is_none());

        let detected = Pipeline::new(square_png(), TrimConfig::default())
            .keep_edge_map(true)
            .decode()
            .unwrap()
            .detect_edges()
            .unwrap();
        let map = detected.edge_map().unwrap();
        assert_eq!(map.dimensions(), (100, 100));
    }

    #[test]
    fn uniform_image_has_no_content() {
        let img = RgbaImage::from_pixel(16, 16, GRAY);
        let result = Pipeline::from_image(img, TrimConfig::default())
            .detect_edges()
            .unwrap()
            .find_margins()
            .unwrap()
            .crop();
        assert!(matches!(result, Err(TrimError::NoContent)));
    }

    #[test]
    fn overflowing_margin_fails_at_margins() {
        let config = TrimConfig {
            margin: i32::MAX,
            ..TrimConfig::default()
        };
        let result = Pipeline::from_image(square_image(), config)
            .detect_edges()
            .unwrap()
            .find_margins();
        assert!(matches!(result, Err(TrimError::InvalidConfig(_))));
    }

    #[test]
    fn empty_source_fails_at_decode() {
        let result = Pipeline::new(Vec::new(), TrimConfig::default()).decode();
        assert!(matches!(result, Err(TrimError::EmptyInput)));
    }

    #[test]
    fn gpu_backend_fails_at_detection() {
        let config = TrimConfig {
            backend: crate::types::ComputeBackend::Gpu,
            ..TrimConfig::default()
        };
        let result = Pipeline::from_image(square_image(), config).detect_edges();
        assert!(matches!(
            result,
            Err(TrimError::UnsupportedComputeBackend(_))
        ));
    }

    #[test]
    fn border_mode_flows_through() {
        let config = TrimConfig {
            mode: EdgeMode::Border,
            ..TrimConfig::default()
        };
        let margins = Pipeline::from_image(square_image(), config)
            .detect_edges()
            .unwrap()
            .find_margins()
            .unwrap();
        assert_eq!(margins.detected(), Rectangle::new(40, 40, 60, 60));
    }

    #[test]
    fn stage_metrics() {
        assert_eq!(Pending::INDEX, 0);
        assert_eq!(Cropped::NAME, "crop");

        let config = TrimConfig {
            margin: 50,
            ..TrimConfig::default()
        };
        let decoded = Pipeline::new(square_png(), config).decode().unwrap();
        assert!(matches!(
            decoded.metrics(),
            Some(StageMetrics::Decode {
                width: 100,
                height: 100,
                pixel_count: 10_000,
                ..
            })
        ));
        let cropped = decoded
            .detect_edges()
            .unwrap()
            .find_margins()
            .unwrap()
            .crop()
            .unwrap();
        // 120x120 crop around a 100x100 source.
        assert!(matches!(
            cropped.metrics(),
            Some(StageMetrics::Crop {
                width: 120,
                height: 120,
                padded_pixels: 4400,
            })
        ));
    }
}
