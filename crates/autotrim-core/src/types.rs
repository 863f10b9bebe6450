//! Shared types for the autotrim core.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rect::Rectangle;

/// Re-export `RgbaImage` so downstream crates can hand pixel buffers
/// to the core without depending on `image` directly.
pub use image::RgbaImage;

/// Re-export `GrayImage` for edge-strength previews.
pub use image::GrayImage;

/// Re-export the RGBA pixel type used for padding colors.
pub use image::Rgba;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count.
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// What each pixel's directional strength is measured against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeMode {
    /// Compare against the adjacent pixel in each direction (local
    /// gradient). Missing neighbors at the border clamp to the pixel
    /// itself.
    #[default]
    Neighbor,
    /// Compare against the image's outer row or column in each
    /// direction (contrast against the frame).
    Border,
}

impl fmt::Display for EdgeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Neighbor => f.write_str("neighbor"),
            Self::Border => f.write_str("border"),
        }
    }
}

/// Execution substrate for the per-pixel edge scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeBackend {
    /// Single-threaded row-major scan.
    Scalar,
    /// Row bands scanned on the rayon thread pool, merged by max.
    #[default]
    Parallel,
    /// Hardware compute. Not available in this build.
    Gpu,
}

impl fmt::Display for ComputeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => f.write_str("scalar"),
            Self::Parallel => f.write_str("parallel"),
            Self::Gpu => f.write_str("gpu"),
        }
    }
}

/// Configuration for a trim pass.
///
/// Serialized as JSON when handed across process boundaries (see the
/// CLI's `--config-json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    /// Edge strengths strictly greater than this count as content.
    /// Meaningful range is 0..=255; other values are accepted.
    pub limit: i32,

    /// Directional comparison mode for the edge scan.
    pub mode: EdgeMode,

    /// Amount added to every side of the detected rectangle before
    /// cropping. Negative values shrink it.
    pub margin: i32,

    /// Explicit RGBA fill for out-of-bounds area. `None` samples the
    /// source's top-left pixel.
    pub padding: Option<[u8; 4]>,

    /// Where the edge scan runs.
    pub backend: ComputeBackend,
}

impl TrimConfig {
    /// Default edge-strength threshold.
    pub const DEFAULT_LIMIT: i32 = 10;
    /// Default margin around the detected content.
    pub const DEFAULT_MARGIN: i32 = 0;

    /// The padding color as an [`Rgba`] pixel, if one was configured.
    #[must_use]
    pub fn padding_color(&self) -> Option<Rgba<u8>> {
        self.padding.map(Rgba)
    }
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            mode: EdgeMode::default(),
            margin: Self::DEFAULT_MARGIN,
            padding: None,
            backend: ComputeBackend::default(),
        }
    }
}

/// Outcome of a full trim pass.
#[derive(Debug, Clone)]
pub struct TrimResult {
    /// Content bounding box found by the margin scan.
    pub detected: Rectangle,
    /// Rectangle actually cropped (`detected` grown by the margin).
    pub crop: Rectangle,
    /// Cropped and padded pixels, `crop.width() x crop.height()`.
    pub output: RgbaImage,
    /// Dimensions of the source image.
    pub dimensions: Dimensions,
}

/// Validated borrowed view over a raw RGBA8 buffer.
///
/// Rows are tightly packed, four bytes per pixel.
#[derive(Debug, Clone, Copy)]
pub struct RgbaView<'a> {
    pixels: &'a [u8],
    width: u32,
    height: u32,
}

impl<'a> RgbaView<'a> {
    /// Wrap a raw buffer.
    ///
    /// # Errors
    ///
    /// Returns [`TrimError::UnknownSourceDimensions`] if either side is
    /// zero or the buffer length is not `width * height * 4`.
    pub fn new(pixels: &'a [u8], width: u32, height: u32) -> Result<Self, TrimError> {
        if width == 0 || height == 0 {
            return Err(TrimError::UnknownSourceDimensions);
        }
        let expected = usize::try_from(u64::from(width) * u64::from(height) * 4)
            .map_err(|_| TrimError::UnknownSourceDimensions)?;
        if pixels.len() != expected {
            return Err(TrimError::UnknownSourceDimensions);
        }
        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    /// View an owned image buffer.
    ///
    /// # Errors
    ///
    /// Returns [`TrimError::UnknownSourceDimensions`] for a zero-sized image.
    pub fn from_image(image: &'a RgbaImage) -> Result<Self, TrimError> {
        Self::new(image.as_raw(), image.width(), image.height())
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// The raw pixel bytes.
    #[must_use]
    pub const fn pixels(&self) -> &'a [u8] {
        self.pixels
    }

    /// The bytes of row `y`.
    #[must_use]
    pub fn row(&self, y: u32) -> &'a [u8] {
        let stride = self.width as usize * 4;
        let start = y as usize * stride;
        &self.pixels[start..start + stride]
    }

    /// The pixel at `(x, y)`.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Rgba([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }
}

/// Parse a hex color: `#rgb`, `#rrggbb` or `#rrggbbaa` (the `#` is
/// optional). Forms without alpha are opaque.
///
/// # Errors
///
/// Returns [`TrimError::InvalidConfig`] for any other input.
pub fn parse_color(s: &str) -> Result<Rgba<u8>, TrimError> {
    let hex = s.trim().trim_start_matches('#');
    let invalid = || TrimError::InvalidConfig(format!("invalid color '{s}'"));
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    match hex.len() {
        3 => {
            let mut out = [0, 0, 0, 255];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16).ok_or_else(invalid)?;
                #[allow(clippy::cast_possible_truncation)]
                let v = v as u8;
                out[i] = v * 17;
            }
            Ok(Rgba(out))
        }
        6 => Ok(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Ok(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => Err(invalid()),
    }
}

/// Errors reported by the autotrim core.
#[derive(Debug, thiserror::Error)]
pub enum TrimError {
    /// The crop target has a non-positive (or unrepresentable) side.
    #[error("invalid crop dimensions {width}x{height}")]
    InvalidCropDimensions {
        /// Requested width.
        width: i64,
        /// Requested height.
        height: i64,
    },

    /// The source image size could not be determined.
    #[error("source image dimensions are unknown")]
    UnknownSourceDimensions,

    /// The requested compute backend is not available.
    #[error("unsupported compute backend: {0}")]
    UnsupportedComputeBackend(String),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No content was found, so there is nothing to crop to.
    #[error("no content found in the image")]
    NoContent,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = TrimConfig::default();
        assert_eq!(config.limit, 10);
        assert_eq!(config.mode, EdgeMode::Neighbor);
        assert_eq!(config.margin, 0);
        assert_eq!(config.padding, None);
        assert_eq!(config.backend, ComputeBackend::Parallel);
        assert_eq!(config.padding_color(), None);
    }

    #[test]
    fn config_json_round_trip() {
        let config = TrimConfig {
            limit: 40,
            mode: EdgeMode::Border,
            margin: -3,
            padding: Some([1, 2, 3, 4]),
            backend: ComputeBackend::Scalar,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""mode":"border""#));
        let back: TrimConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        assert_eq!(back.padding_color(), Some(Rgba([1, 2, 3, 4])));
    }

    #[test]
    fn partial_config_json_fills_defaults() {
        let config: TrimConfig = serde_json::from_str(r#"{"limit": 3}"#).unwrap();
        assert_eq!(config.limit, 3);
        assert_eq!(config.backend, ComputeBackend::Parallel);
    }

    #[test]
    fn view_rejects_zero_size() {
        assert!(matches!(
            RgbaView::new(&[], 0, 5),
            Err(TrimError::UnknownSourceDimensions)
        ));
        assert!(matches!(
            RgbaView::new(&[], 5, 0),
            Err(TrimError::UnknownSourceDimensions)
        ));
    }

    #[test]
    fn view_rejects_length_mismatch() {
        let buf = vec![0u8; 15];
        assert!(matches!(
            RgbaView::new(&buf, 2, 2),
            Err(TrimError::UnknownSourceDimensions)
        ));
    }

    #[test]
    fn view_reads_pixels_and_rows() {
        let img = RgbaImage::from_fn(3, 2, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (x + 10 * y) as u8;
            Rgba([v, 0, 0, 255])
        });
        let view = RgbaView::from_image(&img).unwrap();
        assert_eq!(view.width(), 3);
        assert_eq!(view.height(), 2);
        assert_eq!(view.pixel(2, 1), Rgba([12, 0, 0, 255]));
        assert_eq!(view.row(1).len(), 12);
        assert_eq!(view.row(1)[0], 10);
    }

    #[test]
    fn parse_color_forms() {
        assert_eq!(parse_color("#00f").unwrap(), Rgba([0, 0, 255, 255]));
        assert_eq!(parse_color("ff8000").unwrap(), Rgba([255, 128, 0, 255]));
        assert_eq!(parse_color("#11223344").unwrap(), Rgba([0x11, 0x22, 0x33, 0x44]));
    }

    #[test]
    fn parse_color_rejects_garbage() {
        for bad in ["", "#12", "#12345", "zzzzzz", "#1234567", "+12345"] {
            assert!(
                matches!(parse_color(bad), Err(TrimError::InvalidConfig(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn error_display() {
        let err = TrimError::InvalidCropDimensions {
            width: 0,
            height: -4,
        };
        assert_eq!(err.to_string(), "invalid crop dimensions 0x-4");
        assert_eq!(
            TrimError::UnknownSourceDimensions.to_string(),
            "source image dimensions are unknown"
        );
        assert_eq!(
            TrimError::UnsupportedComputeBackend("gpu".into()).to_string(),
            "unsupported compute backend: gpu"
        );
        assert_eq!(TrimError::NoContent.to_string(), "no content found in the image");
    }

    #[test]
    fn dimensions_pixel_count() {
        let d = Dimensions {
            width: 70_000,
            height: 70_000,
        };
        assert_eq!(d.pixel_count(), 4_900_000_000);
    }
}
