//! Directional edge strength and its row/column aggregation.
//!
//! Every pixel gets four strengths (up, down, left, right): the
//! Chebyshev distance between its RGBA color and a comparison color in
//! that direction. Which color depends on [`EdgeMode`]:
//!
//! - [`EdgeMode::Neighbor`]: the adjacent pixel. At the image border the
//!   missing neighbor is the pixel itself, so outward strengths there
//!   are exactly 0.
//! - [`EdgeMode::Border`]: the pixel in the same column on row 0 (up) or
//!   the last row (down), or in the same row on column 0 (left) or the
//!   last column (right).
//!
//! Samples are folded straight into an [`EdgeMaxValues`] as they are
//! produced. The full edge map is only materialized on request.
//!
//! With [`ComputeBackend::Parallel`] the image is cut into horizontal
//! bands. Each band owns its slice of row maxima and folds columns into
//! a band-local vector; the column vectors are merged by max at the end.

use image::{GrayImage, Luma};
use rayon::prelude::*;

use crate::aggregate::{EdgeMaxValues, EdgeStrength, fold_slice};
use crate::types::{ComputeBackend, EdgeMode, RgbaImage, TrimError};

/// Bands per rayon worker. More bands than threads keeps the pool busy
/// when rows differ in cost.
const BANDS_PER_THREAD: usize = 4;

/// Chebyshev distance between two RGBA colors: the largest per-channel
/// absolute difference.
#[must_use]
pub fn chebyshev(a: [u8; 4], b: [u8; 4]) -> u8 {
    a[0].abs_diff(b[0])
        .max(a[1].abs_diff(b[1]))
        .max(a[2].abs_diff(b[2]))
        .max(a[3].abs_diff(b[3]))
}

/// Compute edge maxima for `image` on the default (parallel) backend.
#[must_use = "returns the row/column edge maxima"]
pub fn detect_edges(image: &RgbaImage, mode: EdgeMode) -> EdgeMaxValues {
    let mut values = EdgeMaxValues::new(image.width(), image.height());
    scan(image, mode, true, &mut values, None);
    values
}

/// Reusable edge detector owning its aggregate.
///
/// Each [`detect`](Self::detect) call clears the aggregate and rebuilds
/// it from scratch for the new image.
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    mode: EdgeMode,
    backend: ComputeBackend,
    keep_edge_map: bool,
    values: EdgeMaxValues,
    edge_map: Option<RgbaImage>,
}

impl EdgeDetector {
    /// Create a detector on the default backend.
    #[must_use]
    pub fn new(mode: EdgeMode) -> Self {
        Self {
            mode,
            backend: ComputeBackend::default(),
            keep_edge_map: false,
            values: EdgeMaxValues::default(),
            edge_map: None,
        }
    }

    /// Select the compute backend.
    #[must_use]
    pub const fn with_backend(mut self, backend: ComputeBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Retain the full per-pixel edge map for visualization.
    ///
    /// The map's R, G, B and A channels hold the up, down, left and
    /// right strengths.
    #[must_use]
    pub const fn keep_edge_map(mut self, keep: bool) -> Self {
        self.keep_edge_map = keep;
        self
    }

    /// The comparison mode.
    #[must_use]
    pub const fn mode(&self) -> EdgeMode {
        self.mode
    }

    /// The compute backend.
    #[must_use]
    pub const fn backend(&self) -> ComputeBackend {
        self.backend
    }

    /// Scan `image` and rebuild the aggregate.
    ///
    /// A zero-sized image is not an error: the aggregate is simply
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns [`TrimError::UnsupportedComputeBackend`] if the backend
    /// cannot run here. The previous aggregate is left untouched in that
    /// case.
    pub fn detect(&mut self, image: &RgbaImage) -> Result<&EdgeMaxValues, TrimError> {
        let parallel = match self.backend {
            ComputeBackend::Scalar => false,
            ComputeBackend::Parallel => true,
            ComputeBackend::Gpu => {
                return Err(TrimError::UnsupportedComputeBackend(
                    "gpu compute is not available in this build".to_string(),
                ));
            }
        };

        let (width, height) = image.dimensions();
        self.values.clear(width, height);

        let mut map = self
            .keep_edge_map
            .then(|| vec![0u8; width as usize * height as usize * 4]);
        scan(
            image,
            self.mode,
            parallel,
            &mut self.values,
            map.as_deref_mut(),
        );
        self.edge_map = map.and_then(|m| RgbaImage::from_raw(width, height, m));

        tracing::debug!(
            width,
            height,
            mode = %self.mode,
            backend = %self.backend,
            peak = ?self.values.peak(),
            "edge scan complete"
        );
        Ok(&self.values)
    }

    /// Aggregate from the most recent pass.
    #[must_use]
    pub const fn values(&self) -> &EdgeMaxValues {
        &self.values
    }

    /// Edge map from the most recent pass, when retained.
    #[must_use]
    pub const fn edge_map(&self) -> Option<&RgbaImage> {
        self.edge_map.as_ref()
    }

    /// Consume the detector, returning the aggregate and edge map.
    #[must_use]
    pub fn into_parts(self) -> (EdgeMaxValues, Option<RgbaImage>) {
        (self.values, self.edge_map)
    }
}

/// Collapse an edge map to one strength per pixel (maximum over the
/// four directions) for display.
#[must_use = "returns the edge strength image"]
pub fn edge_strength_image(edge_map: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(edge_map.width(), edge_map.height(), |x, y| {
        let [up, down, left, right] = edge_map.get_pixel(x, y).0;
        Luma([up.max(down).max(left).max(right)])
    })
}

/// Fill `values` (already cleared to the image size) and, if given,
/// the edge map buffer.
fn scan(
    image: &RgbaImage,
    mode: EdgeMode,
    parallel: bool,
    values: &mut EdgeMaxValues,
    map: Option<&mut [u8]>,
) {
    let width = image.width() as usize;
    let height = image.height() as usize;
    if width == 0 || height == 0 {
        return;
    }
    let frame = Frame {
        pixels: image.as_raw(),
        width,
        height,
    };
    let stride = width * 4;

    let band_rows = if parallel {
        let bands = rayon::current_num_threads() * BANDS_PER_THREAD;
        height.div_ceil(bands).max(1)
    } else {
        height
    };
    let band_count = height.div_ceil(band_rows);

    let map_bands: Vec<Option<&mut [u8]>> = match map {
        Some(m) => m.chunks_mut(band_rows * stride).map(Some).collect(),
        None => std::iter::repeat_with(|| None).take(band_count).collect(),
    };

    let (rows, columns) = values.parts_mut();
    let bands: Vec<Band<'_>> = rows
        .chunks_mut(band_rows)
        .zip(map_bands)
        .enumerate()
        .map(|(i, (rows, map))| Band {
            first_row: i * band_rows,
            rows,
            map,
        })
        .collect();

    if parallel {
        let merged = bands
            .into_par_iter()
            .fold(
                || vec![EdgeStrength::default(); width],
                |mut local, band| {
                    frame.scan_band(mode, band, &mut local);
                    local
                },
            )
            .reduce(
                || vec![EdgeStrength::default(); width],
                |mut a, b| {
                    fold_slice(&mut a, &b);
                    a
                },
            );
        fold_slice(columns, &merged);
    } else {
        for band in bands {
            frame.scan_band(mode, band, columns);
        }
    }
}

/// A run of consecutive rows handed to one worker.
struct Band<'a> {
    first_row: usize,
    rows: &'a mut [EdgeStrength],
    map: Option<&'a mut [u8]>,
}

/// Borrowed RGBA8 pixels with their dimensions.
#[derive(Clone, Copy)]
struct Frame<'a> {
    pixels: &'a [u8],
    width: usize,
    height: usize,
}

impl Frame<'_> {
    fn row(&self, y: usize) -> &[u8] {
        let stride = self.width * 4;
        &self.pixels[y * stride..(y + 1) * stride]
    }

    fn scan_band(&self, mode: EdgeMode, band: Band<'_>, columns: &mut [EdgeStrength]) {
        let last_row = self.height - 1;
        let last_col = self.width - 1;
        let stride = self.width * 4;
        let mut map = band.map;

        for (i, row_max) in band.rows.iter_mut().enumerate() {
            let y = band.first_row + i;
            let current = self.row(y);
            let (above, below) = match mode {
                EdgeMode::Neighbor => (
                    self.row(y.saturating_sub(1)),
                    self.row((y + 1).min(last_row)),
                ),
                EdgeMode::Border => (self.row(0), self.row(last_row)),
            };
            let mut map_row = map.as_deref_mut().map(|m| &mut m[i * stride..(i + 1) * stride]);

            for (x, column_max) in columns.iter_mut().enumerate() {
                let color = pixel(current, x);
                let (left, right) = match mode {
                    EdgeMode::Neighbor => (
                        pixel(current, x.saturating_sub(1)),
                        pixel(current, (x + 1).min(last_col)),
                    ),
                    EdgeMode::Border => (pixel(current, 0), pixel(current, last_col)),
                };
                let sample = EdgeStrength::new(
                    chebyshev(color, pixel(above, x)),
                    chebyshev(color, pixel(below, x)),
                    chebyshev(color, left),
                    chebyshev(color, right),
                );
                row_max.fold(sample);
                column_max.fold(sample);
                if let Some(out) = map_row.as_deref_mut() {
                    out[x * 4..x * 4 + 4].copy_from_slice(&sample.to_array());
                }
            }
        }
    }
}

fn pixel(row: &[u8], x: usize) -> [u8; 4] {
    let i = x * 4;
    [row[i], row[i + 1], row[i + 2], row[i + 3]]
}
