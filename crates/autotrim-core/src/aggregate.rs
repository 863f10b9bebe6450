//! Per-row and per-column running maxima of directional edge strength.
//!
//! [`EdgeMaxValues`] is the only thing the margin scan reads: for every
//! row and every column it keeps four independent maxima (up, down,
//! left, right). Folding is a per-channel `max`, so samples may arrive
//! in any order and partial aggregates from separate workers merge
//! exactly.

use serde::{Deserialize, Serialize};

/// Directional edge strengths toward each neighbor (or border).
///
/// Used both for a single pixel's sample and for the running maximum of
/// a row or column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeStrength {
    /// Strength toward the pixel above.
    pub up: u8,
    /// Strength toward the pixel below.
    pub down: u8,
    /// Strength toward the pixel on the left.
    pub left: u8,
    /// Strength toward the pixel on the right.
    pub right: u8,
}

impl EdgeStrength {
    /// Create a sample from its four channels.
    #[must_use]
    pub const fn new(up: u8, down: u8, left: u8, right: u8) -> Self {
        Self {
            up,
            down,
            left,
            right,
        }
    }

    /// Per-channel maximum of two samples.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self {
            up: self.up.max(other.up),
            down: self.down.max(other.down),
            left: self.left.max(other.left),
            right: self.right.max(other.right),
        }
    }

    /// Fold `other` into `self` by per-channel maximum.
    pub fn fold(&mut self, other: Self) {
        *self = self.max(other);
    }

    /// Largest of the four channels.
    #[must_use]
    pub fn peak(self) -> u8 {
        self.up.max(self.down).max(self.left).max(self.right)
    }

    /// The channels as `[up, down, left, right]`.
    #[must_use]
    pub const fn to_array(self) -> [u8; 4] {
        [self.up, self.down, self.left, self.right]
    }
}

/// Row and column maxima for one image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeMaxValues {
    rows: Vec<EdgeStrength>,
    columns: Vec<EdgeStrength>,
}

impl EdgeMaxValues {
    /// All-zero aggregate for a `width x height` image.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            rows: vec![EdgeStrength::default(); height as usize],
            columns: vec![EdgeStrength::default(); width as usize],
        }
    }

    /// Number of columns (image width).
    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows (image height).
    #[must_use]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Reset every maximum to zero and resize to `width x height`.
    pub fn clear(&mut self, width: u32, height: u32) {
        self.rows.clear();
        self.rows.resize(height as usize, EdgeStrength::default());
        self.columns.clear();
        self.columns.resize(width as usize, EdgeStrength::default());
    }

    /// Fold one pixel's sample into its row and column.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the aggregate's dimensions.
    pub fn fold(&mut self, x: usize, y: usize, sample: EdgeStrength) {
        self.rows[y].fold(sample);
        self.columns[x].fold(sample);
    }

    /// Merge another aggregate of the same dimensions by per-channel max.
    ///
    /// Extra rows or columns on either side are ignored.
    pub fn merge(&mut self, other: &Self) {
        fold_slice(&mut self.rows, &other.rows);
        fold_slice(&mut self.columns, &other.columns);
    }

    /// Maxima for row `y`.
    #[must_use]
    pub fn row(&self, y: usize) -> Option<EdgeStrength> {
        self.rows.get(y).copied()
    }

    /// Maxima for column `x`.
    #[must_use]
    pub fn column(&self, x: usize) -> Option<EdgeStrength> {
        self.columns.get(x).copied()
    }

    /// All row maxima, top to bottom.
    #[must_use]
    pub fn rows(&self) -> &[EdgeStrength] {
        &self.rows
    }

    /// All column maxima, left to right.
    #[must_use]
    pub fn columns(&self) -> &[EdgeStrength] {
        &self.columns
    }

    /// Mutable row and column storage, for band scanners that write
    /// rows directly.
    pub(crate) fn parts_mut(&mut self) -> (&mut [EdgeStrength], &mut [EdgeStrength]) {
        (&mut self.rows, &mut self.columns)
    }

    /// Overall maximum across the whole image, per channel.
    #[must_use]
    pub fn peak(&self) -> EdgeStrength {
        self.rows
            .iter()
            .fold(EdgeStrength::default(), |acc, s| acc.max(*s))
    }
}

/// Per-channel max of `src` into `dst`, element-wise.
pub(crate) fn fold_slice(dst: &mut [EdgeStrength], src: &[EdgeStrength]) {
    for (d, s) in dst.iter_mut().zip(src) {
        d.fold(*s);
    }
}
