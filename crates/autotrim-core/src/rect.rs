//! Half-open integer rectangle.
//!
//! A [`Rectangle`] covers the pixels `left <= x < right` and
//! `top <= y < bottom`. Any four integers form a valid rectangle: when
//! `right <= left` or `bottom <= top` it is simply empty. No operation
//! normalizes the corners and none can fail.

use serde::{Deserialize, Serialize};

/// Integer half-open 2D region in pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rectangle {
    /// Inclusive left edge.
    pub left: i32,
    /// Inclusive top edge.
    pub top: i32,
    /// Exclusive right edge.
    pub right: i32,
    /// Exclusive bottom edge.
    pub bottom: i32,
}

impl Rectangle {
    /// Create a rectangle from its four edges.
    #[must_use]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// The rectangle `(0, 0, width, height)` covering a whole image.
    ///
    /// Sizes beyond `i32::MAX` saturate.
    #[must_use]
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(
            0,
            0,
            i32::try_from(width).unwrap_or(i32::MAX),
            i32::try_from(height).unwrap_or(i32::MAX),
        )
    }

    /// Returns `true` if the rectangle contains no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// Returns `true` if the pixel `(x, y)` lies inside the rectangle.
    #[must_use]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        self.left <= x && x < self.right && self.top <= y && y < self.bottom
    }

    /// Signed width (`right - left`). Negative for inverted rectangles.
    #[must_use]
    pub const fn width(&self) -> i64 {
        self.right as i64 - self.left as i64
    }

    /// Signed height (`bottom - top`). Negative for inverted rectangles.
    #[must_use]
    pub const fn height(&self) -> i64 {
        self.bottom as i64 - self.top as i64
    }

    /// Number of pixels covered, `0` when empty.
    #[must_use]
    pub const fn area(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            #[allow(clippy::cast_sign_loss)]
            let area = self.width() as u64 * self.height() as u64;
            area
        }
    }

    /// Replace all four edges.
    pub const fn set(&mut self, left: i32, top: i32, right: i32, bottom: i32) -> &mut Self {
        self.left = left;
        self.top = top;
        self.right = right;
        self.bottom = bottom;
        self
    }

    /// Move every side outward by `amount` (inward when negative).
    ///
    /// Arithmetic wraps, so `grow(n)` followed by `grow(-n)` is always
    /// the identity.
    pub const fn grow(&mut self, amount: i32) -> &mut Self {
        self.grow_by(amount, amount, amount, amount)
    }

    /// Move each side outward by its own amount (inward when negative).
    pub const fn grow_by(&mut self, left: i32, top: i32, right: i32, bottom: i32) -> &mut Self {
        self.left = self.left.wrapping_sub(left);
        self.top = self.top.wrapping_sub(top);
        self.right = self.right.wrapping_add(right);
        self.bottom = self.bottom.wrapping_add(bottom);
        self
    }

    /// Shrink this rectangle to its overlap with `other`.
    ///
    /// The result may be empty; disjoint rectangles are not an error.
    pub fn intersect(&mut self, other: &Self) -> &mut Self {
        self.left = self.left.max(other.left);
        self.top = self.top.max(other.top);
        self.right = self.right.min(other.right);
        self.bottom = self.bottom.min(other.bottom);
        self
    }

    /// By-value form of [`grow`](Self::grow).
    #[must_use]
    pub const fn grown(mut self, amount: i32) -> Self {
        self.grow(amount);
        self
    }

    /// Like [`grown`](Self::grown), but `None` if any side would
    /// overflow instead of wrapping.
    #[must_use]
    pub const fn checked_grown(self, amount: i32) -> Option<Self> {
        match (
            self.left.checked_sub(amount),
            self.top.checked_sub(amount),
            self.right.checked_add(amount),
            self.bottom.checked_add(amount),
        ) {
            (Some(left), Some(top), Some(right), Some(bottom)) => {
                Some(Self::new(left, top, right, bottom))
            }
            _ => None,
        }
    }

    /// By-value form of [`intersect`](Self::intersect).
    #[must_use]
    pub fn intersection(mut self, other: &Self) -> Self {
        self.intersect(other);
        self
    }
}
