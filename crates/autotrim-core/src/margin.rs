//! Threshold scan turning edge maxima into a content rectangle.
//!
//! Each side is located independently from the channel facing that
//! side: `left` from the columns' left strengths, `right` from their
//! right strengths, `top` from the rows' up strengths and `bottom` from
//! their down strengths. A strength counts only when it is strictly
//! greater than the limit.
//!
//! If either side of an axis finds nothing, that whole axis collapses
//! to `(0, 0)`, leaving a zero-width (or zero-height) rectangle rather
//! than one open on a single side.

use crate::aggregate::{EdgeMaxValues, EdgeStrength};
use crate::rect::Rectangle;
use crate::types::TrimError;

/// Tightest rectangle outside of which every edge strength is at most
/// `limit`.
///
/// `limit` is compared as a plain integer: values below 0 qualify every
/// row and column, values of 255 or more qualify none.
#[must_use = "returns the content rectangle"]
pub fn find_margins(values: &EdgeMaxValues, limit: i32) -> Rectangle {
    if !(0..=255).contains(&limit) {
        tracing::warn!(limit, "edge limit outside 0..=255");
    }

    let (left, right) = axis_bounds(values.columns(), limit, |s| s.left, |s| s.right);
    let (top, bottom) = axis_bounds(values.rows(), limit, |s| s.up, |s| s.down);
    let rect = Rectangle::new(left, top, right, bottom);

    tracing::debug!(limit, ?rect, "margins found");
    rect
}

/// Grow `detected` by a caller-supplied `margin` on every side.
///
/// # Errors
///
/// Returns [`TrimError::InvalidConfig`] if a side would leave the `i32`
/// range.
pub fn apply_margin(detected: Rectangle, margin: i32) -> Result<Rectangle, TrimError> {
    detected.checked_grown(margin).ok_or_else(|| {
        TrimError::InvalidConfig(format!(
            "margin {margin} overflows the coordinates of {detected:?}"
        ))
    })
}

/// First index whose leading channel exceeds `limit`, and one past the
/// last index whose trailing channel does; `(0, 0)` unless both exist.
fn axis_bounds(
    maxima: &[EdgeStrength],
    limit: i32,
    leading: impl Fn(&EdgeStrength) -> u8,
    trailing: impl Fn(&EdgeStrength) -> u8,
) -> (i32, i32) {
    let start = maxima.iter().position(|s| i32::from(leading(s)) > limit);
    let end = maxima.iter().rposition(|s| i32::from(trailing(s)) > limit);
    match (start, end) {
        (Some(start), Some(end)) => (to_coord(start), to_coord(end + 1)),
        _ => (0, 0),
    }
}

fn to_coord(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}
