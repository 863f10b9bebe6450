//! Preview rendering: the detected rectangle drawn over the source.
//!
//! Collaborators that show the result on screen do their own scaling;
//! this produces a full-resolution preview image for files and logs.

use image::Rgba;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::rect::Rectangle;
use crate::types::RgbaImage;

/// Default outline color (opaque magenta).
pub const DEFAULT_OUTLINE: Rgba<u8> = Rgba([255, 0, 255, 255]);

/// Copy `image` and outline `bounds` on it, `thickness` pixels wide,
/// growing inward.
///
/// The outline is clipped to the image. An empty (or fully outside)
/// rectangle leaves the copy unchanged.
#[must_use = "returns the annotated copy"]
pub fn draw_bounds(
    image: &RgbaImage,
    bounds: Rectangle,
    color: Rgba<u8>,
    thickness: u32,
) -> RgbaImage {
    let mut out = image.clone();
    let clipped = bounds.intersection(&Rectangle::from_size(image.width(), image.height()));
    if clipped.is_empty() {
        return out;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (mut width, mut height) = (clipped.width() as u32, clipped.height() as u32);
    let (mut left, mut top) = (clipped.left, clipped.top);
    for _ in 0..thickness {
        if width == 0 || height == 0 {
            break;
        }
        draw_hollow_rect_mut(&mut out, Rect::at(left, top).of_size(width, height), color);
        left += 1;
        top += 1;
        width = width.saturating_sub(2);
        height = height.saturating_sub(2);
    }
    out
}
