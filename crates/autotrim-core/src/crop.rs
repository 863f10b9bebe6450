//! Crop-and-pad compositing.
//!
//! Produces a new buffer sized to a target rectangle given in source
//! pixel coordinates. The target may extend past the source on any side
//! (or miss it entirely); uncovered area is filled with a padding color.
//! Covered area is copied verbatim, alpha included, so a translucent
//! source is never blended over the fill.

use image::Rgba;

use crate::rect::Rectangle;
use crate::types::{RgbaImage, RgbaView, TrimError};

/// View `source` through `target`, padding out-of-bounds area.
///
/// `padding` defaults to the source's top-left pixel.
///
/// # Errors
///
/// Returns [`TrimError::InvalidCropDimensions`] if `target` has a
/// non-positive side, and [`TrimError::UnknownSourceDimensions`] if the
/// source has a zero side.
pub fn crop_expand(
    source: &RgbaImage,
    target: Rectangle,
    padding: Option<Rgba<u8>>,
) -> Result<RgbaImage, TrimError> {
    let (width, height) = output_size(target)?;
    let view = RgbaView::from_image(source)?;
    Ok(composite(view, target, width, height, padding))
}

/// [`crop_expand`] over a raw RGBA8 buffer.
///
/// # Errors
///
/// Returns [`TrimError::InvalidCropDimensions`] if `target` has a
/// non-positive side, and [`TrimError::UnknownSourceDimensions`] if the
/// buffer does not hold `width * height` pixels.
pub fn crop_expand_raw(
    pixels: &[u8],
    width: u32,
    height: u32,
    target: Rectangle,
    padding: Option<Rgba<u8>>,
) -> Result<RgbaImage, TrimError> {
    let (out_width, out_height) = output_size(target)?;
    let view = RgbaView::new(pixels, width, height)?;
    Ok(composite(view, target, out_width, out_height, padding))
}

/// Validate the target and convert its size to `u32`.
///
/// Rejects targets whose RGBA8 buffer size does not fit in `usize`.
fn output_size(target: Rectangle) -> Result<(u32, u32), TrimError> {
    let invalid = || TrimError::InvalidCropDimensions {
        width: target.width(),
        height: target.height(),
    };
    if target.width() <= 0 || target.height() <= 0 {
        return Err(invalid());
    }
    let width = u32::try_from(target.width()).map_err(|_| invalid())?;
    let height = u32::try_from(target.height()).map_err(|_| invalid())?;
    u64::from(width)
        .checked_mul(u64::from(height))
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(invalid)?;
    Ok((width, height))
}

fn composite(
    source: RgbaView<'_>,
    target: Rectangle,
    width: u32,
    height: u32,
    padding: Option<Rgba<u8>>,
) -> RgbaImage {
    let fill = padding.unwrap_or_else(|| source.pixel(0, 0));
    let mut output = RgbaImage::from_pixel(width, height, fill);

    let bounds = Rectangle::from_size(source.width(), source.height());
    let visible = target.intersection(&bounds);
    if visible.is_empty() {
        tracing::debug!(?target, "crop target lies entirely outside the source");
        return output;
    }

    // All of these are non-negative and within their buffers once
    // `visible` is non-empty and inside both rectangles.
    #[allow(clippy::cast_sign_loss)]
    let (src_x, dst_x, run) = (
        visible.left as usize,
        (i64::from(visible.left) - i64::from(target.left)) as usize,
        visible.width() as usize * 4,
    );
    #[allow(clippy::cast_sign_loss)]
    let dst_y0 = (i64::from(visible.top) - i64::from(target.top)) as usize;
    let dst_stride = width as usize * 4;
    let out = &mut *output;

    #[allow(clippy::cast_sign_loss)]
    for (i, src_y) in (visible.top as u32..visible.bottom as u32).enumerate() {
        let src = &source.row(src_y)[src_x * 4..src_x * 4 + run];
        let start = (dst_y0 + i) * dst_stride + dst_x * 4;
        out[start..start + run].copy_from_slice(src);
    }

    tracing::debug!(?target, ?visible, "crop composited");
    output
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let (r, g) = ((x * 16) as u8, (y * 16) as u8);
            Rgba([r, g, 7, 255])
        })
    }

    #[test]
    fn full_bounds_returns_identical_copy() {
        let src = gradient(12, 9);
        let out = crop_expand(&src, Rectangle::from_size(12, 9), Some(BLUE)).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn expanding_pads_ring_with_explicit_color() {
        let src = RgbaImage::from_pixel(10, 10, RED);
        let out = crop_expand(&src, Rectangle::new(-5, -5, 15, 15), Some(BLUE)).unwrap();
        assert_eq!(out.dimensions(), (20, 20));
        for (x, y, p) in out.enumerate_pixels() {
            let inside = (5..15).contains(&x) && (5..15).contains(&y);
            let expected = if inside { RED } else { BLUE };
            assert_eq!(*p, expected, "pixel ({x}, {y})");
        }
    }

    #[test]
    fn padding_defaults_to_top_left_pixel() {
        let mut src = RgbaImage::from_pixel(4, 4, RED);
        src.put_pixel(0, 0, GREEN);
        let out = crop_expand(&src, Rectangle::new(-3, 0, 4, 6), None).unwrap();
        assert_eq!(out.dimensions(), (7, 6));
        for y in 0..6 {
            for x in 0..3 {
                assert_eq!(*out.get_pixel(x, y), GREEN);
            }
        }
        for y in 4..6 {
            for x in 3..7 {
                assert_eq!(*out.get_pixel(x, y), GREEN);
            }
        }
        assert_eq!(*out.get_pixel(3, 0), GREEN);
        assert_eq!(*out.get_pixel(4, 0), RED);
    }

    #[test]
    fn interior_crop_copies_subregion() {
        let src = gradient(10, 10);
        let out = crop_expand(&src, Rectangle::new(2, 3, 6, 8), None).unwrap();
        assert_eq!(out.dimensions(), (4, 5));
        for (x, y, p) in out.enumerate_pixels() {
            assert_eq!(p, src.get_pixel(x + 2, y + 3));
        }
    }

    #[test]
    fn partially_outside_offsets_copy() {
        let src = gradient(6, 6);
        let out = crop_expand(&src, Rectangle::new(3, -2, 9, 4), Some(BLUE)).unwrap();
        assert_eq!(out.dimensions(), (6, 6));
        assert_eq!(*out.get_pixel(0, 0), BLUE);
        assert_eq!(out.get_pixel(0, 2), src.get_pixel(3, 0));
        assert_eq!(out.get_pixel(2, 5), src.get_pixel(5, 3));
        assert_eq!(*out.get_pixel(3, 2), BLUE);
    }

    #[test]
    fn disjoint_target_is_all_padding() {
        let src = RgbaImage::from_pixel(5, 5, RED);
        let out = crop_expand(&src, Rectangle::new(100, 100, 103, 102), Some(BLUE)).unwrap();
        assert_eq!(out.dimensions(), (3, 2));
        assert!(out.pixels().all(|p| *p == BLUE));
    }

    #[test]
    fn translucent_source_overwrites_fill() {
        let half = Rgba([10, 20, 30, 128]);
        let src = RgbaImage::from_pixel(2, 2, half);
        let out = crop_expand(&src, Rectangle::new(-1, -1, 3, 3), Some(BLUE)).unwrap();
        assert_eq!(*out.get_pixel(1, 1), half);
        assert_eq!(*out.get_pixel(0, 0), BLUE);
    }

    #[test]
    fn non_positive_target_is_rejected() {
        let src = RgbaImage::from_pixel(5, 5, RED);
        for target in [
            Rectangle::new(0, 0, 0, 5),
            Rectangle::new(0, 0, 5, 0),
            Rectangle::new(4, 0, 2, 5),
            Rectangle::new(0, 4, 5, -4),
        ] {
            let err = crop_expand(&src, target, None).unwrap_err();
            assert!(
                matches!(err, TrimError::InvalidCropDimensions { .. }),
                "{target:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn unallocatable_target_is_rejected() {
        let src = RgbaImage::from_pixel(4, 4, RED);
        let target = Rectangle::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        let err = crop_expand(&src, target, None).unwrap_err();
        assert!(
            matches!(
                err,
                TrimError::InvalidCropDimensions { width, height }
                    if width == i64::from(u32::MAX) && height == i64::from(u32::MAX)
            ),
            "{err:?}"
        );
        let err = crop_expand_raw(src.as_raw(), 4, 4, target, None).unwrap_err();
        assert!(matches!(err, TrimError::InvalidCropDimensions { .. }));
    }

    #[test]
    fn zero_sized_source_is_unknown() {
        let src = RgbaImage::new(0, 0);
        let err = crop_expand(&src, Rectangle::new(0, 0, 2, 2), Some(BLUE)).unwrap_err();
        assert!(matches!(err, TrimError::UnknownSourceDimensions));
    }

    #[test]
    fn target_checked_before_source() {
        let src = RgbaImage::new(0, 0);
        let err = crop_expand(&src, Rectangle::default(), None).unwrap_err();
        assert!(matches!(err, TrimError::InvalidCropDimensions { .. }));
    }

    #[test]
    fn raw_buffer_with_wrong_length_is_unknown() {
        let err = crop_expand_raw(&[0; 10], 2, 2, Rectangle::new(0, 0, 1, 1), None).unwrap_err();
        assert!(matches!(err, TrimError::UnknownSourceDimensions));
    }

    #[test]
    fn raw_buffer_matches_image_path() {
        let src = gradient(7, 5);
        let target = Rectangle::new(-2, 1, 5, 9);
        let a = crop_expand(&src, target, None).unwrap();
        let b = crop_expand_raw(src.as_raw(), 7, 5, target, None).unwrap();
        assert_eq!(a, b);
    }
}
