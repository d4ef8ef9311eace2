//! Per-color region masks.
//!
//! A region mask marks (255) every pixel whose label equals one palette
//! index. Anti-aliased edges in the source often leave single-pixel
//! seams between same-colored areas, so the mask is then closed with a
//! 2x2 square: dilation followed by erosion with the reflected square.
//!
//! The closing is evaluated as if the image were surrounded by
//! background, so it never grows a region along the image border, and it
//! never removes a pixel that was already set.

use image::{GrayImage, Luma};

use crate::types::LabelField;

/// Mask value for pixels inside the region.
pub const FOREGROUND: u8 = 255;

/// Mask of pixels labelled `index`, before gap closing.
///
/// An index that no pixel carries (including one beyond the palette)
/// produces an all-zero mask.
#[must_use]
pub fn raw_mask(labels: &LabelField, index: usize) -> GrayImage {
    let dims = labels.dimensions();
    GrayImage::from_fn(dims.width, dims.height, |x, y| {
        Luma([if labels.get(x, y) == index { FOREGROUND } else { 0 }])
    })
}

fn is_set(mask: &GrayImage, x: i64, y: i64) -> bool {
    match (u32::try_from(x), u32::try_from(y)) {
        (Ok(x), Ok(y)) if x < mask.width() && y < mask.height() => {
            mask.get_pixel(x, y).0[0] != 0
        }
        _ => false,
    }
}

/// Morphological closing with a 2x2 square structuring element.
///
/// Bridges gaps one pixel wide (including diagonal ones) and fills
/// single-pixel notches; regions separated by two or more pixels stay
/// apart.
#[must_use = "returns the closed mask"]
pub fn close_2x2(mask: &GrayImage) -> GrayImage {
    let (w, h) = mask.dimensions();

    // Dilation grows each pixel right and down, so it needs one extra
    // row and column to hold the growth past the last pixel.
    let dilated = GrayImage::from_fn(w + 1, h + 1, |x, y| {
        let (x, y) = (i64::from(x), i64::from(y));
        let hit = is_set(mask, x, y)
            || is_set(mask, x - 1, y)
            || is_set(mask, x, y - 1)
            || is_set(mask, x - 1, y - 1);
        Luma([if hit { FOREGROUND } else { 0 }])
    });

    // Erosion with the reflected square looks right and down.
    GrayImage::from_fn(w, h, |x, y| {
        let keep = [(0, 0), (1, 0), (0, 1), (1, 1)]
            .iter()
            .all(|&(dx, dy)| dilated.get_pixel(x + dx, y + dy).0[0] != 0);
        Luma([if keep { FOREGROUND } else { 0 }])
    })
}

/// Region mask for palette `index`, with small gaps closed.
#[must_use]
pub fn region_mask(labels: &LabelField, index: usize) -> GrayImage {
    close_2x2(&raw_mask(labels, index))
}

/// Number of foreground pixels in a mask.
#[must_use]
pub fn foreground_count(mask: &GrayImage) -> u64 {
    mask.pixels().map(|p| u64::from(p.0[0] != 0)).sum()
}
