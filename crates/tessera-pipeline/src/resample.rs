//! Nearest-neighbor resampling for palette sampling and preview thumbnails.
//!
//! Both uses must keep every output pixel equal to some input pixel:
//! the palette extractor promises that every palette color occurs in the
//! image, and the preview must stay in exact palette colors. Hence only
//! nearest-neighbor filtering is used here.

use image::RgbImage;
use image::imageops::{self, FilterType};

use crate::types::Dimensions;

/// Box used by [`fit_within`] when the requested box is unusably small.
pub const FALLBACK_PREVIEW_BOX: Dimensions = Dimensions::new(800, 600);

/// Requested boxes narrower than this fall back to [`FALLBACK_PREVIEW_BOX`].
pub const MIN_PREVIEW_BOX_WIDTH: u32 = 100;

/// Resample `image` to exactly `target`, ignoring aspect ratio.
///
/// Returns the (possibly unchanged) image and whether resampling was
/// actually applied. Images that already have the target size, and
/// empty images or targets, are returned unchanged.
#[must_use]
pub fn resample_exact(image: &RgbImage, target: Dimensions) -> (RgbImage, bool) {
    let current = Dimensions::of(image);
    if current == target || current.is_empty() || target.is_empty() {
        return (image.clone(), false);
    }
    let resized = imageops::resize(image, target.width, target.height, FilterType::Nearest);
    (resized, true)
}

/// Shrink `image` to fit inside `bounds`, preserving aspect ratio.
///
/// Never enlarges. Each side of the result is at least one pixel. A box
/// narrower than [`MIN_PREVIEW_BOX_WIDTH`] is replaced by
/// [`FALLBACK_PREVIEW_BOX`].
#[must_use]
pub fn fit_within(image: &RgbImage, bounds: Dimensions) -> RgbImage {
    let bounds = if bounds.width < MIN_PREVIEW_BOX_WIDTH || bounds.height == 0 {
        FALLBACK_PREVIEW_BOX
    } else {
        bounds
    };

    let (w, h) = image.dimensions();
    if w <= bounds.width && h <= bounds.height {
        return image.clone();
    }

    let scale =
        (f64::from(bounds.width) / f64::from(w)).min(f64::from(bounds.height) / f64::from(h));
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let scaled = |side: u32| ((f64::from(side) * scale).round() as u32).max(1);
    imageops::resize(image, scaled(w), scaled(h), FilterType::Nearest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_image(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| image::Rgb([(x % 256) as u8, (y % 256) as u8, 7]))
    }

    #[test]
    fn exact_resample_changes_aspect() {
        let img = test_image(400, 100);
        let (result, applied) = resample_exact(&img, Dimensions::new(200, 200));
        assert!(applied);
        assert_eq!(result.dimensions(), (200, 200));
    }

    #[test]
    fn exact_resample_noop_when_matching() {
        let img = test_image(200, 200);
        let (result, applied) = resample_exact(&img, Dimensions::new(200, 200));
        assert!(!applied);
        assert_eq!(result, img);
    }

    #[test]
    fn exact_resample_keeps_only_source_colors() {
        let img = test_image(37, 23);
        let (result, _) = resample_exact(&img, Dimensions::new(50, 50));
        let source: std::collections::HashSet<_> = img.pixels().collect();
        assert!(result.pixels().all(|p| source.contains(p)));
    }

    #[test]
    fn fit_keeps_small_images() {
        let img = test_image(300, 200);
        let result = fit_within(&img, Dimensions::new(800, 600));
        assert_eq!(result.dimensions(), (300, 200));
    }

    #[test]
    fn fit_landscape() {
        let img = test_image(1600, 900);
        let result = fit_within(&img, Dimensions::new(800, 600));
        assert_eq!(result.dimensions(), (800, 450));
    }

    #[test]
    fn fit_portrait() {
        let img = test_image(600, 1200);
        let result = fit_within(&img, Dimensions::new(800, 600));
        assert_eq!(result.dimensions(), (300, 600));
    }

    #[test]
    fn tiny_box_falls_back() {
        let img = test_image(1600, 1200);
        let result = fit_within(&img, Dimensions::new(50, 50));
        assert_eq!(result.dimensions(), (800, 600));
    }
}
