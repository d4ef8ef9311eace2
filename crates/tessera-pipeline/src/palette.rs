//! Palette extraction by color frequency.
//!
//! The image is first resampled to a small fixed grid (nearest-neighbor,
//! so no new colors are invented), then distinct colors are counted and
//! the most frequent ones become the palette.
//!
//! Ties in count are broken by ascending `(r, g, b)` order, which keeps
//! the result byte-for-byte reproducible for identical input.

use std::collections::BTreeMap;

use image::RgbImage;

use crate::resample::resample_exact;
use crate::types::{Color, Dimensions, Palette};

/// Count the occurrences of every distinct color, keyed in `(r, g, b)` order.
#[must_use]
pub fn color_histogram(image: &RgbImage) -> BTreeMap<Color, u64> {
    let mut counts = BTreeMap::new();
    for pixel in image.pixels() {
        *counts.entry(Color::from(*pixel)).or_insert(0) += 1;
    }
    counts
}

/// Extract up to `max_colors` representative colors from `image`.
///
/// When `sample_size` is `Some`, the image is resampled to exactly that
/// size before counting (aspect ratio is not preserved). Colors are
/// returned most frequent first.
///
/// An empty image yields an empty palette; callers treat that as
/// "nothing to process".
#[must_use]
pub fn extract_palette(
    image: &RgbImage,
    sample_size: Option<Dimensions>,
    max_colors: usize,
) -> Palette {
    if Dimensions::of(image).is_empty() {
        return Palette::default();
    }

    let histogram = match sample_size {
        Some(size) => color_histogram(&resample_exact(image, size).0),
        None => color_histogram(image),
    };

    let mut ranked: Vec<(Color, u64)> = histogram.into_iter().collect();
    // Stable sort keeps the (r, g, b) order among equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let palette: Palette = ranked
        .into_iter()
        .take(max_colors)
        .map(|(color, _)| color)
        .collect();
    log::debug!(
        "extracted {} palette colors (max {max_colors})",
        palette.len()
    );
    palette
}
