//! Nearest-palette-color classification.
//!
//! Every pixel of the adjusted image is assigned the index of the
//! palette color closest to it in RGB space. Lookups go through an
//! R*-tree over the palette colors, so classifying an image costs
//! `O(H·W·log K)` rather than `O(H·W·K)`; repeated pixel colors are
//! served from a cache.
//!
//! Ties (two palette colors at exactly the same distance) resolve to the
//! lowest palette index.

use std::collections::HashMap;

use image::RgbImage;
use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::adjust;
use crate::types::{AdjustmentParameters, Color, Dimensions, LabelField, Palette, PipelineError};

/// R-tree entry: a palette color as a point in RGB space, tagged with
/// its palette index.
type PaletteEntry = GeomWithData<[f64; 3], usize>;

fn rgb_point(color: Color) -> [f64; 3] {
    color.channels().map(f64::from)
}

/// Spatial index answering "which palette color is nearest?".
pub struct NearestColor {
    tree: RTree<PaletteEntry>,
}

impl NearestColor {
    /// Build the index over every color of `palette`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyPalette`] if the palette has no colors.
    pub fn new(palette: &Palette) -> Result<Self, PipelineError> {
        if palette.is_empty() {
            return Err(PipelineError::EmptyPalette);
        }
        let entries = palette
            .colors()
            .iter()
            .enumerate()
            .map(|(index, &color)| PaletteEntry::new(rgb_point(color), index))
            .collect();
        Ok(Self {
            tree: RTree::bulk_load(entries),
        })
    }

    /// Palette index of the color nearest to `color`.
    ///
    /// Among equally distant colors the lowest index wins.
    #[must_use]
    pub fn nearest(&self, color: Color) -> usize {
        let query = rgb_point(color);
        let mut best: Option<(f64, usize)> = None;
        for (entry, distance_2) in self.tree.nearest_neighbor_iter_with_distance_2(&query) {
            match best {
                None => best = Some((distance_2, entry.data)),
                // Entries arrive in increasing distance; stop once past the tie.
                Some((best_distance_2, _)) if distance_2 > best_distance_2 => break,
                Some((_, best_index)) if entry.data < best_index => {
                    best = Some((distance_2, entry.data));
                }
                Some(_) => {}
            }
        }
        best.map_or(0, |(_, index)| index)
    }
}

/// Output of [`classify`].
#[derive(Debug, Clone)]
pub struct Classification {
    /// The contrast- and brightness-adjusted image that was classified.
    pub adjusted: RgbImage,
    /// Nearest palette index per pixel.
    pub labels: LabelField,
}

/// Label every pixel of `image` with its nearest palette color.
///
/// The image is not adjusted; see [`classify`] for the full step.
#[must_use]
pub fn label_pixels(image: &RgbImage, index: &NearestColor) -> LabelField {
    let mut cache: HashMap<Color, usize> = HashMap::new();
    LabelField::from_fn(Dimensions::of(image), |x, y| {
        let color = Color::from(*image.get_pixel(x, y));
        *cache.entry(color).or_insert_with(|| index.nearest(color))
    })
}

/// Adjust contrast and brightness, then classify every pixel against
/// `palette`.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyPalette`] if the palette has no colors.
pub fn classify(
    image: &RgbImage,
    adjustments: &AdjustmentParameters,
    palette: &Palette,
) -> Result<Classification, PipelineError> {
    let index = NearestColor::new(palette)?;
    let adjusted = adjust::adjust(image, adjustments.contrast, adjustments.brightness);
    let labels = label_pixels(&adjusted, &index);
    log::debug!(
        "classified {}x{} pixels against {} colors",
        adjusted.width(),
        adjusted.height(),
        palette.len()
    );
    Ok(Classification { adjusted, labels })
}
