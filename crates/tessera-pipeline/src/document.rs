//! Document assembly: turn per-color polygons into ordered layers.
//!
//! Layers are stacked by luminance. The lightest palette color is taken
//! to be the background and is not drawn at all. The remaining colors
//! are emitted by walking the lightest-first order backwards, so the
//! darkest layer is drawn first and the lightest non-background layer
//! ends up on top.

use crate::types::{ColorLayer, Dimensions, Palette, PathDocument, PipelineError, Polygon};

/// Palette indices sorted by descending luminance.
///
/// Colors of equal luminance keep their palette order.
#[must_use]
pub fn luminance_order(palette: &Palette) -> Vec<usize> {
    let mut order: Vec<usize> = (0..palette.len()).collect();
    let colors = palette.colors();
    order.sort_by(|&a, &b| colors[b].luminance().total_cmp(&colors[a].luminance()));
    order
}

/// Index of the background color: the lightest one in the palette.
#[must_use]
pub fn background_index(palette: &Palette) -> Option<usize> {
    luminance_order(palette).first().copied()
}

/// Assemble a document from the simplified polygons of every palette
/// color.
///
/// `regions[i]` holds the polygons of palette index `i`; missing entries
/// are treated as empty. Colors without polygons produce no layer, and
/// neither does the background color.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidDimensions`] if either side of
/// `dimensions` is zero.
pub fn assemble(
    palette: &Palette,
    regions: &[Vec<Polygon>],
    dimensions: Dimensions,
) -> Result<PathDocument, PipelineError> {
    let order = luminance_order(palette);
    let background = order.first().copied();

    let layers: Vec<ColorLayer> = order
        .iter()
        .skip(1)
        .rev()
        .filter_map(|&index| {
            let polygons = regions.get(index).filter(|p| !p.is_empty())?;
            let color = palette.get(index)?;
            Some(ColorLayer {
                palette_index: index,
                color,
                polygons: polygons.clone(),
            })
        })
        .collect();

    log::debug!(
        "assembled {} layers ({} polygons) on {}x{} canvas",
        layers.len(),
        layers.iter().map(|l| l.polygons.len()).sum::<usize>(),
        dimensions.width,
        dimensions.height,
    );

    PathDocument::new(
        dimensions,
        background.and_then(|i| palette.get(i)),
        layers,
    )
}
