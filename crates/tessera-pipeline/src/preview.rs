//! Raster previews of a classification.
//!
//! Two views are offered: the classified image itself (every pixel
//! painted with its palette color), and a wireframe showing only the
//! borders between differently colored regions.

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::resample::fit_within;
use crate::types::{Color, Dimensions, LabelField, Palette};

/// Wireframe line color.
pub const WIREFRAME_COLOR: Color = Color::new(0, 255, 255);

/// Canny low threshold for wireframe edges.
pub const WIREFRAME_LOW_THRESHOLD: f32 = 50.0;

/// Canny high threshold for wireframe edges.
pub const WIREFRAME_HIGH_THRESHOLD: f32 = 150.0;

/// Which preview to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewMode {
    /// Flat palette colors.
    #[default]
    Filled,
    /// Region borders only.
    Wireframe,
}

/// Paint every pixel with the palette color of its label.
///
/// Labels outside the palette are painted black.
#[must_use]
pub fn render_labels(labels: &LabelField, palette: &Palette) -> RgbImage {
    let dims = labels.dimensions();
    RgbImage::from_fn(dims.width, dims.height, |x, y| {
        palette
            .get(labels.get(x, y))
            .unwrap_or(Color::BLACK)
            .into()
    })
}

fn channel(image: &RgbImage, c: usize) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([image.get_pixel(x, y).0[c]])
    })
}

/// Edge map of a color image: Canny per channel, combined by maximum.
#[must_use = "returns the binary edge map"]
pub fn color_edges(image: &RgbImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let per_channel: Vec<GrayImage> = (0..3)
        .map(|c| imageproc::edges::canny(&channel(image, c), low_threshold, high_threshold))
        .collect();
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let v = per_channel
            .iter()
            .map(|e| e.get_pixel(x, y).0[0])
            .max()
            .unwrap_or(0);
        Luma([v])
    })
}

/// Region borders of a classified image, in [`WIREFRAME_COLOR`] on black.
#[must_use]
pub fn render_wireframe(classified: &RgbImage) -> RgbImage {
    let edges = color_edges(classified, WIREFRAME_LOW_THRESHOLD, WIREFRAME_HIGH_THRESHOLD);
    let line: Rgb<u8> = WIREFRAME_COLOR.into();
    RgbImage::from_fn(edges.width(), edges.height(), |x, y| {
        if edges.get_pixel(x, y).0[0] == 255 {
            line
        } else {
            Rgb([0, 0, 0])
        }
    })
}

/// Render a preview in the given mode, shrunk to fit `display`.
///
/// An empty label field yields an empty image.
#[must_use]
pub fn render_preview(
    labels: &LabelField,
    palette: &Palette,
    mode: PreviewMode,
    display: Dimensions,
) -> RgbImage {
    if labels.is_empty() {
        return RgbImage::new(0, 0);
    }
    let classified = render_labels(labels, palette);
    let image = match mode {
        PreviewMode::Filled => classified,
        PreviewMode::Wireframe => render_wireframe(&classified),
    };
    fit_within(&image, display)
}
