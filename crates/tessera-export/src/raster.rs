//! Document rasterization.
//!
//! Renders a [`PathDocument`] back into pixels with `tiny-skia`: the
//! canvas is flooded with the background color and every layer is
//! filled on top with the even-odd rule and anti-aliasing off, so each
//! output pixel is exactly one palette color.
//!
//! Polygon vertices address pixel centers, hence the half-pixel
//! translation: pixel `(x, y)` is painted when the point `(x, y)` lies
//! inside the polygon.

use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};

use tessera_pipeline::types::RgbImage;
use tessera_pipeline::{Color, PathDocument, Polygon};

/// Errors that can occur while exporting a document.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The rasterizer could not allocate a canvas of this size.
    #[error("cannot allocate a {width}x{height} canvas")]
    Canvas {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
}

fn to_skia(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, 255)
}

/// Build one compound path out of every polygon with at least three
/// points. Returns `None` when nothing drawable remains.
#[allow(clippy::cast_precision_loss)]
fn compound_path(polygons: &[Polygon]) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for polygon in polygons.iter().filter(|p| p.len() >= 3) {
        let mut points = polygon.points().iter().map(|p| (p.x as f32, p.y as f32));
        if let Some((x, y)) = points.next() {
            pb.move_to(x, y);
            for (x, y) in points {
                pb.line_to(x, y);
            }
            pb.close();
        }
    }
    pb.finish()
}

/// Rasterize `document` at its native size.
///
/// Documents without a background color start from white.
///
/// # Errors
///
/// Returns [`ExportError::Canvas`] if the canvas cannot be allocated.
pub fn render_document(document: &PathDocument) -> Result<RgbImage, ExportError> {
    let dims = document.dimensions();
    let canvas_error = || ExportError::Canvas {
        width: dims.width,
        height: dims.height,
    };
    let mut pixmap = Pixmap::new(dims.width, dims.height).ok_or_else(canvas_error)?;
    pixmap.fill(to_skia(document.background().unwrap_or(Color::WHITE)));

    let transform = Transform::from_translate(0.5, 0.5);
    for layer in document.layers() {
        let Some(path) = compound_path(&layer.polygons) else {
            continue;
        };
        let mut paint = Paint::default();
        paint.set_color(to_skia(layer.color));
        paint.anti_alias = false;
        pixmap.fill_path(&path, &paint, FillRule::EvenOdd, transform, None);
    }

    // Every pixel is opaque, so the premultiplied data is plain RGB.
    let rgb: Vec<u8> = pixmap
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    RgbImage::from_raw(dims.width, dims.height, rgb).ok_or_else(canvas_error)
}
