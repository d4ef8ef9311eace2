//! tessera-pipeline: Pure palette vectorization pipeline (sans-IO).
//!
//! Converts raster images into flat-color vector documents through:
//! decode -> palette -> contrast/brightness -> nearest-color labels ->
//! per-color region masks -> contour tracing -> speckle filter ->
//! simplification -> luminance-ordered layers.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! byte slices and images and returns structured data. Serialization
//! lives in `tessera-export`, filesystem access in `tessera-cli`.

pub mod adjust;
pub mod classify;
pub mod contour;
pub mod decode;
pub mod diagnostics;
pub mod document;
pub mod palette;
pub mod pipeline;
pub mod preview;
pub mod region;
pub mod resample;
pub mod simplify;
pub mod types;

pub use contour::{ContourTracer, ContourTracerKind};
pub use pipeline::Pipeline;
pub use preview::PreviewMode;
pub use types::{
    AdjustmentParameters, Color, ColorLayer, Dimensions, ErrorKind, LabelField, Palette,
    ParseColorError, PathDocument, PipelineConfig, PipelineError, Point, Polygon, ProcessResult,
    StagedResult,
};

use types::RgbImage;

/// Vectorize an already decoded image against a fixed palette.
///
/// Runs classification, tracing of every non-background color, and
/// document assembly.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyPalette`] if `palette` is empty.
/// Returns [`PipelineError::InvalidDimensions`] if the image has a
/// zero-length side.
pub fn vectorize(
    image: &RgbImage,
    palette: &Palette,
    adjustments: &AdjustmentParameters,
) -> Result<PathDocument, PipelineError> {
    let config = PipelineConfig {
        adjustments: *adjustments,
        ..PipelineConfig::default()
    };
    let classification = classify::classify(image, adjustments, palette)?;
    let regions = pipeline::trace_regions(
        &classification.labels,
        palette.len(),
        document::background_index(palette),
        &config,
    );
    document::assemble(palette, &regions, Dimensions::of(image))
}

/// Run the full pipeline on encoded image bytes.
///
/// The palette is extracted from the image according to `config`. An
/// extraction that yields no colors is not an error: the result has an
/// empty palette and a document without layers.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty and
/// [`PipelineError::ImageDecode`] if the image cannot be decoded.
pub fn process(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<ProcessResult, PipelineError> {
    let staged = process_staged(image_bytes, config)?;
    Ok(ProcessResult {
        palette: staged.palette,
        document: staged.document,
    })
}

/// Run the full pipeline, keeping every intermediate.
///
/// # Errors
///
/// Same as [`process`].
pub fn process_staged(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<StagedResult, PipelineError> {
    Ok(Pipeline::new(image_bytes.to_vec(), config.clone())
        .decode()?
        .extract_palette()
        .classify()?
        .trace()
        .assemble()?
        .into_result())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_png(img: &RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn exact() -> AdjustmentParameters {
        AdjustmentParameters::IDENTITY
    }

    #[test]
    fn solid_red_square_becomes_one_rectangle() {
        let img = RgbImage::from_pixel(4, 4, image::Rgb([255, 0, 0]));
        let palette = Palette::new(vec![Color::WHITE, Color::new(255, 0, 0)]);
        let doc = vectorize(&img, &palette, &exact()).unwrap();

        assert_eq!(doc.dimensions(), Dimensions::new(4, 4));
        assert_eq!(doc.layers().len(), 1);
        let layer = &doc.layers()[0];
        assert_eq!(layer.color, Color::new(255, 0, 0));
        assert_eq!(layer.polygons.len(), 1);

        let mut corners: Vec<(i32, i32)> = layer.polygons[0]
            .points()
            .iter()
            .map(|p| (p.x, p.y))
            .collect();
        corners.sort_unstable();
        assert_eq!(corners, vec![(0, 0), (0, 3), (3, 0), (3, 3)]);
    }

    #[test]
    fn default_speckle_drops_tiny_square() {
        // The 4x4 block encloses 9 square pixels, below the default of 10.
        let img = RgbImage::from_pixel(4, 4, image::Rgb([255, 0, 0]));
        let palette = Palette::new(vec![Color::WHITE, Color::new(255, 0, 0)]);
        let adjustments = AdjustmentParameters {
            contrast: 1.0,
            brightness: 1.0,
            ..AdjustmentParameters::default()
        };
        let doc = vectorize(&img, &palette, &adjustments).unwrap();
        assert!(doc.layers().is_empty());
    }

    #[test]
    fn ring_becomes_outer_and_hole() {
        let img = RgbImage::from_fn(20, 20, |x, y| {
            let outer = (2..18).contains(&x) && (2..18).contains(&y);
            let hole = (7..13).contains(&x) && (7..13).contains(&y);
            if outer && !hole {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        });
        let palette = Palette::new(vec![Color::WHITE, Color::BLACK]);
        let doc = vectorize(&img, &palette, &exact()).unwrap();
        assert_eq!(doc.layers().len(), 1);
        assert_eq!(doc.layers()[0].color, Color::BLACK);
        assert_eq!(doc.layers()[0].polygons.len(), 2);
        let mut areas: Vec<f64> = doc.layers()[0].polygons.iter().map(Polygon::area).collect();
        areas.sort_by(f64::total_cmp);
        assert!(areas[0] < areas[1]);
    }

    #[test]
    fn empty_palette_is_invalid_input() {
        let img = RgbImage::from_pixel(4, 4, image::Rgb([1, 2, 3]));
        let err = vectorize(&img, &Palette::default(), &exact()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyPalette));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn process_empty_input() {
        let result = process(&[], &PipelineConfig::default());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_corrupt_input() {
        let err = process(&[0xFF, 0x00], &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::ImageDecode(_)));
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }

    #[test]
    fn process_uniform_image_has_no_layers() {
        let png = encode_png(&RgbImage::from_pixel(16, 16, image::Rgb([90, 140, 200])));
        let result = process(&png, &PipelineConfig::default()).unwrap();
        assert_eq!(result.palette.len(), 1);
        assert!(result.document.layers().is_empty());
    }

    #[test]
    fn process_with_zero_palette_size_is_empty_not_an_error() {
        let png = encode_png(&RgbImage::from_fn(16, 16, |x, _| {
            if x < 8 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        }));
        let config = PipelineConfig {
            max_palette_size: 0,
            ..PipelineConfig::default()
        };
        let result = process(&png, &config).unwrap();
        assert!(result.palette.is_empty());
        assert!(result.document.layers().is_empty());
        assert_eq!(result.document.dimensions(), Dimensions::new(16, 16));
    }

    #[test]
    fn process_matches_process_staged() {
        let png = encode_png(&RgbImage::from_fn(40, 30, |x, y| {
            if (x / 10 + y / 10) % 2 == 0 {
                image::Rgb([30, 30, 30])
            } else {
                image::Rgb([240, 240, 240])
            }
        }));
        let config = PipelineConfig::default();
        let result = process(&png, &config).unwrap();
        let staged = process_staged(&png, &config).unwrap();
        assert_eq!(result.palette, staged.palette);
        assert_eq!(result.document, staged.document);
        assert_eq!(staged.labels.dimensions(), Dimensions::new(40, 30));
    }

    #[test]
    fn vectorize_is_deterministic() {
        let img = RgbImage::from_fn(30, 30, |x, y| {
            image::Rgb([(x * 8) as u8, (y * 8) as u8, ((x * y) % 256) as u8])
        });
        let palette = palette::extract_palette(&img, None, 6);
        let a = vectorize(&img, &palette, &AdjustmentParameters::default()).unwrap();
        let b = vectorize(&img, &palette, &AdjustmentParameters::default()).unwrap();
        assert_eq!(a, b);
    }
}
