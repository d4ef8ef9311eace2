//! Raster in, SVG and re-rendered raster out.
#![allow(clippy::unwrap_used)]

use image::{Rgb, RgbImage};
use tessera_export::{SvgMetadata, render_document, to_svg};
use tessera_pipeline::{
    AdjustmentParameters, Color, Dimensions, LabelField, Palette, PipelineConfig, StagedResult,
    process, process_staged, vectorize,
};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const GRAY: Rgb<u8> = Rgb([128, 128, 128]);

fn encode_png(img: &RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn exact_config() -> PipelineConfig {
    PipelineConfig {
        adjustments: AdjustmentParameters::IDENTITY,
        palette_sample_size: None,
        ..PipelineConfig::default()
    }
}

fn ring() -> RgbImage {
    RgbImage::from_fn(24, 24, |x, y| {
        let outer = (3..20).contains(&x) && (3..20).contains(&y);
        let hole = (9..14).contains(&x) && (9..14).contains(&y);
        if outer && !hole { BLACK } else { WHITE }
    })
}

/// Black ring around a hole holding a black island with its own hole.
fn concentric_squares() -> RgbImage {
    RgbImage::from_fn(40, 40, |x, y| {
        let inside = |lo: u32, hi: u32| (lo..hi).contains(&x) && (lo..hi).contains(&y);
        let black = (inside(2, 38) && !inside(8, 32)) || (inside(14, 26) && !inside(18, 22));
        if black { BLACK } else { WHITE }
    })
}

/// Black disk of `radius` centered on a white 100x100 canvas.
fn disk(radius: i64) -> RgbImage {
    RgbImage::from_fn(100, 100, |x, y| {
        let (dx, dy) = (i64::from(x) - 50, i64::from(y) - 50);
        if dx * dx + dy * dy <= radius * radius {
            BLACK
        } else {
            WHITE
        }
    })
}

fn smoothed_config(smoothing: f64) -> PipelineConfig {
    PipelineConfig {
        adjustments: AdjustmentParameters {
            smoothing,
            ..AdjustmentParameters::IDENTITY
        },
        ..exact_config()
    }
}

fn palette_index(staged: &StagedResult, color: Color) -> usize {
    staged
        .palette
        .colors()
        .iter()
        .position(|&c| c == color)
        .unwrap()
}

/// Pixels whose rendered color differs from their label's color.
fn render_mismatches(staged: &StagedResult) -> usize {
    let rendered = render_document(&staged.document).unwrap();
    assert_eq!(rendered.dimensions(), {
        let Dimensions { width, height } = staged.labels.dimensions();
        (width, height)
    });
    rendered
        .enumerate_pixels()
        .filter(|&(x, y, pixel)| {
            let expected = staged.palette.get(staged.labels.get(x, y)).unwrap();
            Color::new(pixel[0], pixel[1], pixel[2]) != expected
        })
        .count()
}

/// The `d` attribute of the first `<path>`.
fn path_data(svg: &str) -> &str {
    let start = svg.find(" d=\"").unwrap() + 4;
    let len = svg[start..].find('"').unwrap();
    &svg[start..start + len]
}

/// Pixels labeled `index` that touch a differently labeled pixel or
/// the image border.
fn boundary_pixels(labels: &LabelField, index: usize) -> usize {
    let Dimensions { width, height } = labels.dimensions();
    let mut count = 0;
    for y in 0..height {
        for x in 0..width {
            if labels.get(x, y) != index {
                continue;
            }
            let on_edge = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
            let touches = on_edge
                || labels.get(x - 1, y) != index
                || labels.get(x + 1, y) != index
                || labels.get(x, y - 1) != index
                || labels.get(x, y + 1) != index;
            if touches {
                count += 1;
            }
        }
    }
    count
}

#[test]
fn solid_square_exports_single_group() {
    let img = RgbImage::from_pixel(4, 4, Rgb([255, 0, 0]));
    let palette = Palette::new(vec![Color::WHITE, Color::new(255, 0, 0)]);
    let doc = vectorize(&img, &palette, &AdjustmentParameters::IDENTITY).unwrap();
    let svg = to_svg(&doc, &SvgMetadata::default());

    assert_eq!(svg.matches("<g").count(), 1);
    assert_eq!(svg.matches("<path").count(), 1);
    assert!(svg.contains(r##"fill="#ff0000""##));
    assert!(svg.contains(r#"viewBox="0 0 4 4""#));
    assert_eq!(svg.matches(" Z").count(), 1);
}

#[test]
fn ring_exports_two_subpaths_in_one_path() {
    let result = process(&encode_png(&ring()), &exact_config()).unwrap();
    let svg = to_svg(&result.document, &SvgMetadata::default());

    assert_eq!(svg.matches("<g").count(), 1);
    assert_eq!(svg.matches("<path").count(), 1);
    assert_eq!(path_data(&svg).matches('M').count(), 2);
    assert!(svg.contains(r##"fill="#000000""##));
    assert!(svg.contains(r#"fill-rule="evenodd""#));
}

#[test]
fn darker_layers_are_written_first() {
    let img = RgbImage::from_fn(60, 30, |x, y| {
        if !(5..25).contains(&y) {
            WHITE
        } else if (5..25).contains(&x) {
            BLACK
        } else if (35..55).contains(&x) {
            GRAY
        } else {
            WHITE
        }
    });
    let result = process(&encode_png(&img), &exact_config()).unwrap();
    assert_eq!(result.palette.len(), 3);
    assert_eq!(result.document.background(), Some(Color::WHITE));

    let svg = to_svg(&result.document, &SvgMetadata::default());
    assert_eq!(svg.matches("<g").count(), 2);
    let black = svg.find(r##"fill="#000000""##).unwrap();
    let gray = svg.find(r##"fill="#808080""##).unwrap();
    assert!(black < gray);
    assert!(!svg.contains("#ffffff"));
}

#[test]
fn rendered_document_matches_labels_up_to_the_boundary() {
    let staged = process_staged(&encode_png(&ring()), &exact_config()).unwrap();
    let black = palette_index(&staged, Color::BLACK);
    assert!(render_mismatches(&staged) <= boundary_pixels(&staged.labels, black));

    // Interior pixels on either side of each border are exact.
    let rendered = render_document(&staged.document).unwrap();
    assert_eq!(*rendered.get_pixel(1, 1), WHITE);
    assert_eq!(*rendered.get_pixel(5, 5), BLACK);
    assert_eq!(*rendered.get_pixel(11, 11), WHITE);
    assert_eq!(*rendered.get_pixel(22, 22), WHITE);
}

#[test]
fn nested_holes_become_four_subpaths() {
    let staged = process_staged(&encode_png(&concentric_squares()), &exact_config()).unwrap();
    assert_eq!(staged.document.layers().len(), 1);
    assert_eq!(staged.document.layers()[0].color, Color::BLACK);
    assert_eq!(staged.document.layers()[0].polygons.len(), 4);

    let svg = to_svg(&staged.document, &SvgMetadata::default());
    assert_eq!(path_data(&svg).matches('M').count(), 4);

    let black = palette_index(&staged, Color::BLACK);
    assert!(render_mismatches(&staged) <= boundary_pixels(&staged.labels, black));

    let rendered = render_document(&staged.document).unwrap();
    assert_eq!(*rendered.get_pixel(0, 0), WHITE);
    assert_eq!(*rendered.get_pixel(4, 4), BLACK);
    assert_eq!(*rendered.get_pixel(11, 11), WHITE);
    assert_eq!(*rendered.get_pixel(16, 16), BLACK);
    assert_eq!(*rendered.get_pixel(20, 20), WHITE);
}

#[test]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn smoothing_error_stays_within_tolerance() {
    let png = encode_png(&disk(40));
    let perimeter = 2.0 * std::f64::consts::PI * 40.0;

    let mut vertex_counts = Vec::new();
    for smoothing in [0.0, 50.0, 100.0] {
        let config = smoothed_config(smoothing);
        let staged = process_staged(&png, &config).unwrap();
        assert_eq!(staged.document.polygon_count(), 1);
        vertex_counts.push(staged.document.vertex_count());

        let black = palette_index(&staged, Color::BLACK);
        let drift = (perimeter * config.adjustments.epsilon_for(perimeter)).ceil() as usize;
        let bound = boundary_pixels(&staged.labels, black) + drift;
        let mismatches = render_mismatches(&staged);
        assert!(
            mismatches <= bound,
            "smoothing {smoothing}: {mismatches} mismatches, bound {bound}"
        );
    }
    assert!(vertex_counts[1] < vertex_counts[0], "{vertex_counts:?}");
    assert!(vertex_counts[2] <= vertex_counts[1], "{vertex_counts:?}");
}

#[test]
fn metadata_round_trips_config_json() {
    let config = exact_config();
    let config_json = serde_json::to_string(&config).unwrap();
    let result = process(&encode_png(&ring()), &config).unwrap();
    let svg = to_svg(
        &result.document,
        &SvgMetadata {
            title: Some("ring"),
            description: None,
            config_json: Some(&config_json),
        },
    );

    let start = svg.find("<tessera:pipeline").unwrap();
    let body_start = start + svg[start..].find('>').unwrap() + 1;
    let body_end = svg.find("</tessera:pipeline>").unwrap();
    let embedded = svg[body_start..body_end]
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");
    let parsed: PipelineConfig = serde_json::from_str(&embedded).unwrap();
    assert_eq!(parsed, config);
}
