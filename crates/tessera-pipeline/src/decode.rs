//! Image decoding.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces an 8-bit
//! RGB image. Alpha is discarded: the vectorizer only ever sees opaque
//! colors.
//!
//! This is the first step in the pipeline: raw bytes in, `RgbImage` out.

use image::RgbImage;

use crate::types::PipelineError;

/// Decode raw image bytes into an RGB image.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Helper: encode an RGBA image as a PNG byte buffer.
    fn encode_png(img: &image::RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode_rgb(&[]);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode_rgb(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = image::RgbaImage::from_pixel(17, 31, image::Rgba([128, 64, 32, 255]));
        let rgb = decode_rgb(&encode_png(&img)).unwrap();
        assert_eq!(rgb.dimensions(), (17, 31));
    }

    #[test]
    fn alpha_is_dropped_and_channels_kept() {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 200, 30, 40]));
        let rgb = decode_rgb(&encode_png(&img)).unwrap();
        for pixel in rgb.pixels() {
            assert_eq!(pixel.0, [10, 200, 30]);
        }
    }
}
