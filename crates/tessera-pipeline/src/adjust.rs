//! Contrast and brightness enhancement.
//!
//! Both operations are linear blends, applied per channel:
//!
//! - contrast blends the pixel with a flat gray at the image's mean
//!   luminance: `mean + factor * (v - mean)`;
//! - brightness blends with black: `factor * v`.
//!
//! Results are clamped to `[0, 255]` and truncated toward zero after
//! each step. A factor of `1.0` leaves the image unchanged.

use image::RgbImage;

/// Fixed-point luma of one pixel (ITU-R 601-2 weights, rounded).
fn luma(pixel: &image::Rgb<u8>) -> u32 {
    let [r, g, b] = pixel.0;
    (u32::from(r) * 19_595 + u32::from(g) * 38_470 + u32::from(b) * 7_471 + 0x8000) >> 16
}

/// Mean luminance of the image, rounded to the nearest integer.
///
/// Returns `0.0` for an empty image.
#[must_use]
pub fn mean_luminance(image: &RgbImage) -> f64 {
    let count = u64::from(image.width()) * u64::from(image.height());
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = image.pixels().map(|p| u64::from(luma(p))).sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = sum as f64 / count as f64;
    mean.round()
}

/// Blend `from` toward `to` by `factor`, clamp, and truncate.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend(from: f64, to: f64, factor: f64) -> u8 {
    let value = factor.mul_add(to - from, from);
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= 255.0 {
        255
    } else {
        value as u8
    }
}

/// Apply contrast enhancement around the image's mean luminance.
#[must_use = "returns the adjusted image"]
pub fn enhance_contrast(image: &RgbImage, factor: f64) -> RgbImage {
    let mean = mean_luminance(image);
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        for channel in &mut pixel.0 {
            *channel = blend(mean, f64::from(*channel), factor);
        }
    }
    out
}

/// Scale every channel by `factor`.
#[must_use = "returns the adjusted image"]
pub fn enhance_brightness(image: &RgbImage, factor: f64) -> RgbImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        for channel in &mut pixel.0 {
            *channel = blend(0.0, f64::from(*channel), factor);
        }
    }
    out
}

/// Apply contrast, then brightness.
#[must_use = "returns the adjusted image"]
pub fn adjust(image: &RgbImage, contrast: f64, brightness: f64) -> RgbImage {
    enhance_brightness(&enhance_contrast(image, contrast), brightness)
}
