//! Shared types for the tessera vectorization pipeline.

use std::fmt;
use std::str::FromStr;

use geo::Area;
use serde::{Deserialize, Serialize};

use crate::contour::ContourTracerKind;

/// Re-export `GrayImage` so downstream crates can reference region
/// masks without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference decoded and
/// adjusted images without depending on `image` directly.
pub use image::RgbImage;

/// An opaque 8-bit RGB color.
///
/// Formats as lowercase `#rrggbb` and parses from `#rrggbb`, `rrggbb`,
/// or the short `#rgb` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Pure white.
    pub const WHITE: Self = Self::new(255, 255, 255);
    /// Pure black.
    pub const BLACK: Self = Self::new(0, 0, 0);

    /// Create a color from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels as an array, in `[r, g, b]` order.
    #[must_use]
    pub const fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Perceived luminance: `0.299*R + 0.587*G + 0.114*B`.
    #[must_use]
    pub fn luminance(self) -> f64 {
        0.114f64.mul_add(
            f64::from(self.b),
            0.299f64.mul_add(f64::from(self.r), 0.587 * f64::from(self.g)),
        )
    }

    /// Squared Euclidean distance in RGB space.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> u32 {
        self.channels()
            .iter()
            .zip(other.channels())
            .map(|(&a, b)| {
                let d = i32::from(a) - i32::from(b);
                d.unsigned_abs() * d.unsigned_abs()
            })
            .sum()
    }
}

impl From<image::Rgb<u8>> for Color {
    fn from(pixel: image::Rgb<u8>) -> Self {
        let [r, g, b] = pixel.0;
        Self { r, g, b }
    }
}

impl From<Color> for image::Rgb<u8> {
    fn from(color: Color) -> Self {
        Self(color.channels())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Error returned when a string is not a valid hex color.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hex color {0:?} (expected #rrggbb or #rgb)")]
pub struct ParseColorError(String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let err = || ParseColorError(s.to_string());
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| err());
        match hex.len() {
            6 => Ok(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                // #abc expands to #aabbcc.
                let short = |i: usize| channel(&hex[i..=i]).map(|v| v * 17);
                Ok(Self::new(short(0)?, short(1)?, short(2)?))
            }
            _ => Err(err()),
        }
    }
}

/// A 2D point on the integer pixel grid.
///
/// Coordinates address pixel centers: `(0, 0)` is the top-left pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: i32,
    /// Vertical position (pixels from top edge).
    pub y: i32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

impl From<Point> for geo::Coord<f64> {
    fn from(p: Point) -> Self {
        Self {
            x: f64::from(p.x),
            y: f64::from(p.y),
        }
    }
}

/// A closed polygon: the last point implicitly connects back to the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon(Vec<Point>);

impl Polygon {
    /// Create a polygon from its vertices (without repeating the first).
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polygon has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all vertices.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polygon and returns its vertices.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Enclosed area (absolute shoelace area).
    ///
    /// Polygons with fewer than three vertices enclose nothing.
    #[must_use]
    pub fn area(&self) -> f64 {
        if self.0.len() < 3 {
            return 0.0;
        }
        let ring: geo::LineString<f64> = self.0.iter().copied().collect();
        geo::Polygon::new(ring, vec![]).unsigned_area()
    }

    /// Length of the closed boundary, including the closing edge.
    #[must_use]
    pub fn perimeter(&self) -> f64 {
        match self.0.len() {
            0 | 1 => 0.0,
            n => (0..n)
                .map(|i| self.0[i].distance(self.0[(i + 1) % n]))
                .sum(),
        }
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create dimensions from a width and height.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions of an image buffer.
    #[must_use]
    pub fn of<P: image::Pixel, C: std::ops::Deref<Target = [P::Subpixel]>>(
        image: &image::ImageBuffer<P, C>,
    ) -> Self {
        Self::new(image.width(), image.height())
    }

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if either side is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// An ordered set of representative colors.
///
/// The position of a color is its palette index. Duplicates are allowed
/// (they only degrade results). A palette is replaced as a whole, never
/// edited in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette(Vec<Color>);

impl Palette {
    /// Create a palette from colors in index order.
    #[must_use]
    pub const fn new(colors: Vec<Color>) -> Self {
        Self(colors)
    }

    /// Returns `true` if the palette has no colors.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of colors.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Color at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Color> {
        self.0.get(index).copied()
    }

    /// All colors in index order.
    #[must_use]
    pub fn colors(&self) -> &[Color] {
        &self.0
    }
}

impl FromIterator<Color> for Palette {
    fn from_iter<I: IntoIterator<Item = Color>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Per-pixel palette indices, row-major, same size as the classified image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelField {
    dimensions: Dimensions,
    labels: Vec<usize>,
}

impl LabelField {
    /// A field with no pixels, produced when there is nothing to classify.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            dimensions: Dimensions::new(0, 0),
            labels: Vec::new(),
        }
    }

    /// Returns `true` if the field has no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Build a label field from row-major labels.
    ///
    /// Returns `None` if `labels.len()` does not match the dimensions.
    #[must_use]
    pub fn from_raw(dimensions: Dimensions, labels: Vec<usize>) -> Option<Self> {
        let expected = usize::try_from(dimensions.pixel_count()).ok()?;
        (labels.len() == expected).then_some(Self { dimensions, labels })
    }

    /// Build a label field by evaluating `f` at every pixel, row by row.
    #[must_use]
    pub fn from_fn(dimensions: Dimensions, mut f: impl FnMut(u32, u32) -> usize) -> Self {
        let labels = (0..dimensions.height)
            .flat_map(|y| (0..dimensions.width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self { dimensions, labels }
    }

    /// Width and height of the field.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Palette index at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> usize {
        self.labels[y as usize * self.dimensions.width as usize + x as usize]
    }

    /// All labels in row-major order.
    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.labels
    }
}

/// Tunable parameters of one pipeline run.
///
/// These replace the interactive sliders of a UI: every call receives an
/// explicit, immutable set. Any non-negative value is accepted; values
/// far outside the usual ranges produce extreme output, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentParameters {
    /// Contrast factor around the image's mean luminance (1.0 = unchanged).
    pub contrast: f64,
    /// Brightness multiplier (1.0 = unchanged).
    pub brightness: f64,
    /// Simplification strength. The Douglas–Peucker epsilon of a contour
    /// is `smoothing / 20000 * perimeter`.
    pub smoothing: f64,
    /// Minimum contour area in square pixels; smaller contours are dropped.
    pub speckle: f64,
}

impl AdjustmentParameters {
    /// Default contrast factor.
    pub const DEFAULT_CONTRAST: f64 = 1.2;
    /// Default brightness factor.
    pub const DEFAULT_BRIGHTNESS: f64 = 1.5;
    /// Default smoothing factor.
    pub const DEFAULT_SMOOTHING: f64 = 5.0;
    /// Default speckle threshold in square pixels.
    pub const DEFAULT_SPECKLE: f64 = 10.0;

    /// Divisor turning `smoothing * perimeter` into a pixel epsilon.
    pub const SMOOTHING_DIVISOR: f64 = 20_000.0;

    /// Parameters that leave the image untouched and keep every
    /// non-degenerate contour at full detail.
    pub const IDENTITY: Self = Self {
        contrast: 1.0,
        brightness: 1.0,
        smoothing: 0.0,
        speckle: 0.0,
    };

    /// Simplification epsilon for a contour with the given perimeter.
    #[must_use]
    pub fn epsilon_for(&self, perimeter: f64) -> f64 {
        self.smoothing / Self::SMOOTHING_DIVISOR * perimeter
    }
}

impl Default for AdjustmentParameters {
    fn default() -> Self {
        Self {
            contrast: Self::DEFAULT_CONTRAST,
            brightness: Self::DEFAULT_BRIGHTNESS,
            smoothing: Self::DEFAULT_SMOOTHING,
            speckle: Self::DEFAULT_SPECKLE,
        }
    }
}

/// Configuration for a full pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Contrast, brightness, smoothing and speckle settings.
    pub adjustments: AdjustmentParameters,

    /// Maximum number of colors in an automatically extracted palette.
    pub max_palette_size: usize,

    /// Size the image is resampled to before counting colors.
    /// `None` counts every pixel of the full image.
    pub palette_sample_size: Option<Dimensions>,

    /// Which contour tracing algorithm to use.
    pub contour_tracer: ContourTracerKind,
}

impl PipelineConfig {
    /// Default maximum palette size.
    pub const DEFAULT_MAX_PALETTE_SIZE: usize = 15;
    /// Default palette sampling size (200x200).
    pub const DEFAULT_PALETTE_SAMPLE_SIZE: Dimensions = Dimensions::new(200, 200);
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            adjustments: AdjustmentParameters::default(),
            max_palette_size: Self::DEFAULT_MAX_PALETTE_SIZE,
            palette_sample_size: Some(Self::DEFAULT_PALETTE_SAMPLE_SIZE),
            contour_tracer: ContourTracerKind::default(),
        }
    }
}

/// One filled shape of the output document: a color and the flat list
/// of closed polygons (outer borders and hole borders) it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorLayer {
    /// Index of the color in the palette the document was built from.
    pub palette_index: usize,
    /// Fill color.
    pub color: Color,
    /// Subpaths, rendered together with the even-odd fill rule.
    pub polygons: Vec<Polygon>,
}

/// The assembled vector document, ready for serialization.
///
/// Layers are stored in drawing order: the first layer is drawn first
/// and the last one ends up on top.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathDocument {
    dimensions: Dimensions,
    background: Option<Color>,
    layers: Vec<ColorLayer>,
}

impl PathDocument {
    /// Create a document.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if either side of the
    /// canvas is zero.
    pub fn new(
        dimensions: Dimensions,
        background: Option<Color>,
        layers: Vec<ColorLayer>,
    ) -> Result<Self, PipelineError> {
        if dimensions.is_empty() {
            return Err(PipelineError::InvalidDimensions {
                width: dimensions.width,
                height: dimensions.height,
            });
        }
        Ok(Self {
            dimensions,
            background,
            layers,
        })
    }

    /// Canvas size in pixels.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// The color treated as background and left out of the layers.
    #[must_use]
    pub const fn background(&self) -> Option<Color> {
        self.background
    }

    /// Layers in drawing order.
    #[must_use]
    pub fn layers(&self) -> &[ColorLayer] {
        &self.layers
    }

    /// Total polygon count across all layers.
    #[must_use]
    pub fn polygon_count(&self) -> usize {
        self.layers.iter().map(|l| l.polygons.len()).sum()
    }

    /// Total vertex count across all layers.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.layers
            .iter()
            .flat_map(|l| &l.polygons)
            .map(Polygon::len)
            .sum()
    }
}

/// Result of running the full pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResult {
    /// The palette the image was classified against.
    pub palette: Palette,
    /// The assembled vector document.
    pub document: PathDocument,
}

/// Result of running the pipeline with every intermediate preserved.
///
/// Lets a collaborator show the classified preview and the vector
/// output from the same run.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Decoded source image.
    pub original: RgbImage,
    /// Palette used for classification.
    pub palette: Palette,
    /// Source after contrast and brightness adjustment.
    pub adjusted: RgbImage,
    /// Nearest-palette-color label of every pixel.
    pub labels: LabelField,
    /// Simplified polygons per palette index. The background entry is
    /// left empty since it is never drawn.
    pub regions: Vec<Vec<Polygon>>,
    /// The assembled document.
    pub document: PathDocument,
}

/// Coarse classification of [`PipelineError`]s for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied unusable input (empty data, empty palette,
    /// zero-sized canvas).
    InvalidInput,
    /// Reading or decoding data failed.
    IoFailure,
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Classification was attempted with no palette colors.
    #[error("palette is empty; nothing to classify against")]
    EmptyPalette,

    /// A document canvas must be at least one pixel on each side.
    #[error("invalid canvas dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
}

impl PipelineError {
    /// Which broad category this error falls into.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ImageDecode(_) => ErrorKind::IoFailure,
            Self::EmptyInput | Self::EmptyPalette | Self::InvalidDimensions { .. } => {
                ErrorKind::InvalidInput
            }
        }
    }
}
