//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::process_staged`] which runs the entire pipeline in one
//! call, [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use tessera_pipeline::{Pipeline, PipelineConfig, PipelineError};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let staged = Pipeline::new(png, PipelineConfig::default())
//!     .decode()?
//!     .extract_palette()
//!     .classify()?
//!     .trace()
//!     .assemble()?
//!     .into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state, carrying
//! every previously computed intermediate. Changing the palette or the
//! adjustments means starting a new pipeline, so a label field can never
//! be paired with a palette it was not computed from.

use std::collections::BTreeSet;

use crate::classify::classify;
use crate::contour::{BorderKind, ContourTracer};
use crate::diagnostics::{self, StageMetrics};
use crate::document;
use crate::palette::extract_palette;
use crate::preview::{PreviewMode, render_preview};
use crate::region::region_mask;
use crate::simplify::reduce_contours;
use crate::types::{
    Dimensions, LabelField, Palette, PathDocument, PipelineConfig, PipelineError, Polygon,
    RgbImage, StagedResult,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`decode`](Self::decode) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing, call .decode() to continue"]
pub struct Pending {
    config: PipelineConfig,
    source: Vec<u8>,
    palette: Option<Palette>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Use `palette` instead of extracting one from the image.
    pub fn with_palette(self, palette: Palette) -> Self {
        Self {
            palette: Some(palette),
            ..self
        }
    }

    /// Decode the source image and advance to the [`Decoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] if the source bytes are
    /// empty. Returns [`PipelineError::ImageDecode`] if the image
    /// format is unrecognized or the data is corrupt.
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        let original = crate::decode::decode_rgb(&self.source)?;
        log::debug!(
            "decoded {} bytes into {}x{} image",
            self.source.len(),
            original.width(),
            original.height()
        );
        Ok(Decoded {
            config: self.config,
            source_len: self.source.len(),
            original,
            palette: self.palette,
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding the source image.
///
/// Call [`extract_palette`](Self::extract_palette) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .extract_palette() to continue"]
pub struct Decoded {
    config: PipelineConfig,
    source_len: usize,
    original: RgbImage,
    palette: Option<Palette>,
}

impl Decoded {
    /// The decoded RGB image.
    #[must_use]
    pub const fn original(&self) -> &RgbImage {
        &self.original
    }

    /// Metrics for the decode step.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let dims = Dimensions::of(&self.original);
        StageMetrics::Decode {
            input_bytes: self.source_len,
            width: dims.width,
            height: dims.height,
            pixel_count: dims.pixel_count(),
        }
    }

    /// Adopt the supplied palette, or extract one from the image.
    pub fn extract_palette(self) -> Paletted {
        let (palette, supplied) = match self.palette {
            Some(palette) => (palette, true),
            None => (
                extract_palette(
                    &self.original,
                    self.config.palette_sample_size,
                    self.config.max_palette_size,
                ),
                false,
            ),
        };
        Paletted {
            config: self.config,
            original: self.original,
            palette,
            supplied,
        }
    }
}

// ───────────────────────── Stage 2: Paletted ─────────────────────────

/// Pipeline state once the palette is known.
///
/// Call [`classify`](Self::classify) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .classify() to continue"]
pub struct Paletted {
    config: PipelineConfig,
    original: RgbImage,
    palette: Palette,
    supplied: bool,
}

impl Paletted {
    /// The palette pixels will be classified against.
    #[must_use]
    pub const fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Metrics for the palette step.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::Palette {
            supplied: self.supplied,
            color_count: self.palette.len(),
            max_colors: self.config.max_palette_size,
        }
    }

    /// Adjust the image and label every pixel.
    ///
    /// An extracted palette can come out empty (for example with
    /// `max_palette_size` set to zero). That is not an error: the label
    /// field stays empty and the run ends in a document without layers.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyPalette`] if a supplied palette is
    /// empty.
    pub fn classify(self) -> Result<Classified, PipelineError> {
        if !self.supplied && self.palette.is_empty() {
            log::debug!("extracted palette is empty, nothing to classify");
            let adjustments = &self.config.adjustments;
            let adjusted =
                crate::adjust::adjust(&self.original, adjustments.contrast, adjustments.brightness);
            return Ok(Classified {
                config: self.config,
                adjusted,
                original: self.original,
                palette: self.palette,
                labels: LabelField::empty(),
            });
        }
        let classification = classify(&self.original, &self.config.adjustments, &self.palette)?;
        Ok(Classified {
            config: self.config,
            original: self.original,
            palette: self.palette,
            adjusted: classification.adjusted,
            labels: classification.labels,
        })
    }
}

// ───────────────────────── Stage 3: Classified ───────────────────────

/// Pipeline state after classification.
///
/// The label field can be previewed before any tracing happens. Call
/// [`trace`](Self::trace) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .trace() to continue"]
pub struct Classified {
    config: PipelineConfig,
    original: RgbImage,
    palette: Palette,
    adjusted: RgbImage,
    labels: LabelField,
}

impl Classified {
    /// The contrast- and brightness-adjusted image.
    #[must_use]
    pub const fn adjusted(&self) -> &RgbImage {
        &self.adjusted
    }

    /// Nearest palette index of every pixel.
    #[must_use]
    pub const fn labels(&self) -> &LabelField {
        &self.labels
    }

    /// Render a preview of the classification, shrunk to fit `display`.
    #[must_use]
    pub fn preview(&self, mode: PreviewMode, display: Dimensions) -> RgbImage {
        render_preview(&self.labels, &self.palette, mode, display)
    }

    /// Metrics for the classification step.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let used: BTreeSet<usize> = self.labels.as_slice().iter().copied().collect();
        StageMetrics::Classify {
            mean_luminance: crate::adjust::mean_luminance(&self.original),
            labels_used: used.len(),
            pixel_count: self.labels.dimensions().pixel_count(),
        }
    }

    /// Build region masks and trace, filter, and simplify every
    /// non-background color.
    pub fn trace(self) -> Traced {
        let background = document::background_index(&self.palette);
        let (regions, stats) = trace_regions_with_stats(
            &self.labels,
            self.palette.len(),
            background,
            &self.config,
        );
        Traced {
            original: self.original,
            palette: self.palette,
            adjusted: self.adjusted,
            labels: self.labels,
            regions,
            stats,
        }
    }
}

/// Counts gathered while tracing, for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
struct TraceStats {
    regions_traced: usize,
    contour_count: usize,
    hole_count: usize,
    contour_points: usize,
    polygon_count: usize,
    polygon_points: usize,
}

fn trace_regions_with_stats(
    labels: &LabelField,
    palette_len: usize,
    background: Option<usize>,
    config: &PipelineConfig,
) -> (Vec<Vec<Polygon>>, TraceStats) {
    let mut stats = TraceStats::default();
    let regions = (0..palette_len)
        .map(|index| {
            if Some(index) == background {
                return Vec::new();
            }
            let contours = config.contour_tracer.trace(&region_mask(labels, index));
            stats.regions_traced += 1;
            stats.contour_count += contours.len();
            stats.hole_count += contours
                .iter()
                .filter(|c| c.border == BorderKind::Hole)
                .count();
            stats.contour_points += contours.iter().map(|c| c.polygon.len()).sum::<usize>();
            let polygons = reduce_contours(contours, &config.adjustments);
            stats.polygon_count += polygons.len();
            stats.polygon_points += diagnostics::total_points(&polygons);
            polygons
        })
        .collect();
    log::debug!(
        "traced {} regions: {} contours -> {} polygons",
        stats.regions_traced,
        stats.contour_count,
        stats.polygon_count
    );
    (regions, stats)
}

/// Polygons of every palette color except `background`.
///
/// The returned vector has one entry per palette index; the background
/// entry is always empty since that color is never drawn.
#[must_use]
pub fn trace_regions(
    labels: &LabelField,
    palette_len: usize,
    background: Option<usize>,
    config: &PipelineConfig,
) -> Vec<Vec<Polygon>> {
    trace_regions_with_stats(labels, palette_len, background, config).0
}

// ───────────────────────── Stage 4: Traced ───────────────────────────

/// Pipeline state after tracing every region.
///
/// Call [`assemble`](Self::assemble) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .assemble() to continue"]
pub struct Traced {
    original: RgbImage,
    palette: Palette,
    adjusted: RgbImage,
    labels: LabelField,
    regions: Vec<Vec<Polygon>>,
    stats: TraceStats,
}

impl Traced {
    /// Simplified polygons per palette index.
    #[must_use]
    pub fn regions(&self) -> &[Vec<Polygon>] {
        &self.regions
    }

    /// Metrics for the trace step.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let s = self.stats;
        StageMetrics::Trace {
            regions_traced: s.regions_traced,
            contour_count: s.contour_count,
            hole_count: s.hole_count,
            contour_points: s.contour_points,
            polygon_count: s.polygon_count,
            polygon_points: s.polygon_points,
            reduction_ratio: diagnostics::reduction_ratio(s.contour_points, s.polygon_points),
        }
    }

    /// Order the layers and build the document.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if the image has a
    /// zero-length side.
    pub fn assemble(self) -> Result<Assembled, PipelineError> {
        let document = document::assemble(
            &self.palette,
            &self.regions,
            Dimensions::of(&self.original),
        )?;
        Ok(Assembled {
            original: self.original,
            palette: self.palette,
            adjusted: self.adjusted,
            labels: self.labels,
            regions: self.regions,
            document,
        })
    }
}

// ───────────────────────── Stage 5: Assembled ────────────────────────

/// Final pipeline state.
#[must_use = "call .into_result() to extract the StagedResult"]
pub struct Assembled {
    original: RgbImage,
    palette: Palette,
    adjusted: RgbImage,
    labels: LabelField,
    regions: Vec<Vec<Polygon>>,
    document: PathDocument,
}

impl Assembled {
    /// The finished document.
    #[must_use]
    pub const fn document(&self) -> &PathDocument {
        &self.document
    }

    /// Metrics for the assembly step.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Assemble {
            layer_count: self.document.layers().len(),
            polygon_count: self.document.polygon_count(),
            vertex_count: self.document.vertex_count(),
            background: self.document.background().map(|c| c.to_string()),
        }
    }

    /// Consume the pipeline, keeping every intermediate.
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        StagedResult {
            original: self.original,
            palette: self.palette,
            adjusted: self.adjusted,
            labels: self.labels,
            regions: self.regions,
            document: self.document,
        }
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental vectorization pipeline.
///
/// Created via [`Pipeline::new`], which stores the source image and
/// config without doing any processing. Each stage method consumes the
/// current state and returns the next, making it a compile-time error
/// to skip stages or call them out of order.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from source image bytes and config.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image_bytes: Vec<u8>, config: PipelineConfig) -> Pending {
        Pending {
            config,
            source: image_bytes,
            palette: None,
        }
    }
}
