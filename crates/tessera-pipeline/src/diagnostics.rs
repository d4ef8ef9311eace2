//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! These diagnostics are permanent instrumentation for parameter
//! tuning. [`process_staged_with_diagnostics`] drives the incremental
//! pipeline and records one [`StageDiagnostics`] per stage transition.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::Pending;
use crate::types::{PipelineError, Polygon, StagedResult};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of timestamps for stage timing.
///
/// Kept abstract so callers can supply a deterministic clock in tests.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by `web_time::Instant` (`std::time::Instant` on
/// native targets, `performance.now()` on WASM).
#[derive(Debug, Clone, Copy, Default)]
pub struct WebClock;

impl Clock for WebClock {
    type Instant = web_time::Instant;

    fn now(&self) -> web_time::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &web_time::Instant) -> Duration {
        since.elapsed()
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Image decoding.
    pub decode: StageDiagnostics,
    /// Palette extraction (or adoption of a supplied palette).
    pub palette: StageDiagnostics,
    /// Contrast/brightness adjustment and nearest-color labelling.
    pub classify: StageDiagnostics,
    /// Region masks, contour tracing, speckle filtering, simplification.
    pub trace: StageDiagnostics,
    /// Layer ordering and document assembly.
    pub assemble: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, sizes, etc.).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
    },
    /// Palette metrics.
    Palette {
        /// `true` if the palette was supplied rather than extracted.
        supplied: bool,
        /// Number of palette colors.
        color_count: usize,
        /// Maximum palette size requested from the extractor.
        max_colors: usize,
    },
    /// Classification metrics.
    Classify {
        /// Mean luminance the contrast step pivoted around.
        mean_luminance: f64,
        /// Number of distinct labels actually used.
        labels_used: usize,
        /// Total pixel count.
        pixel_count: u64,
    },
    /// Contour tracing and simplification metrics.
    Trace {
        /// Number of palette colors traced (all but the background).
        regions_traced: usize,
        /// Contours found before speckle filtering.
        contour_count: usize,
        /// How many of those contours are hole borders.
        hole_count: usize,
        /// Points across those contours.
        contour_points: usize,
        /// Polygons surviving filtering and simplification.
        polygon_count: usize,
        /// Points across the surviving polygons.
        polygon_points: usize,
        /// Point reduction ratio: `1.0 - (after / before)`.
        reduction_ratio: f64,
    },
    /// Document assembly metrics.
    Assemble {
        /// Number of layers in the document.
        layer_count: usize,
        /// Total polygons across all layers.
        polygon_count: usize,
        /// Total vertices across all layers.
        vertex_count: usize,
        /// Background color, if any (`#rrggbb`).
        background: Option<String>,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Number of palette colors.
    pub palette_size: usize,
    /// Number of layers in the output document.
    pub layer_count: usize,
    /// Number of vertices in the output document.
    pub vertex_count: usize,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Decode", &self.decode),
            ("Palette", &self.palette),
            ("Classify", &self.classify),
            ("Trace", &self.trace),
            ("Assemble", &self.assemble),
        ];

        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Palette: {} colors  |  Layers: {}  |  Vertices: {}",
            self.summary.palette_size, self.summary.layer_count, self.summary.vertex_count,
        ));

        lines.join("\n")
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Palette {
            supplied,
            color_count,
            max_colors,
        } => {
            if *supplied {
                format!("{color_count} colors (supplied)")
            } else {
                format!("{color_count} colors (max {max_colors})")
            }
        }
        StageMetrics::Classify {
            mean_luminance,
            labels_used,
            pixel_count,
        } => format!("mean={mean_luminance:.0} labels={labels_used} px={pixel_count}"),
        StageMetrics::Trace {
            regions_traced,
            contour_count,
            hole_count,
            contour_points,
            polygon_count,
            polygon_points,
            reduction_ratio,
        } => {
            let reduction = reduction_ratio * 100.0;
            format!(
                "{regions_traced} regions, {contour_count}->{polygon_count} contours \
                 ({hole_count} holes), {contour_points}->{polygon_points} pts \
                 ({reduction:.1}% reduction)",
            )
        }
        StageMetrics::Assemble {
            layer_count,
            polygon_count,
            vertex_count,
            background,
        } => format!(
            "{layer_count} layers, {polygon_count} polys, {vertex_count} pts, bg={}",
            background.as_deref().unwrap_or("none"),
        ),
    }
}

/// Total points across a slice of polygons.
pub(crate) fn total_points(polygons: &[Polygon]) -> usize {
    polygons.iter().map(Polygon::len).sum()
}

/// `1.0 - after / before`, or `0.0` when there was nothing to reduce.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn reduction_ratio(before: usize, after: usize) -> f64 {
    if before == 0 {
        0.0
    } else {
        1.0 - after as f64 / before as f64
    }
}

/// Time one stage transition.
fn timed<C: Clock, T>(
    clock: &C,
    step: impl FnOnce() -> Result<T, PipelineError>,
) -> Result<(T, Duration), PipelineError> {
    let start = clock.now();
    let value = step()?;
    Ok((value, clock.elapsed(&start)))
}

/// Run every stage of `pending`, timing each transition with `clock`.
///
/// # Errors
///
/// Propagates the first [`PipelineError`] raised by any stage.
pub fn process_staged_with_diagnostics<C: Clock>(
    pending: Pending,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    let run_start = clock.now();

    let (decoded, decode_time) = timed(clock, || pending.decode())?;
    let decode = StageDiagnostics {
        duration: decode_time,
        metrics: decoded.metrics(),
    };

    let (paletted, palette_time) = timed(clock, || Ok(decoded.extract_palette()))?;
    let palette = StageDiagnostics {
        duration: palette_time,
        metrics: paletted.metrics(),
    };

    let (classified, classify_time) = timed(clock, || paletted.classify())?;
    let classify = StageDiagnostics {
        duration: classify_time,
        metrics: classified.metrics(),
    };

    let (traced, trace_time) = timed(clock, || Ok(classified.trace()))?;
    let trace = StageDiagnostics {
        duration: trace_time,
        metrics: traced.metrics(),
    };

    let (assembled, assemble_time) = timed(clock, || traced.assemble())?;
    let assemble = StageDiagnostics {
        duration: assemble_time,
        metrics: assembled.metrics(),
    };

    let total_duration = clock.elapsed(&run_start);
    let staged = assembled.into_result();
    let dims = staged.document.dimensions();
    let summary = PipelineSummary {
        image_width: dims.width,
        image_height: dims.height,
        pixel_count: dims.pixel_count(),
        palette_size: staged.palette.len(),
        layer_count: staged.document.layers().len(),
        vertex_count: staged.document.vertex_count(),
    };

    log::debug!("pipeline finished in {:.3}ms", duration_ms(total_duration));

    Ok((
        staged,
        PipelineDiagnostics {
            decode,
            palette,
            classify,
            trace,
            assemble,
            total_duration,
            summary,
        },
    ))
}

/// [`process_staged_with_diagnostics`] with the default [`WebClock`].
///
/// # Errors
///
/// Propagates the first [`PipelineError`] raised by any stage.
pub fn process_with_diagnostics(
    pending: Pending,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    process_staged_with_diagnostics(pending, &WebClock)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::pipeline::Pipeline;
    use crate::types::{AdjustmentParameters, Color, Palette, PipelineConfig, Point};

    /// Clock that advances one millisecond per reading.
    struct TickClock(Cell<u64>);

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.0.get();
            self.0.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    fn encode_png(img: &image::RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn square_on_white() -> Vec<u8> {
        encode_png(&image::RgbImage::from_fn(24, 16, |x, y| {
            if (4..12).contains(&x) && (4..12).contains(&y) {
                image::Rgb([20, 20, 20])
            } else {
                image::Rgb([255, 255, 255])
            }
        }))
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let ms = duration_ms(Duration::from_millis(1234));
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn reduction_ratio_handles_empty() {
        assert!(reduction_ratio(0, 0).abs() < f64::EPSILON);
        assert!((reduction_ratio(200, 50) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn total_points_sums_polygons() {
        let tri = Polygon::new(vec![Point::new(0, 0), Point::new(1, 0), Point::new(0, 1)]);
        assert_eq!(total_points(&[tri.clone(), tri]), 6);
    }

    #[test]
    fn every_stage_is_timed() {
        let config = PipelineConfig {
            adjustments: AdjustmentParameters::IDENTITY,
            ..PipelineConfig::default()
        };
        let pending = Pipeline::new(square_on_white(), config);
        let (staged, diag) =
            process_staged_with_diagnostics(pending, &TickClock(Cell::new(0))).unwrap();

        let stages = [&diag.decode, &diag.palette, &diag.classify, &diag.trace, &diag.assemble];
        for stage in stages {
            assert_eq!(stage.duration, Duration::from_millis(1));
        }
        assert!(diag.total_duration >= Duration::from_millis(5));
        assert_eq!(diag.summary.image_width, 24);
        assert_eq!(diag.summary.palette_size, 2);
        assert_eq!(diag.summary.layer_count, staged.document.layers().len());
        assert_eq!(diag.summary.layer_count, 1);
    }

    #[test]
    fn metrics_describe_the_run() {
        let config = PipelineConfig {
            adjustments: AdjustmentParameters::IDENTITY,
            ..PipelineConfig::default()
        };
        let pending = Pipeline::new(square_on_white(), config)
            .with_palette(Palette::new(vec![Color::WHITE, Color::new(20, 20, 20)]));
        let (_, diag) = process_with_diagnostics(pending).unwrap();

        assert!(matches!(
            diag.palette.metrics,
            StageMetrics::Palette {
                supplied: true,
                color_count: 2,
                ..
            }
        ));
        assert!(matches!(
            diag.trace.metrics,
            StageMetrics::Trace {
                regions_traced: 1,
                hole_count: 0,
                polygon_count: 1,
                polygon_points: 4,
                ..
            }
        ));
        assert!(matches!(
            &diag.assemble.metrics,
            StageMetrics::Assemble { background: Some(bg), layer_count: 1, .. } if bg == "#ffffff"
        ));
    }

    #[test]
    fn report_lists_every_stage() {
        let pending = Pipeline::new(square_on_white(), PipelineConfig::default());
        let (_, diag) = process_with_diagnostics(pending).unwrap();
        let report = diag.report();
        assert!(report.contains("Pipeline Diagnostics Report"));
        for name in ["Decode", "Palette", "Classify", "Trace", "Assemble"] {
            assert!(report.contains(name), "report missing {name}");
        }
    }

    #[test]
    fn diagnostics_round_trip_through_json() {
        let pending = Pipeline::new(square_on_white(), PipelineConfig::default());
        let (_, diag) = process_with_diagnostics(pending).unwrap();
        let json = serde_json::to_string(&diag).unwrap();
        let back: PipelineDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.decode.metrics, diag.decode.metrics);
        assert_eq!(back.assemble.metrics, diag.assemble.metrics);
        assert_eq!(back.summary.vertex_count, diag.summary.vertex_count);
    }

    #[test]
    fn errors_propagate() {
        let pending = Pipeline::new(Vec::new(), PipelineConfig::default());
        assert!(matches!(
            process_with_diagnostics(pending),
            Err(PipelineError::EmptyInput)
        ));
    }
}
