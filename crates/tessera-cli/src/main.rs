//! tessera: turn a raster image into a flat-color SVG.
//!
//! Reads an image file, reduces it to a small palette, traces every
//! color region and writes one `<g>` per color to
//! `<output-dir>/<name>.svg`. Optionally writes a preview of the
//! classification, a re-rendered raster of the document and per-stage
//! diagnostics.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin tessera -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Set `RUST_LOG=debug` to see per-stage pipeline logs.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use tessera_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use tessera_pipeline::{
    AdjustmentParameters, Color, Dimensions, Palette, Pipeline, PipelineConfig, PreviewMode,
    StagedResult,
};

use crate::output::OutputError;

/// Convert a raster image into flat-color vector regions.
///
/// Every palette color except the brightest becomes one even-odd filled
/// SVG group; the brightest color is treated as the background.
#[derive(Parser)]
#[command(name = "tessera", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Contrast factor around the mean luminance (usually 1.0-3.0).
    #[arg(long, default_value_t = AdjustmentParameters::DEFAULT_CONTRAST)]
    contrast: f64,

    /// Brightness multiplier (usually 0.5-3.0).
    #[arg(long, default_value_t = AdjustmentParameters::DEFAULT_BRIGHTNESS)]
    brightness: f64,

    /// Simplification strength (usually 1-100).
    #[arg(long, default_value_t = AdjustmentParameters::DEFAULT_SMOOTHING)]
    smoothing: f64,

    /// Minimum region area in square pixels (usually 0-200).
    #[arg(long, default_value_t = AdjustmentParameters::DEFAULT_SPECKLE)]
    speckle: f64,

    /// Maximum number of colors to detect.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MAX_PALETTE_SIZE)]
    palette_size: usize,

    /// Comma-separated hex colors replacing automatic detection,
    /// e.g. `#ffffff,#d62828,#003049`.
    #[arg(long, value_delimiter = ',')]
    palette: Option<Vec<Color>>,

    /// Output file name, without extension.
    #[arg(long, default_value = output::DEFAULT_NAME)]
    name: String,

    /// Output directory [default: $HOME/Downloads].
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Write a PNG preview of the color classification.
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Preview style.
    #[arg(long, value_enum, default_value_t = Preview::Filled)]
    preview_mode: Preview,

    /// Shorthand for `--preview-mode wireframe`.
    #[arg(long)]
    wireframe: bool,

    /// Box the preview is shrunk to fit, as WIDTHxHEIGHT.
    #[arg(long, default_value = "800x600", value_parser = output::parse_dimensions)]
    preview_size: Dimensions,

    /// Rasterize the produced document to this PNG.
    #[arg(long)]
    render: Option<PathBuf>,

    /// Print a per-stage timing and count report.
    #[arg(long)]
    diagnostics: bool,

    /// Print diagnostics as JSON instead of the human-readable report.
    #[arg(long)]
    json: bool,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, the adjustment and palette-size flags are ignored.
    /// The JSON must be a valid `PipelineConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// List the palette the image was classified against.
    #[arg(long)]
    print_palette: bool,
}

/// Preview style selection.
#[derive(Clone, Copy, ValueEnum)]
enum Preview {
    /// Every pixel painted with its palette color.
    Filled,
    /// Cyan color boundaries on black.
    Wireframe,
}

impl Cli {
    const fn preview_mode(&self) -> PreviewMode {
        match (self.wireframe, self.preview_mode) {
            (true, _) | (false, Preview::Wireframe) => PreviewMode::Wireframe,
            (false, Preview::Filled) => PreviewMode::Filled,
        }
    }

    fn user_palette(&self) -> Option<Palette> {
        self.palette.clone().map(Palette::new)
    }
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(PipelineConfig {
        adjustments: AdjustmentParameters {
            contrast: cli.contrast,
            brightness: cli.brightness,
            smoothing: cli.smoothing,
            speckle: cli.speckle,
        },
        max_palette_size: cli.palette_size,
        ..PipelineConfig::default()
    })
}

/// Human-readable palette listing, background marked.
fn palette_listing(palette: &Palette, background: Option<Color>) -> String {
    let mut lines = vec![format!("Palette ({} colors)", palette.len())];
    for (i, &color) in palette.colors().iter().enumerate() {
        let marker = if Some(color) == background {
            "  (background)"
        } else {
            ""
        };
        lines.push(format!("  {i:>2}  {color}  luminance {:>6.1}{marker}", color.luminance()));
    }
    lines.join("\n")
}

/// Write the SVG and every optional artifact requested on the command line.
fn write_outputs(
    cli: &Cli,
    config: &PipelineConfig,
    staged: &StagedResult,
) -> Result<(), OutputError> {
    let config_json = serde_json::to_string(config).ok();
    let description = format!(
        "contrast={} brightness={} smoothing={} speckle={}",
        config.adjustments.contrast,
        config.adjustments.brightness,
        config.adjustments.smoothing,
        config.adjustments.speckle,
    );
    let metadata = tessera_export::SvgMetadata {
        title: Some(cli.name.as_str()),
        description: Some(&description),
        config_json: config_json.as_deref(),
    };
    let svg = tessera_export::to_svg(&staged.document, &metadata);
    let dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(output::default_output_dir);
    let path = output::write_svg(&dir, &cli.name, &svg)?;
    log::info!("SVG written to {} ({} bytes)", path.display(), svg.len());

    if let Some(ref preview_path) = cli.preview {
        if staged.labels.is_empty() {
            log::warn!("palette is empty, not writing {}", preview_path.display());
        } else {
            let preview = tessera_pipeline::preview::render_preview(
                &staged.labels,
                &staged.palette,
                cli.preview_mode(),
                cli.preview_size,
            );
            output::write_png(preview_path, &preview)?;
            log::info!(
                "preview written to {} ({}x{})",
                preview_path.display(),
                preview.width(),
                preview.height(),
            );
        }
    }

    if let Some(ref render_path) = cli.render {
        let rendered = tessera_export::render_document(&staged.document)?;
        output::write_png(render_path, &rendered)?;
        log::info!("render written to {}", render_path.display());
    }

    Ok(())
}

fn print_diagnostics(cli: &Cli, diagnostics: &PipelineDiagnostics) -> Result<(), String> {
    if cli.json {
        let json = serde_json::to_string_pretty(diagnostics)
            .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
        println!("{json}");
    } else if cli.diagnostics {
        println!("{}", diagnostics.report());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };
    log::info!(
        "image: {} ({} bytes)",
        cli.image_path.display(),
        image_bytes.len(),
    );

    let mut pending = Pipeline::new(image_bytes, config.clone());
    if let Some(palette) = cli.user_palette() {
        pending = pending.with_palette(palette);
    }

    let (staged, diagnostics) =
        match tessera_pipeline::diagnostics::process_staged_with_diagnostics(pending, &StdClock) {
            Ok(result) => result,
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        };

    if cli.print_palette {
        println!(
            "{}",
            palette_listing(&staged.palette, staged.document.background())
        );
    }

    if let Err(msg) = print_diagnostics(&cli, &diagnostics) {
        eprintln!("{msg}");
        return ExitCode::FAILURE;
    }

    if let Err(e) = write_outputs(&cli, &config, &staged) {
        eprintln!("Output error: {e}");
        return ExitCode::FAILURE;
    }

    log::info!(
        "{} layers, {} polygons, {} vertices",
        staged.document.layers().len(),
        staged.document.polygon_count(),
        staged.document.vertex_count(),
    );
    ExitCode::SUCCESS
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
