//! Filesystem side of the CLI: where results go and how they are written.

use std::path::{Path, PathBuf};

use tessera_pipeline::Dimensions;
use tessera_pipeline::types::RgbImage;

/// Default output file stem.
pub const DEFAULT_NAME: &str = "vector_output";

/// Errors that can occur while writing results to disk.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Creating the output directory or writing a file failed.
    #[error("cannot write {}: {source}", path.display())]
    Io {
        /// Path that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// PNG encoding failed.
    #[error("cannot encode {}: {source}", path.display())]
    Encode {
        /// Path the image was meant for.
        path: PathBuf,
        /// Underlying encoder error.
        source: image::ImageError,
    },

    /// Rasterizing the document failed.
    #[error(transparent)]
    Render(#[from] tessera_export::ExportError),
}

/// `$HOME/Downloads`, or the working directory when `HOME` is unset.
#[must_use]
pub fn default_output_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("."), |home| PathBuf::from(home).join("Downloads"))
}

/// Path of the SVG named `name` inside `dir`.
#[must_use]
pub fn svg_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.svg"))
}

/// Write `svg` to `<dir>/<name>.svg`, creating `dir` if needed.
///
/// # Errors
///
/// Returns [`OutputError::Io`] if the directory cannot be created or the
/// file cannot be written.
pub fn write_svg(dir: &Path, name: &str, svg: &str) -> Result<PathBuf, OutputError> {
    std::fs::create_dir_all(dir).map_err(|source| OutputError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = svg_path(dir, name);
    std::fs::write(&path, svg).map_err(|source| OutputError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Save `image` as PNG at `path`.
///
/// # Errors
///
/// Returns [`OutputError::Encode`] if encoding or writing fails.
pub fn write_png(path: &Path, image: &RgbImage) -> Result<(), OutputError> {
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|source| OutputError::Encode {
            path: path.to_path_buf(),
            source,
        })
}

/// Parse a `WIDTHxHEIGHT` box such as `800x600`.
///
/// # Errors
///
/// Returns a message naming the malformed value.
pub fn parse_dimensions(s: &str) -> Result<Dimensions, String> {
    let err = || format!("expected WIDTHxHEIGHT, got {s:?}");
    let (w, h) = s.split_once(['x', 'X']).ok_or_else(err)?;
    let width = w.trim().parse().map_err(|_| err())?;
    let height = h.trim().parse().map_err(|_| err())?;
    Ok(Dimensions::new(width, height))
}
