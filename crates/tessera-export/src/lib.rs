//! tessera-export: Pure serializers for vector documents (sans-IO).
//!
//! Converts a [`PathDocument`](tessera_pipeline::PathDocument) into SVG
//! text, or rasterizes it back into an RGB image for previews and
//! round-trip checks.

pub mod raster;
pub mod svg;

pub use crate::raster::{ExportError, render_document};
pub use crate::svg::{SvgMetadata, build_path_data, to_svg};
