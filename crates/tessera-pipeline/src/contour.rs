//! Contour tracing: extract closed boundaries from a binary region mask.
//!
//! This module defines the [`ContourTracer`] trait for pluggable tracing
//! algorithms and the [`ContourTracerKind`] enum for selecting one at
//! runtime from [`PipelineConfig`](crate::PipelineConfig).
//!
//! Tracing is hierarchy-aware: both the outer border of every connected
//! component and the border of every hole inside a component are
//! reported. The result is a flat list; nesting is not preserved, which
//! is all even-odd filling needs.

use image::GrayImage;
use imageproc::contours::BorderType;
use serde::{Deserialize, Serialize};

use crate::types::{Point, Polygon};

/// Which side of a region a traced border lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderKind {
    /// Outer boundary of a connected component.
    Outer,
    /// Boundary of a hole inside a component.
    Hole,
}

impl From<BorderType> for BorderKind {
    fn from(border: BorderType) -> Self {
        match border {
            BorderType::Outer => Self::Outer,
            BorderType::Hole => Self::Hole,
        }
    }
}

/// One traced boundary, as a closed ring of pixel-center coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    /// Boundary pixels in tracing order.
    pub polygon: Polygon,
    /// Whether this is an outer or a hole border.
    pub border: BorderKind,
}

/// Selects which contour tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContourTracerKind {
    /// Suzuki-Abe border following via `imageproc::contours::find_contours`.
    #[default]
    BorderFollowing,
}

/// Trait for contour tracing strategies.
///
/// Input: a binary mask (non-zero = inside the region).
/// Output: every outer and hole boundary of the mask.
pub trait ContourTracer {
    /// Trace the boundaries of `mask`.
    fn trace(&self, mask: &GrayImage) -> Vec<Contour>;
}

impl ContourTracer for ContourTracerKind {
    fn trace(&self, mask: &GrayImage) -> Vec<Contour> {
        match *self {
            Self::BorderFollowing => trace_border_following(mask),
        }
    }
}

fn trace_border_following(mask: &GrayImage) -> Vec<Contour> {
    let contours: Vec<imageproc::contours::Contour<i32>> =
        imageproc::contours::find_contours(mask);

    contours
        .into_iter()
        .map(|c| Contour {
            polygon: Polygon::new(c.points.into_iter().map(|p| Point::new(p.x, p.y)).collect()),
            border: c.border_type.into(),
        })
        .collect()
}
