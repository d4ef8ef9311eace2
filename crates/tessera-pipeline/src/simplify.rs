//! Contour simplification and speckle filtering.
//!
//! Traced contours follow every boundary pixel. They are reduced with
//! the Ramer-Douglas-Peucker algorithm using a tolerance proportional to
//! the contour's own perimeter (see
//! [`AdjustmentParameters::epsilon_for`]), so large shapes lose more
//! absolute detail than small ones. Contours enclosing less than the
//! speckle area are discarded before simplification.

use crate::contour::Contour;
use crate::types::{AdjustmentParameters, Point, Polygon};

/// Simplify a closed ring with the Ramer-Douglas-Peucker algorithm.
///
/// The ring is split at its first vertex and at the vertex farthest from
/// it; each half is simplified as an open chain with both ends pinned.
/// A tolerance of 0.0 removes only vertices lying exactly on a chord.
///
/// Rings with fewer than 3 vertices are returned unchanged.
#[must_use = "returns the simplified polygon"]
pub fn simplify_closed(polygon: &Polygon, tolerance: f64) -> Polygon {
    let ring = polygon.points();
    if ring.len() < 3 {
        return polygon.clone();
    }

    let anchor = ring[0];
    let mut split = 0;
    let mut max_dist = 0.0;
    for (i, &p) in ring.iter().enumerate().skip(1) {
        let d = p.distance(anchor);
        if d > max_dist {
            max_dist = d;
            split = i;
        }
    }
    if split == 0 {
        // Every vertex coincides with the first.
        return Polygon::new(vec![anchor]);
    }

    // Close the ring so the second half ends back on the anchor.
    let mut points: Vec<Point> = ring.to_vec();
    points.push(anchor);
    let last = points.len() - 1;

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[split] = true;
    rdp_recurse(&points, 0, split, tolerance, &mut kept);
    rdp_recurse(&points, split, last, tolerance, &mut kept);

    let simplified: Vec<Point> = points[..last]
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect();

    Polygon::new(simplified)
}

/// Drop speckles, simplify what remains, and discard anything that
/// collapsed below three vertices.
///
/// A contour is a speckle when its enclosed area is strictly less than
/// `adjustments.speckle`.
#[must_use = "returns the surviving polygons"]
pub fn reduce_contours(contours: Vec<Contour>, adjustments: &AdjustmentParameters) -> Vec<Polygon> {
    contours
        .into_iter()
        .map(|c| c.polygon)
        .filter(|p| p.area() >= adjustments.speckle)
        .map(|p| simplify_closed(&p, adjustments.epsilon_for(p.perimeter())))
        .filter(|p| p.len() >= 3)
        .collect()
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// line through them. If that distance exceeds `tolerance`, the point is
/// kept and both sub-segments are processed recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from `p` to the line through `a` and `b`.
///
/// When `a` and `b` coincide, returns the distance from `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let (px, py) = (f64::from(p.x), f64::from(p.y));
    let (ax, ay) = (f64::from(a.x), f64::from(a.y));
    let dx = f64::from(b.x) - ax;
    let dy = f64::from(b.y) - ay;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(ay - py, -(dy * (ax - px)));
    cross.abs() / length_sq.sqrt()
}
