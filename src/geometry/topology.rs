//! Ring validity checks used by the simplifier.

use geo::Area;
use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo_types::{Line, LineString, Polygon};

/// Closed, at least four coordinates, non-zero area and no self-intersection.
pub fn is_valid_ring(ring: &LineString<f64>) -> bool {
    if ring.0.len() < 4 || !ring.is_closed() {
        return false;
    }
    if Polygon::new(ring.clone(), vec![]).unsigned_area() == 0.0 {
        return false;
    }
    !self_intersects(ring)
}

/// Checks every pair of segments of a closed ring. Neighbouring segments may
/// share their common vertex but must not fold back onto each other.
pub fn self_intersects(ring: &LineString<f64>) -> bool {
    let segments: Vec<Line<f64>> = ring.lines().collect();
    let n = segments.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            match line_intersection(segments[i], segments[j]) {
                None => {}
                Some(LineIntersection::Collinear { .. }) => return true,
                Some(LineIntersection::SinglePoint { .. }) if adjacent => {}
                Some(LineIntersection::SinglePoint { .. }) => return true,
            }
        }
    }
    false
}

/// True when any segment of `a` touches or crosses any segment of `b`.
pub fn rings_touch(a: &LineString<f64>, b: &LineString<f64>) -> bool {
    a.lines()
        .any(|sa| b.lines().any(|sb| line_intersection(sa, sb).is_some()))
}
