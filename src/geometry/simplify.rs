//! Douglas-Peucker simplification that keeps polygon rings valid.

use geo::{Contains, Intersects, Simplify};
use geo_types::{
    Geometry, GeometryCollection, LineString, MultiLineString, MultiPolygon, Polygon,
};

use super::ensure_well_formed;
use super::topology::{is_valid_ring, rings_touch};
use crate::error::FeatureError;

/// Simplifies every ring and path with distance tolerance `tolerance`.
///
/// A ring whose simplified form would be collapsed or self-intersecting
/// keeps its original vertices; the rest of the feature is still simplified.
/// A tolerance of zero returns the input unchanged.
pub fn simplify(geometry: &Geometry<f64>, tolerance: f64) -> Result<Geometry<f64>, FeatureError> {
    ensure_well_formed(geometry)?;
    if tolerance <= 0.0 {
        return Ok(geometry.clone());
    }
    Ok(simplify_geometry(geometry, tolerance))
}

fn simplify_geometry(geometry: &Geometry<f64>, tolerance: f64) -> Geometry<f64> {
    match geometry {
        Geometry::LineString(line) => Geometry::LineString(simplify_path(line, tolerance)),
        Geometry::MultiLineString(lines) => Geometry::MultiLineString(MultiLineString(
            lines.iter().map(|line| simplify_path(line, tolerance)).collect(),
        )),
        Geometry::Polygon(polygon) => Geometry::Polygon(simplify_polygon(polygon, tolerance)),
        Geometry::MultiPolygon(polygons) => {
            Geometry::MultiPolygon(simplify_multi_polygon(polygons, tolerance))
        }
        Geometry::GeometryCollection(collection) => {
            Geometry::GeometryCollection(GeometryCollection(
                collection
                    .iter()
                    .map(|part| simplify_geometry(part, tolerance))
                    .collect(),
            ))
        }
        // Points, single segments, rects and triangles carry no removable vertices.
        other => other.clone(),
    }
}

/// Douglas-Peucker via `geo`: vertices at most `tolerance` from the chord are dropped.
fn simplify_path(line: &LineString<f64>, tolerance: f64) -> LineString<f64> {
    line.simplify(tolerance)
}

fn simplify_ring(ring: &LineString<f64>, tolerance: f64) -> LineString<f64> {
    let candidate = simplify_path(ring, tolerance);
    if is_valid_ring(&candidate) {
        candidate
    } else {
        ring.clone()
    }
}

fn simplify_polygon(polygon: &Polygon<f64>, tolerance: f64) -> Polygon<f64> {
    let exterior = simplify_ring(polygon.exterior(), tolerance);
    if let Some(simplified) = assemble_polygon(exterior, polygon, tolerance) {
        return simplified;
    }
    tracing::trace!("Simplify: shell conflicts with a hole, keeping original shell");
    assemble_polygon(polygon.exterior().clone(), polygon, tolerance)
        .unwrap_or_else(|| polygon.clone())
}

/// Adds holes to `exterior`, reverting any hole whose simplified form leaves
/// the shell or touches it or an earlier hole. `None` when even the original
/// hole conflicts.
fn assemble_polygon(
    exterior: LineString<f64>,
    polygon: &Polygon<f64>,
    tolerance: f64,
) -> Option<Polygon<f64>> {
    let shell = Polygon::new(exterior, vec![]);
    let mut holes: Vec<LineString<f64>> = Vec::with_capacity(polygon.interiors().len());
    for hole in polygon.interiors() {
        let candidate = simplify_ring(hole, tolerance);
        if !hole_conflicts(&candidate, &shell, &holes) {
            holes.push(candidate);
        } else if !hole_conflicts(hole, &shell, &holes) {
            holes.push(hole.clone());
        } else {
            return None;
        }
    }
    let (exterior, _) = shell.into_inner();
    Some(Polygon::new(exterior, holes))
}

/// Simplifies each part, then reverts pairs of parts that came to overlap or
/// touch until none do. The original parts are assumed disjoint.
fn simplify_multi_polygon(polygons: &MultiPolygon<f64>, tolerance: f64) -> MultiPolygon<f64> {
    let mut parts: Vec<Polygon<f64>> = polygons
        .iter()
        .map(|polygon| simplify_polygon(polygon, tolerance))
        .collect();
    let mut reverted = vec![false; parts.len()];

    loop {
        let mut changed = false;
        for i in 0..parts.len() {
            for j in (i + 1)..parts.len() {
                if (reverted[i] && reverted[j]) || !parts[i].intersects(&parts[j]) {
                    continue;
                }
                for index in [i, j] {
                    if !reverted[index] {
                        parts[index] = polygons.0[index].clone();
                        reverted[index] = true;
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }

    if reverted.iter().any(|r| *r) {
        tracing::trace!("Simplify: kept original rings for overlapping multipolygon parts");
    }
    MultiPolygon(parts)
}

fn hole_conflicts(hole: &LineString<f64>, shell: &Polygon<f64>, holes: &[LineString<f64>]) -> bool {
    rings_touch(hole, shell.exterior())
        || hole.0.first().is_some_and(|first| !shell.contains(first))
        || holes.iter().any(|other| rings_touch(hole, other))
}
