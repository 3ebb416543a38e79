use geo::Area;
use geo_types::{
    Coord, Geometry, GeometryCollection, Line, LineString, MultiLineString, MultiPoint,
    MultiPolygon, Point, Polygon,
};

use super::ensure_well_formed;
use crate::error::FeatureError;

/// Lattice of coordinates representable with a fixed number of decimal digits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrecisionGrid {
    scale: f64,
}

/// Scaled magnitudes from here on are whole numbers in f64 already.
const EXACT_INTEGER_LIMIT: f64 = 4_503_599_627_370_496.0; // 2^52

impl PrecisionGrid {
    /// Digit counts beyond the f64 exponent range give an infinite scale,
    /// which leaves values unsnapped.
    pub fn new(digits: u32) -> Self {
        let scale = i32::try_from(digits)
            .map(|digits| 10f64.powi(digits))
            .unwrap_or(f64::INFINITY);
        Self { scale }
    }

    /// Half-way values snap to the even neighbour. Values the grid is finer
    /// than f64 resolution for are returned as they are.
    pub fn snap(&self, value: f64) -> f64 {
        let scaled = value * self.scale;
        if !scaled.is_finite() || scaled.abs() >= EXACT_INTEGER_LIMIT {
            return value;
        }
        scaled.round_ties_even() / self.scale
    }

    pub fn snap_coord(&self, coord: Coord<f64>) -> Coord<f64> {
        Coord {
            x: self.snap(coord.x),
            y: self.snap(coord.y),
        }
    }

    /// Snapped path with consecutive repeats removed.
    fn snap_path(&self, path: &LineString<f64>) -> Vec<Coord<f64>> {
        let mut out: Vec<Coord<f64>> = Vec::with_capacity(path.0.len());
        for coord in path.coords() {
            let snapped = self.snap_coord(*coord);
            if out.last() != Some(&snapped) {
                out.push(snapped);
            }
        }
        out
    }

    fn reduce_line_string(&self, line: &LineString<f64>) -> Option<LineString<f64>> {
        let coords = self.snap_path(line);
        (coords.len() >= 2).then(|| LineString(coords))
    }

    fn reduce_ring(&self, ring: &LineString<f64>) -> Option<LineString<f64>> {
        let ring = LineString(self.snap_path(ring));
        if ring.0.len() < 4 || !ring.is_closed() {
            return None;
        }
        let area = Polygon::new(ring.clone(), vec![]).unsigned_area();
        (area > 0.0).then_some(ring)
    }

    /// A polygon survives only while its shell does; collapsed holes are dropped.
    fn reduce_polygon(&self, polygon: &Polygon<f64>) -> Option<Polygon<f64>> {
        let exterior = self.reduce_ring(polygon.exterior())?;
        let interiors = polygon
            .interiors()
            .iter()
            .filter_map(|ring| self.reduce_ring(ring))
            .collect();
        Some(Polygon::new(exterior, interiors))
    }

    /// `None` when every part collapsed.
    pub fn reduce_geometry(&self, geometry: &Geometry<f64>) -> Option<Geometry<f64>> {
        match geometry {
            Geometry::Point(point) => Some(Geometry::Point(Point::from(self.snap_coord(point.0)))),
            Geometry::MultiPoint(points) => {
                let points: Vec<Point<f64>> = points
                    .iter()
                    .map(|p| Point::from(self.snap_coord(p.0)))
                    .collect();
                (!points.is_empty()).then(|| Geometry::MultiPoint(MultiPoint(points)))
            }
            Geometry::Line(line) => {
                let start = self.snap_coord(line.start);
                let end = self.snap_coord(line.end);
                (start != end).then(|| Geometry::Line(Line::new(start, end)))
            }
            Geometry::LineString(line) => self.reduce_line_string(line).map(Geometry::LineString),
            Geometry::MultiLineString(lines) => {
                let lines: Vec<LineString<f64>> = lines
                    .iter()
                    .filter_map(|line| self.reduce_line_string(line))
                    .collect();
                (!lines.is_empty()).then(|| Geometry::MultiLineString(MultiLineString(lines)))
            }
            Geometry::Polygon(polygon) => self.reduce_polygon(polygon).map(Geometry::Polygon),
            Geometry::MultiPolygon(polygons) => {
                let polygons: Vec<Polygon<f64>> = polygons
                    .iter()
                    .filter_map(|polygon| self.reduce_polygon(polygon))
                    .collect();
                (!polygons.is_empty()).then(|| Geometry::MultiPolygon(MultiPolygon(polygons)))
            }
            Geometry::GeometryCollection(collection) => {
                let parts: Vec<Geometry<f64>> = collection
                    .iter()
                    .filter_map(|part| self.reduce_geometry(part))
                    .collect();
                (!parts.is_empty())
                    .then(|| Geometry::GeometryCollection(GeometryCollection(parts)))
            }
            Geometry::Rect(rect) => self
                .reduce_polygon(&rect.to_polygon())
                .map(Geometry::Polygon),
            Geometry::Triangle(triangle) => self
                .reduce_polygon(&triangle.to_polygon())
                .map(Geometry::Polygon),
        }
    }
}

/// Outcome of snapping a geometry onto a [`PrecisionGrid`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reduced {
    Snapped(Geometry<f64>),
    /// Every ring and path collapsed; the caller keeps its unreduced geometry.
    Degenerate,
}

pub fn reduce(geometry: &Geometry<f64>, digits: u32) -> Result<Reduced, FeatureError> {
    ensure_well_formed(geometry)?;
    let grid = PrecisionGrid::new(digits);
    Ok(match grid.reduce_geometry(geometry) {
        Some(reduced) => Reduced::Snapped(reduced),
        None => Reduced::Degenerate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::CoordsIter;
    use geo_types::polygon;

    fn triangle() -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: 10.1234567, y: 55.9876543),
            (x: 10.2345678, y: 55.8765432),
            (x: 10.3456789, y: 55.9999999),
            (x: 10.1234567, y: 55.9876543),
        ])
    }

    #[test]
    fn snaps_to_grid() {
        let grid = PrecisionGrid::new(3);
        assert_eq!(grid.snap(12.34567), 12.346);
        assert_eq!(grid.snap(-0.0004), -0.0);
        assert_eq!(PrecisionGrid::new(0).snap(7.6), 8.0);
    }

    #[test]
    fn oversized_digit_counts_leave_coordinates_unchanged() {
        let point = Geometry::Point(Point::new(10.5, 55.2));
        let line = Geometry::LineString(LineString::from(vec![(10.5, 55.2), (11.25, 56.125)]));
        for digits in [17, 309, 400, u32::MAX] {
            assert_eq!(reduce(&point, digits).unwrap(), Reduced::Snapped(point.clone()));
            assert_eq!(reduce(&line, digits).unwrap(), Reduced::Snapped(line.clone()));
        }
    }

    #[test]
    fn snap_never_produces_nan() {
        for digits in [0, 3, 15, 16, 308, 309, 400] {
            let grid = PrecisionGrid::new(digits);
            for value in [0.0, -0.0, 1e-300, 10.5, -179.999999, 1e300, f64::MAX] {
                assert!(grid.snap(value).is_finite(), "digits {digits}, value {value}");
            }
        }
    }

    #[test]
    fn keeps_triangle_coordinate_count() {
        let input = triangle();
        let Reduced::Snapped(reduced) = reduce(&input, 6).unwrap() else {
            panic!("triangle should not degenerate");
        };
        assert_eq!(reduced.coords_count(), input.coords_count());
        let first = reduced.coords_iter().next().unwrap();
        assert_eq!(first.x, 10.123457);
        assert_eq!(first.y, 55.987654);
    }

    #[test]
    fn snapped_coordinates_stay_within_half_a_cell() {
        let input = triangle();
        for digits in 0..8 {
            let half_cell = 0.5 * 10f64.powi(-(digits as i32)) + 1e-12;
            match reduce(&input, digits).unwrap() {
                Reduced::Snapped(reduced) => {
                    for coord in reduced.coords_iter() {
                        assert!(input.coords_iter().any(|orig| {
                            (orig.x - coord.x).abs() <= half_cell
                                && (orig.y - coord.y).abs() <= half_cell
                        }));
                    }
                }
                Reduced::Degenerate => {}
            }
        }
    }

    #[test]
    fn sliver_polygon_degenerates() {
        let sliver = Geometry::Polygon(polygon![
            (x: 10.00001, y: 55.00001),
            (x: 10.00002, y: 55.00001),
            (x: 10.00002, y: 55.00002),
            (x: 10.00001, y: 55.00001),
        ]);
        assert_eq!(reduce(&sliver, 3).unwrap(), Reduced::Degenerate);
    }

    #[test]
    fn drops_collapsed_hole_but_keeps_shell() {
        let with_hole = Geometry::Polygon(polygon![
            exterior: [
                (x: 0.0, y: 0.0),
                (x: 10.0, y: 0.0),
                (x: 10.0, y: 10.0),
                (x: 0.0, y: 10.0),
                (x: 0.0, y: 0.0),
            ],
            interiors: [[
                (x: 5.01, y: 5.01),
                (x: 5.02, y: 5.01),
                (x: 5.02, y: 5.02),
                (x: 5.01, y: 5.01),
            ]]
        ]);
        let Reduced::Snapped(Geometry::Polygon(reduced)) = reduce(&with_hole, 0).unwrap() else {
            panic!("shell should survive");
        };
        assert!(reduced.interiors().is_empty());
        assert_eq!(reduced.exterior().0.len(), 5);
    }

    #[test]
    fn multipolygon_keeps_surviving_parts() {
        let big = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ];
        let tiny = polygon![
            (x: 5.0001, y: 5.0001),
            (x: 5.0002, y: 5.0001),
            (x: 5.0002, y: 5.0002),
            (x: 5.0001, y: 5.0001),
        ];
        let input = Geometry::MultiPolygon(MultiPolygon(vec![big, tiny]));
        let Reduced::Snapped(Geometry::MultiPolygon(reduced)) = reduce(&input, 2).unwrap() else {
            panic!("large part should survive");
        };
        assert_eq!(reduced.0.len(), 1);
    }

    #[test]
    fn points_never_degenerate() {
        let point = Geometry::Point(Point::new(0.0001, 0.0001));
        assert_eq!(
            reduce(&point, 0).unwrap(),
            Reduced::Snapped(Geometry::Point(Point::new(0.0, 0.0)))
        );
    }

    #[test]
    fn short_line_collapses() {
        let line = Geometry::LineString(LineString::from(vec![(1.00001, 2.0), (1.00002, 2.0)]));
        assert_eq!(reduce(&line, 2).unwrap(), Reduced::Degenerate);
    }

    #[test]
    fn empty_input_is_a_caller_error() {
        let empty = Geometry::LineString(LineString::<f64>(vec![]));
        assert!(reduce(&empty, 3).is_err());
    }
}
