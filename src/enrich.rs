//! Derived summary properties attached to every output feature.
//!
//! The three point-valued properties are written latitude first, i.e. as
//! (Y, X) of the source coordinates, while the feature geometry itself keeps
//! (X, Y). [`xy_to_lat_lon`] is the only place that performs the swap.

use geo::{Centroid, InteriorPoint};
use geo_types::{Coord, Point, Rect};
use serde_json::{Map, Value};

use crate::error::FeatureError;
use crate::source::SourceFeature;
use crate::utils::format_grouped;

pub const INTERIOR_PROPERTY: &str = "Interior";
pub const CENTROID_PROPERTY: &str = "Centroid";
pub const ENVELOPE_PROPERTY: &str = "Envelope";
pub const AREA_PROPERTY: &str = "SHAPE_Area";
pub const LENGTH_PROPERTY: &str = "SHAPE_Leng";

const SQUARE_METRES_PER_KM2: f64 = 1_000_000.0;
const METRES_PER_KM: f64 = 1_000.0;

/// A position written latitude first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    fn to_json(self) -> Value {
        Value::Array(vec![Value::from(self.lat), Value::from(self.lon)])
    }
}

/// Source (X, Y) to output (latitude, longitude).
pub fn xy_to_lat_lon(coord: Coord<f64>) -> LatLon {
    LatLon {
        lat: coord.y,
        lon: coord.x,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub interior: LatLon,
    pub centroid: LatLon,
    /// (min Y, min X) then (max Y, max X).
    pub envelope: [LatLon; 2],
    /// Display strings in km² and km; `None` when the source has no such column.
    pub area_km2: Option<String>,
    pub length_km: Option<String>,
}

impl Enrichment {
    /// Writes the derived values over `properties`, replacing the raw
    /// area and length figures.
    pub fn write_into(self, properties: &mut Map<String, Value>) {
        properties.insert(INTERIOR_PROPERTY.to_string(), self.interior.to_json());
        properties.insert(CENTROID_PROPERTY.to_string(), self.centroid.to_json());
        properties.insert(
            ENVELOPE_PROPERTY.to_string(),
            Value::Array(self.envelope.iter().map(|c| c.to_json()).collect()),
        );
        if let Some(area) = self.area_km2 {
            properties.insert(AREA_PROPERTY.to_string(), Value::String(area));
        }
        if let Some(length) = self.length_km {
            properties.insert(LENGTH_PROPERTY.to_string(), Value::String(length));
        }
    }
}

pub fn enrich(feature: &SourceFeature) -> Result<Enrichment, FeatureError> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or(FeatureError::MalformedGeometry("record has no geometry"))?;
    let interior = geometry
        .interior_point()
        .ok_or(FeatureError::MalformedGeometry("no interior point"))?;
    let centroid = geometry
        .centroid()
        .ok_or(FeatureError::MalformedGeometry("no centroid"))?;
    let bbox = feature
        .bounding_box
        .ok_or(FeatureError::MalformedGeometry("no bounding box"))?;

    Ok(Enrichment {
        interior: point_to_lat_lon(interior),
        centroid: point_to_lat_lon(centroid),
        envelope: envelope(&bbox),
        area_km2: scaled_attribute(&feature.attributes, AREA_PROPERTY, SQUARE_METRES_PER_KM2)?,
        length_km: scaled_attribute(&feature.attributes, LENGTH_PROPERTY, METRES_PER_KM)?,
    })
}

fn point_to_lat_lon(point: Point<f64>) -> LatLon {
    xy_to_lat_lon(point.0)
}

fn envelope(bbox: &Rect<f64>) -> [LatLon; 2] {
    [xy_to_lat_lon(bbox.min()), xy_to_lat_lon(bbox.max())]
}

/// Reads a numeric (or numeric string) attribute, divides it by `divisor`
/// and formats it for display. An absent attribute yields `None`; a null
/// one counts as zero.
fn scaled_attribute(
    attributes: &Map<String, Value>,
    field: &'static str,
    divisor: f64,
) -> Result<Option<String>, FeatureError> {
    let raw = match attributes.get(field) {
        None => return Ok(None),
        Some(Value::Null) => Some(0.0),
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    let value = raw.ok_or_else(|| FeatureError::InvalidAttribute {
        field,
        value: attributes[field].to_string(),
    })?;
    Ok(Some(format_grouped(value / divisor)))
}
