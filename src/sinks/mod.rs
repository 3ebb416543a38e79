use anyhow::Result;
use geo_types::Geometry;
use serde_json::{Map, Value};

pub mod geojson;
pub mod geojsonl;

pub use self::geojson::GeoJsonSink;
pub use self::geojsonl::GeoJsonlSink;

/// One finished output feature: simplified geometry in source (X, Y) order
/// plus the original and derived properties.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureRow {
    pub geometry: Geometry<f64>,
    pub properties: Map<String, Value>,
}

impl FeatureRow {
    pub fn into_geojson(self) -> ::geojson::Feature {
        ::geojson::Feature {
            bbox: None,
            geometry: Some(::geojson::Geometry::from(&self.geometry)),
            id: None,
            properties: Some(self.properties),
            foreign_members: None,
        }
    }
}

pub trait DataSink: Send {
    fn add_feature(&mut self, row: FeatureRow) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

/// Collects rows in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
    pub rows: Vec<FeatureRow>,
    pub finished: bool,
}

#[cfg(test)]
impl DataSink for MemorySink {
    fn add_feature(&mut self, row: FeatureRow) -> Result<()> {
        self.rows.push(row);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
