use super::{DataSink, FeatureRow};
use anyhow::Result;
use geojson::GeoJson;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes a single FeatureCollection object, compact, followed by a newline.
/// Features are streamed into the `features` array as they arrive.
pub struct GeoJsonSink {
    writer: BufWriter<Box<dyn Write + Send>>,
    first_feature: bool,
}

impl GeoJsonSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Self::from_writer(Box::new(file))
    }

    pub fn stdout() -> Result<Self> {
        Self::from_writer(Box::new(std::io::stdout()))
    }

    fn from_writer(writer: Box<dyn Write + Send>) -> Result<Self> {
        let mut writer = BufWriter::new(writer);
        write!(writer, "{{\"type\":\"FeatureCollection\",\"features\":[")?;
        Ok(Self {
            writer,
            first_feature: true,
        })
    }
}

impl DataSink for GeoJsonSink {
    fn add_feature(&mut self, row: FeatureRow) -> Result<()> {
        if !self.first_feature {
            write!(self.writer, ",")?;
        }
        self.first_feature = false;

        let geojson = GeoJson::Feature(row.into_geojson());
        serde_json::to_writer(&mut self.writer, &geojson)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        writeln!(self.writer, "]}}")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, Point, Polygon};
    use serde_json::{Map, Value};
    use tempfile::NamedTempFile;

    fn point_row(name: &str, x: f64, y: f64) -> FeatureRow {
        let mut properties = Map::new();
        properties.insert("navn".to_string(), Value::String(name.to_string()));
        FeatureRow {
            geometry: geo_types::Geometry::Point(Point::new(x, y)),
            properties,
        }
    }

    fn read(temp_file: &NamedTempFile) -> (String, serde_json::Value) {
        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        let parsed = serde_json::from_str(&content).unwrap();
        (content, parsed)
    }

    #[test]
    fn creates_valid_geojson_structure() {
        let temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let mut sink = GeoJsonSink::new(temp_file.path()).unwrap();

        sink.add_feature(point_row("Test", 0.0, 0.0)).unwrap();
        sink.finish().unwrap();

        let (content, parsed) = read(&temp_file);
        assert_eq!(parsed["type"], "FeatureCollection");
        assert_eq!(parsed["features"].as_array().unwrap().len(), 1);
        assert!(content.ends_with("]}\n"));
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn writes_features_in_insertion_order() {
        let temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let mut sink = GeoJsonSink::new(temp_file.path()).unwrap();

        for name in ["First", "Second", "Third"] {
            sink.add_feature(point_row(name, 0.0, 0.0)).unwrap();
        }
        sink.finish().unwrap();

        let (_, parsed) = read(&temp_file);
        let names: Vec<&str> = parsed["features"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["properties"]["navn"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn writes_empty_feature_collection() {
        let temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let mut sink = GeoJsonSink::new(temp_file.path()).unwrap();
        sink.finish().unwrap();

        let (_, parsed) = read(&temp_file);
        assert_eq!(parsed["type"], "FeatureCollection");
        assert!(parsed["features"].as_array().unwrap().is_empty());
    }

    #[test]
    fn geometry_keeps_x_y_order() {
        let temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let mut sink = GeoJsonSink::new(temp_file.path()).unwrap();

        sink.add_feature(point_row("Test", 10.5, 55.25)).unwrap();
        sink.finish().unwrap();

        let (_, parsed) = read(&temp_file);
        let feature = &parsed["features"][0];
        assert_eq!(feature["type"], "Feature");
        assert_eq!(feature["geometry"]["type"], "Point");
        assert_eq!(feature["geometry"]["coordinates"], serde_json::json!([10.5, 55.25]));
    }

    #[test]
    fn writes_line_and_polygon_geometry() {
        let temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let mut sink = GeoJsonSink::new(temp_file.path()).unwrap();

        let line = LineString::from(vec![(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)]);
        let polygon = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]),
            vec![],
        );
        for geometry in [
            geo_types::Geometry::LineString(line),
            geo_types::Geometry::Polygon(polygon),
        ] {
            sink.add_feature(FeatureRow {
                geometry,
                properties: Map::new(),
            })
            .unwrap();
        }
        sink.finish().unwrap();

        let (_, parsed) = read(&temp_file);
        assert_eq!(parsed["features"][0]["geometry"]["type"], "LineString");
        assert_eq!(parsed["features"][1]["geometry"]["type"], "Polygon");
    }
}
