//! Loading geometric records into memory.
//!
//! A source is either a shapefile (`.shp` with its `.dbf` attribute table)
//! or a GeoJSON document. Both are read completely before the pipeline runs.

mod geojson;
mod shp;

use geo::{BoundingRect, Intersects};
use geo_types::{Geometry, Rect, coord};
use serde_json::{Map, Value};
use std::path::Path;

use crate::config::RenameTable;
use crate::error::SourceError;

/// One input record.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFeature {
    /// `None` for null shapes or geometries that failed to convert.
    pub geometry: Option<Geometry<f64>>,
    pub attributes: Map<String, Value>,
    pub bounding_box: Option<Rect<f64>>,
}

impl SourceFeature {
    pub fn new(geometry: Option<Geometry<f64>>, attributes: Map<String, Value>) -> Self {
        let bounding_box = geometry.as_ref().and_then(|g| g.bounding_rect());
        Self {
            geometry,
            attributes,
            bounding_box,
        }
    }
}

/// All records of one record set, in source order.
#[derive(Debug, Clone)]
pub struct SourceDataset {
    /// Record-set identifier, taken from the file stem.
    pub name: String,
    pub features: Vec<SourceFeature>,
}

impl SourceDataset {
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.features
            .iter()
            .filter_map(|f| f.bounding_box)
            .reduce(|acc, rect| {
                Rect::new(
                    coord! { x: acc.min().x.min(rect.min().x), y: acc.min().y.min(rect.min().y) },
                    coord! { x: acc.max().x.max(rect.max().x), y: acc.max().y.max(rect.max().y) },
                )
            })
    }

    /// Keeps records whose bounding box intersects `query`.
    ///
    /// Box tests only: records that merely come close are kept as well.
    pub fn retain_intersecting(&mut self, query: &Rect<f64>) {
        let before = self.features.len();
        self.features
            .retain(|f| f.bounding_box.is_some_and(|bbox| bbox.intersects(query)));
        tracing::info!(
            "Source: {} of {} records intersect the query rectangle",
            self.features.len(),
            before
        );
    }
}

pub fn record_set_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Reads `path` into memory, applying the column renames registered for its
/// record set and, when given, the bounding-rectangle prefilter.
pub fn load_source(
    path: &Path,
    renames: &RenameTable,
    query: Option<&Rect<f64>>,
) -> Result<SourceDataset, SourceError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let mut features = match extension.as_str() {
        "shp" => shp::read_shapefile(path)?,
        "geojson" | "json" => self::geojson::read_geojson(path)?,
        _ => {
            return Err(SourceError::UnsupportedFormat(
                path.display().to_string(),
            ));
        }
    };

    let name = record_set_name(path);
    if let Some(columns) = renames.for_record_set(&name) {
        tracing::info!("Source: applying {} column renames for {}", columns.len(), name);
        for feature in &mut features {
            columns.apply(&mut feature.attributes);
        }
    }

    let mut dataset = SourceDataset { name, features };
    tracing::info!(
        "Source: loaded {} records from {:?} (bounds {:?})",
        dataset.features.len(),
        path,
        dataset.bounds()
    );
    if let Some(query) = query {
        dataset.retain_intersecting(query);
    }
    Ok(dataset)
}
