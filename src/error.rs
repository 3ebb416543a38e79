//! Error types for the conversion stages.

use thiserror::Error;

/// Failure confined to a single feature.
///
/// Under the default policy the pipeline logs these and moves on to the
/// next feature; they only abort a run when fail-fast is requested.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    #[error("malformed geometry: {0}")]
    MalformedGeometry(&'static str),

    #[error("attribute '{field}' is not numeric: {value}")]
    InvalidAttribute { field: &'static str, value: String },
}

/// Failure to read a source dataset.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported source format: {0}")]
    UnsupportedFormat(String),

    #[error("shapefile error: {0}")]
    Shapefile(String),

    #[error("GeoJSON error: {0}")]
    GeoJson(String),
}

impl From<shapefile::Error> for SourceError {
    fn from(e: shapefile::Error) -> Self {
        SourceError::Shapefile(e.to_string())
    }
}

impl From<geojson::Error> for SourceError {
    fn from(e: geojson::Error) -> Self {
        SourceError::GeoJson(e.to_string())
    }
}
