use geojson::{Feature, GeoJson};
use std::path::Path;

use super::SourceFeature;
use crate::error::SourceError;

pub fn read_geojson(path: &Path) -> Result<Vec<SourceFeature>, SourceError> {
    let text = std::fs::read_to_string(path)?;
    parse_geojson(&text)
}

pub fn parse_geojson(text: &str) -> Result<Vec<SourceFeature>, SourceError> {
    let features = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature::from(geometry)],
    };

    Ok(features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| {
            let geometry = feature.geometry.and_then(|geometry| {
                geo_types::Geometry::<f64>::try_from(geometry)
                    .map_err(|err| {
                        tracing::warn!("Source: record {} has unusable geometry: {}", index, err);
                    })
                    .ok()
            });
            SourceFeature::new(geometry, feature.properties.unwrap_or_default())
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_feature_collection_in_order() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [10.0, 55.0]},
                 "properties": {"navn": "A"}},
                {"type": "Feature", "geometry": null, "properties": {"navn": "B"}}
            ]
        }"#;
        let features = parse_geojson(text).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].attributes["navn"], "A");
        assert!(features[0].geometry.is_some());
        assert!(features[1].geometry.is_none());
        assert!(features[1].bounding_box.is_none());
    }

    #[test]
    fn missing_properties_become_empty() {
        let text = r#"{"type": "Feature", "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}, "properties": null}"#;
        let features = parse_geojson(text).unwrap();
        assert!(features[0].attributes.is_empty());
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(matches!(parse_geojson("not json"), Err(SourceError::GeoJson(_))));
    }
}
