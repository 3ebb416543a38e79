use serde_json::{Map, Value};
use shapefile::dbase::FieldValue;
use shapefile::Shape;
use std::collections::HashMap;
use std::path::Path;

use super::SourceFeature;
use crate::error::SourceError;

pub fn read_shapefile(path: &Path) -> Result<Vec<SourceFeature>, SourceError> {
    let mut reader = shapefile::Reader::from_path(path)?;
    let mut features = Vec::new();

    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result?;
        let geometry = shape_to_geometry(index, shape);

        let fields: HashMap<String, FieldValue> = record.into();
        let mut attributes: Vec<(String, Value)> = fields
            .into_iter()
            .map(|(name, value)| (name, field_to_json(value)))
            .collect();
        attributes.sort_by(|a, b| a.0.cmp(&b.0));

        features.push(SourceFeature::new(
            geometry,
            attributes.into_iter().collect::<Map<String, Value>>(),
        ));
    }

    Ok(features)
}

/// Null shapes and shapes geo-types cannot represent become records without geometry.
fn shape_to_geometry(index: usize, shape: Shape) -> Option<geo_types::Geometry<f64>> {
    match shape {
        Shape::NullShape => None,
        shape => match geo_types::Geometry::<f64>::try_from(shape) {
            Ok(geometry) => Some(geometry),
            Err(err) => {
                tracing::warn!("Source: record {} has unusable geometry: {}", index, err);
                None
            }
        },
    }
}

fn field_to_json(value: FieldValue) -> Value {
    match value {
        FieldValue::Character(text) => text.map(Value::String).unwrap_or(Value::Null),
        FieldValue::Memo(text) => Value::String(text),
        FieldValue::Numeric(number) => number.map(Value::from).unwrap_or(Value::Null),
        FieldValue::Float(number) => number.map(|n| Value::from(f64::from(n))).unwrap_or(Value::Null),
        FieldValue::Double(number) | FieldValue::Currency(number) => Value::from(number),
        FieldValue::Integer(number) => Value::from(number),
        FieldValue::Logical(flag) => flag.map(Value::Bool).unwrap_or(Value::Null),
        FieldValue::Date(date) => date
            .map(|d| Value::String(format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day())))
            .unwrap_or(Value::Null),
        other => Value::String(format!("{other:?}")),
    }
}
