//! Geometry simplification and precision reduction.
//!
//! Both stages walk every ring and path of a `geo_types::Geometry`
//! independently. Neither stage fails on well-formed input; empty or
//! non-finite geometries are rejected up front as a caller error.

mod reduce;
mod simplify;
mod topology;

pub use reduce::{PrecisionGrid, Reduced, reduce};
pub use simplify::simplify;

use geo::CoordsIter;
use geo_types::Geometry;

use crate::error::FeatureError;

pub fn ensure_well_formed(geometry: &Geometry<f64>) -> Result<(), FeatureError> {
    if geometry.coords_count() == 0 {
        return Err(FeatureError::MalformedGeometry("geometry has no coordinates"));
    }
    if geometry
        .coords_iter()
        .any(|c| !c.x.is_finite() || !c.y.is_finite())
    {
        return Err(FeatureError::MalformedGeometry("non-finite coordinate"));
    }
    Ok(())
}
