//! The geometry kernel for work-zone planning: geographic points, typed units, polygon
//! rings, and polylines. Everything operates directly on [lon, lat] degree pairs with a
//! local flat-earth approximation, which is plenty accurate at work-zone scale
//! (sub-kilometer).

mod angle;
mod bounds;
mod distance;
mod gps;
mod polyline;
mod ring;

pub use crate::angle::Angle;
pub use crate::bounds::Bounds;
pub use crate::distance::Distance;
pub use crate::gps::{HashableLonLat, LonLat};
pub use crate::polyline::{PolyLine, Projection, WalkPosition};
pub use crate::ring::Ring;

/// About 1 centimeter, quite tiny for the purposes here.
pub const EPSILON_DIST: Distance = Distance::const_meters(0.01);

pub(crate) const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Reduce the precision of an f64. This helps ensure serialization is idempotent
/// (everything is exactly the same before and after saving/loading).
pub fn trim_f64(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Serializes a trimmed `f64` as an `i32` to save space.
pub fn serialize_f64<S: serde::Serializer>(x: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i32((x * 10_000.0) as i32)
}

/// Deserializes a trimmed `f64` from an `i32`.
pub fn deserialize_f64<'de, D: serde::Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let x = <i32 as serde::Deserialize>::deserialize(d)?;
    Ok((x as f64) / 10_000.0)
}
