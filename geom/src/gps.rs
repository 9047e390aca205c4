use std::fmt;

use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use crate::{Angle, Distance, EARTH_RADIUS_M};

// longitude is x, latitude is y
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct LonLat {
    pub longitude: f64,
    pub latitude: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> LonLat {
        LonLat {
            longitude: lon,
            latitude: lat,
        }
    }

    /// Haversine great-circle distance.
    pub fn gps_dist(self, other: LonLat) -> Distance {
        let lon1 = self.longitude.to_radians();
        let lon2 = other.longitude.to_radians();
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();

        let delta_lat = lat2 - lat1;
        let delta_lon = lon2 - lon1;

        let a = (delta_lat / 2.0).sin().powi(2)
            + (delta_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        Distance::meters(EARTH_RADIUS_M * c)
    }

    /// The initial great-circle bearing towards `other`, clockwise from north. Degenerate
    /// for coincident points; returns `Angle::ZERO` there, so callers should guard.
    pub fn bearing_to(self, other: LonLat) -> Angle {
        if self == other {
            return Angle::ZERO;
        }
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let y = delta_lon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();
        Angle::radians(y.atan2(x))
    }

    /// Translate by `dist` along `bearing`, using an equirectangular approximation.
    /// Acceptable below a kilometer or so; don't lay out a whole highway with it.
    pub fn project_away(self, dist: Distance, bearing: Angle) -> LonLat {
        let d = dist.inner_meters();
        let (sin, cos) = bearing.inner_radians().sin_cos();
        let dlat = (d * cos / EARTH_RADIUS_M).to_degrees();
        let dlon = (d * sin / (EARTH_RADIUS_M * self.latitude.to_radians().cos())).to_degrees();
        LonLat::new(self.longitude + dlon, self.latitude + dlat)
    }

    pub fn center(pts: &[LonLat]) -> LonLat {
        let mut lon = 0.0;
        let mut lat = 0.0;
        for pt in pts {
            lon += pt.longitude;
            lat += pt.latitude;
        }
        let len = pts.len() as f64;
        LonLat {
            longitude: lon / len,
            latitude: lat / len,
        }
    }

    /// East/north offsets in meters from `origin`, on the local flat-earth plane.
    pub(crate) fn to_local(self, origin: LonLat) -> (f64, f64) {
        let x = (self.longitude - origin.longitude).to_radians()
            * EARTH_RADIUS_M
            * origin.latitude.to_radians().cos();
        let y = (self.latitude - origin.latitude).to_radians() * EARTH_RADIUS_M;
        (x, y)
    }

    pub(crate) fn from_local(origin: LonLat, x: f64, y: f64) -> LonLat {
        let lon = origin.longitude
            + (x / (EARTH_RADIUS_M * origin.latitude.to_radians().cos())).to_degrees();
        let lat = origin.latitude + (y / EARTH_RADIUS_M).to_degrees();
        LonLat::new(lon, lat)
    }

    /// A GeoJSON position.
    pub fn to_geojson(self) -> Vec<f64> {
        vec![self.longitude, self.latitude]
    }

    pub fn to_hashable(self) -> HashableLonLat {
        HashableLonLat {
            lon: NotNan::new(self.longitude).unwrap(),
            lat: NotNan::new(self.latitude).unwrap(),
        }
    }
}

impl fmt::Display for LonLat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "LonLat({0}, {1})", self.longitude, self.latitude)
    }
}

/// A hashable key for deduplicating points.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct HashableLonLat {
    lon: NotNan<f64>,
    lat: NotNan<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seattle() -> LonLat {
        LonLat::new(-122.3395, 47.6004)
    }

    #[test]
    fn distance_laws() {
        let a = seattle();
        let b = LonLat::new(-122.3340, 47.6010);
        assert_eq!(a.gps_dist(b), b.gps_dist(a));
        assert_eq!(a.gps_dist(a), Distance::ZERO);
    }

    #[test]
    fn bearings() {
        let a = seattle();
        let north = LonLat::new(a.longitude, a.latitude + 0.001);
        let east = LonLat::new(a.longitude + 0.001, a.latitude);
        assert!(a.bearing_to(north).normalized_degrees().abs() < 0.01);
        assert!((a.bearing_to(east).normalized_degrees() - 90.0).abs() < 0.01);
        assert_eq!(a.bearing_to(a), Angle::ZERO);
    }

    #[test]
    fn project_away_round_trips_through_distance() {
        let a = seattle();
        for degs in [0.0, 45.0, 90.0, 135.0, 200.0, 300.0] {
            let moved = a.project_away(Distance::meters(1000.0), Angle::degrees(degs));
            let err = (a.gps_dist(moved).inner_meters() - 1000.0).abs();
            assert!(err < 5.0, "bearing {} off by {}m", degs, err);
        }
    }
}
