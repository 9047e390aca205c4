use std::f64;

use serde::{Deserialize, Serialize};

use crate::{Distance, LonLat, EARTH_RADIUS_M};

/// A lon/lat axis-aligned bounding box.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    pub fn new() -> Bounds {
        Bounds {
            min_lon: f64::MAX,
            min_lat: f64::MAX,
            max_lon: f64::MIN,
            max_lat: f64::MIN,
        }
    }

    pub fn from_points(pts: &[LonLat]) -> Bounds {
        let mut b = Bounds::new();
        for pt in pts {
            b.update(*pt);
        }
        b
    }

    pub fn update(&mut self, pt: LonLat) {
        self.min_lon = self.min_lon.min(pt.longitude);
        self.max_lon = self.max_lon.max(pt.longitude);
        self.min_lat = self.min_lat.min(pt.latitude);
        self.max_lat = self.max_lat.max(pt.latitude);
    }

    pub fn contains(&self, pt: LonLat) -> bool {
        pt.longitude >= self.min_lon
            && pt.longitude <= self.max_lon
            && pt.latitude >= self.min_lat
            && pt.latitude <= self.max_lat
    }

    pub fn center(&self) -> LonLat {
        LonLat::new(
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    /// Pad on all sides by `dist`, converting meters to degrees at the box's mid latitude.
    pub fn expand_meters(&self, dist: Distance) -> Bounds {
        let d = dist.inner_meters();
        let dlat = (d / EARTH_RADIUS_M).to_degrees();
        let mid_lat = (self.min_lat + self.max_lat) / 2.0;
        let dlon = (d / (EARTH_RADIUS_M * mid_lat.to_radians().cos())).to_degrees();
        Bounds {
            min_lon: self.min_lon - dlon,
            min_lat: self.min_lat - dlat,
            max_lon: self.max_lon + dlon,
            max_lat: self.max_lat + dlat,
        }
    }

    /// Liang-Barsky clipping: the part of [a, b] inside the box, or None if it misses
    /// entirely.
    pub fn clip_segment(&self, a: LonLat, b: LonLat) -> Option<(LonLat, LonLat)> {
        let dx = b.longitude - a.longitude;
        let dy = b.latitude - a.latitude;
        let mut t0: f64 = 0.0;
        let mut t1: f64 = 1.0;
        for (p, q) in [
            (-dx, a.longitude - self.min_lon),
            (dx, self.max_lon - a.longitude),
            (-dy, a.latitude - self.min_lat),
            (dy, self.max_lat - a.latitude),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
            } else {
                let r = q / p;
                if p < 0.0 {
                    if r > t1 {
                        return None;
                    }
                    if r > t0 {
                        t0 = r;
                    }
                } else {
                    if r < t0 {
                        return None;
                    }
                    if r < t1 {
                        t1 = r;
                    }
                }
            }
        }
        Some((
            LonLat::new(a.longitude + t0 * dx, a.latitude + t0 * dy),
            LonLat::new(a.longitude + t1 * dx, a.latitude + t1 * dy),
        ))
    }
}

impl Default for Bounds {
    fn default() -> Bounds {
        Bounds::new()
    }
}
