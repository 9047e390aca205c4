use std::collections::HashSet;
use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::{Bounds, Distance, LonLat};

/// A polygon boundary: at least 3 distinct vertices, stored unclosed (first != last).
/// Self-intersection isn't validated; that's a documented precondition of the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    pts: Vec<LonLat>,
}

impl Ring {
    pub fn new(mut pts: Vec<LonLat>) -> Result<Ring> {
        // GeoJSON-style input repeats the first point at the end; accept it and unclose.
        if pts.len() >= 4 && pts[0] == *pts.last().unwrap() {
            pts.pop();
        }
        if pts.len() < 3 {
            bail!("Can't make a ring with < 3 points: {:?}", pts);
        }
        if pts.windows(2).any(|pair| pair[0] == pair[1]) {
            bail!("Ring has duplicate adjacent points: {:?}", pts);
        }
        let mut seen = HashSet::new();
        for pt in &pts {
            seen.insert(pt.to_hashable());
        }
        if seen.len() != pts.len() {
            bail!("Ring has repeat points: {:?}", pts);
        }
        Ok(Ring { pts })
    }

    pub fn must_new(pts: Vec<LonLat>) -> Ring {
        Ring::new(pts).unwrap()
    }

    pub fn points(&self) -> &Vec<LonLat> {
        &self.pts
    }

    /// Every boundary segment, wrapping around from the last vertex back to the first.
    pub fn edges(&self) -> Vec<(LonLat, LonLat)> {
        let mut result: Vec<(LonLat, LonLat)> =
            self.pts.windows(2).map(|pair| (pair[0], pair[1])).collect();
        result.push((*self.pts.last().unwrap(), self.pts[0]));
        result
    }

    /// Ray casting, with half-open edge handling so a ray through a shared vertex doesn't
    /// get counted twice.
    pub fn contains_pt(&self, pt: LonLat) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.latitude > pt.latitude) != (b.latitude > pt.latitude) {
                let cross_lon = a.longitude
                    + (pt.latitude - a.latitude) / (b.latitude - a.latitude)
                        * (b.longitude - a.longitude);
                if pt.longitude < cross_lon {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// The closest point on the boundary: the minimum, over every edge, of the
    /// segment-clamped projection. O(n).
    pub fn closest_boundary_pt(&self, pt: LonLat) -> LonLat {
        let mut best: Option<(LonLat, Distance)> = None;
        for (a, b) in self.edges() {
            let candidate = project_onto_segment(pt, a, b);
            let dist = candidate.gps_dist(pt);
            if best.map_or(true, |(_, d)| dist < d) {
                best = Some((candidate, dist));
            }
        }
        // edges() is never empty for a valid ring
        best.unwrap().0
    }

    pub fn dist_to_boundary(&self, pt: LonLat) -> Distance {
        self.closest_boundary_pt(pt).gps_dist(pt)
    }

    /// Identity for interior points; the closest boundary point otherwise.
    pub fn clamp_within(&self, pt: LonLat) -> LonLat {
        if self.contains_pt(pt) {
            pt
        } else {
            self.closest_boundary_pt(pt)
        }
    }

    pub fn centroid(&self) -> LonLat {
        LonLat::center(&self.pts)
    }

    pub fn longest_edge(&self) -> (LonLat, LonLat) {
        let mut best = (self.pts[0], self.pts[1]);
        let mut best_len = Distance::ZERO;
        for (a, b) in self.edges() {
            let len = a.gps_dist(b);
            if len > best_len {
                best = (a, b);
                best_len = len;
            }
        }
        best
    }

    /// All proper crossings of the segment [a, b] with the boundary.
    pub fn intersections_with_segment(&self, a: LonLat, b: LonLat) -> Vec<LonLat> {
        let mut hits = Vec::new();
        for (c, d) in self.edges() {
            if let Some(pt) = segment_intersection(a, b, c, d) {
                hits.push(pt);
            }
        }
        hits
    }

    pub fn get_bounds(&self) -> Bounds {
        Bounds::from_points(&self.pts)
    }

    pub fn to_geojson(&self) -> geojson::Geometry {
        let mut positions: Vec<Vec<f64>> = self.pts.iter().map(|pt| pt.to_geojson()).collect();
        positions.push(self.pts[0].to_geojson());
        geojson::Geometry::new(geojson::Value::Polygon(vec![positions]))
    }
}

impl fmt::Display for Ring {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Ring::new(vec![")?;
        for pt in &self.pts {
            writeln!(f, "  LonLat::new({}, {}),", pt.longitude, pt.latitude)?;
        }
        write!(f, "])")
    }
}

fn project_onto_segment(pt: LonLat, a: LonLat, b: LonLat) -> LonLat {
    let (bx, by) = b.to_local(a);
    let (px, py) = pt.to_local(a);
    let len_sq = bx * bx + by * by;
    if len_sq == 0.0 {
        return a;
    }
    let t = ((px * bx + py * by) / len_sq).clamp(0.0, 1.0);
    LonLat::from_local(a, t * bx, t * by)
}

/// Segment-segment intersection, computed directly in degree space. That's exact for the
/// linear parameterization, which is all the flat-earth model promises.
fn segment_intersection(a1: LonLat, a2: LonLat, b1: LonLat, b2: LonLat) -> Option<LonLat> {
    let d1x = a2.longitude - a1.longitude;
    let d1y = a2.latitude - a1.latitude;
    let d2x = b2.longitude - b1.longitude;
    let d2y = b2.latitude - b1.latitude;

    let denom = d1x * d2y - d1y * d2x;
    if denom == 0.0 {
        return None;
    }
    let t = ((b1.longitude - a1.longitude) * d2y - (b1.latitude - a1.latitude) * d2x) / denom;
    let u = ((b1.longitude - a1.longitude) * d1y - (b1.latitude - a1.latitude) * d1x) / denom;
    if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
        return None;
    }
    Some(LonLat::new(a1.longitude + t * d1x, a1.latitude + t * d1y))
}
