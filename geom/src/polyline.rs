use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::{Angle, Bounds, Distance, LonLat};

/// An open sequence of at least 2 distinct points, with arclength operations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolyLine {
    pts: Vec<LonLat>,
    length: Distance,
}

/// The result of projecting a point onto a polyline.
#[derive(Clone, Copy, Debug)]
pub struct Projection {
    pub pt: LonLat,
    pub segment_idx: usize,
    pub dist_along: Distance,
    pub dist_from: Distance,
    pub segment_bearing: Angle,
}

/// A position reached by walking along a polyline.
#[derive(Clone, Copy, Debug)]
pub struct WalkPosition {
    pub pt: LonLat,
    pub segment_idx: usize,
    pub dist_along: Distance,
    /// The forward bearing (towards increasing arclength) at this position.
    pub bearing: Angle,
}

impl PolyLine {
    pub fn new(pts: Vec<LonLat>) -> Result<PolyLine> {
        if pts.len() < 2 {
            bail!("Can't make a polyline with < 2 points: {:?}", pts);
        }
        if pts.windows(2).any(|pair| pair[0] == pair[1]) {
            bail!("Polyline has duplicate adjacent points: {:?}", pts);
        }
        let length = pts
            .windows(2)
            .fold(Distance::ZERO, |so_far, pair| so_far + pair[0].gps_dist(pair[1]));
        Ok(PolyLine { pts, length })
    }

    pub fn must_new(pts: Vec<LonLat>) -> PolyLine {
        PolyLine::new(pts).unwrap()
    }

    pub fn points(&self) -> &Vec<LonLat> {
        &self.pts
    }

    pub fn first_pt(&self) -> LonLat {
        self.pts[0]
    }

    pub fn last_pt(&self) -> LonLat {
        *self.pts.last().unwrap()
    }

    pub fn length(&self) -> Distance {
        self.length
    }

    pub fn segments(&self) -> impl Iterator<Item = (LonLat, LonLat)> + '_ {
        self.pts.windows(2).map(|pair| (pair[0], pair[1]))
    }

    /// The nearest position on the polyline to `pt`, with how far along and how far off the
    /// line it is.
    pub fn project_pt(&self, pt: LonLat) -> Projection {
        let mut so_far = Distance::ZERO;
        let mut best: Option<Projection> = None;
        for (idx, (a, b)) in self.segments().enumerate() {
            let seg_len = a.gps_dist(b);
            let (bx, by) = b.to_local(a);
            let (px, py) = pt.to_local(a);
            let t = ((px * bx + py * by) / (bx * bx + by * by)).clamp(0.0, 1.0);
            let candidate = LonLat::from_local(a, t * bx, t * by);
            let dist_from = candidate.gps_dist(pt);
            if best.as_ref().map_or(true, |p| dist_from < p.dist_from) {
                best = Some(Projection {
                    pt: candidate,
                    segment_idx: idx,
                    dist_along: so_far + seg_len * t,
                    dist_from,
                    segment_bearing: a.bearing_to(b),
                });
            }
            so_far += seg_len;
        }
        // pts.len() >= 2 by construction
        best.unwrap()
    }

    /// The position at `dist` from the start, clamped into [0, length]. Never extrapolates
    /// off either end; sacrificing a little spacing accuracy beats placing a device
    /// off-road.
    pub fn dist_along(&self, dist: Distance) -> WalkPosition {
        let clamped = if dist < Distance::ZERO {
            Distance::ZERO
        } else if dist > self.length {
            self.length
        } else {
            dist
        };
        let mut so_far = Distance::ZERO;
        for (idx, (a, b)) in self.segments().enumerate() {
            let seg_len = a.gps_dist(b);
            if clamped <= so_far + seg_len || idx == self.pts.len() - 2 {
                let t = if seg_len == Distance::ZERO {
                    0.0
                } else {
                    ((clamped - so_far) / seg_len).clamp(0.0, 1.0)
                };
                let (bx, by) = b.to_local(a);
                let pt = if t == 1.0 {
                    b
                } else {
                    LonLat::from_local(a, t * bx, t * by)
                };
                return WalkPosition {
                    pt,
                    segment_idx: idx,
                    dist_along: clamped,
                    bearing: a.bearing_to(b),
                };
            }
            so_far += seg_len;
        }
        unreachable!()
    }

    /// Move by a signed arclength from `start`, clamped to the ends of the line.
    pub fn walk_along(&self, start: Distance, delta: Distance) -> WalkPosition {
        self.dist_along(start + delta)
    }

    pub fn get_bounds(&self) -> Bounds {
        Bounds::from_points(&self.pts)
    }

    pub fn to_geojson(&self) -> geojson::Geometry {
        let positions: Vec<Vec<f64>> = self.pts.iter().map(|pt| pt.to_geojson()).collect();
        geojson::Geometry::new(geojson::Value::LineString(positions))
    }
}

impl fmt::Display for PolyLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "PolyLine::new(vec![")?;
        for pt in &self.pts {
            writeln!(f, "  LonLat::new({}, {}),", pt.longitude, pt.latitude)?;
        }
        write!(f, "])")
    }
}
