use geom::{Angle, Distance, PolyLine, Ring};

/// A synthesized centerline through the work zone, used when no road data exists.
#[derive(Clone, Debug)]
pub struct Axis {
    /// Runs from the entry point (upstream side) to the exit point.
    pub line: PolyLine,
    /// Points back the way approaching traffic comes from.
    pub upstream_bearing: Angle,
}

/// Far past any work-zone-scale polygon.
const PROBE_REACH: Distance = Distance::const_meters(5_000.0);

/// Derives an axis from the polygon alone: a probe line through the centroid, parallel to
/// the longest edge, intersected with the boundary. With fewer than two boundary hits
/// (degenerate shapes), the nearest boundary points to the probe's ends stand in.
pub fn derive_axis(zone: &Ring) -> Axis {
    let centroid = zone.centroid();
    let (a, b) = zone.longest_edge();
    let bearing = a.bearing_to(b);

    let probe_start = centroid.project_away(PROBE_REACH, bearing.opposite());
    let probe_end = centroid.project_away(PROBE_REACH, bearing);

    let mut hits = zone.intersections_with_segment(probe_start, probe_end);
    hits.sort_by_key(|pt| probe_start.gps_dist(*pt));

    let (entry, exit) = if hits.len() >= 2 {
        // The two most distant hits along the probe
        (hits[0], hits[hits.len() - 1])
    } else {
        debug!("Probe only crossed the boundary {} times; substituting nearest boundary points", hits.len());
        (
            zone.closest_boundary_pt(probe_start),
            zone.closest_boundary_pt(probe_end),
        )
    };

    let line = PolyLine::new(vec![entry, exit])
        .unwrap_or_else(|_| PolyLine::must_new(vec![probe_start, probe_end]));
    Axis {
        line,
        upstream_bearing: entry.bearing_to(probe_start),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geom::LonLat;

    #[test]
    fn axis_runs_along_the_tall_side() {
        // Taller than wide, so the longest edge runs north-south
        let zone = Ring::must_new(vec![
            LonLat::new(-122.3400, 47.6000),
            LonLat::new(-122.3390, 47.6000),
            LonLat::new(-122.3390, 47.6008),
            LonLat::new(-122.3400, 47.6008),
        ]);
        let axis = derive_axis(&zone);

        // Entry on the south edge, exit on the north edge
        assert!((axis.line.first_pt().latitude - 47.6000).abs() < 1e-9);
        assert!((axis.line.last_pt().latitude - 47.6008).abs() < 1e-9);
        // Upstream points south, back towards the probe's origin
        let upstream = axis.upstream_bearing.normalized_degrees();
        assert!((upstream - 180.0).abs() < 1.0, "upstream was {}", upstream);
    }

    #[test]
    fn degenerate_probe_still_produces_an_axis() {
        // A sliver whose centroid-parallel probe can graze the boundary oddly; the axis
        // must still come out usable.
        let zone = Ring::must_new(vec![
            LonLat::new(-122.3400, 47.6000),
            LonLat::new(-122.3399, 47.60001),
            LonLat::new(-122.3390, 47.6000),
            LonLat::new(-122.3395, 47.60005),
        ]);
        let axis = derive_axis(&zone);
        assert!(axis.line.length() > Distance::ZERO);
    }
}
