use geom::{Distance, PolyLine, Ring};

use crate::ROAD_BBOX_PADDING;

/// Centroid-to-road distances beyond this score zero proximity.
const PROXIMITY_SATURATION: Distance = Distance::const_meters(200.0);
/// Length inside the padded box beyond this scores full marks.
const LENGTH_SATURATION: Distance = Distance::const_meters(500.0);

const PROXIMITY_WEIGHT: f64 = 0.6;
const LENGTH_WEIGHT: f64 = 0.4;

/// Picks the road the work zone most plausibly sits on: candidates must intersect the
/// zone's padded bounding box, then score on proximity to the centroid and on how much of
/// them runs through the box. Deterministic; on ties the first candidate wins. `None` when
/// nothing intersects.
pub fn pick_dominant_road(roads: &[PolyLine], zone: &Ring) -> Option<usize> {
    let bbox = zone.get_bounds().expand_meters(ROAD_BBOX_PADDING);
    let centroid = zone.centroid();

    let mut best: Option<(usize, f64)> = None;
    for (idx, road) in roads.iter().enumerate() {
        let mut length_inside = Distance::ZERO;
        for (a, b) in road.segments() {
            if let Some((c, d)) = bbox.clip_segment(a, b) {
                length_inside += c.gps_dist(d);
            }
        }
        if length_inside == Distance::ZERO {
            continue;
        }

        let dist = road.project_pt(centroid).dist_from;
        let proximity = 1.0 - (dist / PROXIMITY_SATURATION).min(1.0);
        let length_score = (length_inside / LENGTH_SATURATION).min(1.0);
        let score = PROXIMITY_WEIGHT * proximity + LENGTH_WEIGHT * length_score;
        debug!(
            "Road candidate {}: {} inside the padded box, {} from the centroid, score {:.3}",
            idx, length_inside, dist, score
        );
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((idx, score));
        }
    }
    best.map(|(idx, _)| idx)
}
