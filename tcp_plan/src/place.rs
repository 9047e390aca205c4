//! The device placement engine: orchestrates the rules resolver, road selector, fallback
//! axis, and shoulder selector into a concrete machine-suggested layout.

use serde::{Deserialize, Serialize};

use geom::{Angle, Distance, LonLat, PolyLine, Ring, WalkPosition};

use crate::{
    derive_axis, pick_dominant_road, resolve_tcp_rules, ApproachDirection, Device, DeviceId,
    DeviceMeta, DeviceType, Layout, Operation, PlacementMethod, ResolvedRules, RulesQuery,
    SignFace, TimeOfDay, BOUNDARY_TOLERANCE, MAX_SIGN_OFFSET, MIN_DEVICE_SEPARATION,
    MIN_SIGN_SEPARATION, PLACEMENT_RETRIES, SHOULDER_OFFSET, UPSTREAM_PROBE,
};

/// A taper never runs with fewer cones than this, no matter how short it is.
const MIN_TAPER_CONES: usize = 4;
/// Lateral growth per cone, producing the funnel shape.
const FUNNEL_STEP: Distance = Distance::const_meters(0.5);
/// How far to back a stacking cone off towards the entry, per retry.
const CONE_NUDGE: Distance = Distance::const_meters(1.5);
/// Extra lateral offset per retry while a sign escapes the zone.
const SIGN_OFFSET_STEP: Distance = Distance::const_meters(2.0);
/// The arrow board sits this far upstream of the taper start.
const ARROW_BOARD_SETBACK: Distance = Distance::const_meters(15.0);

/// Informational input; carried through for the consumer, never used in geometry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadType {
    Highway,
    Arterial,
    Collector,
    Local,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanRequest {
    pub zone: Ring,
    /// Posted speed, validated to [15, 75] upstream of this engine and clamped to the
    /// rules table's [25, 55] internally.
    pub speed_mph: f64,
    pub operation: Operation,
    pub time_of_day: TimeOfDay,
    pub road_type: RoadType,
    pub work_length: Distance,
    /// Pre-resolved by the caller; an empty list triggers the axis fallback.
    pub roads: Vec<PolyLine>,
}

/// Which lateral side of the road signs belong on: the side whose test point sits farther
/// from the zone's centroid. Picking the wrong side is the engine's most safety-relevant
/// failure mode, so the rule is simple and absolute.
pub fn shoulder_side(reference: LonLat, bearing: Angle, zone: &Ring) -> Angle {
    let left = bearing.rotate_degs(-90.0);
    let right = bearing.rotate_degs(90.0);
    let centroid = zone.centroid();
    let left_dist = reference.project_away(SHOULDER_OFFSET, left).gps_dist(centroid);
    let right_dist = reference
        .project_away(SHOULDER_OFFSET, right)
        .gps_dist(centroid);
    if left_dist >= right_dist {
        left
    } else {
        right
    }
}

/// Produces a fresh machine-suggested layout plus the rules that shaped it. Stateless:
/// everything derives from the request.
pub fn suggest_layout(req: &PlanRequest) -> (Layout, ResolvedRules) {
    let rules = resolve_tcp_rules(&RulesQuery::new(
        req.speed_mph,
        req.operation,
        req.time_of_day,
    ));
    info!(
        "Planning a {} zone on a {:?} road at {} mph ({:?})",
        req.operation.as_str(),
        req.road_type,
        req.speed_mph,
        req.time_of_day
    );

    let sign_spacing = Distance::feet(rules.sign_spacing_ft.value);
    let alignment = match pick_dominant_road(&req.roads, &req.zone) {
        Some(idx) => road_alignment(&req.roads[idx], &req.zone),
        None => axis_alignment(&req.zone, sign_spacing * 3.0 + UPSTREAM_PROBE),
    };
    debug!(
        "Placement strategy {:?}; entry at {}, upstream {}",
        alignment.method, alignment.entry, alignment.upstream_bearing
    );

    let shoulder = shoulder_side(alignment.entry, alignment.upstream_bearing, &req.zone);

    let mut placer = Placer {
        zone: &req.zone,
        alignment: &alignment,
        devices: Vec::new(),
    };
    placer.place_signs(&rules, shoulder);
    placer.place_cones(&rules, shoulder);
    placer.place_flaggers(&rules, req.work_length);
    placer.place_arrow_board(&rules, req.operation);

    let approach = ApproachDirection::from_bearing(alignment.upstream_bearing);
    (Layout::new(placer.devices, approach), rules)
}

/// The strategy picked for one plan: a path to walk along, the zone entry point on it,
/// and which way is upstream. Both strategies share all the walking code below.
struct Alignment {
    path: PolyLine,
    entry: LonLat,
    entry_dist: Distance,
    /// +1.0 when upstream is towards increasing arclength.
    upstream_sign: f64,
    upstream_bearing: Angle,
    method: PlacementMethod,
}

impl Alignment {
    /// Walks `dist` upstream (negative for downstream) from the entry, clamped to the
    /// path's ends.
    fn walk_upstream(&self, dist: Distance) -> WalkPosition {
        self.path
            .walk_along(self.entry_dist, dist * self.upstream_sign)
    }
}

fn dist_outside(zone: &Ring, pt: LonLat) -> Distance {
    if zone.contains_pt(pt) {
        Distance::ZERO
    } else {
        zone.dist_to_boundary(pt)
    }
}

fn road_alignment(road: &PolyLine, zone: &Ring) -> Alignment {
    let anchor = road.project_pt(zone.centroid());

    // Probe both ways; the side farther outside the zone is where traffic comes from.
    let ahead = road.walk_along(anchor.dist_along, UPSTREAM_PROBE).pt;
    let behind = road.walk_along(anchor.dist_along, -UPSTREAM_PROBE).pt;
    let upstream_sign = if dist_outside(zone, ahead) >= dist_outside(zone, behind) {
        1.0
    } else {
        -1.0
    };

    // Boundary crossings of the road, with arclength
    let mut crossings: Vec<(Distance, LonLat)> = Vec::new();
    let mut so_far = Distance::ZERO;
    for (a, b) in road.segments() {
        for pt in zone.intersections_with_segment(a, b) {
            crossings.push((so_far + a.gps_dist(pt), pt));
        }
        so_far += a.gps_dist(b);
    }
    crossings.sort_by_key(|(d, _)| *d);

    // The entry is the crossing on the upstream side. A road that intersects the padded
    // bbox without crossing the boundary itself falls back to the centroid's projection.
    let (entry_dist, entry) = if crossings.is_empty() {
        debug!("The dominant road never crosses the zone boundary; using the centroid's projection as the entry");
        (anchor.dist_along, anchor.pt)
    } else if upstream_sign > 0.0 {
        crossings[crossings.len() - 1]
    } else {
        crossings[0]
    };

    let probe = road
        .walk_along(entry_dist, UPSTREAM_PROBE * upstream_sign)
        .pt;
    let upstream_bearing = if probe == entry {
        // The entry sits at the very end of the road data
        let here = road.dist_along(entry_dist);
        if upstream_sign > 0.0 {
            here.bearing
        } else {
            here.bearing.opposite()
        }
    } else {
        entry.bearing_to(probe)
    };

    Alignment {
        path: road.clone(),
        entry,
        entry_dist,
        upstream_sign,
        upstream_bearing,
        method: PlacementMethod::RoadAligned,
    }
}

/// No usable road: synthesize the axis and pre-extend it upstream by `approach_len`, so
/// the clamped walk can still reach every sign position.
fn axis_alignment(zone: &Ring, approach_len: Distance) -> Alignment {
    let axis = derive_axis(zone);
    let entry = axis.line.first_pt();
    let approach_start = entry.project_away(approach_len, axis.upstream_bearing);

    let mut pts = vec![approach_start];
    pts.extend(axis.line.points().clone());
    let path = PolyLine::new(pts).unwrap_or_else(|_| axis.line.clone());
    let entry_dist = path.project_pt(entry).dist_along;

    Alignment {
        path,
        entry,
        entry_dist,
        upstream_sign: -1.0,
        upstream_bearing: axis.upstream_bearing,
        method: PlacementMethod::AxisFallback,
    }
}

/// Maps the ordered required-sign list onto the C (closest), B, A (farthest) posts. The
/// list reads in driving order, so the first sign a driver meets goes farthest upstream.
fn sign_faces(required: &[SignFace]) -> [SignFace; 3] {
    let a = required.first().copied().unwrap_or(SignFace::RoadWorkAhead);
    let b = required.get(1).copied().unwrap_or(a);
    let c = required.last().copied().unwrap_or(a);
    [c, b, a]
}

struct Placer<'a> {
    zone: &'a Ring,
    alignment: &'a Alignment,
    devices: Vec<Device>,
}

impl Placer<'_> {
    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        device_type: DeviceType,
        sign_face: Option<SignFace>,
        pos: LonLat,
        label: Option<String>,
        rotation_degs: Option<f64>,
        purpose: &str,
        resolved_distance: Option<Distance>,
        approximate: bool,
    ) {
        let sequence = self.devices.len();
        self.devices.push(Device {
            id: DeviceId(sequence),
            device_type,
            sign_face,
            pos,
            label,
            rotation_degs,
            meta: DeviceMeta {
                sequence,
                purpose: purpose.to_string(),
                method: self.alignment.method,
                resolved_distance,
                approximate,
            },
        });
    }

    /// Exactly 3 signs, C nearest the zone and A farthest, at cumulative upstream
    /// distances of 1x, 2x, 3x the resolved spacing, offset onto the shoulder.
    fn place_signs(&mut self, rules: &ResolvedRules, shoulder: Angle) {
        let spacing = Distance::feet(rules.sign_spacing_ft.value);
        let faces = sign_faces(&rules.required_signs.value);

        for (i, label) in ["C", "B", "A"].iter().enumerate() {
            let mut target = spacing * (i as f64 + 1.0);
            let mut placed: Option<(LonLat, bool)> = None;
            let mut approximate = false;

            for attempt in 0..=PLACEMENT_RETRIES {
                let on_road = self.alignment.walk_upstream(target).pt;
                let candidate = self.offset_to_shoulder(on_road, shoulder);
                placed = Some(candidate);
                let separated = self
                    .devices
                    .iter()
                    .filter(|d| d.device_type == DeviceType::Sign)
                    .all(|d| d.pos.gps_dist(candidate.0) >= MIN_SIGN_SEPARATION);
                if separated {
                    break;
                }
                if attempt == PLACEMENT_RETRIES {
                    approximate = true;
                    warn!(
                        "Sign {} kept stacking after {} retries; accepting the best candidate",
                        label, PLACEMENT_RETRIES
                    );
                } else {
                    // Push the stacking sign further upstream and try again
                    target += MIN_SIGN_SEPARATION;
                }
            }

            if let Some((pos, escape_failed)) = placed {
                self.push(
                    DeviceType::Sign,
                    Some(faces[i]),
                    pos,
                    Some(label.to_string()),
                    None,
                    "advance warning",
                    Some(target),
                    approximate || escape_failed,
                );
            }
        }
    }

    /// Offsets a road position laterally onto the shoulder, growing the offset (capped at
    /// MAX_SIGN_OFFSET) until the sign lands outside the zone. The bool reports a retry
    /// budget that ran out with the sign still inside.
    fn offset_to_shoulder(&self, on_road: LonLat, shoulder: Angle) -> (LonLat, bool) {
        let mut candidate = on_road.project_away(SHOULDER_OFFSET, shoulder);
        for attempt in 0..=PLACEMENT_RETRIES {
            let mut offset = SHOULDER_OFFSET + SIGN_OFFSET_STEP * attempt as f64;
            if offset > MAX_SIGN_OFFSET {
                offset = MAX_SIGN_OFFSET;
            }
            candidate = on_road.project_away(offset, shoulder);
            if !self.zone.contains_pt(candidate) {
                return (candidate, false);
            }
        }
        warn!(
            "A sign couldn't escape the zone within {} retries; accepting the best candidate",
            PLACEMENT_RETRIES
        );
        (candidate, true)
    }

    /// Cones funnel from the entry towards the centroid: each advances by the resolved
    /// spacing and drifts a little further sideways, clamped inside the zone (or within
    /// tolerance of its boundary).
    fn place_cones(&mut self, rules: &ResolvedRules, shoulder: Angle) {
        let spacing = Distance::feet(rules.cone_spacing_ft.value);
        // Divide in feet, straight from the tables, so exact ratios stay exact
        let count = ((rules.taper_length_ft.value / rules.cone_spacing_ft.value).floor()
            as usize)
            .max(MIN_TAPER_CONES);

        let entry = self.alignment.entry;
        let centroid = self.zone.centroid();
        let advance = if entry == centroid {
            self.alignment.upstream_bearing.opposite()
        } else {
            entry.bearing_to(centroid)
        };
        let funnel = shoulder.opposite();

        for i in 0..count {
            let along = spacing * i as f64;
            let raw = entry
                .project_away(along, advance)
                .project_away(FUNNEL_STEP * i as f64, funnel);
            let (pos, approximate) = self.settle_cone(raw, advance);
            self.push(
                DeviceType::Cone,
                None,
                pos,
                None,
                None,
                "taper channelizing",
                Some(along),
                approximate,
            );
        }
    }

    /// Keeps a cone near the zone and off the top of anything already placed, within the
    /// retry budget.
    fn settle_cone(&self, raw: LonLat, advance: Angle) -> (LonLat, bool) {
        let mut pos = self.clamp_near_zone(raw);
        for attempt in 0..=PLACEMENT_RETRIES {
            if self
                .devices
                .iter()
                .all(|d| d.pos.gps_dist(pos) >= MIN_DEVICE_SEPARATION)
            {
                return (pos, false);
            }
            if attempt == PLACEMENT_RETRIES {
                break;
            }
            // Back the cone off towards the entry and try again
            pos = self.clamp_near_zone(
                raw.project_away(CONE_NUDGE * (attempt + 1) as f64, advance.opposite()),
            );
        }
        warn!(
            "A cone kept stacking after {} retries; accepting the best candidate",
            PLACEMENT_RETRIES
        );
        (pos, true)
    }

    /// Identity while the point is inside the zone or within tolerance of its boundary;
    /// the nearest boundary point otherwise.
    fn clamp_near_zone(&self, pt: LonLat) -> LonLat {
        if self.zone.contains_pt(pt) || self.zone.dist_to_boundary(pt) <= BOUNDARY_TOLERANCE {
            pt
        } else {
            self.zone.clamp_within(pt)
        }
    }

    /// F1 guards the approach a buffer length upstream of the entry; F2, when resolved,
    /// stands past the work area downstream.
    fn place_flaggers(&mut self, rules: &ResolvedRules, work_length: Distance) {
        let buffer = Distance::feet(rules.buffer_length_ft.value);
        let posts = rules.flaggers.value.clone();
        for (i, post) in posts.iter().enumerate() {
            let resolved = if post.role == "downstream" {
                work_length + buffer
            } else {
                buffer
            };
            let pos = if post.role == "downstream" {
                self.alignment.walk_upstream(-resolved).pt
            } else {
                self.alignment.walk_upstream(resolved).pt
            };
            self.push(
                DeviceType::Flagger,
                None,
                pos,
                Some(format!("F{}", i + 1)),
                None,
                &format!("{} flagger post", post.role),
                Some(resolved),
                false,
            );
        }
    }

    /// Only high-speed lane closures get an arrow board, just upstream of the taper,
    /// facing approaching traffic.
    fn place_arrow_board(&mut self, rules: &ResolvedRules, operation: Operation) {
        if operation != Operation::LaneClosure || rules.speed_bucket < 45 {
            return;
        }
        let pos = self.alignment.walk_upstream(ARROW_BOARD_SETBACK).pt;
        let rotation =
            (self.alignment.upstream_bearing.normalized_degrees() + 180.0) % 360.0;
        self.push(
            DeviceType::ArrowBoard,
            None,
            pos,
            None,
            Some(rotation),
            "advance lane-closure warning",
            Some(ARROW_BOARD_SETBACK),
            false,
        );
    }
}
