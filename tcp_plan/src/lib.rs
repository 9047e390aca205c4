//! A traffic-control-plan engine for road work zones. Given a work-zone polygon and job
//! parameters, it resolves spacing/length/count values from a static rules pack (with
//! citations) and lays out warning signs, cones, flaggers, and an arrow board as concrete
//! geographic positions. Every entry point is a pure function of its inputs; the engine
//! keeps no state between calls.

#[macro_use]
extern crate log;

mod axis;
mod devices;
mod layout;
mod place;
mod roads;
mod rules;

pub use crate::axis::{derive_axis, Axis};
pub use crate::devices::{
    ApproachDirection, Device, DeviceId, DeviceMeta, DeviceType, PlacementMethod, Provenance,
    SignFace,
};
pub use crate::layout::Layout;
pub use crate::place::{shoulder_side, suggest_layout, PlanRequest, RoadType};
pub use crate::roads::pick_dominant_road;
pub use crate::rules::{
    resolve_tcp_rules, Citation, Cited, FlaggerPost, Operation, ResolvedRules, RulesQuery,
    TimeOfDay,
};

use geom::Distance;

/// Lateral offset from the road onto the shoulder for sign placement.
pub const SHOULDER_OFFSET: Distance = Distance::const_meters(5.0);
/// No two advance warning signs may sit closer than this.
pub const MIN_SIGN_SEPARATION: Distance = Distance::const_meters(15.0);
/// No channelizing device may sit closer than this to anything already placed.
pub const MIN_DEVICE_SEPARATION: Distance = Distance::const_meters(3.0);
/// A sign escaping the work zone may drift at most this far from the road.
pub const MAX_SIGN_OFFSET: Distance = Distance::const_meters(12.0);
/// Cones may sit this far outside the zone boundary before they get clamped back.
pub const BOUNDARY_TOLERANCE: Distance = Distance::const_meters(5.0);
/// Padding around the zone's bounding box when scoring candidate roads.
pub const ROAD_BBOX_PADDING: Distance = Distance::const_meters(100.0);
/// How far to probe along the alignment when deciding which way is upstream.
pub const UPSTREAM_PROBE: Distance = Distance::const_meters(50.0);
/// Retry budget for off-polygon and anti-stacking corrections. When it runs out, the
/// best candidate so far is accepted and flagged approximate.
pub const PLACEMENT_RETRIES: usize = 5;
