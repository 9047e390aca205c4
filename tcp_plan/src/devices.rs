use std::fmt;

use serde::{Deserialize, Serialize};

use geom::{Angle, Distance, LonLat};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub usize);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Device #{}", self.0)
    }
}

/// Every kind of device a plan can place. Closed set; consumers match exhaustively
/// instead of falling back on "unknown type" branches.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceType {
    Cone,
    Sign,
    ArrowBoard,
    Flagger,
    Drum,
    Barricade,
}

impl DeviceType {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceType::Cone => "cone",
            DeviceType::Sign => "sign",
            DeviceType::ArrowBoard => "arrowBoard",
            DeviceType::Flagger => "flagger",
            DeviceType::Drum => "drum",
            DeviceType::Barricade => "barricade",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignFace {
    RoadWorkAhead,
    BePreparedToStop,
    FlaggerAhead,
    RoadClosed,
    Detour,
}

impl SignFace {
    pub fn as_str(self) -> &'static str {
        match self {
            SignFace::RoadWorkAhead => "ROAD_WORK_AHEAD",
            SignFace::BePreparedToStop => "BE_PREPARED_TO_STOP",
            SignFace::FlaggerAhead => "FLAGGER_AHEAD",
            SignFace::RoadClosed => "ROAD_CLOSED",
            SignFace::Detour => "DETOUR",
        }
    }
}

/// Which placement strategy produced a device. Selected once per plan, never mixed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementMethod {
    RoadAligned,
    AxisFallback,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceMeta {
    /// Placement order within the layout.
    pub sequence: usize,
    pub purpose: String,
    pub method: PlacementMethod,
    /// The rule-resolved distance this device was aiming for, when there was one.
    pub resolved_distance: Option<Distance>,
    /// True when the retry budget ran out and the best candidate was accepted anyway.
    pub approximate: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub device_type: DeviceType,
    pub sign_face: Option<SignFace>,
    pub pos: LonLat,
    pub label: Option<String>,
    /// Compass degrees, clockwise from north.
    pub rotation_degs: Option<f64>,
    pub meta: DeviceMeta,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    MachineSuggested,
    UserCreated,
    UserModified,
}

/// The cardinal direction traffic approaches the work zone from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproachDirection {
    North,
    East,
    South,
    West,
}

impl ApproachDirection {
    /// Buckets a bearing into 90 degree quadrants centered on the cardinal directions.
    pub fn from_bearing(bearing: Angle) -> ApproachDirection {
        let degs = bearing.normalized_degrees();
        if !(45.0..315.0).contains(&degs) {
            ApproachDirection::North
        } else if degs < 135.0 {
            ApproachDirection::East
        } else if degs < 225.0 {
            ApproachDirection::South
        } else {
            ApproachDirection::West
        }
    }
}

impl fmt::Display for ApproachDirection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApproachDirection::North => write!(f, "north"),
            ApproachDirection::East => write!(f, "east"),
            ApproachDirection::South => write!(f, "south"),
            ApproachDirection::West => write!(f, "west"),
        }
    }
}
