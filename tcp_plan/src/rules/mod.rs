//! The deterministic rules resolver: (speed, lane width, operation, time-of-day) in,
//! concrete spacing/length/count values out, every field carrying a citation. Values come
//! from a static versioned pack embedded at compile time; if the whole pack is unreadable,
//! resolution degrades to a legacy fixed table rather than erroring. Per-field gaps in a
//! healthy pack fall to the documented formulas instead.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::SignFace;

pub const SPEED_BUCKETS: [usize; 7] = [25, 30, 35, 40, 45, 50, 55];

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    LaneClosure,
    LaneShift,
    Flagging,
    ShoulderWork,
    FullClosure,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::LaneClosure => "lane_closure",
            Operation::LaneShift => "lane_shift",
            Operation::Flagging => "flagging",
            Operation::ShoulderWork => "shoulder_work",
            Operation::FullClosure => "full_closure",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Day,
    Night,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RulesQuery {
    pub speed_mph: f64,
    pub lane_width_ft: f64,
    pub operation: Operation,
    pub time_of_day: TimeOfDay,
}

impl RulesQuery {
    pub fn new(speed_mph: f64, operation: Operation, time_of_day: TimeOfDay) -> RulesQuery {
        RulesQuery {
            speed_mph,
            lane_width_ft: 12.0,
            operation,
            time_of_day,
        }
    }
}

/// Where a resolved value came from: the pack itself, a documented formula, or the legacy
/// table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub source: String,
    pub section: Option<String>,
    pub note: Option<String>,
}

impl Citation {
    fn pack(pack: &RulesPack, section: Option<&String>) -> Citation {
        Citation {
            source: pack.source.clone(),
            section: section.cloned(),
            note: None,
        }
    }

    fn derived(note: &str) -> Citation {
        Citation {
            source: "derived".to_string(),
            section: None,
            note: Some(note.to_string()),
        }
    }

    fn legacy(note: &str) -> Citation {
        Citation {
            source: "legacy fixed table".to_string(),
            section: None,
            note: Some(note.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cited<T> {
    pub value: T,
    pub citation: Citation,
}

impl<T> Cited<T> {
    fn new(value: T, citation: Citation) -> Cited<T> {
        Cited { value, citation }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlaggerPost {
    pub role: String,
    pub location: String,
}

/// The immutable result of one resolver query. All lengths in feet, matching the source
/// tables; callers convert to meters at the geometry boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRules {
    pub speed_bucket: usize,
    pub sign_spacing_ft: Cited<f64>,
    pub cone_spacing_ft: Cited<f64>,
    pub taper_length_ft: Cited<f64>,
    pub buffer_length_ft: Cited<f64>,
    pub drums_required: Cited<bool>,
    pub required_signs: Cited<Vec<SignFace>>,
    pub flaggers: Cited<Vec<FlaggerPost>>,
}

#[derive(Deserialize)]
struct RulesPack {
    #[allow(unused)]
    version: String,
    source: String,
    by_speed_bucket: BTreeMap<String, SpeedBucketEntry>,
    operations: BTreeMap<String, OperationEntry>,
}

#[derive(Deserialize)]
struct SpeedBucketEntry {
    sign_spacing_ft: Option<f64>,
    cone_spacing_ft: Option<f64>,
    taper_length_ft: Option<f64>,
    buffer_length_ft: Option<f64>,
    drums_required: Option<bool>,
    section: Option<String>,
}

#[derive(Deserialize)]
struct OperationEntry {
    required_signs: Vec<SignFace>,
    flaggers: FlaggerPolicy,
    section: Option<String>,
}

#[derive(Deserialize)]
struct FlaggerPolicy {
    count: usize,
    min_speed_mph: Option<f64>,
}

lazy_static::lazy_static! {
    static ref PACK: Option<RulesPack> = load_pack();
}

fn load_pack() -> Option<RulesPack> {
    match serde_json::from_str::<RulesPack>(include_str!("pack.json")) {
        Ok(pack) => Some(pack),
        Err(err) => {
            warn!(
                "The rules pack is unreadable ({}); degrading to the legacy fixed table",
                err
            );
            None
        }
    }
}

/// Resolves all spacing/length/count values for one job. Pure and total: never errors for
/// valid enum inputs, and identical queries always produce identical results.
pub fn resolve_tcp_rules(query: &RulesQuery) -> ResolvedRules {
    match &*PACK {
        Some(pack) => resolve_from_pack(pack, query),
        None => legacy_resolve(query),
    }
}

/// Clamp to [25, 55] mph, then floor to the nearest bucket.
fn bucket_speed(speed_mph: f64) -> usize {
    let clamped = speed_mph.clamp(25.0, 55.0);
    SPEED_BUCKETS
        .iter()
        .rev()
        .copied()
        .find(|b| *b as f64 <= clamped)
        .unwrap_or(SPEED_BUCKETS[0])
}

fn taper_formula(lane_width_ft: f64, speed: f64) -> f64 {
    if speed <= 40.0 {
        lane_width_ft * speed
    } else {
        (lane_width_ft * speed * speed / 60.0).round()
    }
}

fn resolve_from_pack(pack: &RulesPack, query: &RulesQuery) -> ResolvedRules {
    let bucket = bucket_speed(query.speed_mph);
    let speed = bucket as f64;
    let entry = pack.by_speed_bucket.get(&bucket.to_string());
    let section = entry.and_then(|e| e.section.as_ref());

    let sign_spacing_ft = match entry.and_then(|e| e.sign_spacing_ft) {
        Some(v) => Cited::new(v, Citation::pack(pack, section)),
        None => {
            let v = if speed <= 30.0 {
                100.0
            } else if speed <= 40.0 {
                200.0
            } else {
                350.0
            };
            Cited::new(v, Citation::derived("tiered sign spacing by speed class"))
        }
    };

    let cone_spacing_ft = match entry.and_then(|e| e.cone_spacing_ft) {
        Some(v) => Cited::new(v, Citation::pack(pack, section)),
        None => Cited::new(speed, Citation::derived("S-feet rule: cone spacing in feet equals speed in mph")),
    };

    let taper_length_ft = match entry.and_then(|e| e.taper_length_ft) {
        Some(v) => Cited::new(v, Citation::pack(pack, section)),
        None => Cited::new(
            taper_formula(query.lane_width_ft, speed),
            Citation::derived("taper formula: W*S at 40 mph or less, else W*S^2/60, rounded"),
        ),
    };

    let buffer_length_ft = match entry.and_then(|e| e.buffer_length_ft) {
        Some(v) => Cited::new(v, Citation::pack(pack, section)),
        None => Cited::new(2.0 * speed, Citation::derived("buffer length = 2 x speed")),
    };

    let drums_required = {
        let by_table = entry.and_then(|e| e.drums_required);
        let by_speed =
            speed >= 35.0 || (query.time_of_day == TimeOfDay::Night && speed >= 30.0);
        if by_table == Some(true) {
            Cited::new(true, Citation::pack(pack, section))
        } else if by_speed {
            Cited::new(
                true,
                Citation::derived("drums at 35+ mph, or 30+ mph during night work"),
            )
        } else {
            match by_table {
                Some(v) => Cited::new(v, Citation::pack(pack, section)),
                None => Cited::new(false, Citation::derived("no drum trigger applies")),
            }
        }
    };

    let op_entry = pack.operations.get(query.operation.as_str());
    let required_signs = match op_entry {
        Some(op) => Cited::new(
            op.required_signs.clone(),
            Citation::pack(pack, op.section.as_ref()),
        ),
        None => Cited::new(
            default_required_signs(query.operation),
            Citation::derived("default sign sequence for this operation"),
        ),
    };

    let flaggers = match op_entry {
        Some(op) => {
            let count = if op.flaggers.min_speed_mph.map_or(true, |min| speed >= min) {
                op.flaggers.count
            } else {
                0
            };
            Cited::new(flagger_posts(count), Citation::pack(pack, op.section.as_ref()))
        }
        None => Cited::new(
            flagger_posts(default_flagger_count(query.operation, speed)),
            Citation::derived("default flagger policy for this operation"),
        ),
    };

    ResolvedRules {
        speed_bucket: bucket,
        sign_spacing_ft,
        cone_spacing_ft,
        taper_length_ft,
        buffer_length_ft,
        drums_required,
        required_signs,
        flaggers,
    }
}

/// The exception path when the whole pack failed to parse: a fixed table keyed by speed
/// rounded to the nearest 5 mph and clamped to [25, 55]. The values stay within safe
/// engineering bounds, so producing a plan beats hard failure.
fn legacy_resolve(query: &RulesQuery) -> ResolvedRules {
    let rounded = (((query.speed_mph / 5.0).round() * 5.0).clamp(25.0, 55.0)) as usize;
    let speed = rounded as f64;
    let (sign, cone, taper, buffer) = match rounded {
        25 => (100.0, 25.0, 105.0, 55.0),
        30 => (100.0, 30.0, 180.0, 85.0),
        35 => (200.0, 35.0, 180.0, 120.0),
        40 => (200.0, 40.0, 240.0, 170.0),
        45 => (350.0, 45.0, 405.0, 220.0),
        50 => (350.0, 50.0, 500.0, 280.0),
        _ => (350.0, 55.0, 605.0, 335.0),
    };
    let drums = speed >= 35.0 || (query.time_of_day == TimeOfDay::Night && speed >= 30.0);
    let cite = |what: &str| Citation::legacy(what);

    ResolvedRules {
        speed_bucket: rounded,
        sign_spacing_ft: Cited::new(sign, cite("sign spacing, rounded legacy speed row")),
        cone_spacing_ft: Cited::new(cone, cite("cone spacing, rounded legacy speed row")),
        taper_length_ft: Cited::new(taper, cite("taper length, rounded legacy speed row")),
        buffer_length_ft: Cited::new(buffer, cite("buffer length, rounded legacy speed row")),
        drums_required: Cited::new(drums, cite("drums at 35+ mph, or 30+ mph during night work")),
        required_signs: Cited::new(
            default_required_signs(query.operation),
            cite("default sign sequence for this operation"),
        ),
        flaggers: Cited::new(
            flagger_posts(default_flagger_count(query.operation, speed)),
            cite("default flagger policy for this operation"),
        ),
    }
}

fn default_required_signs(op: Operation) -> Vec<SignFace> {
    match op {
        Operation::LaneClosure => vec![SignFace::RoadWorkAhead, SignFace::BePreparedToStop],
        Operation::Flagging => vec![
            SignFace::RoadWorkAhead,
            SignFace::BePreparedToStop,
            SignFace::FlaggerAhead,
        ],
        Operation::FullClosure => vec![
            SignFace::RoadWorkAhead,
            SignFace::RoadClosed,
            SignFace::Detour,
        ],
        Operation::LaneShift | Operation::ShoulderWork => vec![SignFace::RoadWorkAhead],
    }
}

fn default_flagger_count(op: Operation, speed: f64) -> usize {
    match op {
        Operation::Flagging => 2,
        Operation::FullClosure => 1,
        Operation::LaneClosure => {
            if speed >= 40.0 {
                1
            } else {
                0
            }
        }
        Operation::LaneShift | Operation::ShoulderWork => 0,
    }
}

fn flagger_posts(count: usize) -> Vec<FlaggerPost> {
    let mut posts = Vec::new();
    if count >= 1 {
        posts.push(FlaggerPost {
            role: "upstream".to_string(),
            location: "ahead of the work-zone entry, facing approaching traffic".to_string(),
        });
    }
    if count >= 2 {
        posts.push(FlaggerPost {
            role: "downstream".to_string(),
            location: "past the work area, controlling the opposite approach".to_string(),
        });
    }
    posts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(speed_mph: f64, operation: Operation, time_of_day: TimeOfDay) -> RulesQuery {
        RulesQuery::new(speed_mph, operation, time_of_day)
    }

    #[test]
    fn speed_bucketing() {
        assert_eq!(bucket_speed(15.0), 25);
        assert_eq!(bucket_speed(25.0), 25);
        assert_eq!(bucket_speed(29.0), 25);
        assert_eq!(bucket_speed(30.0), 30);
        assert_eq!(bucket_speed(53.0), 50);
        assert_eq!(bucket_speed(72.0), 55);
    }

    #[test]
    fn taper_uses_the_formula_above_40() {
        let rules = resolve_tcp_rules(&query(45.0, Operation::LaneClosure, TimeOfDay::Day));
        assert_eq!(rules.taper_length_ft.value, 405.0);
        assert_eq!(rules.taper_length_ft.citation.source, "derived");
    }

    #[test]
    fn table_rows_resolve_directly() {
        let rules = resolve_tcp_rules(&query(35.0, Operation::LaneClosure, TimeOfDay::Day));
        assert_eq!(rules.sign_spacing_ft.value, 200.0);
        assert_eq!(rules.taper_length_ft.value, 180.0);
        assert!(rules.sign_spacing_ft.citation.section.is_some());

        let rules = resolve_tcp_rules(&query(25.0, Operation::LaneClosure, TimeOfDay::Day));
        assert_eq!(rules.sign_spacing_ft.value, 100.0);
        assert!(!rules.drums_required.value);
    }

    #[test]
    fn drums_at_night() {
        let day = resolve_tcp_rules(&query(30.0, Operation::LaneClosure, TimeOfDay::Day));
        assert!(!day.drums_required.value);
        let night = resolve_tcp_rules(&query(30.0, Operation::LaneClosure, TimeOfDay::Night));
        assert!(night.drums_required.value);
    }

    #[test]
    fn flagging_operation() {
        let rules = resolve_tcp_rules(&query(35.0, Operation::Flagging, TimeOfDay::Day));
        assert!(rules.required_signs.value.contains(&SignFace::FlaggerAhead));
        assert_eq!(rules.flaggers.value.len(), 2);
        assert_eq!(rules.flaggers.value[0].role, "upstream");
    }

    #[test]
    fn lane_closure_flagger_needs_speed() {
        let slow = resolve_tcp_rules(&query(35.0, Operation::LaneClosure, TimeOfDay::Day));
        assert!(slow.flaggers.value.is_empty());
        let fast = resolve_tcp_rules(&query(45.0, Operation::LaneClosure, TimeOfDay::Day));
        assert_eq!(fast.flaggers.value.len(), 1);
    }

    #[test]
    fn resolution_is_idempotent() {
        let q = query(42.0, Operation::Flagging, TimeOfDay::Night);
        assert_eq!(resolve_tcp_rules(&q), resolve_tcp_rules(&q));
    }

    #[test]
    fn legacy_table_stays_in_bounds() {
        let rules = legacy_resolve(&query(47.0, Operation::LaneClosure, TimeOfDay::Day));
        assert_eq!(rules.speed_bucket, 45);
        assert_eq!(rules.taper_length_ft.value, 405.0);
        assert_eq!(rules.sign_spacing_ft.value, 350.0);
        assert_eq!(rules.flaggers.value.len(), 1);

        let rules = legacy_resolve(&query(80.0, Operation::FullClosure, TimeOfDay::Day));
        assert_eq!(rules.speed_bucket, 55);
        assert!(rules.required_signs.value.contains(&SignFace::Detour));
    }
}
