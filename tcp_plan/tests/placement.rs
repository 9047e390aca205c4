//! End-to-end placement scenarios: one zone, both strategies, and the layout lifecycle.

use geom::{Distance, LonLat, PolyLine, Ring};
use tcp_plan::{
    suggest_layout, ApproachDirection, DeviceType, Operation, PlacementMethod, PlanRequest,
    Provenance, RoadType, SignFace, TimeOfDay, BOUNDARY_TOLERANCE, MIN_DEVICE_SEPARATION,
    MIN_SIGN_SEPARATION,
};

/// Roughly 75m x 89m, in Seattle.
fn zone() -> Ring {
    Ring::must_new(vec![
        LonLat::new(-122.3400, 47.6000),
        LonLat::new(-122.3390, 47.6000),
        LonLat::new(-122.3390, 47.6008),
        LonLat::new(-122.3400, 47.6008),
    ])
}

/// An east-west road slicing straight through the zone.
fn through_road() -> PolyLine {
    PolyLine::must_new(vec![
        LonLat::new(-122.3500, 47.6004),
        LonLat::new(-122.3300, 47.6004),
    ])
}

fn lane_closure_request() -> PlanRequest {
    PlanRequest {
        zone: zone(),
        speed_mph: 45.0,
        operation: Operation::LaneClosure,
        time_of_day: TimeOfDay::Day,
        road_type: RoadType::Arterial,
        work_length: Distance::meters(30.0),
        roads: vec![through_road()],
    }
}

#[test]
fn high_speed_lane_closure_on_a_road() {
    let (layout, rules) = suggest_layout(&lane_closure_request());

    assert_eq!(layout.provenance, Provenance::MachineSuggested);
    // The road runs east-west through the middle of the zone, so traffic approaches from
    // one of those two directions.
    assert!(matches!(
        layout.approach,
        ApproachDirection::East | ApproachDirection::West
    ));

    let signs: Vec<_> = layout
        .devices()
        .iter()
        .filter(|d| d.device_type == DeviceType::Sign)
        .collect();
    assert_eq!(signs.len(), 3);
    let labels: Vec<_> = signs.iter().map(|d| d.label.clone().unwrap()).collect();
    assert_eq!(labels, vec!["C", "B", "A"]);
    for sign in &signs {
        assert!(!zone().contains_pt(sign.pos), "a sign landed inside the zone");
        assert_eq!(sign.meta.method, PlacementMethod::RoadAligned);
    }
    for (i, a) in signs.iter().enumerate() {
        for b in &signs[i + 1..] {
            if !a.meta.approximate && !b.meta.approximate {
                assert!(a.pos.gps_dist(b.pos) >= MIN_SIGN_SEPARATION);
            }
        }
    }
    // A sits farthest upstream
    let centroid = zone().centroid();
    assert!(signs[2].pos.gps_dist(centroid) > signs[0].pos.gps_dist(centroid));

    // 405ft of taper at 45ft spacing
    assert_eq!(rules.taper_length_ft.value, 405.0);
    let cones: Vec<_> = layout
        .devices()
        .iter()
        .filter(|d| d.device_type == DeviceType::Cone)
        .collect();
    assert_eq!(cones.len(), 9);
    for cone in &cones {
        let near = zone().contains_pt(cone.pos)
            || zone().dist_to_boundary(cone.pos) <= BOUNDARY_TOLERANCE + Distance::meters(0.01);
        assert!(near, "a cone drifted away from the zone");
    }

    // A 45mph lane closure posts one flagger and an arrow board
    let flaggers: Vec<_> = layout
        .devices()
        .iter()
        .filter(|d| d.device_type == DeviceType::Flagger)
        .collect();
    assert_eq!(flaggers.len(), 1);
    assert_eq!(flaggers[0].label.as_deref(), Some("F1"));

    let boards: Vec<_> = layout
        .devices()
        .iter()
        .filter(|d| d.device_type == DeviceType::ArrowBoard)
        .collect();
    assert_eq!(boards.len(), 1);
    assert!(boards[0].rotation_degs.is_some());

    assert!(rules.drums_required.value);
}

#[test]
fn no_arrow_board_below_45() {
    let mut req = lane_closure_request();
    req.speed_mph = 40.0;
    let (layout, _) = suggest_layout(&req);
    assert!(!layout
        .devices()
        .iter()
        .any(|d| d.device_type == DeviceType::ArrowBoard));
}

#[test]
fn flagging_without_roads_falls_back_to_the_axis() {
    let req = PlanRequest {
        zone: zone(),
        speed_mph: 35.0,
        operation: Operation::Flagging,
        time_of_day: TimeOfDay::Day,
        road_type: RoadType::Local,
        work_length: Distance::meters(30.0),
        roads: Vec::new(),
    };
    let (layout, rules) = suggest_layout(&req);

    // The zone is taller than wide, so the axis runs south to north
    assert_eq!(layout.approach, ApproachDirection::South);
    for device in layout.devices() {
        assert_eq!(device.meta.method, PlacementMethod::AxisFallback);
    }

    let signs: Vec<_> = layout
        .devices()
        .iter()
        .filter(|d| d.device_type == DeviceType::Sign)
        .collect();
    assert_eq!(signs.len(), 3);
    for sign in &signs {
        assert!(!zone().contains_pt(sign.pos));
    }
    // Flagging leads with the flagger warning closest to the zone
    assert_eq!(signs[0].sign_face, Some(SignFace::FlaggerAhead));
    assert_eq!(signs[2].sign_face, Some(SignFace::RoadWorkAhead));

    // 180ft of taper at 35ft spacing
    let cones = layout
        .devices()
        .iter()
        .filter(|d| d.device_type == DeviceType::Cone)
        .count();
    assert_eq!(cones, 5);

    let flaggers: Vec<_> = layout
        .devices()
        .iter()
        .filter(|d| d.device_type == DeviceType::Flagger)
        .collect();
    assert_eq!(flaggers.len(), 2);
    assert_eq!(flaggers[0].label.as_deref(), Some("F1"));
    assert_eq!(flaggers[1].label.as_deref(), Some("F2"));

    assert!(rules
        .required_signs
        .value
        .contains(&SignFace::FlaggerAhead));
}

#[test]
fn suggestions_are_deterministic() {
    let (a, rules_a) = suggest_layout(&lane_closure_request());
    let (b, rules_b) = suggest_layout(&lane_closure_request());
    assert_eq!(a.devices(), b.devices());
    assert_eq!(a.approach, b.approach);
    assert_eq!(rules_a, rules_b);
}

#[test]
fn user_edits_survive_regeneration() {
    let (mut layout, _) = suggest_layout(&lane_closure_request());
    let id = layout.devices()[0].id;
    let someplace = LonLat::new(-122.3410, 47.6015);
    assert!(layout.move_device(id, someplace));
    assert_eq!(layout.provenance, Provenance::UserModified);

    let (regenerated, _) = suggest_layout(&lane_closure_request());
    let kept = layout.merge_regenerated(regenerated.clone(), false);
    assert_eq!(kept.devices()[0].pos, someplace);

    let replaced = layout.merge_regenerated(regenerated, true);
    assert_eq!(replaced.provenance, Provenance::MachineSuggested);
}

#[test]
fn layouts_render_as_geojson() {
    let (layout, _) = suggest_layout(&lane_closure_request());
    match layout.to_geojson() {
        geojson::GeoJson::FeatureCollection(fc) => {
            assert_eq!(fc.features.len(), layout.devices().len());
            let props = fc.features[0].properties.as_ref().unwrap();
            assert_eq!(props["type"], "sign");
            assert_eq!(props["label"], "C");
        }
        _ => panic!("expected a FeatureCollection"),
    }
}

#[test]
fn tight_zone_accepts_approximate_cones() {
    // Roughly 18m x 18m: far too short for a 45mph taper, so the cones past the far edge
    // clamp onto the boundary, stack, and exhaust their retries.
    let tight = Ring::must_new(vec![
        LonLat::new(-122.34000, 47.60000),
        LonLat::new(-122.33976, 47.60000),
        LonLat::new(-122.33976, 47.60016),
        LonLat::new(-122.34000, 47.60016),
    ]);
    let road = PolyLine::must_new(vec![
        LonLat::new(-122.3500, 47.60008),
        LonLat::new(-122.3300, 47.60008),
    ]);
    let req = PlanRequest {
        zone: tight.clone(),
        speed_mph: 45.0,
        operation: Operation::LaneClosure,
        time_of_day: TimeOfDay::Day,
        road_type: RoadType::Arterial,
        work_length: Distance::meters(10.0),
        roads: vec![road],
    };
    let (layout, _) = suggest_layout(&req);

    let cones: Vec<_> = layout
        .devices()
        .iter()
        .filter(|d| d.device_type == DeviceType::Cone)
        .collect();
    assert_eq!(cones.len(), 9);

    // The retry-exhausted outcome is named, not silent
    assert!(cones.iter().any(|c| c.meta.approximate));

    // Even the approximate ones stay on or near the zone, never out in traffic
    for cone in &cones {
        let near = tight.contains_pt(cone.pos)
            || tight.dist_to_boundary(cone.pos) <= BOUNDARY_TOLERANCE + Distance::meters(0.01);
        assert!(near, "an approximate cone was mis-placed");
    }

    // Cones that weren't flagged still honor the separation rule against each other
    for (i, a) in cones.iter().enumerate() {
        for b in &cones[i + 1..] {
            if !a.meta.approximate && !b.meta.approximate {
                assert!(a.pos.gps_dist(b.pos) >= MIN_DEVICE_SEPARATION);
            }
        }
    }

    // Signs are unaffected: upstream of the entry, they have all the room they need
    let signs: Vec<_> = layout
        .devices()
        .iter()
        .filter(|d| d.device_type == DeviceType::Sign)
        .collect();
    assert_eq!(signs.len(), 3);
    for sign in &signs {
        assert!(!tight.contains_pt(sign.pos));
        assert!(!sign.meta.approximate);
    }
}
